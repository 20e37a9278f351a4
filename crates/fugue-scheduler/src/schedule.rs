//! The schedule artifact
//!
//! A [`Schedule`] is the ordered sequence of layers produced at generation
//! time: each layer is a set of kernel ids proven pairwise conflict-free.
//! Built once, immutable afterward, and consumed read-only by the executor
//! across any number of runs. The serialized form, a flat ordered list of
//! per-layer kernel-id lists, is the only artifact that round-trips between
//! generation time and run time.

use crate::error::{ScheduleError, ScheduleResult};
use fugue_primitives::KernelId;
use serde::{Deserialize, Serialize};

/// An ordered, immutable layered execution plan
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    layers: Vec<Vec<KernelId>>,
}

impl Schedule {
    /// Create a schedule from its layers
    pub fn new(layers: Vec<Vec<KernelId>>) -> Self {
        Self { layers }
    }

    /// The degenerate serial schedule: one kernel per layer, program order
    ///
    /// Always valid and safe for any program of `kernel_count` kernels;
    /// requires no hazard analysis. Used as a correctness baseline and as
    /// the fallback when no parallelism is desired.
    pub fn serial(kernel_count: usize) -> Self {
        Self {
            layers: (0..kernel_count as u32).map(|i| vec![KernelId::new(i)]).collect(),
        }
    }

    /// All layers in execution order
    pub fn layers(&self) -> &[Vec<KernelId>] {
        &self.layers
    }

    /// One layer's kernel ids
    pub fn layer(&self, index: usize) -> &[KernelId] {
        &self.layers[index]
    }

    /// Number of layers
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// Whether the schedule has no layers
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Total number of scheduled kernels
    pub fn kernel_count(&self) -> usize {
        self.layers.iter().map(|layer| layer.len()).sum()
    }

    /// Size of the largest layer
    pub fn max_parallelism(&self) -> usize {
        self.layers.iter().map(|layer| layer.len()).max().unwrap_or(0)
    }

    /// Check that the schedule covers a dense kernel table exactly once
    ///
    /// Required before consuming a deserialized schedule: every id must be
    /// in `0..kernel_count` and appear in exactly one layer.
    pub fn validate(&self, kernel_count: usize) -> ScheduleResult<()> {
        let mut seen = vec![false; kernel_count];
        for layer in &self.layers {
            for &id in layer {
                match seen.get_mut(id.index()) {
                    Some(slot) if !*slot => *slot = true,
                    _ => return Err(ScheduleError::MalformedSchedule { kernel: id }),
                }
            }
        }
        if let Some(missing) = seen.iter().position(|placed| !placed) {
            return Err(ScheduleError::MalformedSchedule {
                kernel: KernelId::new(missing as u32),
            });
        }
        Ok(())
    }
}

/// Summary statistics carried out of schedule generation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleStats {
    /// Total number of kernels scheduled
    pub total_kernels: usize,
    /// Number of layers in the final schedule
    pub layer_count: usize,
    /// Number of dependency edges found by hazard analysis
    pub dependency_count: usize,
    /// Size of the largest layer
    pub max_parallelism: usize,
}

impl ScheduleStats {
    /// Ratio of kernels to layers; 1.0 means fully serial
    pub fn parallelism_ratio(&self) -> f64 {
        if self.layer_count == 0 {
            return 0.0;
        }
        self.total_kernels as f64 / self.layer_count as f64
    }

    /// Layers saved versus the serial baseline
    pub fn layers_saved(&self) -> usize {
        self.total_kernels.saturating_sub(self.layer_count)
    }
}
