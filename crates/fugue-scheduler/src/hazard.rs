//! Hazard analysis
//!
//! Builds the "must complete before" dependency graph from raw address
//! information, covering read-after-write, write-after-write and
//! write-after-read hazards. The resulting graph is a superset of the true
//! hazards: false positives only cost parallelism, false negatives would
//! corrupt the workspace.

use crate::error::{ScheduleError, ScheduleResult, StuckKernel};
use fugue_primitives::{Kernel, KernelId};
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

/// Kind of ordering hazard between two kernels
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HazardKind {
    /// A kernel reads what an earlier kernel writes
    ReadAfterWrite,
    /// Both kernels write the same address
    WriteAfterWrite,
    /// A kernel overwrites what an earlier kernel reads
    WriteAfterRead,
}

/// Edge in the dependency graph
#[derive(Clone, Debug)]
struct HazardEdge {
    /// Kernel that must wait for the edge's source
    to: KernelId,
    /// Hazard that forced the edge
    kind: HazardKind,
}

/// Directed dependency graph over kernel ids
///
/// An edge `a -> b` means `a` must complete before `b` may start. A valid
/// input program yields an acyclic graph; a cycle is malformed input and is
/// reported as a hard error by layering, never approximated.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    /// Forward edges: kernel -> kernels that depend on it
    forward: HashMap<KernelId, Vec<HazardEdge>>,
    /// Backward edges: kernel -> kernels it depends on
    backward: HashMap<KernelId, BTreeSet<KernelId>>,
    /// All registered kernels
    kernels: BTreeSet<KernelId>,
}

impl DependencyGraph {
    /// Create a new empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a kernel node
    pub fn add_kernel(&mut self, id: KernelId) {
        self.kernels.insert(id);
        self.forward.entry(id).or_default();
        self.backward.entry(id).or_default();
    }

    /// Add a dependency edge: `from` must complete before `to`
    ///
    /// Self-edges and duplicate edges are discarded; the first recorded
    /// hazard kind wins for a given pair.
    pub fn add_dependency(&mut self, from: KernelId, to: KernelId, kind: HazardKind) {
        if from == to {
            return;
        }
        if self.backward.entry(to).or_default().insert(from) {
            self.forward.entry(from).or_default().push(HazardEdge { to, kind });
        }
    }

    /// Sorted list of kernels the given kernel depends on
    pub fn dependencies_of(&self, id: KernelId) -> Vec<KernelId> {
        self.backward
            .get(&id)
            .map(|deps| deps.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Kernels that depend on the given kernel
    pub fn dependents_of(&self, id: KernelId) -> Vec<KernelId> {
        self.forward
            .get(&id)
            .map(|edges| edges.iter().map(|e| e.to).collect())
            .unwrap_or_default()
    }

    /// Whether `a` directly depends on `b`
    pub fn depends_on(&self, a: KernelId, b: KernelId) -> bool {
        self.backward.get(&a).is_some_and(|deps| deps.contains(&b))
    }

    /// Number of dependencies of a kernel
    pub fn in_degree(&self, id: KernelId) -> usize {
        self.backward.get(&id).map(|deps| deps.len()).unwrap_or(0)
    }

    /// Total number of dependency edges
    pub fn edge_count(&self) -> usize {
        self.forward.values().map(|edges| edges.len()).sum()
    }

    /// Number of registered kernels
    pub fn len(&self) -> usize {
        self.kernels.len()
    }

    /// Whether the graph has no kernels
    pub fn is_empty(&self) -> bool {
        self.kernels.is_empty()
    }

    /// Partition the graph into topological waves (Kahn layering)
    ///
    /// Each wave holds, in increasing id order, every kernel whose
    /// dependencies all lie in earlier waves. Fails with a diagnostic listing
    /// every stuck kernel and its unsatisfied dependencies if no progress can
    /// be made while kernels remain.
    pub fn layer_waves(&self) -> ScheduleResult<Vec<Vec<KernelId>>> {
        let mut placed: BTreeSet<KernelId> = BTreeSet::new();
        let mut waves = Vec::new();

        while placed.len() < self.kernels.len() {
            let ready: Vec<KernelId> = self
                .kernels
                .iter()
                .filter(|id| !placed.contains(*id))
                .filter(|id| {
                    self.backward
                        .get(*id)
                        .map(|deps| deps.iter().all(|d| placed.contains(d)))
                        .unwrap_or(true)
                })
                .copied()
                .collect();

            if ready.is_empty() {
                let stuck = self
                    .kernels
                    .iter()
                    .filter(|id| !placed.contains(*id))
                    .map(|&kernel| StuckKernel {
                        kernel,
                        unsatisfied: self
                            .dependencies_of(kernel)
                            .into_iter()
                            .filter(|d| !placed.contains(d))
                            .collect(),
                    })
                    .collect();
                return Err(ScheduleError::CycleDetected { stuck });
            }

            placed.extend(ready.iter().copied());
            waves.push(ready);
        }

        Ok(waves)
    }
}

/// Analyze a program and build its dependency graph
///
/// Walks the kernels once in program order, threading explicit local state:
/// a name-to-producer map over all declared outputs, an address-to-last-
/// writer map and an address-to-readers map. Every input takes a dependency
/// on its named producer and on the last writer of its resolved address (the
/// latter covers aliasing the explicit link misses); every output takes
/// write-after-write and write-after-read dependencies before becoming the
/// new last writer. External sentinels are excluded throughout.
pub fn analyze(kernels: &[Kernel]) -> DependencyGraph {
    let mut graph = DependencyGraph::new();
    for kernel in kernels {
        graph.add_kernel(kernel.id);
    }

    // Explicit dataflow links: output name -> producing kernel. A name
    // written twice keeps its later producer, matching the address maps
    // below which track only the most recent writer.
    let mut producer_by_name: HashMap<&str, KernelId> = HashMap::new();
    for kernel in kernels {
        for out in kernel.outputs.iter().filter(|r| !r.is_external()) {
            producer_by_name.insert(out.name.as_str(), kernel.id);
        }
    }

    let mut last_writer: HashMap<u64, KernelId> = HashMap::new();
    let mut readers: HashMap<u64, Vec<KernelId>> = HashMap::new();

    for kernel in kernels {
        let id = kernel.id;

        for input in kernel.inputs.iter().filter(|r| !r.is_external()) {
            if let Some(&producer) = producer_by_name.get(input.name.as_str()) {
                graph.add_dependency(producer, id, HazardKind::ReadAfterWrite);
            }
            if let Some(addr) = input.address() {
                if let Some(&writer) = last_writer.get(&addr) {
                    graph.add_dependency(writer, id, HazardKind::ReadAfterWrite);
                }
                readers.entry(addr).or_default().push(id);
            }
        }

        for output in kernel.outputs.iter().filter(|r| !r.is_external()) {
            let Some(addr) = output.address() else {
                continue;
            };
            if let Some(&writer) = last_writer.get(&addr) {
                graph.add_dependency(writer, id, HazardKind::WriteAfterWrite);
            }
            if let Some(prior_readers) = readers.get(&addr) {
                for &reader in prior_readers {
                    graph.add_dependency(reader, id, HazardKind::WriteAfterRead);
                }
            }
            last_writer.insert(addr, id);
            readers.insert(addr, Vec::new());
        }
    }

    debug!(
        kernels = kernels.len(),
        edges = graph.edge_count(),
        "hazard analysis complete"
    );
    graph
}
