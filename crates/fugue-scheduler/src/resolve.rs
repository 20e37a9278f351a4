//! Program resolution
//!
//! The ingestion boundary between the upstream extraction stage and the
//! core: kernel specs name their buffers and entry points symbolically, a
//! [`ResolutionTable`] maps buffer names to locations, and a
//! [`KernelRegistry`] maps entry-point names to callables. Resolution turns
//! the three into the immutable [`Kernel`] table everything downstream
//! consumes.

use crate::error::{ScheduleError, ScheduleResult};
use fugue_primitives::{BufferLoc, BufferRef, Kernel, KernelFn, KernelId, ScratchRange};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// One kernel as described by the extraction stage
///
/// Ids must be dense and 0-based across a program.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KernelSpec {
    /// Dense 0-based kernel id
    pub id: u32,
    /// Entry-point name, also the registry key
    pub name: String,
    /// Input buffer names, in call order
    pub inputs: Vec<String>,
    /// Output buffer names, in call order
    pub outputs: Vec<String>,
    /// Private workspace range the kernel touches beyond its named buffers
    #[serde(default)]
    pub scratch: Option<ScratchRange>,
}

/// Mapping from symbolic buffer name to resolved location
///
/// A name may be registered exactly once; in particular nothing can be both
/// an external sentinel and arena-addressed, which makes the assumption that
/// external I/O never aliases workspace storage a checked precondition.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ResolutionTable {
    buffers: HashMap<String, BufferLoc>,
}

impl ResolutionTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a buffer's location
    ///
    /// Re-registering a name with the same location is a no-op; a different
    /// location is an error.
    pub fn insert(&mut self, name: impl Into<String>, loc: BufferLoc) -> ScheduleResult<()> {
        let name = name.into();
        match self.buffers.get(&name) {
            Some(existing) if *existing != loc => {
                Err(ScheduleError::ConflictingResolution { buffer: name })
            }
            _ => {
                self.buffers.insert(name, loc);
                Ok(())
            }
        }
    }

    /// Look up a buffer's location
    pub fn get(&self, name: &str) -> Option<BufferLoc> {
        self.buffers.get(name).copied()
    }

    /// Number of registered buffers
    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    /// Whether the table is empty
    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }
}

/// Entry-point table: kernel name to callable
#[derive(Clone, Default)]
pub struct KernelRegistry {
    entries: HashMap<String, KernelFn>,
}

impl KernelRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an entry point under a kernel name
    pub fn register(&mut self, name: impl Into<String>, entry: KernelFn) {
        self.entries.insert(name.into(), entry);
    }

    /// Look up an entry point
    pub fn get(&self, name: &str) -> Option<&KernelFn> {
        self.entries.get(name)
    }
}

impl std::fmt::Debug for KernelRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KernelRegistry")
            .field("entries", &self.entries.len())
            .finish()
    }
}

/// The serialized interchange form of a program: specs plus buffer table
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ProgramManifest {
    /// Kernel specs in program order
    pub kernels: Vec<KernelSpec>,
    /// Buffer name resolution table
    pub buffers: ResolutionTable,
}

/// Resolve a manifest against an entry-point registry
///
/// Fails if ids are not dense and 0-based, if any referenced buffer has no
/// table entry, or if a spec names an entry point missing from the registry.
pub fn resolve_program(
    manifest: &ProgramManifest,
    registry: &KernelRegistry,
) -> ScheduleResult<Vec<Kernel>> {
    let mut kernels = Vec::with_capacity(manifest.kernels.len());

    for (position, spec) in manifest.kernels.iter().enumerate() {
        if spec.id as usize != position {
            return Err(ScheduleError::NonDenseIds {
                expected: position as u32,
                found: spec.id,
            });
        }
        let id = KernelId::new(spec.id);

        let resolve_refs = |names: &[String]| -> ScheduleResult<Vec<BufferRef>> {
            names
                .iter()
                .map(|name| match manifest.buffers.get(name) {
                    Some(loc) => Ok(BufferRef {
                        name: name.clone(),
                        loc,
                    }),
                    None => Err(ScheduleError::UnresolvedBuffer {
                        kernel: id,
                        buffer: name.clone(),
                    }),
                })
                .collect()
        };

        let inputs = resolve_refs(&spec.inputs)?;
        let outputs = resolve_refs(&spec.outputs)?;

        let entry = registry
            .get(&spec.name)
            .ok_or_else(|| ScheduleError::UnknownEntryPoint {
                kernel: id,
                name: spec.name.clone(),
            })?
            .clone();

        kernels.push(Kernel::new(id, spec.name.clone(), inputs, outputs, spec.scratch, entry));
    }

    debug!(kernels = kernels.len(), buffers = manifest.buffers.len(), "program resolved");
    Ok(kernels)
}
