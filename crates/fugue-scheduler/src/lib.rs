//! # fugue-scheduler
//!
//! Schedule generation for fugue.
//!
//! Turns a resolved kernel table into a layered parallel execution plan:
//! hazard analysis infers the dependency graph from raw addresses, Kahn
//! layering partitions it into waves, and first-fit grouping against the
//! conflict oracle refines each wave into pairwise conflict-free layers.
//!
//! Everything here runs at generation time; the resulting [`Schedule`] is
//! immutable and is the only artifact handed to the runtime.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod access;
mod conflict;
mod error;
mod grouping;
mod hazard;
mod resolve;
mod schedule;

pub use access::AccessSet;
pub use conflict::ConflictOracle;
pub use error::{ScheduleError, ScheduleResult, StuckKernel};
pub use grouping::group_wave;
pub use hazard::{analyze, DependencyGraph, HazardKind};
pub use resolve::{
    resolve_program, KernelRegistry, KernelSpec, ProgramManifest, ResolutionTable,
};
pub use schedule::{Schedule, ScheduleStats};

use fugue_primitives::Kernel;
use tracing::debug;

/// A generated schedule together with its statistics
#[derive(Clone, Debug)]
pub struct Plan {
    /// The layered execution plan
    pub schedule: Schedule,
    /// Generation statistics
    pub stats: ScheduleStats,
}

/// Run the full generation pipeline over a resolved kernel table
///
/// Validates that ids are dense and 0-based, analyzes hazards, layers the
/// dependency graph into waves and refines each wave into conflict-free
/// groups. Fails without emitting a partial schedule if the graph contains a
/// cycle.
pub fn plan(kernels: &[Kernel]) -> ScheduleResult<Plan> {
    for (position, kernel) in kernels.iter().enumerate() {
        if kernel.id.index() != position {
            return Err(ScheduleError::NonDenseIds {
                expected: position as u32,
                found: kernel.id.as_u32(),
            });
        }
    }

    let graph = analyze(kernels);
    let waves = graph.layer_waves()?;
    let oracle = ConflictOracle::new(kernels, &graph);

    let mut layers = Vec::new();
    for wave in &waves {
        layers.extend(group_wave(&oracle, wave));
    }

    let schedule = Schedule::new(layers);
    let stats = ScheduleStats {
        total_kernels: kernels.len(),
        layer_count: schedule.len(),
        dependency_count: graph.edge_count(),
        max_parallelism: schedule.max_parallelism(),
    };
    debug!(
        kernels = stats.total_kernels,
        layers = stats.layer_count,
        edges = stats.dependency_count,
        max_parallelism = stats.max_parallelism,
        "schedule generated"
    );

    Ok(Plan { schedule, stats })
}
