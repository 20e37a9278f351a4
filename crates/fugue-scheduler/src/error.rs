//! Error types for schedule generation

use fugue_primitives::KernelId;
use std::fmt::Write;
use thiserror::Error;

/// A kernel that could not be placed during topological layering, together
/// with the dependencies that were never satisfied
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StuckKernel {
    /// The unplaced kernel
    pub kernel: KernelId,
    /// Its unsatisfied dependencies
    pub unsatisfied: Vec<KernelId>,
}

fn render_stuck(stuck: &[StuckKernel]) -> String {
    let mut out = String::new();
    for (i, s) in stuck.iter().enumerate() {
        if i > 0 {
            out.push_str("; ");
        }
        let _ = write!(out, "kernel {} waiting on [", s.kernel);
        for (j, dep) in s.unsatisfied.iter().enumerate() {
            if j > 0 {
                out.push_str(", ");
            }
            let _ = write!(out, "{dep}");
        }
        out.push(']');
    }
    out
}

/// Schedule generation errors
///
/// All of these are fatal: generation aborts and no partial schedule is
/// emitted.
#[derive(Debug, Error)]
pub enum ScheduleError {
    /// Topological layering could not make progress
    #[error("dependency cycle detected: {}", render_stuck(.stuck))]
    CycleDetected {
        /// Every kernel left unplaced, with its unsatisfied dependencies
        stuck: Vec<StuckKernel>,
    },

    /// A kernel references a buffer with no resolvable address or sentinel
    #[error("kernel {kernel} references buffer `{buffer}` with no resolved address or sentinel")]
    UnresolvedBuffer {
        /// The referencing kernel
        kernel: KernelId,
        /// The unresolvable buffer name
        buffer: String,
    },

    /// A buffer name was registered with two different resolutions
    #[error("buffer `{buffer}` registered with conflicting resolutions")]
    ConflictingResolution {
        /// The doubly-registered buffer name
        buffer: String,
    },

    /// Kernel ids are not dense and 0-based
    #[error("kernel ids must be dense and 0-based: expected {expected}, found {found}")]
    NonDenseIds {
        /// The id expected at this position
        expected: u32,
        /// The id actually present
        found: u32,
    },

    /// A kernel spec names an entry point missing from the registry
    #[error("kernel {kernel} names unknown entry point `{name}`")]
    UnknownEntryPoint {
        /// The kernel whose entry point is missing
        kernel: KernelId,
        /// The missing entry point name
        name: String,
    },

    /// A schedule does not cover the kernel table exactly once
    #[error("malformed schedule: kernel {kernel} is out of range, duplicated or missing")]
    MalformedSchedule {
        /// The offending kernel id
        kernel: KernelId,
    },
}

/// Result type for schedule generation
pub type ScheduleResult<T> = Result<T, ScheduleError>;
