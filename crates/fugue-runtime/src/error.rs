//! Error types for schedule execution

use fugue_primitives::KernelId;
use fugue_scheduler::ScheduleError;
use thiserror::Error;

/// Run-time execution errors
#[derive(Debug, Error)]
pub enum RunError {
    /// The schedule does not match the kernel table
    #[error("schedule rejected: {0}")]
    InvalidSchedule(#[from] ScheduleError),

    /// A kernel returned a nonzero status
    ///
    /// The layer in which the fault occurred was allowed to finish before
    /// the run stopped; this reports the first observed fault.
    #[error("kernel {kernel} failed with status {status} in layer {layer}")]
    KernelFault {
        /// Layer index the fault occurred in
        layer: usize,
        /// The failing kernel
        kernel: KernelId,
        /// The kernel's nonzero return status
        status: i32,
    },
}

/// Result type for schedule execution
pub type RunResult<T> = Result<T, RunError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kernel_fault_display() {
        let err = RunError::KernelFault {
            layer: 3,
            kernel: KernelId::new(12),
            status: -2,
        };
        let msg = err.to_string();
        assert!(msg.contains("#12"));
        assert!(msg.contains("-2"));
        assert!(msg.contains("layer 3"));
    }
}
