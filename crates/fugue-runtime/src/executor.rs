//! Schedule executor
//!
//! Executes a schedule layer-by-layer on a fixed pool of worker threads plus
//! the coordinating caller thread. All participants are symmetric SPMD
//! executors synchronized by two alternating barriers per layer; within a
//! layer each participant runs a statically strided slice of the layer's
//! kernels. The workspace arena is accessed with zero locking; safety was
//! proved when the schedule was built.

use crate::barrier::Barrier;
use crate::error::{RunError, RunResult};
use fugue_primitives::{ConstArena, Kernel, KernelId, WorkArena};
use fugue_scheduler::Schedule;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;
use std::time::Instant;
use tracing::{debug, error};

/// Run-time configuration, owned by the surrounding tooling
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunConfig {
    /// Worker-thread count; participants = workers + the coordinator. Zero
    /// workers runs the whole schedule on the caller thread.
    pub workers: usize,
    /// Cap on the number of leading layers to execute; `None` runs all
    pub max_layers: Option<usize>,
    /// Emit a trace event every N layers; 0 disables cadence tracing
    pub trace_every: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            workers: 3,
            max_layers: None,
            trace_every: 0,
        }
    }
}

impl RunConfig {
    /// Configuration with the given worker count and defaults otherwise
    pub fn with_workers(workers: usize) -> Self {
        Self {
            workers,
            ..Self::default()
        }
    }
}

/// Outcome of a completed (non-faulting) run
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunSummary {
    /// Number of layers executed
    pub layers_executed: usize,
}

/// A fault observed by one participant, kept in its private slot until the
/// pool is joined
#[derive(Clone, Copy, Debug)]
struct Fault {
    layer: usize,
    kernel: KernelId,
    status: i32,
}

/// Shared state for one run; lives only for the duration of the run
struct ExecContext<'a> {
    schedule: &'a Schedule,
    kernels: &'a [Kernel],
    consts: &'a ConstArena,
    workspace: &'a WorkArena,
    participants: usize,
    /// Layer currently being executed, published before the start barrier
    layer_idx: AtomicUsize,
    /// Set by the coordinator once no further layers will be issued
    halted: AtomicBool,
    /// Any-fault flag; observed by the coordinator after the end barrier
    faulted: AtomicBool,
    start: Barrier,
    end: Barrier,
}

impl ExecContext<'_> {
    /// Execute participant `tid`'s slice of a layer: indices
    /// `tid, tid + P, tid + 2P, …` in the layer's kernel list
    ///
    /// The slice always runs to completion; a fault raises the shared flag
    /// but never aborts the layer.
    fn run_slice(&self, tid: usize, layer_index: usize) -> Option<Fault> {
        let layer = self.schedule.layer(layer_index);
        let mut first_fault = None;

        let mut position = tid;
        while position < layer.len() {
            let id = layer[position];
            let kernel = &self.kernels[id.index()];
            let status = kernel.invoke(self.consts, self.workspace);
            if status != 0 {
                self.faulted.store(true, Ordering::Release);
                error!(
                    kernel = %id,
                    name = %kernel.name,
                    layer = layer_index,
                    status,
                    "kernel returned nonzero status"
                );
                if first_fault.is_none() {
                    first_fault = Some(Fault {
                        layer: layer_index,
                        kernel: id,
                        status,
                    });
                }
            }
            position += self.participants;
        }

        first_fault
    }

    /// Worker state machine: AwaitStart -> (halted? Exit) -> RunSlice ->
    /// AwaitEnd -> AwaitStart
    fn worker_loop(&self, tid: usize) -> Option<Fault> {
        let mut first_fault = None;
        loop {
            self.start.wait();
            if self.halted.load(Ordering::Acquire) {
                break;
            }
            let layer_index = self.layer_idx.load(Ordering::Acquire);
            let fault = self.run_slice(tid, layer_index);
            if first_fault.is_none() {
                first_fault = fault;
            }
            self.end.wait();
        }
        first_fault
    }
}

/// Execute a schedule against a kernel table and a pair of arenas
///
/// The schedule is validated against the kernel table up front. The pool is
/// created once, runs every issued layer bulk-synchronously, and is joined
/// once: layer i+1 never starts until every participant finished layer i.
/// Scheduling stops early when a layer raised the fault flag (that layer
/// still completes) or when the configured layer cap is reached.
///
/// On a fault the error reports the first observed fault (lowest layer,
/// then lowest kernel id), reduced from per-participant records after the
/// pool has shut down.
pub fn run(
    schedule: &Schedule,
    kernels: &[Kernel],
    consts: &ConstArena,
    workspace: &WorkArena,
    config: &RunConfig,
) -> RunResult<RunSummary> {
    schedule.validate(kernels.len())?;

    let limit = config
        .max_layers
        .map_or(schedule.len(), |cap| cap.min(schedule.len()));
    let participants = config.workers + 1;

    let ctx = ExecContext {
        schedule,
        kernels,
        consts,
        workspace,
        participants,
        layer_idx: AtomicUsize::new(0),
        halted: AtomicBool::new(false),
        faulted: AtomicBool::new(false),
        start: Barrier::new(participants),
        end: Barrier::new(participants),
    };

    debug!(
        layers = limit,
        kernels = kernels.len(),
        workers = config.workers,
        "starting run"
    );

    let (layers_executed, faults) = thread::scope(|scope| {
        let handles: Vec<_> = (0..config.workers)
            .map(|tid| {
                let ctx = &ctx;
                scope.spawn(move || ctx.worker_loop(tid))
            })
            .collect();

        let coordinator_tid = config.workers;
        let mut faults: Vec<Fault> = Vec::new();
        let mut executed = 0;
        let mut trace_mark = Instant::now();

        for layer_index in 0..limit {
            ctx.layer_idx.store(layer_index, Ordering::Release);
            ctx.start.wait();
            let fault = ctx.run_slice(coordinator_tid, layer_index);
            ctx.end.wait();
            executed += 1;
            faults.extend(fault);

            if config.trace_every > 0 && layer_index % config.trace_every == 0 {
                debug!(
                    layer = layer_index,
                    total = limit,
                    elapsed_ms = trace_mark.elapsed().as_secs_f64() * 1e3,
                    "layer complete"
                );
                trace_mark = Instant::now();
            }
            if ctx.faulted.load(Ordering::Acquire) {
                break;
            }
        }

        // Release blocked workers exactly once more so they observe the
        // halt flag instead of a nonexistent layer, then join.
        ctx.halted.store(true, Ordering::Release);
        ctx.start.wait();

        for handle in handles {
            match handle.join() {
                Ok(fault) => faults.extend(fault),
                Err(payload) => std::panic::resume_unwind(payload),
            }
        }
        (executed, faults)
    });

    if let Some(first) = faults.into_iter().min_by_key(|f| (f.layer, f.kernel)) {
        return Err(RunError::KernelFault {
            layer: first.layer,
            kernel: first.kernel,
            status: first.status,
        });
    }
    Ok(RunSummary { layers_executed })
}
