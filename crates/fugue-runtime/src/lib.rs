//! # fugue-runtime
//!
//! Bulk-synchronous execution of fugue schedules.
//!
//! A run creates a fixed pool of worker threads once, executes the schedule
//! layer-by-layer with two-phase barrier synchronization, and joins the pool
//! once at the end. Every participant (workers plus the coordinating caller
//! thread) runs a statically strided slice of each layer. Layer i+1 never
//! begins until every participant has finished layer i; within a layer the
//! workspace arena is shared with zero locking, which the schedule proved
//! safe at generation time.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod barrier;
mod error;
mod executor;

pub use barrier::Barrier;
pub use error::{RunError, RunResult};
pub use executor::{run, RunConfig, RunSummary};
