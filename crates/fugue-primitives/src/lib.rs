//! # fugue-primitives
//!
//! Data model for fugue: kernels, buffer references and the shared memory
//! arenas they execute against.
//!
//! A compiled dataflow program is a dense list of [`Kernel`] records. Each
//! kernel names the buffers it reads and writes as [`BufferRef`]s resolved to
//! offsets into a single mutable [`WorkArena`] (constants live in a separate
//! read-only [`ConstArena`]), and carries a callable entry point. The
//! scheduler crate analyzes these records; the runtime crate invokes them.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod arena;
mod kernel;

pub use arena::{ConstArena, WorkArena};
pub use kernel::{BufferLoc, BufferRef, Kernel, KernelArgs, KernelFn, KernelId, ScratchRange};
