//! Shared memory arenas
//!
//! Kernels address storage as integer offsets into two arenas: a read-only
//! constant arena (weights, lookup tables) and a single mutable workspace
//! arena shared by every kernel in a program. Within one schedule layer the
//! workspace is written concurrently with no locking; safety rests entirely
//! on the schedule-time guarantee that co-layer kernels touch disjoint
//! ranges.

use std::cell::UnsafeCell;

/// Read-only byte arena for constants
///
/// Filled once at load time; concurrent reads need no synchronization.
#[derive(Clone, Debug, Default)]
pub struct ConstArena {
    data: Box<[u8]>,
}

impl ConstArena {
    /// Create a constant arena from its byte contents
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            data: data.into_boxed_slice(),
        }
    }

    /// Arena size in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the arena is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Borrow a byte range
    ///
    /// Panics if the range exceeds the arena bounds.
    pub fn slice(&self, offset: usize, len: usize) -> &[u8] {
        &self.data[offset..offset + len]
    }

    /// Base pointer for kernels that index the arena directly
    pub fn base_ptr(&self) -> *const u8 {
        self.data.as_ptr()
    }
}

/// Shared mutable workspace arena
///
/// One logical block of memory addressed by byte offsets. All participants of
/// a run write to it concurrently within a layer without locking, which is
/// sound only because the schedule proves co-layer kernels access disjoint
/// ranges. The accessors are `unsafe` to keep that contract visible at every
/// call site.
pub struct WorkArena {
    data: UnsafeCell<Box<[u8]>>,
    len: usize,
}

// Concurrent access is restricted to disjoint ranges by the schedule; the
// arena itself performs no synchronization.
unsafe impl Sync for WorkArena {}

impl WorkArena {
    /// Allocate a zero-filled workspace of the given size
    pub fn new(len: usize) -> Self {
        Self {
            data: UnsafeCell::new(vec![0u8; len].into_boxed_slice()),
            len,
        }
    }

    /// Arena size in bytes
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the arena is empty
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Base pointer for kernels that index the arena directly
    pub fn base_ptr(&self) -> *mut u8 {
        unsafe { (*self.data.get()).as_mut_ptr() }
    }

    /// Borrow a byte range for reading
    ///
    /// # Safety
    ///
    /// No kernel scheduled concurrently with the caller may write an
    /// overlapping range. Panics if the range exceeds the arena bounds.
    pub unsafe fn slice(&self, offset: usize, len: usize) -> &[u8] {
        assert!(offset + len <= self.len, "workspace range out of bounds");
        std::slice::from_raw_parts(self.base_ptr().add(offset), len)
    }

    /// Borrow a byte range for writing
    ///
    /// # Safety
    ///
    /// No kernel scheduled concurrently with the caller may access an
    /// overlapping range. Panics if the range exceeds the arena bounds.
    #[allow(clippy::mut_from_ref)]
    pub unsafe fn slice_mut(&self, offset: usize, len: usize) -> &mut [u8] {
        assert!(offset + len <= self.len, "workspace range out of bounds");
        std::slice::from_raw_parts_mut(self.base_ptr().add(offset), len)
    }

    /// Copy the arena contents out
    ///
    /// Takes `&mut self`, so no run may be in flight.
    pub fn snapshot(&mut self) -> Vec<u8> {
        unsafe { (*self.data.get()).to_vec() }
    }

    /// Zero the arena contents
    ///
    /// Takes `&mut self`, so no run may be in flight.
    pub fn reset(&mut self) {
        unsafe { (*self.data.get()).fill(0) };
    }
}

impl std::fmt::Debug for WorkArena {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkArena").field("len", &self.len).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_const_arena_slice() {
        let arena = ConstArena::new(vec![1, 2, 3, 4]);
        assert_eq!(arena.len(), 4);
        assert_eq!(arena.slice(1, 2), &[2, 3]);
    }

    #[test]
    fn test_work_arena_starts_zeroed() {
        let arena = WorkArena::new(8);
        assert_eq!(unsafe { arena.slice(0, 8) }, &[0u8; 8]);
    }

    #[test]
    fn test_work_arena_write_read() {
        let mut arena = WorkArena::new(8);
        unsafe { arena.slice_mut(2, 3).copy_from_slice(&[7, 8, 9]) };
        assert_eq!(unsafe { arena.slice(2, 3) }, &[7, 8, 9]);
        assert_eq!(arena.snapshot(), vec![0, 0, 7, 8, 9, 0, 0, 0]);

        arena.reset();
        assert_eq!(arena.snapshot(), vec![0u8; 8]);
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn test_work_arena_bounds_checked() {
        let arena = WorkArena::new(4);
        unsafe {
            arena.slice(2, 3);
        }
    }

    #[test]
    fn test_concurrent_disjoint_writes() {
        let arena = Arc::new(WorkArena::new(64));
        let mut handles = vec![];

        // 8 threads each own a disjoint 8-byte region
        for t in 0..8u8 {
            let arena = Arc::clone(&arena);
            handles.push(thread::spawn(move || {
                let region = unsafe { arena.slice_mut(t as usize * 8, 8) };
                region.fill(t + 1);
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        let mut arena = Arc::try_unwrap(arena).unwrap();
        let snapshot = arena.snapshot();
        for t in 0..8usize {
            assert!(snapshot[t * 8..(t + 1) * 8].iter().all(|&b| b == t as u8 + 1));
        }
    }
}
