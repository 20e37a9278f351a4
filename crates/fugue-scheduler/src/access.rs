//! Per-kernel memory access summaries
//!
//! An [`AccessSet`] condenses a kernel's buffer references into the address
//! facts the conflict oracle needs: resolved input addresses, non-external
//! output references and the private scratch range.

use fugue_primitives::{BufferRef, Kernel, ScratchRange};

/// Address-level access summary of one kernel
#[derive(Clone, Debug, Default)]
pub struct AccessSet {
    /// Resolved workspace addresses the kernel reads
    pub input_addrs: Vec<u64>,
    /// Output references, external sentinels excluded
    pub outputs: Vec<BufferRef>,
    /// Private scratch range, if declared
    pub scratch: Option<ScratchRange>,
}

impl AccessSet {
    /// Summarize a kernel's accesses
    pub fn of(kernel: &Kernel) -> Self {
        let input_addrs = kernel
            .inputs
            .iter()
            .filter(|r| !r.is_external())
            .filter_map(|r| r.address())
            .collect();
        let outputs = kernel
            .outputs
            .iter()
            .filter(|r| !r.is_external())
            .cloned()
            .collect();
        Self {
            input_addrs,
            outputs,
            scratch: kernel.scratch,
        }
    }

    /// Whether any output of `self` may denote the same storage as any
    /// output of `other`
    pub fn outputs_collide(&self, other: &AccessSet) -> bool {
        self.outputs
            .iter()
            .any(|a| other.outputs.iter().any(|b| a.may_alias(b)))
    }

    /// Whether both kernels declare scratch ranges that overlap
    pub fn scratch_overlaps(&self, other: &AccessSet) -> bool {
        match (self.scratch, other.scratch) {
            (Some(a), Some(b)) => a.overlaps(&b),
            _ => false,
        }
    }

    /// Whether any resolved output address of `self` falls inside `other`'s
    /// scratch range
    pub fn output_hits_scratch(&self, other: &AccessSet) -> bool {
        let Some(scratch) = other.scratch else {
            return false;
        };
        self.outputs
            .iter()
            .filter_map(|r| r.address())
            .any(|addr| scratch.contains(addr))
    }

    /// Whether any resolved input address of `self` falls inside `other`'s
    /// scratch range
    pub fn input_covered_by_scratch(&self, other: &AccessSet) -> bool {
        let Some(scratch) = other.scratch else {
            return false;
        };
        self.input_addrs.iter().any(|&addr| scratch.contains(addr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fugue_primitives::{KernelArgs, KernelFn, KernelId};
    use std::sync::Arc;

    fn noop() -> KernelFn {
        Arc::new(|_: &KernelArgs<'_>| 0)
    }

    fn kernel(
        id: u32,
        inputs: Vec<BufferRef>,
        outputs: Vec<BufferRef>,
        scratch: Option<ScratchRange>,
    ) -> Kernel {
        Kernel::new(KernelId::new(id), format!("op_{id}"), inputs, outputs, scratch, noop())
    }

    #[test]
    fn test_externals_excluded() {
        let k = kernel(
            0,
            vec![BufferRef::external("images"), BufferRef::arena("a", 16)],
            vec![BufferRef::external("output"), BufferRef::arena("b", 32)],
            None,
        );
        let set = AccessSet::of(&k);
        assert_eq!(set.input_addrs, vec![16]);
        assert_eq!(set.outputs.len(), 1);
        assert_eq!(set.outputs[0].address(), Some(32));
    }

    #[test]
    fn test_output_collision_by_address() {
        let a = AccessSet::of(&kernel(0, vec![], vec![BufferRef::arena("x", 64)], None));
        let b = AccessSet::of(&kernel(1, vec![], vec![BufferRef::arena("y", 64)], None));
        let c = AccessSet::of(&kernel(2, vec![], vec![BufferRef::arena("z", 128)], None));
        assert!(a.outputs_collide(&b));
        assert!(!a.outputs_collide(&c));
    }

    #[test]
    fn test_output_collision_by_symbolic_name() {
        let a = AccessSet::of(&kernel(0, vec![], vec![BufferRef::symbolic("pool")], None));
        let b = AccessSet::of(&kernel(1, vec![], vec![BufferRef::symbolic("pool")], None));
        assert!(a.outputs_collide(&b));
    }

    #[test]
    fn test_scratch_checks() {
        let with_scratch = AccessSet::of(&kernel(0, vec![], vec![], Some(ScratchRange::new(0, 100))));
        let writer = AccessSet::of(&kernel(1, vec![], vec![BufferRef::arena("w", 50)], None));
        let reader = AccessSet::of(&kernel(2, vec![BufferRef::arena("r", 100)], vec![], None));
        let outside = AccessSet::of(&kernel(3, vec![], vec![BufferRef::arena("o", 101)], None));

        assert!(writer.output_hits_scratch(&with_scratch));
        assert!(!outside.output_hits_scratch(&with_scratch));
        assert!(reader.input_covered_by_scratch(&with_scratch));
        assert!(!with_scratch.output_hits_scratch(&writer));

        let other_scratch = AccessSet::of(&kernel(4, vec![], vec![], Some(ScratchRange::new(90, 200))));
        let far_scratch = AccessSet::of(&kernel(5, vec![], vec![], Some(ScratchRange::new(200, 300))));
        assert!(with_scratch.scratch_overlaps(&other_scratch));
        assert!(!with_scratch.scratch_overlaps(&far_scratch));
        assert!(!with_scratch.scratch_overlaps(&writer));
    }
}
