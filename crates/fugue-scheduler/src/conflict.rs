//! Conflict oracle
//!
//! A stricter pairwise predicate than the ordering graph, used only to
//! decide whether two kernels already free of ordering dependencies may share
//! a schedule layer. Every check is conservative: any plausible overlap
//! forbids concurrency.

use crate::access::AccessSet;
use crate::hazard::DependencyGraph;
use fugue_primitives::{Kernel, KernelId};

/// Pairwise co-schedulability predicate
pub struct ConflictOracle<'a> {
    access: Vec<AccessSet>,
    graph: &'a DependencyGraph,
}

impl<'a> ConflictOracle<'a> {
    /// Build an oracle over a kernel table and its dependency graph
    pub fn new(kernels: &[Kernel], graph: &'a DependencyGraph) -> Self {
        Self {
            access: kernels.iter().map(AccessSet::of).collect(),
            graph,
        }
    }

    /// Whether two kernels may safely execute in the same layer
    ///
    /// False if any of the following holds:
    /// - either kernel appears in the other's dependency set;
    /// - any output of one may denote the same storage as an output of the
    ///   other (resolved address, or name equality for symbolic refs);
    /// - both declare scratch ranges and the ranges overlap;
    /// - any output address of one falls inside the other's scratch range;
    /// - any resolved input address of one falls inside the other's scratch
    ///   range.
    pub fn can_run_concurrently(&self, a: KernelId, b: KernelId) -> bool {
        if self.graph.depends_on(a, b) || self.graph.depends_on(b, a) {
            return false;
        }

        let sa = &self.access[a.index()];
        let sb = &self.access[b.index()];

        if sa.outputs_collide(sb) {
            return false;
        }
        if sa.scratch_overlaps(sb) {
            return false;
        }
        if sa.output_hits_scratch(sb) || sb.output_hits_scratch(sa) {
            return false;
        }
        if sa.input_covered_by_scratch(sb) || sb.input_covered_by_scratch(sa) {
            return false;
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hazard::analyze;
    use fugue_primitives::{BufferRef, KernelArgs, KernelFn, ScratchRange};
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

    fn id(raw: u32) -> KernelId {
        KernelId::new(raw)
    }

    #[test]
    fn test_independent_kernels_compatible() {
        let program = vec![
            kernel(0, vec![], vec![BufferRef::arena("a", 0)], None),
            kernel(1, vec![], vec![BufferRef::arena("b", 64)], None),
        ];
        let graph = analyze(&program);
        let oracle = ConflictOracle::new(&program, &graph);
        assert!(oracle.can_run_concurrently(id(0), id(1)));
        assert!(oracle.can_run_concurrently(id(1), id(0)));
    }

    #[test]
    fn test_dependency_blocks_concurrency() {
        let program = vec![
            kernel(0, vec![], vec![BufferRef::arena("a", 0)], None),
            kernel(1, vec![BufferRef::arena("a", 0)], vec![BufferRef::arena("b", 64)], None),
        ];
        let graph = analyze(&program);
        let oracle = ConflictOracle::new(&program, &graph);
        assert!(!oracle.can_run_concurrently(id(0), id(1)));
        assert!(!oracle.can_run_concurrently(id(1), id(0)));
    }

    #[test]
    fn test_output_collision_without_dependency() {
        // Two writers of the same address with the WAW edge removed would
        // still be rejected; here the oracle must refuse even when asked
        // about the pair directly.
        let program = vec![
            kernel(0, vec![], vec![BufferRef::arena("x", 0)], None),
            kernel(1, vec![], vec![BufferRef::arena("x_alias", 0)], None),
        ];
        let empty = DependencyGraph::new();
        let oracle = ConflictOracle::new(&program, &empty);
        assert!(!oracle.can_run_concurrently(id(0), id(1)));
    }

    #[test]
    fn test_scratch_overlap_blocks() {
        let program = vec![
            kernel(0, vec![], vec![BufferRef::arena("a", 1000)], Some(ScratchRange::new(0, 100))),
            kernel(1, vec![], vec![BufferRef::arena("b", 2000)], Some(ScratchRange::new(50, 150))),
            kernel(2, vec![], vec![BufferRef::arena("c", 3000)], Some(ScratchRange::new(200, 300))),
        ];
        let graph = analyze(&program);
        let oracle = ConflictOracle::new(&program, &graph);
        assert!(!oracle.can_run_concurrently(id(0), id(1)));
        assert!(oracle.can_run_concurrently(id(0), id(2)));
    }

    #[test]
    fn test_output_into_scratch_blocks() {
        // Kernel 1 writes address 50 inside kernel 0's scratch range with no
        // named relation between them.
        let program = vec![
            kernel(0, vec![], vec![BufferRef::arena("a", 1000)], Some(ScratchRange::new(0, 100))),
            kernel(1, vec![], vec![BufferRef::arena("b", 50)], None),
        ];
        let graph = analyze(&program);
        let oracle = ConflictOracle::new(&program, &graph);
        assert!(!oracle.can_run_concurrently(id(0), id(1)));
        assert!(!oracle.can_run_concurrently(id(1), id(0)));
    }

    #[test]
    fn test_input_covered_by_scratch_blocks() {
        let program = vec![
            kernel(0, vec![], vec![BufferRef::arena("a", 1000)], Some(ScratchRange::new(0, 100))),
            kernel(1, vec![BufferRef::arena("b", 80)], vec![BufferRef::arena("c", 2000)], None),
        ];
        let graph = analyze(&program);
        let oracle = ConflictOracle::new(&program, &graph);
        assert!(!oracle.can_run_concurrently(id(0), id(1)));
    }

    #[test]
    fn test_external_inputs_ignored_by_scratch_check() {
        let program = vec![
            kernel(0, vec![], vec![BufferRef::arena("a", 1000)], Some(ScratchRange::new(0, 100))),
            kernel(1, vec![BufferRef::external("images")], vec![BufferRef::arena("b", 2000)], None),
        ];
        let graph = analyze(&program);
        let oracle = ConflictOracle::new(&program, &graph);
        assert!(oracle.can_run_concurrently(id(0), id(1)));
    }
}
