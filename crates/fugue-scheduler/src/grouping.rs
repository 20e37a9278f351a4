//! Parallel grouping
//!
//! Refines each topological wave into conflict-free groups by greedy
//! first-fit coloring against the conflict oracle. Groups of the same wave
//! still execute as separate layers: the oracle's scratch checks are not part
//! of the ordering graph, so the extra serialization is the safety margin.

use crate::conflict::ConflictOracle;
use fugue_primitives::KernelId;

/// Split one wave into pairwise conflict-free groups
///
/// Kernels are visited in the wave's order (increasing id); each joins the
/// first existing group it is compatible with against every current member,
/// or opens a new group.
pub fn group_wave(oracle: &ConflictOracle<'_>, wave: &[KernelId]) -> Vec<Vec<KernelId>> {
    let mut groups: Vec<Vec<KernelId>> = Vec::new();

    for &kernel in wave {
        let slot = groups.iter_mut().find(|group| {
            group
                .iter()
                .all(|&member| oracle.can_run_concurrently(kernel, member))
        });
        match slot {
            Some(group) => group.push(kernel),
            None => groups.push(vec![kernel]),
        }
    }

    groups
}
