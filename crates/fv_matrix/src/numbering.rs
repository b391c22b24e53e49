// crates/fv_matrix/src/numbering.rs

//! Conflict-free face grouping for threaded native multiplies.
//!
//! The native off-diagonal phase scatter-writes two output rows per face, so
//! it cannot be parallelized over arbitrary faces. The mesh numbering layer
//! partitions faces into groups such that, within one group, the face ranges
//! handed to different threads touch disjoint cells; groups run sequentially,
//! ranges within a group in parallel.

use std::collections::HashSet;
use std::ops::Range;

/// Face grouping supplied by the mesh numbering collaborator.
#[derive(Debug, Clone)]
pub struct FaceGroups {
    /// Per group, the face ranges assigned to each thread.
    groups: Vec<Vec<Range<usize>>>,
}

impl FaceGroups {
    /// Build from per-group thread ranges.
    pub fn new(groups: Vec<Vec<Range<usize>>>) -> Self {
        Self { groups }
    }

    /// Trivial grouping: one group, one range (sequential execution).
    pub fn single(n_faces: usize) -> Self {
        Self {
            groups: vec![vec![0..n_faces]],
        }
    }

    /// Number of groups.
    #[inline]
    pub fn n_groups(&self) -> usize {
        self.groups.len()
    }

    /// Thread ranges of one group.
    #[inline]
    pub fn ranges(&self, g: usize) -> &[Range<usize>] {
        &self.groups[g]
    }

    /// Verify that ranges within each group touch disjoint cells.
    ///
    /// Diagnostic helper; the multiply kernels rely on this property without
    /// re-checking it.
    pub fn is_conflict_free(&self, face_cell: &[[usize; 2]]) -> bool {
        for group in &self.groups {
            let mut seen: Vec<HashSet<usize>> = Vec::with_capacity(group.len());
            for range in group {
                let mut cells = HashSet::new();
                for f in range.clone() {
                    cells.insert(face_cell[f][0]);
                    cells.insert(face_cell[f][1]);
                }
                if seen.iter().any(|other| !other.is_disjoint(&cells)) {
                    return false;
                }
                seen.push(cells);
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_group() {
        let g = FaceGroups::single(10);
        assert_eq!(g.n_groups(), 1);
        assert_eq!(g.ranges(0), &[0..10]);
    }

    #[test]
    fn test_conflict_detection() {
        let faces = [[0, 1], [1, 2], [3, 4], [4, 5]];
        // faces 0 and 1 share cell 1: conflicting in one group
        let bad = FaceGroups::new(vec![vec![0..1, 1..2]]);
        assert!(!bad.is_conflict_free(&faces));
        // faces 0 and 2 are disjoint
        let good = FaceGroups::new(vec![vec![0..1, 2..3], vec![1..2, 3..4]]);
        assert!(good.is_conflict_free(&faces));
    }
}
