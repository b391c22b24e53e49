// crates/fv_matrix/src/structure.rs

//! Matrix structures: immutable topology, independent of numeric values.
//!
//! A [`MatrixStructure`] is built once per mesh from the interior-face
//! connectivity and shared read-only by any number of matrices. The native
//! representation only borrows the face list (the mesh layer keeps ownership);
//! compressed representations own their index arrays.
//!
//! Column ids within each row are sorted ascending with no duplicates after
//! construction. When the input face list contains duplicate (row, col) pairs
//! (several faces connecting the same two cells), the builder merges them into
//! a single slot and clears the `direct_assembly` flag so coefficient
//! assignment accumulates instead of overwriting.

/// Storage layout tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatrixKind {
    /// Face-based adjacency, no compressed form.
    Native,
    /// Compressed sparse row, diagonal stored inline.
    Csr,
    /// Symmetric CSR: upper triangle only, diagonal first.
    CsrSym,
    /// Modified CSR: diagonal in a separate dense array.
    Msr,
    /// Symmetric MSR: upper triangle off-diagonal, separate diagonal.
    MsrSym,
}

impl MatrixKind {
    /// All storage kinds, in tuning enumeration order.
    pub const ALL: [MatrixKind; 5] = [
        MatrixKind::Native,
        MatrixKind::Csr,
        MatrixKind::CsrSym,
        MatrixKind::Msr,
        MatrixKind::MsrSym,
    ];

    /// Display name.
    pub fn name(self) -> &'static str {
        match self {
            MatrixKind::Native => "native",
            MatrixKind::Csr => "CSR",
            MatrixKind::CsrSym => "CSR_SYM",
            MatrixKind::Msr => "MSR",
            MatrixKind::MsrSym => "MSR_SYM",
        }
    }

    /// Whether this kind stores only one triangle (symmetric values required).
    #[inline]
    pub fn symmetric_storage(self) -> bool {
        matches!(self, MatrixKind::CsrSym | MatrixKind::MsrSym)
    }

    /// Whether the diagonal lives inline in the column-id list.
    #[inline]
    pub fn inline_diagonal(self) -> bool {
        matches!(self, MatrixKind::Csr | MatrixKind::CsrSym)
    }
}

impl std::fmt::Display for MatrixKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// Compressed representation
// ============================================================================

/// Compressed sparse row index structure (shared by CSR and MSR kinds).
#[derive(Debug, Clone)]
pub struct CsrStructure {
    n_rows: usize,
    n_cols: usize,
    have_diag: bool,
    direct_assembly: bool,
    row_index: Vec<usize>,
    col_id: Vec<usize>,
}

impl CsrStructure {
    /// Build the general (possibly rectangular) compressed structure.
    ///
    /// Each face (i, j) contributes column j to row i and column i to row j;
    /// endpoints beyond the owned row range contribute only to the owned side.
    /// With `have_diag`, every row additionally gets its own column id.
    pub fn general(
        n_rows: usize,
        n_cols: usize,
        have_diag: bool,
        face_cell: &[[usize; 2]],
    ) -> Self {
        let diag = usize::from(have_diag);
        let mut count = vec![diag; n_rows];

        for face in face_cell {
            let [ii, jj] = *face;
            if ii < n_rows {
                count[ii] += 1;
            }
            if jj < n_rows {
                count[jj] += 1;
            }
        }

        let mut row_index = vec![0usize; n_rows + 1];
        for ii in 0..n_rows {
            row_index[ii + 1] = row_index[ii] + count[ii];
        }

        let mut col_id = vec![0usize; row_index[n_rows]];
        let mut cursor: Vec<usize> = row_index[..n_rows].to_vec();

        if have_diag {
            for (ii, c) in cursor.iter_mut().enumerate() {
                col_id[*c] = ii;
                *c += 1;
            }
        }

        for face in face_cell {
            let [ii, jj] = *face;
            if ii < n_rows {
                col_id[cursor[ii]] = jj;
                cursor[ii] += 1;
            }
            if jj < n_rows {
                col_id[cursor[jj]] = ii;
                cursor[jj] += 1;
            }
        }

        let mut s = Self {
            n_rows,
            n_cols,
            have_diag,
            direct_assembly: true,
            row_index,
            col_id,
        };
        s.sort_and_compact();
        s
    }

    /// Build the symmetric compressed structure (upper triangle per row).
    ///
    /// A face (i, j) contributes only to the row with the smaller index; the
    /// diagonal, when present, is always the first entry of its row.
    pub fn symmetric(
        n_rows: usize,
        n_cols: usize,
        have_diag: bool,
        face_cell: &[[usize; 2]],
    ) -> Self {
        let diag = usize::from(have_diag);
        let mut count = vec![diag; n_rows];

        for face in face_cell {
            let [ii, jj] = *face;
            if ii < jj && ii < n_rows {
                count[ii] += 1;
            } else if jj < ii && jj < n_rows {
                count[jj] += 1;
            }
        }

        let mut row_index = vec![0usize; n_rows + 1];
        for ii in 0..n_rows {
            row_index[ii + 1] = row_index[ii] + count[ii];
        }

        let mut col_id = vec![0usize; row_index[n_rows]];
        let mut cursor: Vec<usize> = row_index[..n_rows].to_vec();

        if have_diag {
            for (ii, c) in cursor.iter_mut().enumerate() {
                col_id[*c] = ii;
                *c += 1;
            }
        }

        for face in face_cell {
            let [ii, jj] = *face;
            if ii < jj && ii < n_rows {
                col_id[cursor[ii]] = jj;
                cursor[ii] += 1;
            } else if jj < ii && jj < n_rows {
                col_id[cursor[jj]] = ii;
                cursor[jj] += 1;
            }
        }

        let mut s = Self {
            n_rows,
            n_cols,
            have_diag,
            direct_assembly: true,
            row_index,
            col_id,
        };
        s.sort_and_compact();
        s
    }

    /// Sort each row's column ids, then merge adjacent duplicates.
    ///
    /// Duplicates arise from multiple faces connecting the same two cells;
    /// merging them clears `direct_assembly` so assignment accumulates.
    fn sort_and_compact(&mut self) {
        let mut has_duplicates = false;

        for ii in 0..self.n_rows {
            let row = &mut self.col_id[self.row_index[ii]..self.row_index[ii + 1]];
            row.sort_unstable();
            if row.windows(2).any(|w| w[0] == w[1]) {
                has_duplicates = true;
            }
        }

        if !has_duplicates {
            return;
        }

        self.direct_assembly = false;

        let mut col_id = Vec::with_capacity(self.col_id.len());
        let mut row_index = vec![0usize; self.n_rows + 1];

        for ii in 0..self.n_rows {
            row_index[ii] = col_id.len();
            let row = &self.col_id[self.row_index[ii]..self.row_index[ii + 1]];
            let mut last = usize::MAX;
            for &c in row {
                if c != last {
                    col_id.push(c);
                    last = c;
                }
            }
        }
        row_index[self.n_rows] = col_id.len();

        col_id.shrink_to_fit();
        self.col_id = col_id;
        self.row_index = row_index;
    }

    /// Number of owned rows.
    #[inline]
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    /// Number of columns (owned + ghost).
    #[inline]
    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    /// Whether the diagonal is stored inline.
    #[inline]
    pub fn have_diag(&self) -> bool {
        self.have_diag
    }

    /// Whether each (row, col) pair maps to exactly one slot.
    #[inline]
    pub fn direct_assembly(&self) -> bool {
        self.direct_assembly
    }

    /// Row pointer array (length `n_rows + 1`).
    #[inline]
    pub fn row_index(&self) -> &[usize] {
        &self.row_index
    }

    /// Column ids for all rows.
    #[inline]
    pub fn col_id(&self) -> &[usize] {
        &self.col_id
    }

    /// Total number of stored entries.
    #[inline]
    pub fn nnz(&self) -> usize {
        self.col_id.len()
    }

    /// Column ids of one row.
    #[inline]
    pub fn row(&self, ii: usize) -> &[usize] {
        &self.col_id[self.row_index[ii]..self.row_index[ii + 1]]
    }

    /// Slot index of column `jj` within row `ii`.
    ///
    /// The column must be present; rows are short so a linear scan wins over
    /// binary search for typical finite-volume stencils.
    #[inline]
    pub(crate) fn slot(&self, ii: usize, jj: usize) -> usize {
        let mut kk = self.row_index[ii];
        debug_assert!(self.row(ii).contains(&jj));
        while self.col_id[kk] != jj {
            kk += 1;
        }
        kk
    }
}

// ============================================================================
// Polymorphic structure
// ============================================================================

/// Per-kind topology payload.
#[derive(Debug)]
enum StructureRepr {
    Native,
    Compressed(CsrStructure),
}

/// Immutable matrix topology bound to a mesh.
///
/// Borrows the mesh layer's face-endpoint array for the structure's whole
/// lifetime; compressed payloads are owned.
#[derive(Debug)]
pub struct MatrixStructure<'f> {
    kind: MatrixKind,
    n_rows: usize,
    n_cols: usize,
    face_cell: &'f [[usize; 2]],
    repr: StructureRepr,
}

impl<'f> MatrixStructure<'f> {
    /// Build a structure of the requested kind.
    ///
    /// `face_cell` holds 0-based (cell, cell) endpoints for each interior
    /// face; endpoints in `n_rows..n_cols` reference ghost cells.
    pub fn new(
        kind: MatrixKind,
        n_rows: usize,
        n_cols: usize,
        face_cell: &'f [[usize; 2]],
    ) -> Self {
        let repr = match kind {
            MatrixKind::Native => StructureRepr::Native,
            MatrixKind::Csr => {
                StructureRepr::Compressed(CsrStructure::general(n_rows, n_cols, true, face_cell))
            }
            MatrixKind::CsrSym => {
                StructureRepr::Compressed(CsrStructure::symmetric(n_rows, n_cols, true, face_cell))
            }
            MatrixKind::Msr => {
                StructureRepr::Compressed(CsrStructure::general(n_rows, n_cols, false, face_cell))
            }
            MatrixKind::MsrSym => {
                StructureRepr::Compressed(CsrStructure::symmetric(n_rows, n_cols, false, face_cell))
            }
        };

        Self {
            kind,
            n_rows,
            n_cols,
            face_cell,
            repr,
        }
    }

    /// Storage kind.
    #[inline]
    pub fn kind(&self) -> MatrixKind {
        self.kind
    }

    /// Number of owned rows.
    #[inline]
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    /// Number of columns (owned + ghost).
    #[inline]
    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    /// Number of interior faces.
    #[inline]
    pub fn n_faces(&self) -> usize {
        self.face_cell.len()
    }

    /// Face endpoint array.
    #[inline]
    pub fn face_cell(&self) -> &'f [[usize; 2]] {
        self.face_cell
    }

    /// Compressed payload, when the kind has one.
    #[inline]
    pub fn csr(&self) -> Option<&CsrStructure> {
        match &self.repr {
            StructureRepr::Native => None,
            StructureRepr::Compressed(cs) => Some(cs),
        }
    }

    /// Whether coefficient assignment can overwrite slots directly.
    #[inline]
    pub fn direct_assembly(&self) -> bool {
        match &self.repr {
            StructureRepr::Native => true,
            StructureRepr::Compressed(cs) => cs.direct_assembly(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RING: [[usize; 2]; 4] = [[0, 1], [1, 2], [2, 3], [3, 0]];

    #[test]
    fn test_csr_ring_rows_sorted_unique() {
        let cs = CsrStructure::general(4, 4, true, &RING);
        assert_eq!(cs.n_rows(), 4);
        assert!(cs.have_diag());
        assert!(cs.direct_assembly());
        assert_eq!(cs.nnz(), 12); // 4 diag + 8 off-diag
        for ii in 0..4 {
            let row = cs.row(ii);
            assert!(row.windows(2).all(|w| w[0] < w[1]), "row {ii} not sorted");
            assert!(row.contains(&ii), "row {ii} missing diagonal");
        }
        assert_eq!(cs.row(0), &[0, 1, 3]);
        assert_eq!(cs.row(2), &[1, 2, 3]);
    }

    #[test]
    fn test_csr_pair_set_matches_faces() {
        let cs = CsrStructure::general(4, 4, false, &RING);
        let mut pairs: Vec<(usize, usize)> = Vec::new();
        for ii in 0..4 {
            for &jj in cs.row(ii) {
                pairs.push((ii, jj));
            }
        }
        let mut expected: Vec<(usize, usize)> = RING
            .iter()
            .flat_map(|&[a, b]| [(a, b), (b, a)])
            .collect();
        expected.sort_unstable();
        pairs.sort_unstable();
        assert_eq!(pairs, expected);
    }

    #[test]
    fn test_csr_sym_upper_triangle_diag_first() {
        let cs = CsrStructure::symmetric(4, 4, true, &RING);
        // row 0: diag 0 plus faces (0,1) and (3,0) -> cols {0, 1, 3}
        assert_eq!(cs.row(0), &[0, 1, 3]);
        // row 3: only the diagonal remains (both its faces have a smaller endpoint)
        assert_eq!(cs.row(3), &[3]);
        for ii in 0..4 {
            let row = cs.row(ii);
            assert_eq!(row[0], ii, "diagonal not first in row {ii}");
            assert!(row.iter().all(|&jj| jj >= ii));
        }
    }

    #[test]
    fn test_msr_excludes_diagonal() {
        let cs = CsrStructure::general(4, 4, false, &RING);
        assert_eq!(cs.nnz(), 8);
        for ii in 0..4 {
            assert!(!cs.row(ii).contains(&ii));
        }
    }

    #[test]
    fn test_duplicate_face_compaction() {
        let faces = [[0, 1], [1, 2], [0, 1]];
        let cs = CsrStructure::general(3, 3, true, &faces);
        assert!(!cs.direct_assembly());
        // duplicates merged: row 0 = {0, 1}, row 1 = {0, 1, 2}, row 2 = {1, 2}
        assert_eq!(cs.row(0), &[0, 1]);
        assert_eq!(cs.row(1), &[0, 1, 2]);
        assert_eq!(cs.nnz(), 7);
    }

    #[test]
    fn test_ghost_endpoint_excluded_from_ghost_row() {
        // face (1, 4) where rows 0..3 are owned and column 4 is a ghost cell
        let faces = [[0, 1], [1, 4]];
        let cs = CsrStructure::general(3, 5, true, &faces);
        // ghost row 4 gets no storage; owned row 1 sees column 4
        assert!(cs.row(1).contains(&4));
        assert_eq!(cs.nnz(), 3 + 3);
    }

    #[test]
    fn test_structure_kinds() {
        let s = MatrixStructure::new(MatrixKind::Native, 4, 4, &RING);
        assert!(s.csr().is_none());
        assert!(s.direct_assembly());
        assert_eq!(s.n_faces(), 4);

        let s = MatrixStructure::new(MatrixKind::MsrSym, 4, 4, &RING);
        let cs = s.csr().unwrap();
        assert!(!cs.have_diag());
        assert_eq!(cs.nnz(), 4); // upper triangle of the ring
    }

    #[test]
    fn test_slot_lookup() {
        let cs = CsrStructure::general(4, 4, true, &RING);
        assert_eq!(cs.col_id()[cs.slot(0, 3)], 3);
        assert_eq!(cs.col_id()[cs.slot(2, 1)], 1);
    }
}
