// crates/fv_matrix/src/coeffs.rs

//! Coefficient binding: attach numeric values to a structure.
//!
//! Ownership is explicit in the type system: a [`CoeffArray`] either borrows
//! the caller's array (zero-copy, invalidated by [`CoeffArray::release`]) or
//! owns a private copy. Compressed kinds always own their off-diagonal slot
//! array because assignment scatters face values into structure slot order;
//! native and MSR diagonals can be mapped directly.
//!
//! Off-diagonal input layouts:
//! - symmetric: one value per face
//! - asymmetric interleaved: `xa[2f]` couples (i -> j), `xa[2f+1]` couples
//!   (j -> i), adjacent in memory
//! - asymmetric split: two half-arrays, normalized here by an interleaving
//!   copy pass
//!
//! For structures with `direct_assembly == false` (merged duplicate faces)
//! the slot array is zeroed first and contributions accumulate; otherwise
//! each (row, col) pair maps to exactly one slot and plain assignment is
//! used. Zero-initializing in both cases keeps uncovered slots at zero.

use crate::structure::CsrStructure;

/// Numeric array with explicit ownership.
#[derive(Debug, Clone, Default)]
pub enum CoeffArray<'a> {
    /// No array bound; reads as all zeros.
    #[default]
    Unset,
    /// Borrowed from the caller; dropped by [`CoeffArray::release`].
    Shared(&'a [f64]),
    /// Private copy owned by the coefficients object.
    Owned(Vec<f64>),
}

impl<'a> CoeffArray<'a> {
    /// Map or copy an optional caller array.
    pub fn bind(values: Option<&'a [f64]>, copy: bool) -> Self {
        match values {
            None => Self::Unset,
            Some(v) if copy => Self::Owned(v.to_vec()),
            Some(v) => Self::Shared(v),
        }
    }

    /// Slice view, `None` when unset.
    #[inline]
    pub fn get(&self) -> Option<&[f64]> {
        match self {
            Self::Unset => None,
            Self::Shared(v) => Some(v),
            Self::Owned(v) => Some(v),
        }
    }

    /// Whether an array is bound.
    #[inline]
    pub fn is_set(&self) -> bool {
        !matches!(self, Self::Unset)
    }

    /// Unlink a shared array; owned copies are kept. Idempotent.
    pub fn release(&mut self) {
        if matches!(self, Self::Shared(_)) {
            *self = Self::Unset;
        }
    }
}

// ============================================================================
// Per-kind stores
// ============================================================================

/// Native coefficients: diagonal plus per-face couplings.
#[derive(Debug, Default)]
pub struct NativeCoeffs<'a> {
    /// Symmetric couplings (one value per face).
    pub symmetric: bool,
    /// Diagonal values (block-aware).
    pub da: CoeffArray<'a>,
    /// Off-diagonal values: `n_faces` entries when symmetric, interleaved
    /// `2 * n_faces` otherwise.
    pub xa: CoeffArray<'a>,
}

impl<'a> NativeCoeffs<'a> {
    /// Bind native coefficients.
    ///
    /// Asymmetric split input is normalized to the interleaved layout the
    /// kernels expect, which forces a copy regardless of `copy`.
    pub fn bind(
        symmetric: bool,
        interleaved: bool,
        copy: bool,
        n_faces: usize,
        da: Option<&'a [f64]>,
        xa: Option<&'a [f64]>,
    ) -> Self {
        let xa = match xa {
            Some(v) if !symmetric && !interleaved => {
                let mut out = vec![0.0; 2 * n_faces];
                for f in 0..n_faces {
                    out[2 * f] = v[f];
                    out[2 * f + 1] = v[n_faces + f];
                }
                CoeffArray::Owned(out)
            }
            other => CoeffArray::bind(other, copy),
        };

        Self {
            symmetric,
            da: CoeffArray::bind(da, copy),
            xa,
        }
    }
}

/// CSR coefficients: one value per structure slot, diagonal inline.
#[derive(Debug, Default)]
pub struct CsrCoeffs {
    /// Slot-ordered values (length = structure nnz).
    pub val: Vec<f64>,
}

/// Symmetric CSR coefficients: upper-triangle slots, diagonal first.
#[derive(Debug, Default)]
pub struct CsrSymCoeffs {
    /// Slot-ordered values (length = structure nnz).
    pub val: Vec<f64>,
}

/// MSR coefficients: separate diagonal plus off-diagonal slots.
#[derive(Debug, Default)]
pub struct MsrCoeffs<'a> {
    /// Dense diagonal (mappable).
    pub d_val: CoeffArray<'a>,
    /// Slot-ordered off-diagonal values.
    pub x_val: Vec<f64>,
}

/// Symmetric MSR coefficients.
#[derive(Debug, Default)]
pub struct MsrSymCoeffs<'a> {
    /// Dense diagonal (mappable).
    pub d_val: CoeffArray<'a>,
    /// Slot-ordered upper-triangle off-diagonal values.
    pub x_val: Vec<f64>,
}

/// Coefficient payload of a matrix.
#[derive(Debug, Default)]
pub enum CoeffStore<'a> {
    /// Nothing bound yet.
    #[default]
    Unbound,
    /// Native face-based values.
    Native(NativeCoeffs<'a>),
    /// CSR slot values.
    Csr(CsrCoeffs),
    /// Symmetric CSR slot values.
    CsrSym(CsrSymCoeffs),
    /// MSR values.
    Msr(MsrCoeffs<'a>),
    /// Symmetric MSR values.
    MsrSym(MsrSymCoeffs<'a>),
}

impl CoeffStore<'_> {
    /// Whether coefficients are bound.
    #[inline]
    pub fn is_bound(&self) -> bool {
        !matches!(self, Self::Unbound)
    }

    /// Unlink shared arrays; owned storage is kept. Idempotent.
    pub fn release(&mut self) {
        match self {
            Self::Unbound | Self::Csr(_) | Self::CsrSym(_) => {}
            Self::Native(c) => {
                c.da.release();
                c.xa.release();
            }
            Self::Msr(c) => c.d_val.release(),
            Self::MsrSym(c) => c.d_val.release(),
        }
    }
}

// ============================================================================
// Slot assignment (compressed kinds)
// ============================================================================

/// Face value pair for one face: coupling (i -> j) and (j -> i).
#[inline]
fn face_values(
    xa: &[f64],
    f: usize,
    n_faces: usize,
    symmetric: bool,
    interleaved: bool,
) -> (f64, f64) {
    if symmetric {
        (xa[f], xa[f])
    } else if interleaved {
        (xa[2 * f], xa[2 * f + 1])
    } else {
        (xa[f], xa[n_faces + f])
    }
}

/// Scatter general (two-sided) face values into slot order.
///
/// Slots start zeroed; `direct_assembly` structures assign, merged-duplicate
/// structures accumulate. The inline diagonal is written when present.
pub(crate) fn assign_general(
    cs: &CsrStructure,
    face_cell: &[[usize; 2]],
    symmetric: bool,
    interleaved: bool,
    da: Option<&[f64]>,
    xa: Option<&[f64]>,
) -> Vec<f64> {
    let n_rows = cs.n_rows();
    let n_faces = face_cell.len();
    let mut val = vec![0.0; cs.nnz()];

    if cs.have_diag() {
        if let Some(da) = da {
            for ii in 0..n_rows {
                val[cs.slot(ii, ii)] = da[ii];
            }
        }
    }

    if let Some(xa) = xa {
        let direct = cs.direct_assembly();
        for (f, face) in face_cell.iter().enumerate() {
            let [ii, jj] = *face;
            let (v_ij, v_ji) = face_values(xa, f, n_faces, symmetric, interleaved);
            if ii < n_rows {
                let kk = cs.slot(ii, jj);
                if direct {
                    val[kk] = v_ij;
                } else {
                    val[kk] += v_ij;
                }
            }
            if jj < n_rows {
                let kk = cs.slot(jj, ii);
                if direct {
                    val[kk] = v_ji;
                } else {
                    val[kk] += v_ji;
                }
            }
        }
    }

    val
}

/// Scatter symmetric face values into upper-triangle slot order.
pub(crate) fn assign_symmetric(
    cs: &CsrStructure,
    face_cell: &[[usize; 2]],
    da: Option<&[f64]>,
    xa: Option<&[f64]>,
) -> Vec<f64> {
    let n_rows = cs.n_rows();
    let mut val = vec![0.0; cs.nnz()];

    if cs.have_diag() {
        if let Some(da) = da {
            for ii in 0..n_rows {
                // diagonal is the first entry of its row by construction
                val[cs.row_index()[ii]] = da[ii];
            }
        }
    }

    if let Some(xa) = xa {
        let direct = cs.direct_assembly();
        for (f, face) in face_cell.iter().enumerate() {
            let [ii, jj] = *face;
            let (row, col) = if ii < jj { (ii, jj) } else { (jj, ii) };
            if row < n_rows && row != col {
                let kk = cs.slot(row, col);
                if direct {
                    val[kk] = xa[f];
                } else {
                    val[kk] += xa[f];
                }
            }
        }
    }

    val
}
