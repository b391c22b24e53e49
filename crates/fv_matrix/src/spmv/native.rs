// crates/fv_matrix/src/spmv/native.rs

//! Native (face-based) matrix-vector products.

use super::{diag_vec, zero_range, DEFAULT_LOOP_LENGTH};
use crate::block::{dense_mv, dense_mv_3};
use crate::coeffs::{CoeffStore, NativeCoeffs};
use crate::error::{MatrixError, MatrixResult};
use crate::matrix::Matrix;

fn native_coeffs<'c>(m: &'c Matrix<'_>) -> MatrixResult<&'c NativeCoeffs<'c>> {
    match m.coeff_store() {
        CoeffStore::Native(c) => Ok(c),
        _ => Err(MatrixError::CoefficientsNotSet),
    }
}

/// Accumulate the off-diagonal contributions of a face range.
#[inline]
fn scatter_faces(
    face_cell: &[[usize; 2]],
    xa: &[f64],
    symmetric: bool,
    range: std::ops::Range<usize>,
    x: &[f64],
    y: &mut [f64],
) {
    if symmetric {
        for f in range {
            let [ii, jj] = face_cell[f];
            y[ii] += xa[f] * x[jj];
            y[jj] += xa[f] * x[ii];
        }
    } else {
        for f in range {
            let [ii, jj] = face_cell[f];
            y[ii] += xa[2 * f] * x[jj];
            y[jj] += xa[2 * f + 1] * x[ii];
        }
    }
}

/// Sequential face loop.
pub(super) fn mat_vec(
    exclude_diag: bool,
    m: &Matrix<'_>,
    x: &[f64],
    y: &mut [f64],
) -> MatrixResult<()> {
    let s = m.structure();
    let c = native_coeffs(m)?;
    let (n_rows, n_cols) = (s.n_rows(), s.n_cols());

    if !exclude_diag {
        diag_vec(c.da.get(), x, y, n_rows);
    } else {
        zero_range(y, 0, n_rows);
    }
    zero_range(y, n_rows, n_cols);

    if let Some(xa) = c.xa.get() {
        scatter_faces(s.face_cell(), xa, c.symmetric, 0..s.n_faces(), x, y);
    }
    Ok(())
}

/// Face loop over conflict-free groups; ranges within a group in parallel.
pub(super) fn mat_vec_grouped(
    exclude_diag: bool,
    m: &Matrix<'_>,
    x: &[f64],
    y: &mut [f64],
) -> MatrixResult<()> {
    let s = m.structure();
    let c = native_coeffs(m)?;
    let groups = m
        .face_groups()
        .ok_or(MatrixError::missing_kernel("grouped native"))?;
    let (n_rows, n_cols) = (s.n_rows(), s.n_cols());

    if !exclude_diag {
        diag_vec(c.da.get(), x, y, n_rows);
    } else {
        zero_range(y, 0, n_rows);
    }
    zero_range(y, n_rows, n_cols);

    let xa = match c.xa.get() {
        Some(xa) => xa,
        None => return Ok(()),
    };
    let face_cell = s.face_cell();
    let symmetric = c.symmetric;

    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;

        struct SyncPtr(*mut f64);
        // SAFETY: ranges within one group touch disjoint cells (numbering
        // contract), so concurrent writes never alias.
        unsafe impl Send for SyncPtr {}
        unsafe impl Sync for SyncPtr {}
        impl SyncPtr {
            /// Caller guarantees no concurrent access to element `i`.
            #[inline]
            unsafe fn add_assign(&self, i: usize, v: f64) {
                *self.0.add(i) += v;
            }
        }

        let yp = SyncPtr(y.as_mut_ptr());
        for g in 0..groups.n_groups() {
            groups.ranges(g).par_iter().for_each(|range| {
                for f in range.clone() {
                    let [ii, jj] = face_cell[f];
                    let (upper, lower) = if symmetric {
                        (xa[f], xa[f])
                    } else {
                        (xa[2 * f], xa[2 * f + 1])
                    };
                    // SAFETY: ii and jj belong to this range only within the
                    // group; no other worker touches them.
                    unsafe {
                        yp.add_assign(ii, upper * x[jj]);
                        yp.add_assign(jj, lower * x[ii]);
                    }
                }
            });
        }
    }

    #[cfg(not(feature = "parallel"))]
    {
        for g in 0..groups.n_groups() {
            for range in groups.ranges(g) {
                scatter_faces(face_cell, xa, symmetric, range.clone(), x, y);
            }
        }
    }

    Ok(())
}

/// Cache-blocked face loop.
///
/// Faces are processed in blocks of `loop_length` so the endpoint indices
/// stay in L1 between the two sub-loops; the first sub-loop carries the
/// running `y[ii]` value across consecutive faces sharing a row to break the
/// load-after-store dependency.
pub(super) fn mat_vec_bull(
    exclude_diag: bool,
    m: &Matrix<'_>,
    x: &[f64],
    y: &mut [f64],
    loop_length: usize,
) -> MatrixResult<()> {
    let s = m.structure();
    let c = native_coeffs(m)?;
    let (n_rows, n_cols) = (s.n_rows(), s.n_cols());
    let ll = if loop_length > 0 {
        loop_length
    } else {
        DEFAULT_LOOP_LENGTH
    };

    if !exclude_diag {
        diag_vec(c.da.get(), x, y, n_rows);
    } else {
        zero_range(y, 0, n_rows);
    }
    zero_range(y, n_rows, n_cols);

    let xa = match c.xa.get() {
        Some(xa) => xa,
        None => return Ok(()),
    };
    let face_cell = s.face_cell();
    let n_faces = s.n_faces();
    let symmetric = c.symmetric;

    let xa_upper = |f: usize| if symmetric { xa[f] } else { xa[2 * f] };
    let xa_lower = |f: usize| if symmetric { xa[f] } else { xa[2 * f + 1] };

    let mut start = 0;
    while start < n_faces {
        let kk_max = (n_faces - start).min(ll);
        let chunk = &face_cell[start..start + kk_max];

        // sub-loop 1: y[ii] += xa * x[jj], carrying y[ii] across repeats
        let mut ii_prev = chunk[0][0];
        let mut y_it_prev = y[ii_prev] + xa_upper(start) * x[chunk[0][1]];

        for kk in 1..kk_max {
            let ii = chunk[kk][0];
            let y_it = if ii == ii_prev {
                y_it_prev
            } else {
                let t = y[ii];
                y[ii_prev] = y_it_prev;
                t
            };
            ii_prev = ii;
            y_it_prev = y_it + xa_upper(start + kk) * x[chunk[kk][1]];
        }
        y[ii_prev] = y_it_prev;

        // sub-loop 2: y[jj] += xa * x[ii]
        for (kk, face) in chunk.iter().enumerate() {
            y[face[1]] += xa_lower(start + kk) * x[face[0]];
        }

        start += ll;
    }

    Ok(())
}

/// Block-coupled face loop (generic extent, or the fixed 3x3 form).
///
/// Diagonal blocks are dense; face couplings stay scalar and act uniformly
/// on every component.
pub(super) fn b_mat_vec(
    exclude_diag: bool,
    m: &Matrix<'_>,
    x: &[f64],
    y: &mut [f64],
    fixed3: bool,
) -> MatrixResult<()> {
    let s = m.structure();
    let c = native_coeffs(m)?;
    let b = m.block();
    let (n_rows, n_cols) = (s.n_rows(), s.n_cols());
    let (e, vs, bs) = (b.extent, b.vec_stride, b.block_stride);

    if fixed3 && (e != 3 || vs != 3 || bs != 9) {
        return Err(MatrixError::missing_kernel("fixed 3x3 block"));
    }

    // padding components stay zero
    zero_range(y, 0, n_cols * vs);

    if !exclude_diag {
        if let Some(da) = c.da.get() {
            for ii in 0..n_rows {
                let blk = &da[ii * bs..(ii + 1) * bs];
                let xb = &x[ii * vs..ii * vs + e];
                let yb = &mut y[ii * vs..ii * vs + e];
                if fixed3 {
                    dense_mv_3(blk, xb, yb);
                } else {
                    dense_mv(&b, blk, xb, yb);
                }
            }
        }
    }

    if let Some(xa) = c.xa.get() {
        if c.symmetric {
            for (f, face) in s.face_cell().iter().enumerate() {
                let [ii, jj] = *face;
                for kk in 0..e {
                    y[ii * vs + kk] += xa[f] * x[jj * vs + kk];
                    y[jj * vs + kk] += xa[f] * x[ii * vs + kk];
                }
            }
        } else {
            for (f, face) in s.face_cell().iter().enumerate() {
                let [ii, jj] = *face;
                for kk in 0..e {
                    y[ii * vs + kk] += xa[2 * f] * x[jj * vs + kk];
                    y[jj * vs + kk] += xa[2 * f + 1] * x[ii * vs + kk];
                }
            }
        }
    }

    Ok(())
}
