// crates/fv_matrix/src/spmv/csr.rs

//! CSR matrix-vector products (diagonal stored inline).

use super::{zero_range, DEFAULT_LOOP_LENGTH};
use crate::coeffs::CoeffStore;
use crate::error::{MatrixError, MatrixResult};
use crate::matrix::Matrix;
use crate::structure::CsrStructure;
use fv_foundation::AlignedVec;

fn csr_parts<'c>(m: &'c Matrix<'_>) -> MatrixResult<(&'c CsrStructure, &'c [f64])> {
    let cs = m
        .structure()
        .csr()
        .ok_or(MatrixError::CoefficientsNotSet)?;
    match m.coeff_store() {
        CoeffStore::Csr(c) => Ok((cs, &c.val)),
        _ => Err(MatrixError::CoefficientsNotSet),
    }
}

#[inline]
fn row_dot(cs: &CsrStructure, val: &[f64], x: &[f64], ii: usize, exclude_diag: bool) -> f64 {
    let start = cs.row_index()[ii];
    let row = cs.row(ii);
    let mut sii = 0.0;
    if exclude_diag {
        for (kk, &col) in row.iter().enumerate() {
            if col != ii {
                sii += val[start + kk] * x[col];
            }
        }
    } else {
        for (kk, &col) in row.iter().enumerate() {
            sii += val[start + kk] * x[col];
        }
    }
    sii
}

/// Row-gather product; each row owns its output slot, so rows run in
/// parallel without write hazards.
pub(super) fn mat_vec(
    exclude_diag: bool,
    m: &Matrix<'_>,
    x: &[f64],
    y: &mut [f64],
) -> MatrixResult<()> {
    let (cs, val) = csr_parts(m)?;
    let (n_rows, n_cols) = (cs.n_rows(), cs.n_cols());

    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        y[..n_rows]
            .par_iter_mut()
            .enumerate()
            .for_each(|(ii, yi)| *yi = row_dot(cs, val, x, ii, exclude_diag));
    }

    #[cfg(not(feature = "parallel"))]
    for ii in 0..n_rows {
        y[ii] = row_dot(cs, val, x, ii, exclude_diag);
    }

    zero_range(y, n_rows, n_cols);
    Ok(())
}

/// Chunked-prefetch product: gather the chunk's x values into a contiguous
/// scratch buffer, then run the row dot products against the scratch only.
pub(super) fn mat_vec_pf(
    exclude_diag: bool,
    m: &Matrix<'_>,
    x: &[f64],
    y: &mut [f64],
    loop_length: usize,
) -> MatrixResult<()> {
    if exclude_diag {
        return Err(MatrixError::not_implemented(
            "prefetch multiply with diagonal exclusion",
            "use the non-prefetch CSR kernel",
        ));
    }

    let (cs, val) = csr_parts(m)?;
    let (n_rows, n_cols) = (cs.n_rows(), cs.n_cols());
    let chunk = if loop_length > 0 {
        loop_length
    } else {
        DEFAULT_LOOP_LENGTH
    };
    let ri = cs.row_index();

    let mut max_nnz = 0;
    let mut start = 0;
    while start < n_rows {
        let end = (start + chunk).min(n_rows);
        max_nnz = max_nnz.max(ri[end] - ri[start]);
        start = end;
    }
    let mut scratch: AlignedVec<f64> = AlignedVec::zeros(max_nnz);

    let mut start = 0;
    while start < n_rows {
        let end = (start + chunk).min(n_rows);

        let mut p = 0;
        for ii in start..end {
            for &col in cs.row(ii) {
                scratch[p] = x[col];
                p += 1;
            }
        }

        let mut p = 0;
        for ii in start..end {
            let mut sii = 0.0;
            for kk in ri[ii]..ri[ii + 1] {
                sii += val[kk] * scratch[p];
                p += 1;
            }
            y[ii] = sii;
        }

        start = end;
    }

    zero_range(y, n_rows, n_cols);
    Ok(())
}

/// Symmetric product: each stored upper-triangle entry contributes to both
/// its row (forward) and its column (mirrored) in the same pass.
///
/// The mirrored scatter writes to arbitrary rows, so this kernel is
/// sequential only.
pub(super) fn mat_vec_sym(
    exclude_diag: bool,
    m: &Matrix<'_>,
    x: &[f64],
    y: &mut [f64],
) -> MatrixResult<()> {
    let cs = m
        .structure()
        .csr()
        .ok_or(MatrixError::CoefficientsNotSet)?;
    let val = match m.coeff_store() {
        CoeffStore::CsrSym(c) => &c.val,
        _ => return Err(MatrixError::CoefficientsNotSet),
    };
    let (n_rows, n_cols) = (cs.n_rows(), cs.n_cols());
    let ri = cs.row_index();
    let col_id = cs.col_id();

    // the diagonal is the first entry of its row by construction
    let mirror_start = usize::from(cs.have_diag());
    let fwd_start = if exclude_diag { mirror_start } else { 0 };

    zero_range(y, 0, n_cols);

    for ii in 0..n_rows {
        let (rs, re) = (ri[ii], ri[ii + 1]);
        let n = re - rs;

        let mut sii = 0.0;
        for kk in fwd_start..n {
            sii += val[rs + kk] * x[col_id[rs + kk]];
        }
        y[ii] += sii;

        for kk in mirror_start..n {
            y[col_id[rs + kk]] += val[rs + kk] * x[ii];
        }
    }

    Ok(())
}
