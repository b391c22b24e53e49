// crates/fv_matrix/src/spmv/msr.rs

//! MSR matrix-vector products (diagonal in a separate dense array).

use super::{zero_range, DEFAULT_LOOP_LENGTH};
use crate::coeffs::CoeffStore;
use crate::error::{MatrixError, MatrixResult};
use crate::matrix::Matrix;
use crate::structure::CsrStructure;
use fv_foundation::AlignedVec;

struct MsrParts<'c> {
    cs: &'c CsrStructure,
    d_val: Option<&'c [f64]>,
    x_val: &'c [f64],
}

fn msr_parts<'c>(m: &'c Matrix<'_>) -> MatrixResult<MsrParts<'c>> {
    let cs = m
        .structure()
        .csr()
        .ok_or(MatrixError::CoefficientsNotSet)?;
    match m.coeff_store() {
        CoeffStore::Msr(c) => Ok(MsrParts {
            cs,
            d_val: c.d_val.get(),
            x_val: &c.x_val,
        }),
        CoeffStore::MsrSym(c) => Ok(MsrParts {
            cs,
            d_val: c.d_val.get(),
            x_val: &c.x_val,
        }),
        _ => Err(MatrixError::CoefficientsNotSet),
    }
}

#[inline]
fn row_dot(cs: &CsrStructure, val: &[f64], x: &[f64], ii: usize) -> f64 {
    let start = cs.row_index()[ii];
    let mut sii = 0.0;
    for (kk, &col) in cs.row(ii).iter().enumerate() {
        sii += val[start + kk] * x[col];
    }
    sii
}

/// Row-gather product plus separate diagonal term.
pub(super) fn mat_vec(
    exclude_diag: bool,
    m: &Matrix<'_>,
    x: &[f64],
    y: &mut [f64],
) -> MatrixResult<()> {
    let p = msr_parts(m)?;
    let (n_rows, n_cols) = (p.cs.n_rows(), p.cs.n_cols());
    let (cs, x_val) = (p.cs, p.x_val);

    match (exclude_diag, p.d_val) {
        (false, Some(d_val)) => {
            #[cfg(feature = "parallel")]
            {
                use rayon::prelude::*;
                y[..n_rows]
                    .par_iter_mut()
                    .enumerate()
                    .for_each(|(ii, yi)| {
                        *yi = row_dot(cs, x_val, x, ii) + d_val[ii] * x[ii];
                    });
            }

            #[cfg(not(feature = "parallel"))]
            for ii in 0..n_rows {
                y[ii] = row_dot(cs, x_val, x, ii) + d_val[ii] * x[ii];
            }
        }
        _ => {
            #[cfg(feature = "parallel")]
            {
                use rayon::prelude::*;
                y[..n_rows]
                    .par_iter_mut()
                    .enumerate()
                    .for_each(|(ii, yi)| *yi = row_dot(cs, x_val, x, ii));
            }

            #[cfg(not(feature = "parallel"))]
            for ii in 0..n_rows {
                y[ii] = row_dot(cs, x_val, x, ii);
            }
        }
    }

    zero_range(y, n_rows, n_cols);
    Ok(())
}

/// Chunked-prefetch product: each row's gathered x values are followed by
/// the row's own x entry for the diagonal term.
pub(super) fn mat_vec_pf(
    exclude_diag: bool,
    m: &Matrix<'_>,
    x: &[f64],
    y: &mut [f64],
    loop_length: usize,
) -> MatrixResult<()> {
    let p = msr_parts(m)?;
    let (n_rows, n_cols) = (p.cs.n_rows(), p.cs.n_cols());
    let (cs, x_val) = (p.cs, p.x_val);
    let chunk = if loop_length > 0 {
        loop_length
    } else {
        DEFAULT_LOOP_LENGTH
    };
    let ri = cs.row_index();
    let diag = if exclude_diag { None } else { p.d_val };

    let mut max_len = 0;
    let mut start = 0;
    while start < n_rows {
        let end = (start + chunk).min(n_rows);
        max_len = max_len.max(ri[end] - ri[start] + (end - start));
        start = end;
    }
    let mut scratch: AlignedVec<f64> = AlignedVec::zeros(max_len);

    let mut start = 0;
    while start < n_rows {
        let end = (start + chunk).min(n_rows);

        let mut pp = 0;
        for ii in start..end {
            for &col in cs.row(ii) {
                scratch[pp] = x[col];
                pp += 1;
            }
            scratch[pp] = x[ii];
            pp += 1;
        }

        let mut pp = 0;
        match diag {
            Some(d_val) => {
                for ii in start..end {
                    let mut sii = 0.0;
                    for kk in ri[ii]..ri[ii + 1] {
                        sii += x_val[kk] * scratch[pp];
                        pp += 1;
                    }
                    y[ii] = sii + d_val[ii] * scratch[pp];
                    pp += 1;
                }
            }
            None => {
                for ii in start..end {
                    let mut sii = 0.0;
                    for kk in ri[ii]..ri[ii + 1] {
                        sii += x_val[kk] * scratch[pp];
                        pp += 1;
                    }
                    y[ii] = sii;
                    pp += 1; // skip the unused diagonal gather slot
                }
            }
        }

        start = end;
    }

    zero_range(y, n_rows, n_cols);
    Ok(())
}

/// Symmetric product with mirrored scatter; sequential only.
pub(super) fn mat_vec_sym(
    exclude_diag: bool,
    m: &Matrix<'_>,
    x: &[f64],
    y: &mut [f64],
) -> MatrixResult<()> {
    let p = msr_parts(m)?;
    let (n_rows, n_cols) = (p.cs.n_rows(), p.cs.n_cols());
    let (cs, x_val) = (p.cs, p.x_val);
    let ri = cs.row_index();
    let col_id = cs.col_id();

    zero_range(y, 0, n_cols);

    if !exclude_diag {
        if let Some(d_val) = p.d_val {
            for ii in 0..n_rows {
                y[ii] += d_val[ii] * x[ii];
            }
        }
    }

    for ii in 0..n_rows {
        let (rs, re) = (ri[ii], ri[ii + 1]);

        let mut sii = 0.0;
        for kk in rs..re {
            sii += x_val[kk] * x[col_id[kk]];
        }
        y[ii] += sii;

        for kk in rs..re {
            y[col_id[kk]] += x_val[kk] * x[ii];
        }
    }

    Ok(())
}
