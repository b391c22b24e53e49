// crates/fv_matrix/src/spmv/mod.rs

//! Matrix-vector product kernel family.
//!
//! One tagged [`SpmvKernel`] variant per implementation; the matrix selects
//! variants once at creation (or from a tuned [`crate::MatrixVariant`]) and
//! dispatches through [`SpmvKernel::run`].
//!
//! Kernel shape, common to all storage kinds:
//! 1. diagonal phase: populate `y` for owned rows (or zero it when the
//!    diagonal is excluded), always zero the ghost row range
//! 2. off-diagonal phase: accumulate couplings
//!
//! Accumulation order differs between variants (serial, threaded, prefetch,
//! cache-blocked), so results agree only up to floating-point rounding.

mod csr;
mod msr;
mod native;

use crate::error::MatrixResult;
use crate::matrix::Matrix;

/// A matrix-vector product implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpmvKernel {
    /// Native face loop, sequential.
    NativeSerial,
    /// Native face loop over conflict-free face groups (threaded).
    NativeGrouped,
    /// Native face loop, cache-blocked with split sub-loops.
    NativeBull {
        /// Faces per cache block (0 selects the default of 508).
        loop_length: usize,
    },
    /// Native block-coupled product, generic block extent.
    NativeBlock,
    /// Native block-coupled product, fixed 3x3 blocks.
    NativeBlock3,
    /// CSR row gather.
    Csr,
    /// CSR row gather with chunked x prefetch.
    CsrPrefetch {
        /// Rows per prefetch chunk (0 selects the default of 508).
        loop_length: usize,
    },
    /// Symmetric CSR with mirrored scatter (sequential only).
    CsrSym,
    /// MSR row gather plus separate diagonal.
    Msr,
    /// MSR row gather with chunked x prefetch.
    MsrPrefetch {
        /// Rows per prefetch chunk (0 selects the default of 508).
        loop_length: usize,
    },
    /// Symmetric MSR with mirrored scatter (sequential only).
    MsrSym,
}

impl SpmvKernel {
    /// Display name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::NativeSerial => "native",
            Self::NativeGrouped => "native, grouped sum",
            Self::NativeBull { .. } => "native, Bull algorithm",
            Self::NativeBlock => "native, blocked",
            Self::NativeBlock3 => "native, 3x3 blocks",
            Self::Csr => "CSR",
            Self::CsrPrefetch { .. } => "CSR, with prefetch",
            Self::CsrSym => "CSR_SYM",
            Self::Msr => "MSR",
            Self::MsrPrefetch { .. } => "MSR, with prefetch",
            Self::MsrSym => "MSR_SYM",
        }
    }

    /// Whether the kernel handles block-coupled systems.
    #[inline]
    pub fn is_block(&self) -> bool {
        matches!(self, Self::NativeBlock | Self::NativeBlock3)
    }

    /// Compute `y = A.x` (or `y = (A - D).x` when `exclude_diag`).
    ///
    /// `x` must cover the extended column range, `y` the extended row range;
    /// the ghost range of `y` is zeroed. No halo synchronization happens
    /// here.
    pub fn run(
        &self,
        exclude_diag: bool,
        m: &Matrix<'_>,
        x: &[f64],
        y: &mut [f64],
    ) -> MatrixResult<()> {
        match *self {
            Self::NativeSerial => native::mat_vec(exclude_diag, m, x, y),
            Self::NativeGrouped => native::mat_vec_grouped(exclude_diag, m, x, y),
            Self::NativeBull { loop_length } => {
                native::mat_vec_bull(exclude_diag, m, x, y, loop_length)
            }
            Self::NativeBlock => native::b_mat_vec(exclude_diag, m, x, y, false),
            Self::NativeBlock3 => native::b_mat_vec(exclude_diag, m, x, y, true),
            Self::Csr => csr::mat_vec(exclude_diag, m, x, y),
            Self::CsrPrefetch { loop_length } => {
                csr::mat_vec_pf(exclude_diag, m, x, y, loop_length)
            }
            Self::CsrSym => csr::mat_vec_sym(exclude_diag, m, x, y),
            Self::Msr => msr::mat_vec(exclude_diag, m, x, y),
            Self::MsrPrefetch { loop_length } => {
                msr::mat_vec_pf(exclude_diag, m, x, y, loop_length)
            }
            Self::MsrSym => msr::mat_vec_sym(exclude_diag, m, x, y),
        }
    }
}

/// Default chunk length for cache-blocked and prefetch kernels.
pub(crate) const DEFAULT_LOOP_LENGTH: usize = 508;

// ============================================================================
// Shared diagonal-phase helpers
// ============================================================================

/// Scalar diagonal phase: `y[i] = da[i] * x[i]` for owned rows.
#[inline]
pub(crate) fn diag_vec(da: Option<&[f64]>, x: &[f64], y: &mut [f64], n_rows: usize) {
    match da {
        Some(da) => {
            for ii in 0..n_rows {
                y[ii] = da[ii] * x[ii];
            }
        }
        None => y[..n_rows].fill(0.0),
    }
}

/// Zero a sub-range of y.
#[inline]
pub(crate) fn zero_range(y: &mut [f64], start: usize, end: usize) {
    y[start..end].fill(0.0);
}
