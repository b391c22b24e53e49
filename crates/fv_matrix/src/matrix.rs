// crates/fv_matrix/src/matrix.rs

//! The operational matrix object.
//!
//! A [`Matrix`] borrows an immutable [`MatrixStructure`] (which must outlive
//! it), owns the currently bound coefficients, and carries a kernel table
//! with one optional [`SpmvKernel`] per (block-mode, diagonal-mode) slot.
//! Kernels are selected once at creation and may be replaced wholesale from a
//! tuned [`MatrixVariant`](crate::MatrixVariant).
//!
//! Concurrency contract: multiply calls may run concurrently on a shared
//! matrix (read-only access), but the caller must serialize coefficient
//! binding/release against in-flight multiplies; there is no internal
//! locking.

use crate::block::BlockSize;
use crate::coeffs::{
    assign_general, assign_symmetric, CoeffArray, CoeffStore, CsrCoeffs, CsrSymCoeffs, MsrCoeffs,
    MsrSymCoeffs, NativeCoeffs,
};
use crate::error::{MatrixError, MatrixResult};
use crate::halo::{HaloExchange, RotationMode};
use crate::numbering::FaceGroups;
use crate::spmv::SpmvKernel;
use crate::structure::{MatrixKind, MatrixStructure};
use crate::variant::MatrixVariant;

/// Kernel table slots: scalar, scalar exclude-diag, block, block exclude-diag.
pub(crate) const N_KERNEL_SLOTS: usize = 4;

const SLOT_MODES: [&str; N_KERNEL_SLOTS] = [
    "scalar",
    "scalar exclude-diagonal",
    "block",
    "block exclude-diagonal",
];

/// Sparse matrix bound to a mesh structure.
pub struct Matrix<'m> {
    structure: &'m MatrixStructure<'m>,
    coeffs: CoeffStore<'m>,
    halo: Option<&'m dyn HaloExchange>,
    groups: Option<&'m FaceGroups>,
    block: BlockSize,
    kernels: [Option<SpmvKernel>; N_KERNEL_SLOTS],
    loop_length: usize,
}

impl<'m> Matrix<'m> {
    /// Create a matrix with the default kernel selection for its kind.
    pub fn new(structure: &'m MatrixStructure<'m>) -> Self {
        let kernels = match structure.kind() {
            MatrixKind::Native => [
                Some(SpmvKernel::NativeSerial),
                Some(SpmvKernel::NativeSerial),
                Some(SpmvKernel::NativeBlock),
                Some(SpmvKernel::NativeBlock),
            ],
            MatrixKind::Csr => [Some(SpmvKernel::Csr), Some(SpmvKernel::Csr), None, None],
            MatrixKind::CsrSym => [
                Some(SpmvKernel::CsrSym),
                Some(SpmvKernel::CsrSym),
                None,
                None,
            ],
            MatrixKind::Msr => [Some(SpmvKernel::Msr), Some(SpmvKernel::Msr), None, None],
            MatrixKind::MsrSym => [
                Some(SpmvKernel::MsrSym),
                Some(SpmvKernel::MsrSym),
                None,
                None,
            ],
        };

        Self {
            structure,
            coeffs: CoeffStore::Unbound,
            halo: None,
            groups: None,
            block: BlockSize::SCALAR,
            kernels,
            loop_length: 0,
        }
    }

    /// Create a matrix and apply a tuned variant's kernel selection.
    ///
    /// A variant whose kind differs from the structure's is ignored.
    pub fn with_variant(structure: &'m MatrixStructure<'m>, variant: &MatrixVariant) -> Self {
        let mut m = Self::new(structure);
        if variant.kind == structure.kind() {
            m.loop_length = variant.loop_length;
            for (slot, k) in m.kernels.iter_mut().zip(variant.kernels.iter()) {
                if k.is_some() {
                    *slot = *k;
                }
            }
        }
        m
    }

    /// Attach a ghost-value exchange provider.
    pub fn set_halo(&mut self, halo: &'m dyn HaloExchange) {
        self.halo = Some(halo);
    }

    /// Attach a conflict-free face grouping, enabling the threaded native
    /// kernel when this matrix uses the default native selection.
    pub fn set_face_groups(&mut self, groups: &'m FaceGroups) {
        self.groups = Some(groups);
        if self.structure.kind() == MatrixKind::Native {
            for slot in self.kernels.iter_mut().take(2) {
                if *slot == Some(SpmvKernel::NativeSerial) {
                    *slot = Some(SpmvKernel::NativeGrouped);
                }
            }
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Associated structure.
    #[inline]
    pub fn structure(&self) -> &MatrixStructure<'m> {
        self.structure
    }

    /// Bound coefficients.
    #[inline]
    pub fn coeff_store(&self) -> &CoeffStore<'m> {
        &self.coeffs
    }

    /// Storage kind.
    #[inline]
    pub fn kind(&self) -> MatrixKind {
        self.structure.kind()
    }

    /// Number of owned rows.
    #[inline]
    pub fn n_rows(&self) -> usize {
        self.structure.n_rows()
    }

    /// Number of columns (owned + ghost).
    #[inline]
    pub fn n_cols(&self) -> usize {
        self.structure.n_cols()
    }

    /// Current diagonal block size.
    #[inline]
    pub fn block(&self) -> BlockSize {
        self.block
    }

    /// Attached face grouping, if any.
    #[inline]
    pub fn face_groups(&self) -> Option<&FaceGroups> {
        self.groups
    }

    /// Whether coefficients are bound.
    #[inline]
    pub fn is_bound(&self) -> bool {
        self.coeffs.is_bound()
    }

    // ========================================================================
    // Coefficient binding
    // ========================================================================

    /// Bind coefficients, sharing the caller's arrays where the storage
    /// layout allows (native and MSR diagonals; others are scattered into
    /// private slot arrays).
    ///
    /// Off-diagonal input is interleaved: `xa[2f]` couples face f's first
    /// endpoint to its second, `xa[2f+1]` the reverse; symmetric input has
    /// one value per face. Shared arrays must stay valid until released or
    /// rebound.
    pub fn set_coefficients(
        &mut self,
        symmetric: bool,
        block: BlockSize,
        da: Option<&'m [f64]>,
        xa: Option<&'m [f64]>,
    ) -> MatrixResult<()> {
        self.bind(symmetric, true, false, block, da, xa)
    }

    /// Bind coefficients, copying every array into private storage.
    pub fn copy_coefficients(
        &mut self,
        symmetric: bool,
        block: BlockSize,
        da: Option<&'m [f64]>,
        xa: Option<&'m [f64]>,
    ) -> MatrixResult<()> {
        self.bind(symmetric, true, true, block, da, xa)
    }

    /// Bind scalar coefficients with split (non-interleaved) off-diagonal
    /// input: `xa[f]` holds the forward coupling and `xa[n_faces + f]` the
    /// reverse. Symmetric input is identical to the interleaved entry point.
    pub fn set_coefficients_split(
        &mut self,
        symmetric: bool,
        da: Option<&'m [f64]>,
        xa: Option<&'m [f64]>,
    ) -> MatrixResult<()> {
        self.bind(symmetric, false, false, BlockSize::SCALAR, da, xa)
    }

    fn bind(
        &mut self,
        symmetric: bool,
        interleaved: bool,
        copy: bool,
        block: BlockSize,
        da: Option<&'m [f64]>,
        xa: Option<&'m [f64]>,
    ) -> MatrixResult<()> {
        let kind = self.structure.kind();
        let n_rows = self.structure.n_rows();
        let n_faces = self.structure.n_faces();

        if kind.symmetric_storage() && !symmetric {
            return Err(MatrixError::unsupported(
                "set_coefficients(asymmetric)",
                kind.name(),
            ));
        }
        if !block.is_scalar() && kind != MatrixKind::Native {
            return Err(MatrixError::unsupported("block coefficients", kind.name()));
        }

        // asymmetric input is 2 * n_faces values, interleaved or in two
        // concatenated half-arrays
        let xa_len = if symmetric { n_faces } else { 2 * n_faces };
        if let Some(da) = da {
            MatrixError::check_size("da", n_rows * block.block_stride, da.len())?;
        }
        if let Some(xa) = xa {
            MatrixError::check_size("xa", xa_len, xa.len())?;
        }

        let face_cell = self.structure.face_cell();
        self.coeffs = if kind == MatrixKind::Native {
            CoeffStore::Native(NativeCoeffs::bind(
                symmetric,
                interleaved,
                copy,
                n_faces,
                da,
                xa,
            ))
        } else {
            let cs = self
                .structure
                .csr()
                .ok_or(MatrixError::unsupported("coefficient assembly", kind.name()))?;
            match kind {
                MatrixKind::Csr => CoeffStore::Csr(CsrCoeffs {
                    val: assign_general(cs, face_cell, symmetric, interleaved, da, xa),
                }),
                MatrixKind::CsrSym => CoeffStore::CsrSym(CsrSymCoeffs {
                    val: assign_symmetric(cs, face_cell, da, xa),
                }),
                MatrixKind::Msr => CoeffStore::Msr(MsrCoeffs {
                    d_val: CoeffArray::bind(da, copy),
                    x_val: assign_general(cs, face_cell, symmetric, interleaved, None, xa),
                }),
                _ => CoeffStore::MsrSym(MsrSymCoeffs {
                    d_val: CoeffArray::bind(da, copy),
                    x_val: assign_symmetric(cs, face_cell, None, xa),
                }),
            }
        };
        self.block = block;
        Ok(())
    }

    /// Unlink shared coefficient arrays without touching owned copies.
    ///
    /// Idempotent; a subsequent bind fully re-initializes the payload.
    pub fn release_coefficients(&mut self) {
        self.coeffs.release();
    }

    // ========================================================================
    // Diagonal extraction
    // ========================================================================

    /// Copy the diagonal into `out` (length `n_rows`, or `n_rows * extent`
    /// for block matrices: the diagonal entries of each dense block).
    /// Missing diagonals read as zero.
    pub fn get_diagonal(&self, out: &mut [f64]) -> MatrixResult<()> {
        let n_rows = self.structure.n_rows();
        let b = self.block;
        MatrixError::check_size("out", n_rows * b.extent, out.len())?;

        match &self.coeffs {
            CoeffStore::Unbound => Err(MatrixError::CoefficientsNotSet),
            CoeffStore::Native(c) => {
                self.diag_from_dense(c.da.get(), out);
                Ok(())
            }
            CoeffStore::Msr(c) => {
                self.diag_from_dense(c.d_val.get(), out);
                Ok(())
            }
            CoeffStore::MsrSym(c) => {
                self.diag_from_dense(c.d_val.get(), out);
                Ok(())
            }
            CoeffStore::Csr(c) => {
                let cs = self
                    .structure
                    .csr()
                    .ok_or(MatrixError::CoefficientsNotSet)?;
                for ii in 0..n_rows {
                    let start = cs.row_index()[ii];
                    out[ii] = cs
                        .row(ii)
                        .iter()
                        .position(|&col| col == ii)
                        .map_or(0.0, |kk| c.val[start + kk]);
                }
                Ok(())
            }
            CoeffStore::CsrSym(c) => {
                let cs = self
                    .structure
                    .csr()
                    .ok_or(MatrixError::CoefficientsNotSet)?;
                for ii in 0..n_rows {
                    let start = cs.row_index()[ii];
                    // diagonal first in its row when stored
                    out[ii] = if cs.have_diag() && cs.col_id()[start] == ii {
                        c.val[start]
                    } else {
                        0.0
                    };
                }
                Ok(())
            }
        }
    }

    fn diag_from_dense(&self, da: Option<&[f64]>, out: &mut [f64]) {
        let n_rows = self.structure.n_rows();
        let b = self.block;
        match da {
            None => out[..n_rows * b.extent].fill(0.0),
            Some(da) if b.is_scalar() => out[..n_rows].copy_from_slice(&da[..n_rows]),
            Some(da) => {
                for ii in 0..n_rows {
                    for kk in 0..b.extent {
                        out[ii * b.extent + kk] =
                            da[ii * b.block_stride + kk * b.row_stride + kk];
                    }
                }
            }
        }
    }

    // ========================================================================
    // Multiply entry points
    // ========================================================================

    /// y = A.x, refreshing the ghost range of x through the halo first.
    pub fn vector_multiply(
        &self,
        rotation: RotationMode,
        x: &mut [f64],
        y: &mut [f64],
    ) -> MatrixResult<()> {
        self.pre_multiply_sync(rotation, x)?;
        self.spmv(false, x, y)
    }

    /// y = A.x without any halo synchronization.
    ///
    /// Use when x's ghost range is already current to skip the redundant
    /// exchange.
    pub fn vector_multiply_nosync(&self, x: &[f64], y: &mut [f64]) -> MatrixResult<()> {
        self.spmv(false, x, y)
    }

    /// y = (A - D).x, refreshing the ghost range of x through the halo first.
    pub fn exdiag_vector_multiply(
        &self,
        rotation: RotationMode,
        x: &mut [f64],
        y: &mut [f64],
    ) -> MatrixResult<()> {
        self.pre_multiply_sync(rotation, x)?;
        self.spmv(true, x, y)
    }

    /// y = (A - D).x without any halo synchronization.
    pub fn exdiag_vector_multiply_nosync(&self, x: &[f64], y: &mut [f64]) -> MatrixResult<()> {
        self.spmv(true, x, y)
    }

    fn pre_multiply_sync(&self, rotation: RotationMode, x: &mut [f64]) -> MatrixResult<()> {
        if let Some(halo) = self.halo {
            if rotation == RotationMode::Forbid && halo.has_rotations() {
                return Err(MatrixError::RotationForbidden {
                    operation: "vector_multiply",
                });
            }
            if self.block.is_scalar() {
                halo.sync_values(rotation, x)?;
            } else {
                halo.sync_values_blocked(rotation, x, self.block.vec_stride)?;
            }
        }
        Ok(())
    }

    pub(crate) fn spmv(&self, exclude_diag: bool, x: &[f64], y: &mut [f64]) -> MatrixResult<()> {
        let slot = match (self.block.is_scalar(), exclude_diag) {
            (true, false) => 0,
            (true, true) => 1,
            (false, false) => 2,
            (false, true) => 3,
        };

        let n = self.structure.n_cols() * self.block.vec_stride;
        if x.len() < n {
            return Err(MatrixError::size_mismatch("x", n, x.len()));
        }
        if y.len() < n {
            return Err(MatrixError::size_mismatch("y", n, y.len()));
        }

        let kernel = self.kernels[slot]
            .as_ref()
            .ok_or(MatrixError::missing_kernel(SLOT_MODES[slot]))?;
        kernel.run(exclude_diag, self, x, y)
    }

    /// Effective loop length for cache-blocked kernels.
    #[inline]
    pub fn loop_length(&self) -> usize {
        self.loop_length
    }
}
