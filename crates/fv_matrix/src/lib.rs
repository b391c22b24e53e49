// =============================================================================
// crates/fv_matrix/src/lib.rs
// =============================================================================
//! Polymorphic sparse-matrix core for a finite-volume solver.
//!
//! Supports five storage layouts (native face-based, CSR, symmetric CSR, MSR,
//! symmetric MSR), each with specialized matrix-vector product kernels, plus a
//! runtime auto-tuner that benchmarks kernel variants and selects the fastest
//! combination for the current mesh and hardware.
//!
//! # Architecture
//!
//! - [`structure`]: immutable topology ([`MatrixStructure`]), built once per
//!   mesh and shared read-only by any number of matrices
//! - [`coeffs`]: numeric payload bound to a structure, borrowed or owned
//! - [`matrix`]: the operational object ([`Matrix`]) combining structure,
//!   coefficients and a kernel table
//! - [`spmv`]: the kernel family ([`SpmvKernel`])
//! - [`halo`]: ghost-value exchange seam ([`HaloExchange`])
//! - [`variant`]: variant registry, auto-tuner and correctness checker
//!
//! # Example
//!
//! ```
//! use fv_matrix::{BlockSize, Matrix, MatrixKind, MatrixStructure};
//!
//! // 4 cells in a ring
//! let faces = [[0, 1], [1, 2], [2, 3], [3, 0]];
//! let da = [2.0; 4];
//! let xa = [-1.0; 4];
//!
//! let structure = MatrixStructure::new(MatrixKind::Csr, 4, 4, &faces);
//! let mut matrix = Matrix::new(&structure);
//! matrix
//!     .set_coefficients(true, BlockSize::SCALAR, Some(&da), Some(&xa))
//!     .unwrap();
//!
//! let x = [1.0; 4];
//! let mut y = [0.0; 4];
//! matrix.vector_multiply_nosync(&x, &mut y).unwrap();
//! assert!(y.iter().all(|v| v.abs() < 1e-12));
//! ```

#![warn(clippy::all)]

pub mod block;
pub mod coeffs;
pub mod error;
pub mod halo;
pub mod matrix;
pub mod numbering;
pub mod spmv;
pub mod structure;
pub mod variant;

pub use block::BlockSize;
pub use coeffs::{CoeffArray, CoeffStore};
pub use error::{MatrixError, MatrixResult};
pub use halo::{HaloExchange, RotationMode, TranslationHalo};
pub use matrix::Matrix;
pub use numbering::FaceGroups;
pub use spmv::SpmvKernel;
pub use structure::{CsrStructure, MatrixKind, MatrixStructure};
pub use variant::{
    check_variants, tune, variant_list, CheckResult, MatrixVariant, SymmetrySupport, TuningOptions,
};
