// crates/fv_matrix/src/error.rs

//! Matrix-layer error types.
//!
//! All errors here are programmer-facing contract violations or intentionally
//! unimplemented corners; none are transient. The policy is fail fast and
//! loud, no retries. Errors convert into `fv_foundation::FvError` for
//! propagation across layer boundaries.

use fv_foundation::FvError;
use thiserror::Error;

/// Matrix module result type.
pub type MatrixResult<T> = Result<T, MatrixError>;

/// Matrix layer error enum.
#[derive(Error, Debug)]
pub enum MatrixError {
    /// Operation not available for the given storage kind.
    #[error("operation {operation} is not supported for {kind} matrices")]
    UnsupportedKind {
        /// Operation name.
        operation: &'static str,
        /// Storage kind display name.
        kind: &'static str,
    },

    /// No multiply kernel bound for the requested mode.
    #[error("matrix is missing a {mode} vector multiply kernel")]
    MissingKernel {
        /// Mode description (scalar / block, with or without diagonal).
        mode: &'static str,
    },

    /// Multiply or diagonal extraction before coefficients were bound.
    #[error("matrix coefficients have not been set")]
    CoefficientsNotSet,

    /// Array length mismatch at a public entry point.
    #[error("size mismatch: {name} expected {expected}, got {actual}")]
    SizeMismatch {
        /// Array name.
        name: &'static str,
        /// Expected length.
        expected: usize,
        /// Actual length.
        actual: usize,
    },

    /// Halo contains rotation transforms but the caller forbade applying them.
    #[error("halo requires rotation handling for {operation}; use an entry point with an explicit rotation mode")]
    RotationForbidden {
        /// Operation that hit the restriction.
        operation: &'static str,
    },

    /// Known, intentionally unimplemented combination.
    #[error("{feature} is not implemented: {hint}")]
    NotImplemented {
        /// The missing combination.
        feature: &'static str,
        /// Which entry point to use instead.
        hint: &'static str,
    },

    /// Auto-tuning could not produce a usable result.
    #[error("tuning failed: {0}")]
    Tuning(String),
}

impl MatrixError {
    /// Operation not supported for a storage kind.
    pub fn unsupported(operation: &'static str, kind: &'static str) -> Self {
        Self::UnsupportedKind { operation, kind }
    }

    /// Missing kernel for a multiply mode.
    pub fn missing_kernel(mode: &'static str) -> Self {
        Self::MissingKernel { mode }
    }

    /// Array length mismatch.
    pub fn size_mismatch(name: &'static str, expected: usize, actual: usize) -> Self {
        Self::SizeMismatch {
            name,
            expected,
            actual,
        }
    }

    /// Intentionally unimplemented combination.
    pub fn not_implemented(feature: &'static str, hint: &'static str) -> Self {
        Self::NotImplemented { feature, hint }
    }

    /// Tuning failure.
    pub fn tuning(message: impl Into<String>) -> Self {
        Self::Tuning(message.into())
    }

    /// Check an array length at a public entry point.
    #[inline]
    pub fn check_size(name: &'static str, expected: usize, actual: usize) -> MatrixResult<()> {
        if expected != actual {
            Err(Self::size_mismatch(name, expected, actual))
        } else {
            Ok(())
        }
    }
}

/// Conversion to the foundation layer.
impl From<MatrixError> for FvError {
    fn from(err: MatrixError) -> Self {
        match err {
            MatrixError::UnsupportedKind { operation, kind } => {
                FvError::config(format!("matrix operation [{operation}] unsupported for {kind}"))
            }
            MatrixError::MissingKernel { mode } => {
                FvError::config(format!("missing {mode} multiply kernel"))
            }
            MatrixError::CoefficientsNotSet => {
                FvError::validation("matrix coefficients not set")
            }
            MatrixError::SizeMismatch {
                name,
                expected,
                actual,
            } => FvError::size_mismatch(name, expected, actual),
            MatrixError::RotationForbidden { operation } => {
                FvError::config(format!("rotation handling required for [{operation}]"))
            }
            MatrixError::NotImplemented { feature, hint } => {
                FvError::not_implemented(format!("{feature} ({hint})"))
            }
            MatrixError::Tuning(message) => FvError::config(format!("tuning: {message}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = MatrixError::unsupported("get_diag_block_size", "CSR_SYM");
        assert!(err.to_string().contains("CSR_SYM"));
        assert!(err.to_string().contains("get_diag_block_size"));
    }

    #[test]
    fn test_check_size() {
        assert!(MatrixError::check_size("x", 4, 4).is_ok());
        assert!(MatrixError::check_size("x", 4, 3).is_err());
    }

    #[test]
    fn test_conversion_to_foundation() {
        let err = MatrixError::size_mismatch("da", 8, 4);
        let fv: FvError = err.into();
        assert!(matches!(fv, FvError::SizeMismatch { .. }));
    }

    #[test]
    fn test_not_implemented_hint() {
        let err = MatrixError::not_implemented(
            "prefetch multiply with diagonal exclusion",
            "use the non-prefetch kernel",
        );
        assert!(err.to_string().contains("non-prefetch"));
    }
}
