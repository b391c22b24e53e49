// crates/fv_foundation/src/error.rs

//! Unified error type for the workspace.
//!
//! Provides the [`FvError`] enum and the [`FvResult`] alias. Domain crates
//! define their own error enums and convert into `FvError` for propagation
//! across layer boundaries.
//!
//! # Example
//!
//! ```
//! use fv_foundation::error::{FvError, FvResult};
//!
//! fn read_options() -> FvResult<()> {
//!     Err(FvError::config("missing tuning section"))
//! }
//! ```

use thiserror::Error;

/// Unified result type.
pub type FvResult<T> = Result<T, FvError>;

/// Workspace-level error type.
///
/// Core variants only; domain-specific errors live in the domain crates and
/// convert into this type at layer boundaries.
#[derive(Error, Debug)]
pub enum FvError {
    /// Configuration error.
    #[error("configuration error: {message}")]
    Config {
        /// Description of the invalid configuration.
        message: String,
    },

    /// Invalid input data.
    #[error("invalid input: {message}")]
    InvalidInput {
        /// Why the input was rejected.
        message: String,
    },

    /// Value outside its permitted range.
    #[error("out of range: {field}={value}, expected [{min}, {max}]")]
    OutOfRange {
        /// Field name.
        field: &'static str,
        /// Actual value.
        value: f64,
        /// Minimum allowed value.
        min: f64,
        /// Maximum allowed value.
        max: f64,
    },

    /// Array length mismatch.
    #[error("size mismatch: {name} expected {expected}, got {actual}")]
    SizeMismatch {
        /// Name of the array or field.
        name: &'static str,
        /// Expected length.
        expected: usize,
        /// Actual length.
        actual: usize,
    },

    /// Index beyond the valid range.
    #[error("index out of bounds: {index_type} index {index} outside 0..{len}")]
    IndexOutOfBounds {
        /// Kind of index (cell, face, row, ...).
        index_type: &'static str,
        /// Offending index.
        index: usize,
        /// Exclusive upper bound.
        len: usize,
    },

    /// Validation failure.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Feature not implemented.
    #[error("not implemented: {feature}")]
    NotImplemented {
        /// Description of the missing feature.
        feature: String,
    },

    /// Internal invariant violation.
    #[error("internal error: {message}")]
    Internal {
        /// Description of the broken invariant.
        message: String,
    },
}

// ========================================================================
// Convenience constructors
// ========================================================================

impl FvError {
    /// Configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Invalid input.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Value outside its range.
    pub fn out_of_range(field: &'static str, value: f64, min: f64, max: f64) -> Self {
        Self::OutOfRange {
            field,
            value,
            min,
            max,
        }
    }

    /// Array length mismatch.
    pub fn size_mismatch(name: &'static str, expected: usize, actual: usize) -> Self {
        Self::SizeMismatch {
            name,
            expected,
            actual,
        }
    }

    /// Index beyond the valid range.
    pub fn index_out_of_bounds(index_type: &'static str, index: usize, len: usize) -> Self {
        Self::IndexOutOfBounds {
            index_type,
            index,
            len,
        }
    }

    /// Validation failure.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Feature not implemented.
    pub fn not_implemented(feature: impl Into<String>) -> Self {
        Self::NotImplemented {
            feature: feature.into(),
        }
    }

    /// Internal invariant violation.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

// ========================================================================
// Validation helpers
// ========================================================================

impl FvError {
    /// Check that an array length matches its expected size.
    #[inline]
    pub fn check_size(name: &'static str, expected: usize, actual: usize) -> FvResult<()> {
        if expected != actual {
            Err(Self::size_mismatch(name, expected, actual))
        } else {
            Ok(())
        }
    }

    /// Check that a value lies within a closed range.
    #[inline]
    pub fn check_range(field: &'static str, value: f64, min: f64, max: f64) -> FvResult<()> {
        if value < min || value > max {
            Err(Self::out_of_range(field, value, min, max))
        } else {
            Ok(())
        }
    }

    /// Check that an index is within bounds.
    #[inline]
    pub fn check_index(index_type: &'static str, index: usize, len: usize) -> FvResult<()> {
        if index >= len {
            Err(Self::index_out_of_bounds(index_type, index, len))
        } else {
            Ok(())
        }
    }
}

// ========================================================================
// Tests
// ========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = FvError::config("bad weight");
        assert!(err.to_string().contains("configuration error"));
    }

    #[test]
    fn test_size_mismatch_display() {
        let err = FvError::size_mismatch("da", 10, 5);
        assert!(err.to_string().contains("da"));
        assert!(err.to_string().contains("10"));
        assert!(err.to_string().contains("5"));
    }

    #[test]
    fn test_check_size() {
        assert!(FvError::check_size("x", 10, 10).is_ok());
        assert!(FvError::check_size("x", 10, 5).is_err());
    }

    #[test]
    fn test_check_range() {
        assert!(FvError::check_range("weight", 0.5, 0.0, 1.0).is_ok());
        assert!(FvError::check_range("weight", -0.1, 0.0, 1.0).is_err());
        assert!(FvError::check_range("weight", 1.1, 0.0, 1.0).is_err());
    }

    #[test]
    fn test_check_index() {
        assert!(FvError::check_index("row", 5, 10).is_ok());
        assert!(FvError::check_index("row", 10, 10).is_err());
    }

    #[test]
    fn test_ensure_macro() {
        fn check(value: i32) -> FvResult<()> {
            crate::ensure!(value > 0, FvError::invalid_input("value must be positive"));
            Ok(())
        }

        assert!(check(1).is_ok());
        assert!(check(-1).is_err());
    }

    #[test]
    fn test_require_macro() {
        fn get(opt: Option<i32>) -> FvResult<i32> {
            let v = crate::require!(opt, FvError::validation("missing value"));
            Ok(v)
        }

        assert_eq!(get(Some(42)).unwrap(), 42);
        assert!(get(None).is_err());
    }
}
