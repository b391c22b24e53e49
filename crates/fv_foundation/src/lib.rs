// crates/fv_foundation/src/lib.rs

//! Foundation layer for the fvmat workspace.
//!
//! Zero-domain-knowledge base layer providing the abstractions shared by the
//! upper crates.
//!
//! # Modules
//!
//! - [`error`]: unified error type and validation helpers
//! - [`memory`]: cache-line-aligned contiguous buffers for SIMD-friendly kernels
//!
//! # Design principles
//!
//! 1. **Minimal dependencies**: only `thiserror`, `bytemuck` and `rayon`
//! 2. **Explicit errors**: every fallible operation returns [`FvResult`]
//! 3. **Zero-overhead abstraction**: release builds compile down to the raw loops

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod memory;

pub use error::{FvError, FvResult};
pub use memory::AlignedVec;

/// Return early with an error if a condition does not hold.
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $err:expr) => {
        if !($cond) {
            return Err($err.into());
        }
    };
}

/// Unwrap an `Option`, returning early with an error when it is `None`.
#[macro_export]
macro_rules! require {
    ($opt:expr, $err:expr) => {
        match $opt {
            Some(v) => v,
            None => return Err($err.into()),
        }
    };
}

/// Prelude with the commonly used types.
pub mod prelude {
    pub use crate::error::{FvError, FvResult};
    pub use crate::memory::AlignedVec;
    pub use crate::{ensure, require};
}
