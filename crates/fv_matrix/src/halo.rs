// crates/fv_matrix/src/halo.rs

//! Ghost-value exchange seam.
//!
//! The mesh layer owns halo construction and communication; this crate only
//! consumes the [`HaloExchange`] interface to refresh the ghost range of `x`
//! before the off-diagonal phase of a multiply reads it.

use crate::error::{MatrixError, MatrixResult};

/// Handling of rotational periodicity during a ghost-value sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationMode {
    /// Apply the periodicity rotation transforms to exchanged values.
    Apply,
    /// Reset rotation-affected ghost values to zero.
    Reset,
    /// Fail if the halo actually contains rotation transforms.
    Forbid,
}

/// Ghost-value exchange provider.
///
/// Implementations refresh `x[n_owned..]` from neighboring data. The blocked
/// variant synchronizes `stride` interleaved components per cell.
pub trait HaloExchange {
    /// Refresh scalar ghost values.
    fn sync_values(&self, rotation: RotationMode, x: &mut [f64]) -> MatrixResult<()>;

    /// Refresh blocked ghost values (`stride` components per cell).
    fn sync_values_blocked(
        &self,
        rotation: RotationMode,
        x: &mut [f64],
        stride: usize,
    ) -> MatrixResult<()>;

    /// Whether the halo carries rotational periodicity transforms.
    fn has_rotations(&self) -> bool {
        false
    }
}

/// Pure-translation periodic halo: each ghost cell mirrors an owned cell.
///
/// Covers single-process periodic meshes and tests; distributed halos live in
/// the mesh layer behind the same trait.
#[derive(Debug, Clone, Default)]
pub struct TranslationHalo {
    /// (source owned cell, destination ghost cell) pairs.
    pairs: Vec<(usize, usize)>,
}

impl TranslationHalo {
    /// Build from (owned source, ghost destination) index pairs.
    pub fn new(pairs: Vec<(usize, usize)>) -> Self {
        Self { pairs }
    }
}

impl HaloExchange for TranslationHalo {
    fn sync_values(&self, _rotation: RotationMode, x: &mut [f64]) -> MatrixResult<()> {
        // translation-only: every rotation mode is acceptable
        for &(src, dst) in &self.pairs {
            if src >= x.len() || dst >= x.len() {
                return Err(MatrixError::size_mismatch("x", dst + 1, x.len()));
            }
            x[dst] = x[src];
        }
        Ok(())
    }

    fn sync_values_blocked(
        &self,
        _rotation: RotationMode,
        x: &mut [f64],
        stride: usize,
    ) -> MatrixResult<()> {
        for &(src, dst) in &self.pairs {
            let (s, d) = (src * stride, dst * stride);
            if s + stride > x.len() || d + stride > x.len() {
                return Err(MatrixError::size_mismatch("x", d + stride, x.len()));
            }
            for k in 0..stride {
                x[d + k] = x[s + k];
            }
        }
        Ok(())
    }
}
