// crates/fv_matrix/src/block.rs

//! Diagonal block-size descriptor and small dense block products.
//!
//! A [`BlockSize`] describes the layout of block-coupled systems (e.g. a
//! 3-component velocity coupled per cell): the logical block extent plus the
//! padded strides used to address vectors and per-row dense blocks. Scalar
//! matrices use the degenerate `{1,1,1,1}` descriptor so the same stride
//! arithmetic covers both cases.

/// Diagonal block-size descriptor.
///
/// Fields, in storage order:
/// - `extent`: useful block size (number of coupled components)
/// - `vec_stride`: vector block extent (padding included)
/// - `row_stride`: dense-block row extent
/// - `block_stride`: dense-block extent (row * column, padding included)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockSize {
    /// Useful block size.
    pub extent: usize,
    /// Vector block stride.
    pub vec_stride: usize,
    /// Dense-block row stride.
    pub row_stride: usize,
    /// Dense-block stride.
    pub block_stride: usize,
}

impl BlockSize {
    /// Scalar (unblocked) descriptor.
    pub const SCALAR: Self = Self {
        extent: 1,
        vec_stride: 1,
        row_stride: 1,
        block_stride: 1,
    };

    /// Fixed 3x3 block descriptor (3-component coupled systems).
    pub const fn fixed3() -> Self {
        Self {
            extent: 3,
            vec_stride: 3,
            row_stride: 3,
            block_stride: 9,
        }
    }

    /// Unpadded descriptor for an arbitrary extent.
    pub const fn from_extent(extent: usize) -> Self {
        Self {
            extent,
            vec_stride: extent,
            row_stride: extent,
            block_stride: extent * extent,
        }
    }

    /// Whether this is the degenerate scalar descriptor.
    #[inline]
    pub fn is_scalar(&self) -> bool {
        self.block_stride == 1
    }
}

impl Default for BlockSize {
    fn default() -> Self {
        Self::SCALAR
    }
}

/// y = B.x for one dense block, generic extent.
///
/// `blk` addresses a single row-major dense block through `row_stride`;
/// `x` and `y` are the block slices of the vectors.
#[inline]
pub(crate) fn dense_mv(b: &BlockSize, blk: &[f64], x: &[f64], y: &mut [f64]) {
    for k in 0..b.extent {
        let mut s = 0.0;
        for l in 0..b.extent {
            s += blk[k * b.row_stride + l] * x[l];
        }
        y[k] = s;
    }
}

/// y = B.x for one dense 3x3 block.
///
/// Accumulation order matches [`dense_mv`] with extent 3 so both paths
/// produce identical results.
#[inline]
pub(crate) fn dense_mv_3(blk: &[f64], x: &[f64], y: &mut [f64]) {
    let mut s0 = 0.0;
    s0 += blk[0] * x[0];
    s0 += blk[1] * x[1];
    s0 += blk[2] * x[2];
    let mut s1 = 0.0;
    s1 += blk[3] * x[0];
    s1 += blk[4] * x[1];
    s1 += blk[5] * x[2];
    let mut s2 = 0.0;
    s2 += blk[6] * x[0];
    s2 += blk[7] * x[1];
    s2 += blk[8] * x[2];
    y[0] = s0;
    y[1] = s1;
    y[2] = s2;
}
