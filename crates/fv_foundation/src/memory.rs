// crates/fv_foundation/src/memory.rs

//! Cache-line-aligned contiguous buffers.
//!
//! [`AlignedVec`] is a 64-byte-aligned heap buffer backed by `std::alloc`,
//! suitable for SIMD loads and for the scratch/result vectors of the sparse
//! kernels. Elements must be `Pod` so the buffer can be zero-initialized
//! without running constructors.

use bytemuck::Pod;
use rayon::prelude::*;
use std::alloc::{alloc_zeroed, dealloc, handle_alloc_error, Layout};
use std::ops::{Deref, DerefMut};

/// Byte alignment of every `AlignedVec` allocation (cache line / AVX-512).
pub const ALIGN: usize = 64;

/// 64-byte-aligned contiguous buffer.
#[derive(Debug)]
pub struct AlignedVec<T: Pod> {
    ptr: *mut T,
    len: usize,
}

// SAFETY: the buffer is uniquely owned and T is Pod.
unsafe impl<T: Pod + Send> Send for AlignedVec<T> {}
unsafe impl<T: Pod + Sync> Sync for AlignedVec<T> {}

impl<T: Pod> AlignedVec<T> {
    /// Create a zero-initialized buffer of length `len`.
    pub fn zeros(len: usize) -> Self {
        if len == 0 {
            return Self {
                ptr: std::ptr::null_mut(),
                len: 0,
            };
        }

        let layout = Self::layout_for(len);
        let ptr = unsafe { alloc_zeroed(layout) as *mut T };
        if ptr.is_null() {
            handle_alloc_error(layout);
        }

        debug_assert_eq!((ptr as usize) % layout.align(), 0);

        Self { ptr, len }
    }

    /// Create an aligned copy of a slice.
    pub fn from_slice(slice: &[T]) -> Self {
        let mut v = Self::zeros(slice.len());
        v.as_mut_slice().copy_from_slice(slice);
        v
    }

    /// Number of elements.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the buffer is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Raw pointer to the first element.
    #[inline]
    pub fn as_ptr(&self) -> *const T {
        self.ptr
    }

    /// Immutable slice view.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        if self.len == 0 {
            &[]
        } else {
            unsafe { std::slice::from_raw_parts(self.ptr, self.len) }
        }
    }

    /// Mutable slice view.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        if self.len == 0 {
            &mut []
        } else {
            unsafe { std::slice::from_raw_parts_mut(self.ptr, self.len) }
        }
    }

    /// Parallel fill.
    pub fn par_fill(&mut self, value: T)
    where
        T: Send + Sync,
    {
        self.as_mut_slice().par_iter_mut().for_each(|v| *v = value);
    }

    #[inline]
    fn layout_for(len: usize) -> Layout {
        Layout::from_size_align(
            len * std::mem::size_of::<T>(),
            ALIGN.max(std::mem::align_of::<T>()),
        )
        .expect("invalid layout")
    }
}

impl<T: Pod> Deref for AlignedVec<T> {
    type Target = [T];
    fn deref(&self) -> &Self::Target {
        self.as_slice()
    }
}

impl<T: Pod> DerefMut for AlignedVec<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.as_mut_slice()
    }
}

impl<T: Pod> Clone for AlignedVec<T> {
    fn clone(&self) -> Self {
        Self::from_slice(self.as_slice())
    }
}

impl<T: Pod> Default for AlignedVec<T> {
    fn default() -> Self {
        Self {
            ptr: std::ptr::null_mut(),
            len: 0,
        }
    }
}

impl<T: Pod> Drop for AlignedVec<T> {
    fn drop(&mut self) {
        if self.ptr.is_null() || self.len == 0 {
            return;
        }
        let layout = Self::layout_for(self.len);
        unsafe { dealloc(self.ptr as *mut u8, layout) };
    }
}

impl<T: Pod> FromIterator<T> for AlignedVec<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let vec: Vec<T> = iter.into_iter().collect();
        Self::from_slice(&vec)
    }
}
