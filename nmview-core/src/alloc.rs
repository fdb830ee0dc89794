//! Fallible allocation for large result buffers.
//!
//! Propagation stacks and oversampled maps scale with user-chosen sizes, so
//! their buffers are reserved with `try_reserve_exact` and an exhausted
//! allocator is reported as [`Error::OutOfMemory`] instead of aborting.

use crate::error::{Error, Result};

/// Allocates a vector of `len` copies of `value`.
pub fn try_filled<T: Clone>(len: usize, value: T) -> Result<Vec<T>> {
    let bytes = len.saturating_mul(std::mem::size_of::<T>());
    let mut buffer = Vec::new();
    buffer
        .try_reserve_exact(len)
        .map_err(|_| Error::OutOfMemory { bytes })?;
    buffer.resize(len, value);
    Ok(buffer)
}
