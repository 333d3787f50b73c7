//! Key list partitioning.

use super::SyncError;

/// Split `items` into chunks of `size`, preserving order. All chunks have
/// exactly `size` items except possibly the last; concatenating them
/// reproduces the input. A zero chunk size is a configuration error, never
/// a silent no-op.
pub fn chunk<T: Clone>(items: &[T], size: usize) -> Result<Vec<Vec<T>>, SyncError> {
    if size == 0 {
        return Err(SyncError::InvalidChunkSize);
    }
    Ok(items.chunks(size).map(|c| c.to_vec()).collect())
}
