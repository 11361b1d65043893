//! RAII guard for a pinned buffer.
//!
//! A [`BufferGuard`] owns one pin on a frame and gives it back to the pool
//! when dropped, on every exit path including `?` returns and panics.

use std::ops::Deref;
use std::sync::Arc;

use super::buffer_pool_manager::BufferPoolManager;
use super::frame::Buffer;

/// A pinned buffer that unpins itself on drop.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use walpool::buffer::BufferPoolManager;
/// use walpool::storage::{FileManager, MemoryFileManager};
///
/// let fm = Arc::new(MemoryFileManager::new());
/// let block = fm.append("t.tbl").unwrap();
/// let pool = BufferPoolManager::new(2, fm);
///
/// {
///     let guard = pool.fetch(&block).unwrap();
///     guard.set_int(0, 42, 1, -1).unwrap();
///     assert_eq!(pool.available(), 1);
/// } // unpinned here
/// assert_eq!(pool.available(), 2);
/// ```
pub struct BufferGuard<'a> {
    pool: &'a BufferPoolManager,
    buffer: Arc<Buffer>,
}

impl<'a> BufferGuard<'a> {
    /// Wrap a buffer the caller has already pinned once.
    pub(crate) fn new(pool: &'a BufferPoolManager, buffer: Arc<Buffer>) -> Self {
        Self { pool, buffer }
    }

    /// A shared handle to the frame. The pin still belongs to the guard.
    pub fn buffer(&self) -> &Arc<Buffer> {
        &self.buffer
    }
}

impl Deref for BufferGuard<'_> {
    type Target = Buffer;

    #[inline]
    fn deref(&self) -> &Buffer {
        &self.buffer
    }
}

impl Drop for BufferGuard<'_> {
    fn drop(&mut self) {
        self.pool.unpin(&self.buffer);
    }
}
