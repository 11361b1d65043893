//! Buffer - a frame of the buffer pool.
//!
//! A [`Buffer`] holds the contents of at most one block plus the metadata
//! the pool and the log need:
//! - Which block is loaded (if any)
//! - Pin count for reference counting
//! - Modifying transaction and LSN for write-ahead flushing
//! - The two most recent pin timestamps for LRU-2

use std::fmt;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::trace;

use crate::buffer::replacer::{AccessHistory, INFINITE};
use crate::common::{BlockId, Error, FrameId, Lsn, Result, TxNum, NO_LSN, NO_TXN};
use crate::storage::page::{Page, PageFormatter};
use crate::storage::FileManager;

/// Makes the log durable up to an LSN.
///
/// A dirty buffer calls this before writing its contents, which is what
/// enforces "log before data". The log manager implements it; the pool
/// holds it as a weak reference.
pub trait WalFlush: Send + Sync {
    fn flush_through(&self, lsn: Lsn) -> Result<()>;
}

/// Everything guarded by the frame's content lock.
struct FrameState {
    contents: Page,
    block: Option<BlockId>,
    modified_by: TxNum,
    lsn: Lsn,
}

/// A frame in the buffer pool.
///
/// Frames are created lazily by the pool and live as long as the pool.
/// Only the pool rebinds a frame to another block; everyone else works
/// through the typed accessors, which keep dirty/LSN bookkeeping right.
///
/// # Thread Safety
/// - contents, block, dirty state: `RwLock`
/// - `pin_count`: `AtomicU32`, changed only under the pool lock
/// - access timestamps: `AtomicU64`, changed only under the pool lock
pub struct Buffer {
    id: FrameId,
    file_manager: Arc<dyn FileManager>,
    state: RwLock<FrameState>,
    pin_count: AtomicU32,
    last_access: AtomicU64,
    second_last_access: AtomicU64,
}

impl Buffer {
    /// Create an unassigned frame.
    pub(crate) fn new(id: FrameId, file_manager: Arc<dyn FileManager>) -> Self {
        Self {
            id,
            file_manager,
            state: RwLock::new(FrameState {
                contents: Page::new(),
                block: None,
                modified_by: NO_TXN,
                lsn: NO_LSN,
            }),
            pin_count: AtomicU32::new(0),
            last_access: AtomicU64::new(INFINITE),
            second_last_access: AtomicU64::new(INFINITE),
        }
    }

    #[inline]
    pub fn id(&self) -> FrameId {
        self.id
    }

    /// The block currently held, or `None` for an unassigned frame.
    pub fn block(&self) -> Option<BlockId> {
        self.state.read().block.clone()
    }

    // ========================================================================
    // Typed access
    // ========================================================================

    pub fn get_int(&self, offset: usize) -> Result<i32> {
        self.state.read().contents.get_int(offset)
    }

    pub fn get_string(&self, offset: usize) -> Result<String> {
        self.state.read().contents.get_string(offset)
    }

    /// Write `value` at `offset` on behalf of `txn`.
    ///
    /// `lsn` is the log record covering this write. Pass [`NO_LSN`] for
    /// writes that must not be logged, such as the log's own bookkeeping.
    pub fn set_int(&self, offset: usize, value: i32, txn: TxNum, lsn: Lsn) -> Result<()> {
        let mut state = self.state.write();
        state.contents.set_int(offset, value)?;
        Self::mark_modified(&mut state, txn, lsn);
        Ok(())
    }

    /// Write `value` at `offset` on behalf of `txn`. See [`Buffer::set_int`].
    pub fn set_string(&self, offset: usize, value: &str, txn: TxNum, lsn: Lsn) -> Result<()> {
        let mut state = self.state.write();
        state.contents.set_string(offset, value)?;
        Self::mark_modified(&mut state, txn, lsn);
        Ok(())
    }

    fn mark_modified(state: &mut FrameState, txn: TxNum, lsn: Lsn) {
        state.modified_by = txn;
        if lsn >= 0 {
            state.lsn = state.lsn.max(lsn);
        }
    }

    /// Copy `len` bytes starting at `offset`.
    pub(crate) fn copy_bytes(&self, offset: usize, len: usize) -> Result<Vec<u8>> {
        let state = self.state.read();
        offset
            .checked_add(len)
            .and_then(|end| state.contents.as_slice().get(offset..end))
            .map(<[u8]>::to_vec)
            .ok_or(Error::OutOfBounds { offset, len })
    }

    // ========================================================================
    // Dirty / LSN state
    // ========================================================================

    /// Whether the last write applied to this frame came from `txn`.
    pub fn is_modified_by(&self, txn: TxNum) -> bool {
        self.state.read().modified_by == txn
    }

    /// Transaction of the last unflushed write, or [`NO_TXN`] if clean.
    pub fn modifying_txn(&self) -> TxNum {
        self.state.read().modified_by
    }

    /// Highest LSN covering the unflushed writes, or [`NO_LSN`].
    pub fn lsn(&self) -> Lsn {
        self.state.read().lsn
    }

    pub fn is_dirty(&self) -> bool {
        self.state.read().modified_by >= 0
    }

    // ========================================================================
    // Pin count operations (Atomic)
    // ========================================================================

    /// Increment the pin count. Returns the new pin count.
    #[inline]
    pub(crate) fn pin(&self) -> u32 {
        self.pin_count.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Decrement the pin count. Returns the new pin count.
    ///
    /// # Panics
    /// Panics if pin count is already 0.
    #[inline]
    pub(crate) fn unpin(&self) -> u32 {
        let old = self.pin_count.fetch_sub(1, Ordering::Relaxed);
        assert!(old > 0, "pin count underflow");
        old - 1
    }

    #[inline]
    pub fn pin_count(&self) -> u32 {
        self.pin_count.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn is_pinned(&self) -> bool {
        self.pin_count() > 0
    }

    // ========================================================================
    // Access history (LRU-2)
    // ========================================================================

    /// Record a pin at logical time `now`.
    pub(crate) fn update_access_time(&self, now: u64) {
        let last = self.last_access.swap(now, Ordering::Relaxed);
        self.second_last_access.store(last, Ordering::Relaxed);
    }

    /// Forget all recorded pins, so the frame restarts cold.
    pub(crate) fn reset_access_time(&self) {
        self.last_access.store(INFINITE, Ordering::Relaxed);
        self.second_last_access.store(INFINITE, Ordering::Relaxed);
    }

    pub fn access_history(&self) -> AccessHistory {
        AccessHistory {
            last: self.last_access.load(Ordering::Relaxed),
            second_last: self.second_last_access.load(Ordering::Relaxed),
        }
    }

    // ========================================================================
    // Binding and flushing
    // ========================================================================

    /// Load `block` from disk into this frame.
    ///
    /// The frame must be clean; the pool flushes victims before rebinding.
    pub(crate) fn assign_to_block(&self, block: BlockId) -> Result<()> {
        let mut state = self.state.write();
        state.block = None;
        self.file_manager.read(&block, &mut state.contents)?;
        state.block = Some(block);
        state.modified_by = NO_TXN;
        state.lsn = NO_LSN;
        Ok(())
    }

    /// Append a block to `file_name`, format it and bind this frame to it.
    pub(crate) fn assign_to_new(&self, file_name: &str, formatter: &dyn PageFormatter) -> Result<BlockId> {
        let mut state = self.state.write();
        state.block = None;
        let block = self.file_manager.append(file_name)?;
        formatter.format(&mut state.contents)?;
        self.file_manager.write(&block, &state.contents)?;
        state.block = Some(block.clone());
        state.modified_by = NO_TXN;
        state.lsn = NO_LSN;
        Ok(block)
    }

    /// Write the contents back to disk if the frame is dirty.
    ///
    /// When the dirty contents are covered by a log record, `wal` is asked
    /// to make the log durable through that LSN first. Returns whether a
    /// block was written.
    pub(crate) fn flush(&self, wal: Option<&dyn WalFlush>) -> Result<bool> {
        loop {
            let lsn = {
                let state = self.state.read();
                if state.modified_by < 0 {
                    return Ok(false);
                }
                state.lsn
            };

            if lsn >= 0 {
                match wal {
                    Some(wal) => wal.flush_through(lsn)?,
                    None => trace!(frame = %self.id, lsn, "no log attached, writing without WAL flush"),
                }
            }

            let mut state = self.state.write();
            if state.modified_by < 0 {
                return Ok(false);
            }
            // A newer logged write slipped in while the log was flushing
            if state.lsn > lsn {
                continue;
            }
            let block = state
                .block
                .clone()
                .ok_or_else(|| Error::Corrupted(format!("{} is dirty but holds no block", self.id)))?;
            self.file_manager.write(&block, &state.contents)?;
            state.modified_by = NO_TXN;
            state.lsn = NO_LSN;
            return Ok(true);
        }
    }
}

impl fmt::Debug for Buffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Buffer")
            .field("id", &self.id)
            .field("block", &self.block())
            .field("pin_count", &self.pin_count())
            .finish()
    }
}
