//! Buffer Pool Manager - the block caching layer.
//!
//! The [`BufferPoolManager`] provides:
//! - A fixed budget of frames, allocated lazily
//! - Pin-based reference counting
//! - LRU-2 victim selection among unpinned frames
//! - Transaction-scoped flushing that honors the write-ahead rule

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::time::Instant;

use parking_lot::{Condvar, Mutex, RwLock};
use tracing::{debug, trace, warn};

use crate::buffer::replacer::LruKReplacer;
use crate::buffer::{Buffer, BufferGuard, BufferPoolStats, WalFlush};
use crate::common::{BlockId, Error, FrameId, Lsn, Result, TxNum};
use crate::storage::page::PageFormatter;
use crate::storage::FileManager;

/// Manages a pool of buffer frames for caching disk blocks.
///
/// # Architecture
/// ```text
/// ┌─────────────────────────────────────────────────────────────┐
/// │                    BufferPoolManager                        │
/// │  ┌──────────────┐  ┌───────────────────────────────────┐   │
/// │  │ block_table  │  │   frames: Vec<Arc<Buffer>>        │   │
/// │  │BlockId → Fid │─▶│  [Frame0] [Frame1] ... (≤ cap)    │   │
/// │  └──────────────┘  └───────────────────────────────────┘   │
/// │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐      │
/// │  │  free_list   │  │   replacer   │  │ file_manager │      │
/// │  │ Vec<FrameId> │  │ LruKReplacer │  │ dyn trait    │      │
/// │  └──────────────┘  └──────────────┘  └──────────────┘      │
/// └─────────────────────────────────────────────────────────────┘
/// ```
///
/// # Thread Safety
/// `pin`, `pin_new`, `unpin`, `flush_all` and the mapping lookups all run
/// under one pool-wide `Mutex`, so victim selection sees a consistent view
/// of pin counts and access times. `available()` reads an atomic and is
/// advisory only.
///
/// # Availability
/// `available` starts at the capacity and counts frames that are not
/// pinned, including frames not allocated yet. Every unpin that frees a
/// frame bumps a release counter and signals a condvar; the pool itself
/// never waits on it, [`BufferManager`](crate::buffer::BufferManager) does.
pub struct BufferPoolManager {
    /// Everything victim selection must observe atomically.
    state: Mutex<PoolState>,

    /// Unpinned-frame credit.
    available: AtomicUsize,

    /// Maximum number of frames.
    capacity: usize,

    replacer: LruKReplacer,

    file_manager: Arc<dyn FileManager>,

    /// Log used to honor the write-ahead rule when flushing.
    wal: RwLock<Option<Weak<dyn WalFlush>>>,

    stats: BufferPoolStats,

    /// Count of unpins that left a frame unpinned.
    releases: Mutex<u64>,
    frame_released: Condvar,
}

struct PoolState {
    /// Frames allocated so far, indexed by `FrameId`.
    frames: Vec<Arc<Buffer>>,

    /// Resident blocks. Mapped frames may be unpinned.
    block_table: HashMap<BlockId, FrameId>,

    /// Allocated frames that hold no block (a bind failed).
    free_list: Vec<FrameId>,

    /// Logical clock for access timestamps.
    clock: u64,
}

impl PoolState {
    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }
}

/// Diagnostic view of one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameInfo {
    pub frame_id: FrameId,
    pub block: Option<BlockId>,
    pub pin_count: u32,
    pub modified_by: TxNum,
    pub lsn: Lsn,
}

impl BufferPoolManager {
    /// Create a pool of up to `capacity` frames over `file_manager`.
    ///
    /// # Panics
    /// Panics if `capacity` is 0.
    pub fn new(capacity: usize, file_manager: Arc<dyn FileManager>) -> Self {
        assert!(capacity > 0, "capacity must be > 0");

        Self {
            state: Mutex::new(PoolState {
                frames: Vec::with_capacity(capacity),
                block_table: HashMap::new(),
                free_list: Vec::new(),
                clock: 0,
            }),
            available: AtomicUsize::new(capacity),
            capacity,
            replacer: LruKReplacer::new(),
            file_manager,
            wal: RwLock::new(None),
            stats: BufferPoolStats::new(),
            releases: Mutex::new(0),
            frame_released: Condvar::new(),
        }
    }

    /// Register the log that dirty frames must flush through first.
    pub fn attach_log(&self, wal: Weak<dyn WalFlush>) {
        *self.wal.write() = Some(wal);
    }

    fn wal(&self) -> Option<Arc<dyn WalFlush>> {
        self.wal.read().as_ref().and_then(Weak::upgrade)
    }

    // ========================================================================
    // Public API: Pin and unpin
    // ========================================================================

    /// Pin a buffer to `block`, loading the block if it is not resident.
    ///
    /// # Errors
    /// - `Error::PoolExhausted` if every frame is pinned (recoverable)
    /// - `Error::BlockNotFound` / I/O errors from the file layer
    pub fn pin(&self, block: &BlockId) -> Result<Arc<Buffer>> {
        let mut state = self.state.lock();

        let buffer = match state.block_table.get(block) {
            Some(&frame_id) => {
                BufferPoolStats::bump(&self.stats.cache_hits);
                Arc::clone(&state.frames[frame_id.index()])
            }
            None => {
                BufferPoolStats::bump(&self.stats.cache_misses);
                let buffer = self.acquire_frame(&mut state)?;
                if let Err(e) = buffer.assign_to_block(block.clone()) {
                    state.free_list.push(buffer.id());
                    return Err(e);
                }
                BufferPoolStats::bump(&self.stats.blocks_read);
                buffer
            }
        };

        if !buffer.is_pinned() {
            self.available.fetch_sub(1, Ordering::Relaxed);
        }
        buffer.pin();
        state.block_table.insert(block.clone(), buffer.id());
        let now = state.tick();
        buffer.update_access_time(now);

        trace!(%block, frame = %buffer.id(), pins = buffer.pin_count(), "pinned");
        Ok(buffer)
    }

    /// Append a block to `file_name`, format it and pin a buffer to it.
    ///
    /// Nothing is appended if no frame is available.
    pub fn pin_new(&self, file_name: &str, formatter: &dyn PageFormatter) -> Result<Arc<Buffer>> {
        let mut state = self.state.lock();

        let buffer = self.acquire_frame(&mut state)?;
        let block = match buffer.assign_to_new(file_name, formatter) {
            Ok(block) => block,
            Err(e) => {
                state.free_list.push(buffer.id());
                return Err(e);
            }
        };

        self.available.fetch_sub(1, Ordering::Relaxed);
        buffer.pin();
        state.block_table.insert(block.clone(), buffer.id());
        let now = state.tick();
        buffer.update_access_time(now);

        trace!(%block, frame = %buffer.id(), "pinned new block");
        Ok(buffer)
    }

    /// Release one pin on `buffer`.
    ///
    /// Wakes threads waiting for a frame when the last pin goes, whichever
    /// path released it: a direct call, a dropped guard, the log or its
    /// iterator.
    ///
    /// # Panics
    /// Panics if the buffer is not pinned.
    pub fn unpin(&self, buffer: &Buffer) {
        let freed = {
            let _state = self.state.lock();
            let freed = buffer.unpin() == 0;
            if freed {
                self.available.fetch_add(1, Ordering::Relaxed);
            }
            freed
        };

        if freed {
            *self.releases.lock() += 1;
            self.frame_released.notify_all();
        }
    }

    /// Current value of the release counter.
    ///
    /// Read it before trying to pin, then pass it to
    /// [`wait_for_release`](Self::wait_for_release) so a release between
    /// the attempt and the wait is not lost.
    pub(crate) fn release_count(&self) -> u64 {
        *self.releases.lock()
    }

    /// Block until a frame is released after `seen`, or until `deadline`.
    ///
    /// Returns whether a release happened.
    pub(crate) fn wait_for_release(&self, seen: u64, deadline: Instant) -> bool {
        let mut releases = self.releases.lock();
        while *releases == seen {
            if self.frame_released.wait_until(&mut releases, deadline).timed_out() {
                return *releases != seen;
            }
        }
        true
    }

    /// Pin `block` and wrap the pin in a guard.
    pub fn fetch(&self, block: &BlockId) -> Result<BufferGuard<'_>> {
        let buffer = self.pin(block)?;
        Ok(BufferGuard::new(self, buffer))
    }

    /// Like [`pin_new`](Self::pin_new), returning a guard.
    pub fn fetch_new(&self, file_name: &str, formatter: &dyn PageFormatter) -> Result<BufferGuard<'_>> {
        let buffer = self.pin_new(file_name, formatter)?;
        Ok(BufferGuard::new(self, buffer))
    }

    // ========================================================================
    // Public API: Flush
    // ========================================================================

    /// Flush every resident buffer last modified by `txn`.
    ///
    /// Each write is preceded by a log flush through the buffer's LSN.
    /// The first failure is returned; a commit must not assume durability
    /// after an error.
    pub fn flush_all(&self, txn: TxNum) -> Result<()> {
        let state = self.state.lock();
        let wal = self.wal();

        for &frame_id in state.block_table.values() {
            let buffer = &state.frames[frame_id.index()];
            if buffer.is_modified_by(txn) && buffer.flush(wal.as_deref())? {
                BufferPoolStats::bump(&self.stats.blocks_written);
            }
        }

        debug!(txn, "flushed transaction buffers");
        Ok(())
    }

    /// Flush the buffer holding `block`, if it is resident and dirty.
    pub fn flush_block(&self, block: &BlockId) -> Result<()> {
        let state = self.state.lock();
        if let Some(&frame_id) = state.block_table.get(block) {
            if state.frames[frame_id.index()].flush(self.wal().as_deref())? {
                BufferPoolStats::bump(&self.stats.blocks_written);
            }
        }
        Ok(())
    }

    // ========================================================================
    // Public API: Lookups and info
    // ========================================================================

    /// Number of frames that are not pinned, allocated or not.
    pub fn available(&self) -> usize {
        self.available.load(Ordering::Relaxed)
    }

    /// Whether `block` is resident (pinned or not).
    pub fn contains_mapping(&self, block: &BlockId) -> bool {
        self.state.lock().block_table.contains_key(block)
    }

    /// The buffer holding `block`, if resident. Does not pin it.
    pub fn get_mapping(&self, block: &BlockId) -> Option<Arc<Buffer>> {
        let state = self.state.lock();
        state
            .block_table
            .get(block)
            .map(|&frame_id| Arc::clone(&state.frames[frame_id.index()]))
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Frames allocated so far.
    pub fn allocated_frames(&self) -> usize {
        self.state.lock().frames.len()
    }

    pub fn stats(&self) -> &BufferPoolStats {
        &self.stats
    }

    pub fn file_manager(&self) -> &Arc<dyn FileManager> {
        &self.file_manager
    }

    /// A snapshot of every allocated frame, in frame order.
    pub fn frame_states(&self) -> Vec<FrameInfo> {
        let state = self.state.lock();
        state
            .frames
            .iter()
            .map(|buffer| FrameInfo {
                frame_id: buffer.id(),
                block: buffer.block(),
                pin_count: buffer.pin_count(),
                modified_by: buffer.modifying_txn(),
                lsn: buffer.lsn(),
            })
            .collect()
    }

    // ========================================================================
    // Internal: Frame acquisition
    // ========================================================================

    /// Find a frame to bind: a spare one, a fresh one, or an LRU-2 victim.
    ///
    /// The returned frame is unpinned, clean and unmapped.
    fn acquire_frame(&self, state: &mut PoolState) -> Result<Arc<Buffer>> {
        if let Some(frame_id) = state.free_list.pop() {
            return Ok(Arc::clone(&state.frames[frame_id.index()]));
        }

        if state.frames.len() < self.capacity {
            let frame_id = FrameId::new(state.frames.len());
            let buffer = Arc::new(Buffer::new(frame_id, Arc::clone(&self.file_manager)));
            state.frames.push(Arc::clone(&buffer));
            debug!(frame = %frame_id, "allocated frame");
            return Ok(buffer);
        }

        let candidates = state.block_table.values().filter_map(|&frame_id| {
            let buffer = &state.frames[frame_id.index()];
            (!buffer.is_pinned()).then(|| (frame_id, buffer.access_history()))
        });

        let Some(frame_id) = self.replacer.select_victim(candidates) else {
            BufferPoolStats::bump(&self.stats.exhaustions);
            warn!(capacity = self.capacity, "buffer pool exhausted");
            return Err(Error::PoolExhausted);
        };

        let victim = Arc::clone(&state.frames[frame_id.index()]);

        // Flush before unmapping so a failed write leaves the block resident
        if victim.flush(self.wal().as_deref())? {
            BufferPoolStats::bump(&self.stats.blocks_written);
        }

        victim.reset_access_time();
        if let Some(old_block) = victim.block() {
            state.block_table.remove(&old_block);
            debug!(frame = %frame_id, evicted = %old_block, "evicted block");
        }
        BufferPoolStats::bump(&self.stats.evictions);

        Ok(victim)
    }
}
