//! Log Manager - append-only record log on top of the buffer pool.
//!
//! The log has no private I/O path: its tail block is an ordinary pinned
//! buffer, and reading it back goes through the same pool.
//!
//! # Block layout
//! ```text
//! 0        4                                              BLOCK_SIZE
//! ┌────────┬──────────────┬────┬──────────────┬────┬───────────┐
//! │LAST_POS│ rec1 values  │ bp │ rec2 values  │ bp │   free    │
//! └────────┴──────────────┴────┴──────────────┴────┴───────────┘
//! ```
//! `LAST_POS` holds the offset of the newest back-pointer (`bp`); each
//! back-pointer holds the offset of the one before it, 0 for the first
//! record of the block.
//!
//! # LSNs
//! A record's LSN is the number of the block it was written to, so every
//! record in a block shares one LSN. Forcing the log through an LSN at or
//! past the tail therefore means forcing the tail block.

use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use tracing::{debug, trace, warn};

use crate::buffer::{Buffer, BufferPoolManager, WalFlush};
use crate::common::config::{BLOCK_SIZE, INT_SIZE};
use crate::common::{BlockId, Error, FrameId, Lsn, Result, NO_LSN};
use crate::recovery::log_iterator::read_pointer;
use crate::recovery::{LogIterator, LogValue, LAST_POS};
use crate::storage::page::{Page, PageFormatter};

/// Largest record (fields plus back-pointer) a block can hold.
pub const MAX_RECORD_SIZE: usize = BLOCK_SIZE - INT_SIZE;

/// Formats a fresh log block: zeroed, with an empty record chain.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogFormatter;

impl PageFormatter for LogFormatter {
    fn format(&self, page: &mut Page) -> Result<()> {
        page.reset();
        page.set_int(LAST_POS, 0)
    }
}

/// The append target.
struct LogTail {
    /// Pinned for as long as it is the tail.
    buffer: Arc<Buffer>,
    block: BlockId,
    /// Next free byte in the tail block.
    pos: usize,
}

impl LogTail {
    fn lsn(&self) -> Lsn {
        Lsn::from(self.block.number())
    }
}

/// Appends records to the log file and reads them back newest first.
///
/// # Locking
/// `append` and `iterator` serialize on an append lock. The tail itself
/// sits behind a separate `RwLock`, which is all that [`LogManager::flush`]
/// takes; the pool calls `flush` while holding its own lock, so `flush`
/// must never wait on an append in progress.
pub struct LogManager {
    pool: Arc<BufferPoolManager>,
    log_file: String,
    append_lock: Mutex<()>,
    tail: RwLock<LogTail>,
}

impl LogManager {
    /// Open the log in `log_file`, creating its first block if the file is
    /// empty, and register it as the pool's write-ahead hook.
    pub fn new(pool: Arc<BufferPoolManager>, log_file: impl Into<String>) -> Result<Arc<Self>> {
        let log_file = log_file.into();
        let size = pool.file_manager().size(&log_file)?;

        let tail = if size == 0 {
            let tail = Self::new_tail(&pool, &log_file)?;
            debug!(file = %log_file, "created log");
            tail
        } else {
            let block = BlockId::new(log_file.clone(), size - 1);
            let buffer = pool.pin(&block)?;
            let pos = match read_pointer(&buffer, LAST_POS) {
                Ok(last) => last + INT_SIZE,
                Err(e) => {
                    pool.unpin(&buffer);
                    return Err(e);
                }
            };
            debug!(%block, pos, "resumed log");
            LogTail { buffer, block, pos }
        };

        let log = Arc::new(Self {
            pool,
            log_file,
            append_lock: Mutex::new(()),
            tail: RwLock::new(tail),
        });
        let hook: Weak<LogManager> = Arc::downgrade(&log);
        log.pool.attach_log(hook);
        Ok(log)
    }

    /// Append a record and return its LSN.
    ///
    /// A record that does not fit in the rest of the tail block starts a new
    /// block. Either the whole record is written or nothing is.
    pub fn append(&self, values: &[LogValue]) -> Result<Lsn> {
        let size = values.iter().map(LogValue::encoded_size).sum::<usize>() + INT_SIZE;
        if size > MAX_RECORD_SIZE {
            return Err(Error::RecordTooLarge {
                size,
                max: MAX_RECORD_SIZE,
            });
        }

        let _append = self.append_lock.lock();

        if self.tail.read().pos + size > BLOCK_SIZE {
            self.roll_over()?;
        }

        let mut tail = self.tail.write();
        let lsn = tail.lsn();
        let buffer = Arc::clone(&tail.buffer);

        let mut pos = tail.pos;
        for value in values {
            match value {
                LogValue::Int(v) => buffer.set_int(pos, *v, lsn, NO_LSN)?,
                LogValue::Str(s) => buffer.set_string(pos, s, lsn, NO_LSN)?,
            }
            pos += value.encoded_size();
        }

        let previous = buffer.get_int(LAST_POS)?;
        buffer.set_int(pos, previous, lsn, NO_LSN)?;
        buffer.set_int(LAST_POS, pos as i32, lsn, NO_LSN)?;
        tail.pos = pos + INT_SIZE;

        trace!(lsn, offset = pos, size, "appended log record");
        Ok(lsn)
    }

    /// Make the log durable through `lsn`.
    ///
    /// LSNs of earlier blocks were forced when the log moved past them, so
    /// only an LSN at or past the tail needs a write.
    pub fn flush(&self, lsn: Lsn) -> Result<()> {
        let tail = self.tail.read();
        if lsn >= tail.lsn() && tail.buffer.flush(None)? {
            trace!(lsn, block = %tail.block, "forced log tail");
        }
        Ok(())
    }

    /// Iterate over every record, newest first.
    ///
    /// Forces the tail first, so everything returned is on disk.
    pub fn iterator(&self) -> Result<LogIterator<'_>> {
        let _append = self.append_lock.lock();
        let block = {
            let tail = self.tail.read();
            tail.buffer.flush(None)?;
            tail.block.clone()
        };
        LogIterator::new(&self.pool, block)
    }

    /// LSN the next record would get if it fits in the tail block.
    pub fn current_lsn(&self) -> Lsn {
        self.tail.read().lsn()
    }

    pub fn log_file(&self) -> &str {
        &self.log_file
    }

    /// Describe the tail buffer and its used bytes.
    pub fn tail_summary(&self) -> Result<TailSummary> {
        let tail = self.tail.read();
        let summary = TailSummary {
            block: tail.block.clone(),
            frame: tail.buffer.id(),
            pin_count: tail.buffer.pin_count(),
            dirty: tail.buffer.is_dirty(),
            last_record: read_pointer(&tail.buffer, LAST_POS)?,
            next_pos: tail.pos,
            contents: tail.buffer.copy_bytes(0, tail.pos)?,
        };
        debug!(%summary, "log tail");
        Ok(summary)
    }

    /// Force the tail, then move it to a freshly appended block.
    ///
    /// The new block is pinned before the old one is released, so a failure
    /// leaves the current tail in place.
    fn roll_over(&self) -> Result<()> {
        self.flush(self.current_lsn())?;

        let next = Self::new_tail(&self.pool, &self.log_file)?;
        let block = next.block.clone();
        let old = std::mem::replace(&mut *self.tail.write(), next);
        self.pool.unpin(&old.buffer);

        debug!(from = %old.block, to = %block, "log rolled over");
        Ok(())
    }

    fn new_tail(pool: &BufferPoolManager, log_file: &str) -> Result<LogTail> {
        let buffer = pool.pin_new(log_file, &LogFormatter)?;
        match buffer.block() {
            Some(block) => Ok(LogTail {
                buffer,
                block,
                pos: INT_SIZE,
            }),
            None => {
                pool.unpin(&buffer);
                Err(Error::Corrupted(format!("new log block of {} is unbound", log_file)))
            }
        }
    }
}

impl WalFlush for LogManager {
    fn flush_through(&self, lsn: Lsn) -> Result<()> {
        self.flush(lsn)
    }
}

impl Drop for LogManager {
    fn drop(&mut self) {
        let tail = self.tail.get_mut();
        if let Err(e) = tail.buffer.flush(None) {
            warn!(block = %tail.block, error = %e, "failed to force log tail on close");
        }
        self.pool.unpin(&tail.buffer);
    }
}

/// Snapshot of the log tail, for debugging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TailSummary {
    pub block: BlockId,
    pub frame: FrameId,
    pub pin_count: u32,
    pub dirty: bool,
    /// Offset of the newest back-pointer, 0 if the block has no records.
    pub last_record: usize,
    pub next_pos: usize,
    /// Bytes `0..next_pos` of the tail block.
    pub contents: Vec<u8>,
}

impl fmt::Display for TailSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} in {} (pins: {}, dirty: {}, last record: {}, next: {}, {} bytes used)",
            self.block,
            self.frame,
            self.pin_count,
            self.dirty,
            self.last_record,
            self.next_pos,
            self.contents.len()
        )
    }
}
