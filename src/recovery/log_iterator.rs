//! Backward traversal of the log.
//!
//! Records inside a block are chained through their trailing back-pointers,
//! and the first int of each block points at the last back-pointer written
//! there:
//!
//! ```text
//! block n:  [LAST_POS=p2][ rec1 ][bp=0][ rec2 ][bp=p1]...
//!                                  ^p1           ^p2
//! ```
//!
//! Walking from `LAST_POS` down the chain yields the block's records newest
//! first; a back-pointer of 0 means the block is done and the walk moves to
//! block `n - 1`.

use tracing::trace;

use crate::buffer::{Buffer, BufferGuard, BufferPoolManager};
use crate::common::config::{BLOCK_SIZE, INT_SIZE};
use crate::common::{BlockId, Error, Result};
use crate::recovery::{LogRecord, LAST_POS};

/// Iterates over log records from the newest to the oldest.
///
/// Holds a pin on exactly one log block at a time. Moving to an earlier
/// block releases the current pin before taking the next one, and dropping
/// the iterator releases whatever it holds.
pub struct LogIterator<'a> {
    pool: &'a BufferPoolManager,
    guard: Option<BufferGuard<'a>>,
    block: BlockId,
    /// Back-pointer position of the next record to yield, or 0 when the
    /// current block has no records left.
    current_rec: usize,
    failed: bool,
}

impl<'a> LogIterator<'a> {
    /// Start just after the last record of `block`.
    pub(crate) fn new(pool: &'a BufferPoolManager, block: BlockId) -> Result<Self> {
        let guard = pool.fetch(&block)?;
        let current_rec = read_pointer(&guard, LAST_POS)?;
        Ok(Self {
            pool,
            guard: Some(guard),
            block,
            current_rec,
            failed: false,
        })
    }

    /// Whether earlier records may remain.
    ///
    /// May report `true` for a log whose earlier blocks hold no records;
    /// `next()` then returns `None`.
    pub fn has_next(&self) -> bool {
        !self.failed && (self.current_rec > 0 || self.block.number() > 0)
    }

    /// The block the iterator is positioned in.
    pub fn block(&self) -> &BlockId {
        &self.block
    }

    fn next_record(&mut self) -> Result<Option<LogRecord>> {
        while self.current_rec == 0 {
            match self.block.previous() {
                Some(previous) => self.move_to(previous)?,
                None => return Ok(None),
            }
        }

        let guard = self
            .guard
            .as_ref()
            .ok_or_else(|| Error::Corrupted(format!("log iterator holds no pin on {}", self.block)))?;

        let end = self.current_rec;
        let previous = read_pointer(guard, end)?;
        if previous + INT_SIZE > end {
            return Err(Error::Corrupted(format!(
                "back-pointer {} at {} in {} does not point backwards",
                previous, end, self.block
            )));
        }

        let start = previous + INT_SIZE;
        let bytes = guard.copy_bytes(start, end - start)?;
        self.current_rec = previous;

        Ok(Some(LogRecord::new(self.block.clone(), start, bytes)))
    }

    fn move_to(&mut self, block: BlockId) -> Result<()> {
        // Release before pinning, so iterating needs at most one extra frame
        self.guard = None;
        let guard = self.pool.fetch(&block)?;
        self.current_rec = read_pointer(&guard, LAST_POS)?;
        trace!(%block, last_record = self.current_rec, "log iterator moved to block");
        self.block = block;
        self.guard = Some(guard);
        Ok(())
    }
}

impl Iterator for LogIterator<'_> {
    type Item = Result<LogRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.next_record() {
            Ok(record) => record.map(Ok),
            Err(e) => {
                self.failed = true;
                self.guard = None;
                Some(Err(e))
            }
        }
    }
}

/// Read a back-pointer and check that it lands inside the block.
pub(crate) fn read_pointer(buffer: &Buffer, offset: usize) -> Result<usize> {
    let raw = buffer.get_int(offset)?;
    usize::try_from(raw)
        .ok()
        .filter(|&pos| pos + INT_SIZE <= BLOCK_SIZE)
        .ok_or_else(|| Error::Corrupted(format!("invalid log pointer {} at offset {}", raw, offset)))
}
