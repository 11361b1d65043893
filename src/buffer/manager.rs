//! Waiting front end for the buffer pool.
//!
//! [`BufferPoolManager`] never blocks: an exhausted pool is reported
//! immediately. [`BufferManager`] is the retry policy client code usually
//! wants instead. A pin that finds no free frame sleeps until the pool
//! reports a released frame, and gives up with [`Error::BufferAbort`] once
//! `max_wait` has passed. Releases count whether they come through this
//! manager, the pool, a guard or the log.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::buffer::{Buffer, BufferPoolManager};
use crate::common::{BlockId, Error, Result, TxNum};
use crate::storage::page::PageFormatter;

pub struct BufferManager {
    pool: Arc<BufferPoolManager>,
    max_wait: Duration,
}

impl BufferManager {
    pub fn new(pool: Arc<BufferPoolManager>, max_wait: Duration) -> Self {
        Self { pool, max_wait }
    }

    /// Pin `block`, waiting up to `max_wait` for a frame.
    pub fn pin(&self, block: &BlockId) -> Result<Arc<Buffer>> {
        self.pin_with(|| self.pool.pin(block), || block.to_string())
    }

    /// Append a block to `file_name` and pin it, waiting up to `max_wait`.
    pub fn pin_new(&self, file_name: &str, formatter: &dyn PageFormatter) -> Result<Arc<Buffer>> {
        self.pin_with(
            || self.pool.pin_new(file_name, formatter),
            || format!("new block of {}", file_name),
        )
    }

    /// Release a pin. The pool wakes anyone waiting for a frame.
    pub fn unpin(&self, buffer: &Buffer) {
        self.pool.unpin(buffer);
    }

    pub fn flush_all(&self, txn: TxNum) -> Result<()> {
        self.pool.flush_all(txn)
    }

    pub fn available(&self) -> usize {
        self.pool.available()
    }

    pub fn pool(&self) -> &Arc<BufferPoolManager> {
        &self.pool
    }

    pub fn max_wait(&self) -> Duration {
        self.max_wait
    }

    fn pin_with(
        &self,
        attempt: impl Fn() -> Result<Arc<Buffer>>,
        describe: impl FnOnce() -> String,
    ) -> Result<Arc<Buffer>> {
        let start = Instant::now();
        let deadline = start + self.max_wait;

        loop {
            let seen = self.pool.release_count();
            match attempt() {
                Err(Error::PoolExhausted) => {}
                other => return other,
            }

            if Instant::now() >= deadline || !self.pool.wait_for_release(seen, deadline) {
                let block = describe();
                let waited = start.elapsed();
                warn!(%block, ?waited, "gave up waiting for a buffer");
                return Err(Error::BufferAbort { block, waited });
            }
            debug!("frame released, retrying pin");
        }
    }
}
