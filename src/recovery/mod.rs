//! Write-ahead logging.
//!
//! This module contains:
//! - [`LogManager`] - Appends records to the log file through the buffer pool
//! - [`LogIterator`] - Reads the log back, newest record first
//! - [`LogRecord`] / [`LogValue`] - Record fields, as read and as written

mod log_iterator;
mod log_manager;
mod log_record;

pub use log_iterator::LogIterator;
pub use log_manager::{LogFormatter, LogManager, TailSummary, MAX_RECORD_SIZE};
pub use log_record::{LogRecord, LogValue};

/// Offset of the int holding the newest back-pointer in each log block.
pub const LAST_POS: usize = 0;
