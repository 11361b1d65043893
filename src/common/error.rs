//! Error types for walpool.

use std::time::Duration;

use thiserror::Error;

use crate::common::BlockId;

/// Convenient Result type alias.
pub type Result<T> = std::result::Result<T, Error>;

/// All possible errors in walpool.
///
/// A single error type keeps propagation uniform between the file layer,
/// the buffer pool and the log manager.
#[derive(Debug, Error)]
pub enum Error {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    /// I/O error from the file layer, passed through unchanged.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Requested block lies past the end of its file.
    #[error("{0} not found")]
    BlockNotFound(BlockId),

    // -------------------------------------------------------------------------
    // Buffer Pool Errors
    // -------------------------------------------------------------------------
    /// Every frame is pinned and none may be reused.
    ///
    /// This is a normal condition: the caller decides whether to retry or
    /// abort its transaction.
    #[error("No free frames available in buffer pool")]
    PoolExhausted,

    /// A waiting pin request gave up.
    #[error("Gave up waiting {waited:?} for a frame to hold {block}")]
    BufferAbort { block: String, waited: Duration },

    // -------------------------------------------------------------------------
    // Page / Record Errors
    // -------------------------------------------------------------------------
    /// Typed access outside the page.
    #[error("Access of {len} bytes at offset {offset} is outside the page")]
    OutOfBounds { offset: usize, len: usize },

    /// Bytes on the page cannot be decoded.
    #[error("Corrupted data: {0}")]
    Corrupted(String),

    /// A log record was read past its last field.
    #[error("Log record exhausted: read at {pos} but record ends at {end}")]
    RecordExhausted { pos: usize, end: usize },

    /// A log record that can never fit in a single block.
    #[error("Log record of {size} bytes exceeds the {max} bytes available in a block")]
    RecordTooLarge { size: usize, max: usize },

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Whether the caller may retry the operation later.
    ///
    /// Only frame shortages are transient; everything else reflects the
    /// state of the disk or a misuse of the API.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::PoolExhausted | Error::BufferAbort { .. })
    }
}
