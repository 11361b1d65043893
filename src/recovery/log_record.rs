//! Log record values and the read cursor handed out by the log iterator.

use std::fmt;

use crate::common::config::{str_size, INT_SIZE};
use crate::common::{BlockId, Error, Result};
use crate::storage::page::{read_int, read_string};

/// One field of a log record.
///
/// The log has no schema: a record is whatever sequence of values the
/// caller appended, and the reader must know that sequence to decode it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogValue {
    Int(i32),
    Str(String),
}

impl LogValue {
    /// Bytes this value occupies on the log page.
    pub fn encoded_size(&self) -> usize {
        match self {
            LogValue::Int(_) => INT_SIZE,
            LogValue::Str(s) => str_size(s.len()),
        }
    }
}

impl From<i32> for LogValue {
    fn from(value: i32) -> Self {
        LogValue::Int(value)
    }
}

impl From<String> for LogValue {
    fn from(value: String) -> Self {
        LogValue::Str(value)
    }
}

impl From<&str> for LogValue {
    fn from(value: &str) -> Self {
        LogValue::Str(value.to_owned())
    }
}

impl fmt::Display for LogValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogValue::Int(v) => write!(f, "{}", v),
            LogValue::Str(s) => write!(f, "{:?}", s),
        }
    }
}

/// A log record read back from the log.
///
/// Holds a copy of the record's bytes, so it stays valid after the
/// iterator has moved on and unpinned the block. Fields are read in the
/// order they were appended.
#[derive(Debug, Clone)]
pub struct LogRecord {
    block: BlockId,
    offset: usize,
    bytes: Vec<u8>,
    pos: usize,
}

impl LogRecord {
    pub(crate) fn new(block: BlockId, offset: usize, bytes: Vec<u8>) -> Self {
        Self {
            block,
            offset,
            bytes,
            pos: 0,
        }
    }

    /// The log block holding this record.
    pub fn block(&self) -> &BlockId {
        &self.block
    }

    /// Byte offset of the record's first field within its block.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Size of the record's fields, excluding the trailing back-pointer.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Bytes not read yet.
    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    pub fn next_int(&mut self) -> Result<i32> {
        self.ensure(INT_SIZE)?;
        let value = read_int(&self.bytes, self.pos)?;
        self.pos += INT_SIZE;
        Ok(value)
    }

    pub fn next_string(&mut self) -> Result<String> {
        self.ensure(INT_SIZE)?;
        let value = read_string(&self.bytes, self.pos).map_err(|e| match e {
            Error::OutOfBounds { .. } => Error::RecordExhausted {
                pos: self.pos,
                end: self.bytes.len(),
            },
            other => other,
        })?;
        self.pos += str_size(value.len());
        Ok(value)
    }

    fn ensure(&self, len: usize) -> Result<()> {
        if self.remaining() < len {
            return Err(Error::RecordExhausted {
                pos: self.pos,
                end: self.bytes.len(),
            });
        }
        Ok(())
    }
}
