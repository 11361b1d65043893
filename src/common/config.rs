//! Configuration constants and engine configuration for walpool.

use std::path::PathBuf;
use std::time::Duration;

use crate::common::{Error, Result};

/// Size of a block in bytes (4KB).
///
/// Every file managed by the storage layer is a sequence of blocks of
/// exactly this size, and every buffer frame holds one block.
///
/// # Alignment
/// Pages are aligned to 4096 bytes for efficient Direct I/O (O_DIRECT).
pub const BLOCK_SIZE: usize = 4096;

/// Encoded width of an `int` value (big-endian `i32`).
pub const INT_SIZE: usize = 4;

/// Encoded width of a string whose UTF-8 form is `len` bytes long.
///
/// Strings are stored as a 4-byte length prefix followed by the bytes.
#[inline]
pub const fn str_size(len: usize) -> usize {
    INT_SIZE + len
}

/// Default number of frames in the buffer pool.
pub const DEFAULT_POOL_SIZE: usize = 8;

/// Default name of the write-ahead log file.
pub const DEFAULT_LOG_FILE: &str = "simpledb.log";

/// Default time a waiting pin request blocks before giving up.
pub const DEFAULT_MAX_PIN_WAIT: Duration = Duration::from_secs(10);

/// Configuration for a [`StorageEngine`](crate::StorageEngine).
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding every data file and the log file.
    pub data_dir: PathBuf,

    /// Number of frames in the buffer pool.
    pub pool_size: usize,

    /// Name of the log file inside `data_dir`.
    pub log_file: String,

    /// How long [`BufferManager`](crate::buffer::BufferManager) waits for a
    /// frame before aborting the request.
    pub max_pin_wait: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./walpool_data"),
            pool_size: DEFAULT_POOL_SIZE,
            log_file: DEFAULT_LOG_FILE.to_string(),
            max_pin_wait: DEFAULT_MAX_PIN_WAIT,
        }
    }
}

impl Config {
    /// Create a new config builder.
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Check the settings that cannot be represented by the types alone.
    pub fn validate(&self) -> Result<()> {
        if self.pool_size == 0 {
            return Err(Error::Config("pool_size must be > 0".to_string()));
        }
        if self.log_file.is_empty() {
            return Err(Error::Config("log_file must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Builder for [`Config`].
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory.
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the number of buffer frames.
    pub fn pool_size(mut self, frames: usize) -> Self {
        self.config.pool_size = frames;
        self
    }

    /// Set the log file name.
    pub fn log_file(mut self, name: impl Into<String>) -> Self {
        self.config.log_file = name.into();
        self
    }

    /// Set the maximum time a pin request waits for a free frame.
    pub fn max_pin_wait(mut self, wait: Duration) -> Self {
        self.config.max_pin_wait = wait;
        self
    }

    /// Finish building, validating the result.
    pub fn build(self) -> Result<Config> {
        self.config.validate()?;
        Ok(self.config)
    }
}
