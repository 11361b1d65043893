//! Storage engine - wires the file layer, buffer pool and log together.

use std::sync::Arc;

use tracing::info;

use crate::buffer::{BufferManager, BufferPoolManager};
use crate::common::{Config, Result};
use crate::recovery::LogManager;
use crate::storage::{DiskFileManager, FileManager};

/// The storage core of one database directory.
///
/// Built once at startup; components that need the pool or the log get an
/// `Arc` from here instead of looking them up globally.
///
/// # Example
/// ```no_run
/// use walpool::{Config, StorageEngine};
/// use walpool::recovery::LogValue;
///
/// let config = Config::builder().data_dir("./db").pool_size(16).build().unwrap();
/// let engine = StorageEngine::open(config).unwrap();
///
/// let lsn = engine.log().append(&[LogValue::from(1), LogValue::from("start")]).unwrap();
/// engine.log().flush(lsn).unwrap();
/// ```
pub struct StorageEngine {
    config: Config,
    file_manager: Arc<DiskFileManager>,
    pool: Arc<BufferPoolManager>,
    buffer_manager: Arc<BufferManager>,
    log: Arc<LogManager>,
}

impl StorageEngine {
    /// Open (or create) the database in `config.data_dir`.
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;

        let file_manager = Arc::new(DiskFileManager::open(&config.data_dir)?);
        let shared: Arc<dyn FileManager> = file_manager.clone();
        let pool = Arc::new(BufferPoolManager::new(config.pool_size, shared));
        let log = LogManager::new(Arc::clone(&pool), config.log_file.clone())?;
        let buffer_manager = Arc::new(BufferManager::new(Arc::clone(&pool), config.max_pin_wait));

        info!(
            dir = %config.data_dir.display(),
            new = file_manager.is_new(),
            frames = config.pool_size,
            log = %config.log_file,
            lsn = log.current_lsn(),
            "storage engine opened"
        );

        Ok(Self {
            config,
            file_manager,
            pool,
            buffer_manager,
            log,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Whether `open` created the data directory.
    pub fn is_new(&self) -> bool {
        self.file_manager.is_new()
    }

    pub fn file_manager(&self) -> &Arc<DiskFileManager> {
        &self.file_manager
    }

    /// The non-waiting pool.
    pub fn pool(&self) -> &Arc<BufferPoolManager> {
        &self.pool
    }

    /// The pool behind a pin timeout of `config.max_pin_wait`.
    pub fn buffer_manager(&self) -> &Arc<BufferManager> {
        &self.buffer_manager
    }

    pub fn log(&self) -> &Arc<LogManager> {
        &self.log
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::BlockId;
    use crate::recovery::LogValue;
    use crate::storage::page::ZeroFormatter;
    use std::time::Duration;
    use tempfile::tempdir;

    fn config(dir: &std::path::Path) -> Config {
        Config::builder()
            .data_dir(dir.join("db"))
            .pool_size(4)
            .max_pin_wait(Duration::from_millis(20))
            .build()
            .unwrap()
    }

    #[test]
    fn test_open_new_directory() {
        let dir = tempdir().unwrap();
        let engine = StorageEngine::open(config(dir.path())).unwrap();

        assert!(engine.is_new());
        assert_eq!(engine.pool().capacity(), 4);
        assert_eq!(engine.log().log_file(), "simpledb.log");
        assert!(dir.path().join("db").join("simpledb.log").exists());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let dir = tempdir().unwrap();
        let mut bad = config(dir.path());
        bad.pool_size = 0;
        assert!(StorageEngine::open(bad).is_err());
    }

    #[test]
    fn test_data_and_log_survive_reopen() {
        let dir = tempdir().unwrap();
        let block;
        {
            let engine = StorageEngine::open(config(dir.path())).unwrap();
            let lsn = engine.log().append(&[LogValue::from(7), LogValue::from("set")]).unwrap();

            let buffer = engine.buffer_manager().pin_new("table.tbl", &ZeroFormatter).unwrap();
            block = buffer.block().unwrap();
            buffer.set_int(0, 1234, 7, lsn).unwrap();
            engine.buffer_manager().unpin(&buffer);
            engine.buffer_manager().flush_all(7).unwrap();
        }

        let engine = StorageEngine::open(config(dir.path())).unwrap();
        assert!(!engine.is_new());

        let buffer = engine.pool().pin(&block).unwrap();
        assert_eq!(buffer.get_int(0).unwrap(), 1234);
        engine.pool().unpin(&buffer);

        let mut records = engine.log().iterator().unwrap();
        let mut record = records.next().unwrap().unwrap();
        assert_eq!(record.next_int().unwrap(), 7);
        assert_eq!(record.next_string().unwrap(), "set");
        assert!(records.next().is_none());
        assert_eq!(block, BlockId::new("table.tbl", 0));
    }
}
