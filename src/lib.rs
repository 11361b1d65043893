//! walpool - a buffer pool with LRU-2 replacement and a write-ahead log.
//!
//! # Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         StorageEngine                           │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │           Log Manager (recovery/)                        │   │
//! │  │   append → tail buffer    iterator → newest first        │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                    ↓ pin / unpin     ↑ WAL flush                │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │           Buffer Pool (buffer/)                          │   │
//! │  │   BufferPoolManager + Buffer + LRU-2 + Statistics        │   │
//! │  │   BufferManager (waits for frames)                       │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │           Storage Layer (storage/)                       │   │
//! │  │     FileManager (disk | memory) + Page + formatters      │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//! - [`common`] - Shared primitives (BlockId, FrameId, Error, config)
//! - [`buffer`] - Buffer pool management and LRU-2 replacement
//! - [`storage`] - Block I/O and page formats
//! - [`recovery`] - Write-ahead log
//! - [`engine`] - Wiring of all of the above
//!
//! # Quick Start
//! ```
//! use std::sync::Arc;
//! use walpool::buffer::BufferPoolManager;
//! use walpool::recovery::{LogManager, LogValue};
//! use walpool::storage::{FileManager, MemoryFileManager};
//!
//! let fm = Arc::new(MemoryFileManager::new());
//! let block = fm.append("accounts.tbl").unwrap();
//! let pool = Arc::new(BufferPoolManager::new(8, fm));
//! let log = LogManager::new(Arc::clone(&pool), "walpool.log").unwrap();
//!
//! // Log the change, then apply it under the record's LSN
//! let lsn = log.append(&[LogValue::from(1), LogValue::from("deposit")]).unwrap();
//! let buffer = pool.pin(&block).unwrap();
//! buffer.set_int(0, 100, 1, lsn).unwrap();
//! pool.unpin(&buffer);
//!
//! // Commit: the log is forced before the data block is written
//! pool.flush_all(1).unwrap();
//! ```

pub mod buffer;
pub mod common;
pub mod engine;
pub mod recovery;
pub mod storage;

// Re-export commonly used items at crate root for convenience
pub use common::config::{BLOCK_SIZE, INT_SIZE};
pub use common::{BlockId, Config, Error, FrameId, Lsn, Result, TxNum};

pub use buffer::{Buffer, BufferManager, BufferPoolManager, BufferPoolStats, StatsSnapshot};
pub use engine::StorageEngine;
pub use recovery::{LogManager, LogRecord, LogValue};
pub use storage::page::Page;
pub use storage::{DiskFileManager, FileManager, MemoryFileManager};
