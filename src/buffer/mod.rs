//! Buffer pool management.
//!
//! The buffer pool is the in-memory cache between the log / record layers
//! and the file layer. It manages a fixed budget of frames, each holding
//! at most one block.
//!
//! # Components
//! - [`BufferPoolManager`] - The block cache (never waits)
//! - [`BufferManager`] - Waiting front end with a pin timeout
//! - [`Buffer`] - A frame: block contents + pin / dirty / LSN metadata
//! - [`BufferGuard`] - RAII pin
//! - [`BufferPoolStats`] - Performance statistics
//! - [`replacer`] - LRU-2 victim selection

mod buffer_guard;
mod buffer_pool_manager;
mod frame;
mod manager;
pub mod replacer;
mod stats;

pub use buffer_guard::BufferGuard;
pub use buffer_pool_manager::{BufferPoolManager, FrameInfo};
pub use frame::{Buffer, WalFlush};
pub use manager::BufferManager;
pub use stats::{BufferPoolStats, StatsSnapshot};
