//! Common types and utilities shared across walpool.
//!
//! This module contains fundamental primitives used throughout the codebase:
//! - Configuration constants and [`Config`]
//! - Error types
//! - Identifiers (BlockId, FrameId, TxNum, Lsn)

mod block_id;
pub mod config;
pub mod error;
mod frame_id;

pub use block_id::BlockId;
pub use config::Config;
pub use error::{Error, Result};
pub use frame_id::FrameId;

/// Transaction number. Negative means "no transaction".
pub type TxNum = i64;

/// Log sequence number. Negative means "no log record".
pub type Lsn = i64;

/// Marker for a buffer that no transaction has modified.
pub const NO_TXN: TxNum = -1;

/// Marker for a write that is not covered by any log record.
pub const NO_LSN: Lsn = -1;
