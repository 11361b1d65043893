//! Eviction policy implementations (replacers).
//!
//! Currently implements:
//! - [`LruKReplacer`] - LRU-K with K = 2

mod lru_k;

pub use lru_k::{AccessHistory, LruKReplacer, INFINITE};
