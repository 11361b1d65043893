//! Storage layer - block I/O and page formats.
//!
//! This module handles persistent storage:
//! - [`FileManager`] - Block-addressed file I/O trait
//! - [`DiskFileManager`] / [`MemoryFileManager`] - Its two backends
//! - [`page`] - Page contents and formatters

mod file_manager;
mod memory;
pub mod page;

pub use file_manager::{DiskFileManager, FileManager};
pub use memory::MemoryFileManager;
