//! In-memory file layer.

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::common::config::BLOCK_SIZE;
use crate::common::{BlockId, Error, Result};
use crate::storage::file_manager::FileManager;
use crate::storage::page::Page;

/// Keeps every file as a vector of blocks in memory.
///
/// Behaves like [`DiskFileManager`](super::DiskFileManager) minus
/// persistence, which makes it the default backend for tests and tools.
#[derive(Default)]
pub struct MemoryFileManager {
    files: Mutex<HashMap<String, Vec<Box<[u8; BLOCK_SIZE]>>>>,
}

impl MemoryFileManager {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FileManager for MemoryFileManager {
    fn read(&self, block: &BlockId, page: &mut Page) -> Result<()> {
        let files = self.files.lock();
        let data = files
            .get(block.file_name())
            .and_then(|blocks| blocks.get(block.number() as usize))
            .ok_or_else(|| Error::BlockNotFound(block.clone()))?;
        page.as_mut_slice().copy_from_slice(&data[..]);
        Ok(())
    }

    fn write(&self, block: &BlockId, page: &Page) -> Result<()> {
        let mut files = self.files.lock();
        let data = files
            .get_mut(block.file_name())
            .and_then(|blocks| blocks.get_mut(block.number() as usize))
            .ok_or_else(|| Error::BlockNotFound(block.clone()))?;
        data.copy_from_slice(page.as_slice());
        Ok(())
    }

    fn append(&self, file_name: &str) -> Result<BlockId> {
        let mut files = self.files.lock();
        let blocks = files.entry(file_name.to_string()).or_default();
        let block = BlockId::new(file_name, blocks.len() as u32);
        blocks.push(Box::new([0u8; BLOCK_SIZE]));
        Ok(block)
    }

    fn size(&self, file_name: &str) -> Result<u32> {
        Ok(self
            .files
            .lock()
            .get(file_name)
            .map_or(0, |blocks| blocks.len() as u32))
    }
}
