//! File layer - block-addressed I/O for named files.
//!
//! The [`FileManager`] trait is the only way the buffer pool touches disk.
//! [`DiskFileManager`] stores each logical file as one OS file inside a data
//! directory.

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::debug;

use crate::common::config::BLOCK_SIZE;
use crate::common::{BlockId, Error, Result};
use crate::storage::page::Page;

/// Block-addressed access to named files.
///
/// Implementations must be thread-safe: frames flush themselves through a
/// shared `Arc<dyn FileManager>` without holding the pool lock.
pub trait FileManager: Send + Sync {
    /// Read `block` into `page`.
    ///
    /// # Errors
    /// `Error::BlockNotFound` if the block lies past the end of its file.
    fn read(&self, block: &BlockId, page: &mut Page) -> Result<()>;

    /// Write `page` over `block`, which must already exist.
    fn write(&self, block: &BlockId, page: &Page) -> Result<()>;

    /// Append a zeroed block to `file_name`, creating the file if needed.
    fn append(&self, file_name: &str) -> Result<BlockId>;

    /// Number of blocks currently in `file_name` (0 if it does not exist).
    fn size(&self, file_name: &str) -> Result<u32>;

    /// Size of every block handled by this manager.
    fn block_size(&self) -> usize {
        BLOCK_SIZE
    }
}

/// An open OS file plus its length in blocks.
struct OpenFile {
    file: File,
    block_count: u32,
}

/// Stores each logical file as `<data_dir>/<file_name>`.
///
/// # File Layout
/// ```text
/// ┌─────────┬─────────┬─────────┬─────────┐
/// │ Block 0 │ Block 1 │  ...    │ Block N │
/// │ (4KB)   │ (4KB)   │         │ (4KB)   │
/// └─────────┴─────────┴─────────┴─────────┘
/// Offset:  0      4096    ...    N×4096
/// ```
///
/// Files are opened on first use and kept open. Every write and append is
/// followed by `fsync()`.
pub struct DiskFileManager {
    data_dir: PathBuf,
    is_new: bool,
    files: Mutex<HashMap<String, OpenFile>>,
}

impl DiskFileManager {
    /// Open the data directory, creating it if it does not exist.
    pub fn open<P: AsRef<Path>>(data_dir: P) -> Result<Self> {
        let data_dir = data_dir.as_ref().to_path_buf();
        let is_new = !data_dir.exists();
        if is_new {
            fs::create_dir_all(&data_dir)?;
        }
        debug!(dir = %data_dir.display(), is_new, "opened data directory");

        Ok(Self {
            data_dir,
            is_new,
            files: Mutex::new(HashMap::new()),
        })
    }

    /// Whether the data directory was created by this manager.
    #[inline]
    pub fn is_new(&self) -> bool {
        self.is_new
    }

    /// The directory holding all files.
    #[inline]
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Run `f` against the open handle for `file_name`, opening it first.
    fn with_file<T>(&self, file_name: &str, f: impl FnOnce(&mut OpenFile) -> Result<T>) -> Result<T> {
        let mut files = self.files.lock();
        if !files.contains_key(file_name) {
            let file = OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .truncate(false)
                .open(self.data_dir.join(file_name))?;
            let block_count = (file.metadata()?.len() / BLOCK_SIZE as u64) as u32;
            files.insert(file_name.to_string(), OpenFile { file, block_count });
        }
        let open = files
            .get_mut(file_name)
            .ok_or_else(|| Error::Corrupted(format!("file handle for {} vanished", file_name)))?;
        f(open)
    }
}

fn block_offset(number: u32) -> u64 {
    (number as u64) * (BLOCK_SIZE as u64)
}

impl FileManager for DiskFileManager {
    fn read(&self, block: &BlockId, page: &mut Page) -> Result<()> {
        self.with_file(block.file_name(), |open| {
            if block.number() >= open.block_count {
                return Err(Error::BlockNotFound(block.clone()));
            }
            open.file.seek(SeekFrom::Start(block_offset(block.number())))?;
            open.file.read_exact(page.as_mut_slice())?;
            Ok(())
        })
    }

    fn write(&self, block: &BlockId, page: &Page) -> Result<()> {
        self.with_file(block.file_name(), |open| {
            if block.number() >= open.block_count {
                return Err(Error::BlockNotFound(block.clone()));
            }
            open.file.seek(SeekFrom::Start(block_offset(block.number())))?;
            open.file.write_all(page.as_slice())?;
            open.file.sync_all()?;
            Ok(())
        })
    }

    fn append(&self, file_name: &str) -> Result<BlockId> {
        self.with_file(file_name, |open| {
            let block = BlockId::new(file_name, open.block_count);
            open.file.seek(SeekFrom::Start(block_offset(block.number())))?;
            open.file.write_all(&[0u8; BLOCK_SIZE])?;
            open.file.sync_all()?;
            open.block_count += 1;
            Ok(block)
        })
    }

    fn size(&self, file_name: &str) -> Result<u32> {
        self.with_file(file_name, |open| Ok(open.block_count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_open_creates_directory() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("db");

        let fm = DiskFileManager::open(&path).unwrap();
        assert!(fm.is_new());
        assert!(path.is_dir());

        let fm = DiskFileManager::open(&path).unwrap();
        assert!(!fm.is_new());
    }

    #[test]
    fn test_size_of_missing_file_is_zero() {
        let dir = tempdir().unwrap();
        let fm = DiskFileManager::open(dir.path()).unwrap();
        assert_eq!(fm.size("nothing.tbl").unwrap(), 0);
    }

    #[test]
    fn test_append_and_read_block() {
        let dir = tempdir().unwrap();
        let fm = DiskFileManager::open(dir.path()).unwrap();

        let block = fm.append("t.tbl").unwrap();
        assert_eq!(block, BlockId::new("t.tbl", 0));
        assert_eq!(fm.size("t.tbl").unwrap(), 1);

        let mut page = Page::new();
        fm.read(&block, &mut page).unwrap();
        assert_eq!(page.get_int(0).unwrap(), 0);
    }

    #[test]
    fn test_write_and_read_block() {
        let dir = tempdir().unwrap();
        let fm = DiskFileManager::open(dir.path()).unwrap();
        let block = fm.append("t.tbl").unwrap();

        let mut page = Page::new();
        page.set_int(0, 0x42).unwrap();
        page.set_string(4, "hello").unwrap();
        fm.write(&block, &page).unwrap();

        let mut read_back = Page::new();
        fm.read(&block, &mut read_back).unwrap();
        assert_eq!(read_back.get_int(0).unwrap(), 0x42);
        assert_eq!(read_back.get_string(4).unwrap(), "hello");
    }

    #[test]
    fn test_files_are_independent() {
        let dir = tempdir().unwrap();
        let fm = DiskFileManager::open(dir.path()).unwrap();

        fm.append("a").unwrap();
        fm.append("a").unwrap();
        let b0 = fm.append("b").unwrap();

        assert_eq!(fm.size("a").unwrap(), 2);
        assert_eq!(fm.size("b").unwrap(), 1);
        assert_eq!(b0.number(), 0);
    }

    #[test]
    fn test_persistence_across_managers() {
        let dir = tempdir().unwrap();

        {
            let fm = DiskFileManager::open(dir.path()).unwrap();
            let block = fm.append("t.tbl").unwrap();
            let mut page = Page::new();
            page.set_int(100, 7).unwrap();
            fm.write(&block, &page).unwrap();
        }

        {
            let fm = DiskFileManager::open(dir.path()).unwrap();
            assert_eq!(fm.size("t.tbl").unwrap(), 1);
            let mut page = Page::new();
            fm.read(&BlockId::new("t.tbl", 0), &mut page).unwrap();
            assert_eq!(page.get_int(100).unwrap(), 7);
        }
    }

    #[test]
    fn test_read_missing_block() {
        let dir = tempdir().unwrap();
        let fm = DiskFileManager::open(dir.path()).unwrap();
        fm.append("t.tbl").unwrap();

        let mut page = Page::new();
        let result = fm.read(&BlockId::new("t.tbl", 1), &mut page);
        assert!(matches!(result, Err(Error::BlockNotFound(_))));
    }

    #[test]
    fn test_write_missing_block() {
        let dir = tempdir().unwrap();
        let fm = DiskFileManager::open(dir.path()).unwrap();

        let page = Page::new();
        let result = fm.write(&BlockId::new("t.tbl", 0), &page);
        assert!(matches!(result, Err(Error::BlockNotFound(_))));
    }
}
