//! Page - the fundamental 4KB unit of storage.
//!
//! A [`Page`] is the in-memory image of one disk block. It knows how to
//! read and write the two value types the storage core understands:
//!
//! ```text
//! int    : 4 bytes, big-endian i32
//! string : 4-byte big-endian length N, then N bytes of UTF-8
//! ```

use crate::common::config::{str_size, BLOCK_SIZE, INT_SIZE};
use crate::common::{Error, Result};

/// A page of data (4KB, 4KB-aligned).
///
/// `Page` does not implement `Clone` outside tests: copying a block should
/// be explicit.
///
/// # Example
/// ```
/// use walpool::storage::page::Page;
///
/// let mut page = Page::new();
/// page.set_int(0, 7).unwrap();
/// page.set_string(4, "abc").unwrap();
/// assert_eq!(page.get_int(0).unwrap(), 7);
/// assert_eq!(page.get_string(4).unwrap(), "abc");
/// ```
#[repr(align(4096))]
pub struct Page {
    data: [u8; BLOCK_SIZE],
}

impl Page {
    /// Create a new zeroed page.
    #[inline]
    pub fn new() -> Self {
        Self {
            data: [0u8; BLOCK_SIZE],
        }
    }

    /// Get immutable slice of page data.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Get mutable slice of page data.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Zero out the entire page.
    pub fn reset(&mut self) {
        self.data.fill(0);
    }

    /// Read the int stored at `offset`.
    pub fn get_int(&self, offset: usize) -> Result<i32> {
        read_int(&self.data, offset)
    }

    /// Store `value` at `offset`.
    pub fn set_int(&mut self, offset: usize, value: i32) -> Result<()> {
        let slot = slot_mut(&mut self.data, offset, INT_SIZE)?;
        slot.copy_from_slice(&value.to_be_bytes());
        Ok(())
    }

    /// Read the length-prefixed string stored at `offset`.
    pub fn get_string(&self, offset: usize) -> Result<String> {
        read_string(&self.data, offset)
    }

    /// Store `value` at `offset` as a length prefix followed by its bytes.
    ///
    /// Fails without touching the page if the encoded string does not fit.
    pub fn set_string(&mut self, offset: usize, value: &str) -> Result<()> {
        let bytes = value.as_bytes();
        let len = i32::try_from(bytes.len())
            .map_err(|_| Error::OutOfBounds { offset, len: str_size(bytes.len()) })?;
        let slot = slot_mut(&mut self.data, offset, str_size(bytes.len()))?;
        slot[..INT_SIZE].copy_from_slice(&len.to_be_bytes());
        slot[INT_SIZE..].copy_from_slice(bytes);
        Ok(())
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new()
    }
}

// Clone only available in tests - forces explicit copying in production
#[cfg(test)]
impl Clone for Page {
    fn clone(&self) -> Self {
        let mut new_page = Page::new();
        new_page.data.copy_from_slice(&self.data);
        new_page
    }
}

fn slot(data: &[u8], offset: usize, len: usize) -> Result<&[u8]> {
    offset
        .checked_add(len)
        .and_then(|end| data.get(offset..end))
        .ok_or(Error::OutOfBounds { offset, len })
}

fn slot_mut(data: &mut [u8], offset: usize, len: usize) -> Result<&mut [u8]> {
    offset
        .checked_add(len)
        .and_then(|end| data.get_mut(offset..end))
        .ok_or(Error::OutOfBounds { offset, len })
}

/// Decode an int from any byte area laid out like a page.
pub(crate) fn read_int(data: &[u8], offset: usize) -> Result<i32> {
    let bytes = slot(data, offset, INT_SIZE)?;
    Ok(i32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

/// Decode a length-prefixed string from any byte area laid out like a page.
pub(crate) fn read_string(data: &[u8], offset: usize) -> Result<String> {
    let len = read_int(data, offset)?;
    let len = usize::try_from(len)
        .map_err(|_| Error::Corrupted(format!("negative string length {} at {}", len, offset)))?;
    let bytes = slot(data, offset + INT_SIZE, len)?;
    String::from_utf8(bytes.to_vec())
        .map_err(|e| Error::Corrupted(format!("invalid UTF-8 at {}: {}", offset, e)))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_size_and_alignment() {
        assert_eq!(std::mem::size_of::<Page>(), BLOCK_SIZE);
        assert_eq!(std::mem::align_of::<Page>(), 4096);
    }

    #[test]
    fn test_int_is_big_endian() {
        let mut page = Page::new();
        page.set_int(8, 0x0102_0304).unwrap();
        assert_eq!(&page.as_slice()[8..12], &[1, 2, 3, 4]);
        assert_eq!(page.get_int(8).unwrap(), 0x0102_0304);
    }

    #[test]
    fn test_negative_int() {
        let mut page = Page::new();
        page.set_int(0, -57).unwrap();
        assert_eq!(page.get_int(0).unwrap(), -57);
    }

    #[test]
    fn test_string_layout() {
        let mut page = Page::new();
        page.set_string(10, "bb").unwrap();
        assert_eq!(&page.as_slice()[10..16], &[0, 0, 0, 2, b'b', b'b']);
        assert_eq!(page.get_string(10).unwrap(), "bb");
    }

    #[test]
    fn test_empty_and_multibyte_strings() {
        let mut page = Page::new();
        page.set_string(0, "").unwrap();
        page.set_string(100, "héllo").unwrap();
        assert_eq!(page.get_string(0).unwrap(), "");
        assert_eq!(page.get_string(100).unwrap(), "héllo");
    }

    #[test]
    fn test_int_at_last_slot() {
        let mut page = Page::new();
        page.set_int(BLOCK_SIZE - INT_SIZE, 9).unwrap();
        assert_eq!(page.get_int(BLOCK_SIZE - INT_SIZE).unwrap(), 9);
    }

    #[test]
    fn test_out_of_bounds_access() {
        let mut page = Page::new();
        assert!(matches!(
            page.set_int(BLOCK_SIZE - 2, 1),
            Err(Error::OutOfBounds { .. })
        ));
        assert!(matches!(page.get_int(usize::MAX), Err(Error::OutOfBounds { .. })));
        assert!(matches!(
            page.set_string(BLOCK_SIZE - 5, "too long"),
            Err(Error::OutOfBounds { .. })
        ));
        // Failed write leaves the page untouched
        assert!(page.as_slice().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_corrupted_string_length() {
        let mut page = Page::new();
        page.set_int(0, -1).unwrap();
        assert!(matches!(page.get_string(0), Err(Error::Corrupted(_))));
    }

    #[test]
    fn test_page_reset() {
        let mut page = Page::new();
        page.set_int(0, 1234).unwrap();
        page.reset();
        assert_eq!(page.get_int(0).unwrap(), 0);
    }

    #[test]
    fn test_page_clone_in_tests() {
        let mut page = Page::new();
        page.set_int(0, 5).unwrap();
        let cloned = page.clone();
        assert_eq!(cloned.get_int(0).unwrap(), 5);
    }
}
