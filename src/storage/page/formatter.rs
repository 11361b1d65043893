//! Page formatters.
//!
//! A [`PageFormatter`] initializes the contents of a block that has just
//! been appended to a file, before the block is handed to anyone.

use super::Page;
use crate::common::Result;

/// Initializes a freshly appended block.
///
/// Called exactly once per block, by
/// [`Buffer::assign_to_new`](crate::buffer::Buffer::assign_to_new).
pub trait PageFormatter: Send + Sync {
    fn format(&self, page: &mut Page) -> Result<()>;
}

/// Leaves the new block zero-filled.
#[derive(Debug, Default, Clone, Copy)]
pub struct ZeroFormatter;

impl PageFormatter for ZeroFormatter {
    fn format(&self, page: &mut Page) -> Result<()> {
        page.reset();
        Ok(())
    }
}
