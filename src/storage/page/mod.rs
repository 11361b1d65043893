//! Page types and layout.
//!
//! This module contains:
//! - [`Page`] - The raw 4KB data container with typed accessors
//! - [`PageFormatter`] - Initialization hook for freshly appended blocks

mod formatter;
#[allow(clippy::module_inception)]
mod page;

pub use formatter::{PageFormatter, ZeroFormatter};
pub use page::Page;
pub(crate) use page::{read_int, read_string};
