//! Block identifier type.

use std::fmt;

/// Identifies a block on disk: a file name plus a block number in that file.
///
/// Equality and hashing use both fields, so a `BlockId` can key the
/// buffer pool's block → frame mapping directly.
///
/// # Example
/// ```
/// use walpool::BlockId;
///
/// let blk = BlockId::new("students.tbl", 3);
/// assert_eq!(blk.number(), 3);
/// assert_eq!(blk.previous(), Some(BlockId::new("students.tbl", 2)));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId {
    file_name: String,
    number: u32,
}

impl BlockId {
    /// Create a new BlockId.
    pub fn new(file_name: impl Into<String>, number: u32) -> Self {
        Self {
            file_name: file_name.into(),
            number,
        }
    }

    /// Name of the file the block belongs to.
    #[inline]
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Position of the block within its file.
    #[inline]
    pub fn number(&self) -> u32 {
        self.number
    }

    /// The block just before this one in the same file, if any.
    pub fn previous(&self) -> Option<BlockId> {
        self.number
            .checked_sub(1)
            .map(|number| BlockId::new(self.file_name.clone(), number))
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Block({}, {})", self.file_name, self.number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_block_id_equality_uses_both_fields() {
        assert_eq!(BlockId::new("a", 1), BlockId::new("a", 1));
        assert_ne!(BlockId::new("a", 1), BlockId::new("b", 1));
        assert_ne!(BlockId::new("a", 1), BlockId::new("a", 2));
    }

    #[test]
    fn test_block_id_hash_key() {
        let mut set = HashSet::new();
        set.insert(BlockId::new("a", 1));
        assert!(set.contains(&BlockId::new("a", 1)));
        assert!(!set.contains(&BlockId::new("a", 2)));
    }

    #[test]
    fn test_block_id_previous() {
        assert_eq!(BlockId::new("log", 0).previous(), None);
        assert_eq!(BlockId::new("log", 5).previous(), Some(BlockId::new("log", 4)));
    }

    #[test]
    fn test_block_id_display() {
        assert_eq!(format!("{}", BlockId::new("log", 7)), "Block(log, 7)");
    }
}
