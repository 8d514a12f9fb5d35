//! Hash tree levels, bottom (data digests) to top (single root block).

use std::io::Write;

use crate::error::{Result, VerityError};
use crate::level::compute_level;
use crate::superblock::{Digest32, Superblock};

/// Levels of a verity hash tree, indexed from the bottom.
///
/// Every level is a whole number of hash blocks; the top level is exactly
/// one hash block, whose salted digest is the root hash.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HashTree {
    levels: Vec<Vec<u8>>,
    root_hash: Digest32,
}

impl HashTree {
    /// Grow a tree on top of a non-empty `bottom` level until a single hash
    /// block remains.
    ///
    /// # Errors
    ///
    /// [`VerityError::InvalidLevel`] when `bottom` is empty or not a whole
    /// number of hash blocks.
    pub fn build(sb: &Superblock, bottom: Vec<u8>) -> Result<Self> {
        let hash_block_size = sb.hash_block_size() as usize;
        if bottom.is_empty() {
            return Err(VerityError::InvalidLevel("bottom level is empty"));
        }
        if bottom.len() % hash_block_size != 0 {
            return Err(VerityError::InvalidLevel(
                "bottom level is not a whole number of hash blocks",
            ));
        }

        let mut levels = vec![bottom];
        // Each pass divides the block count by at least two, so this ends.
        while let Some(top) = levels.last().filter(|l| l.len() > hash_block_size) {
            let next = compute_level(sb, top, hash_block_size)?;
            levels.push(next);
        }
        let root_hash = sb.salted_digest(levels.last().map_or(&[][..], Vec::as_slice));
        Ok(Self { levels, root_hash })
    }

    /// Salted digest of the top hash block.
    #[inline]
    #[must_use]
    pub fn root_hash(&self) -> Digest32 {
        self.root_hash
    }

    /// Levels from the bottom up.
    #[must_use]
    pub fn levels(&self) -> &[Vec<u8>] {
        &self.levels
    }

    /// Number of levels.
    #[must_use]
    pub fn height(&self) -> usize {
        self.levels.len()
    }

    /// Serialized size of all levels.
    #[must_use]
    pub fn byte_len(&self) -> u64 {
        self.levels.iter().map(|l| l.len() as u64).sum()
    }

    /// Write the levels top to bottom, each as one contiguous run.
    pub fn write_to<W: Write + ?Sized>(&self, w: &mut W) -> Result<u64> {
        for level in self.levels.iter().rev() {
            w.write_all(level)?;
        }
        Ok(self.byte_len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entropy::SeededEntropy;
    use crate::params::VerityParams;

    fn sb() -> Superblock {
        Superblock::new(&VerityParams::default(), SeededEntropy::new(11)).unwrap()
    }

    #[test]
    fn single_block_bottom_is_root_level() {
        let sb = sb();
        let bottom = compute_level(&sb, &[9u8; 100], 4096).unwrap();
        let tree = HashTree::build(&sb, bottom.clone()).unwrap();
        assert_eq!(tree.height(), 1);
        assert_eq!(tree.root_hash(), sb.salted_digest(&bottom));
    }

    #[test]
    fn heights_grow_with_bottom() {
        let sb = sb();
        // 2 bottom blocks -> 1; 129 -> 2 -> 1.
        for (blocks, height) in [(2usize, 2usize), (128, 2), (129, 3)] {
            let tree = HashTree::build(&sb, vec![3u8; blocks * 4096]).unwrap();
            assert_eq!(tree.height(), height, "{blocks} bottom blocks");
            assert_eq!(tree.levels().last().unwrap().len(), 4096);
        }
    }

    #[test]
    fn writes_top_first() {
        let sb = sb();
        let tree = HashTree::build(&sb, vec![1u8; 2 * 4096]).unwrap();
        let mut out = Vec::new();
        let n = tree.write_to(&mut out).unwrap();
        assert_eq!(n, 3 * 4096);
        assert_eq!(out.len(), 3 * 4096);
        assert_eq!(&out[..4096], &tree.levels()[1][..]);
        assert_eq!(&out[4096..], &tree.levels()[0][..]);
    }

    #[test]
    fn rejects_unusable_bottom() {
        let sb = sb();
        for bottom in [Vec::new(), vec![1u8; 100], vec![1u8; 4096 + 1]] {
            let len = bottom.len();
            let err = HashTree::build(&sb, bottom).unwrap_err();
            assert!(matches!(err, VerityError::InvalidLevel(_)), "bottom of {len} bytes");
        }
    }
}
