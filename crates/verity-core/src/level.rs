//! Build a whole tree level from the level below it.

use crate::error::{Result, VerityError};
use crate::hash_block::fill_hash_block;
use crate::superblock::Superblock;

/// Hash every `chunk_size` chunk of `input` into a run of hash blocks.
///
/// The result is always a whole number of hash blocks; an empty input
/// gives an empty level.
///
/// # Errors
///
/// [`VerityError::InvalidLevel`] when `chunk_size` is zero.
pub fn compute_level(sb: &Superblock, mut input: &[u8], chunk_size: usize) -> Result<Vec<u8>> {
    if chunk_size == 0 {
        return Err(VerityError::InvalidLevel("chunk size must be non-zero"));
    }
    let per_block = sb.data_blocks_per_hash_block() * chunk_size;
    let blocks = input.len().div_ceil(per_block);
    let mut level = Vec::with_capacity(blocks * sb.hash_block_size() as usize);
    loop {
        let hb = fill_hash_block(sb, &mut input, chunk_size);
        if let Some(block) = hb.block {
            level.extend_from_slice(&block);
        }
        if hb.exhausted {
            return Ok(level);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entropy::SeededEntropy;
    use crate::params::VerityParams;

    #[test]
    fn empty_input_empty_level() {
        let sb = Superblock::new(&VerityParams::default(), SeededEntropy::new(1)).unwrap();
        assert!(compute_level(&sb, &[], 4096).unwrap().is_empty());
    }

    #[test]
    fn level_is_whole_blocks() {
        let sb = Superblock::new(&VerityParams::default(), SeededEntropy::new(1)).unwrap();
        for hash_blocks in [1usize, 2, 3, 129] {
            let input = vec![0xA5u8; hash_blocks * 4096];
            let level = compute_level(&sb, &input, 4096).unwrap();
            assert_eq!(level.len() % 4096, 0);
            assert_eq!(level.len() / 4096, hash_blocks.div_ceil(128));
        }
    }

    #[test]
    fn zero_chunk_size_rejected() {
        let sb = Superblock::new(&VerityParams::default(), SeededEntropy::new(1)).unwrap();
        let err = compute_level(&sb, &[1u8; 100], 0).unwrap_err();
        assert!(matches!(err, VerityError::InvalidLevel(_)));
    }
}
