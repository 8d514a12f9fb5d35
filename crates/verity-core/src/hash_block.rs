//! Assemble one hash block from a run of input chunks.

use crate::error::{Result, VerityError};
use crate::superblock::Superblock;

/// One assembled hash block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HashBlock {
    /// Digests followed by zero padding, exactly one hash block long.
    /// `None` when the source had nothing left.
    pub block: Option<Vec<u8>>,
    /// Number of chunks digested into `block`.
    pub chunks: u64,
    /// Whether the source is now empty.
    pub exhausted: bool,
}

/// Digest up to `data_blocks_per_hash_block` chunks of `chunk_size` bytes
/// from the front of `src`, advancing it past what was consumed.
///
/// A final chunk shorter than `chunk_size` is digested as-is. The hash
/// block itself is zero-padded when the source runs dry before it fills.
///
/// # Errors
///
/// [`VerityError::InvalidLevel`] when `chunk_size` is zero.
pub fn assemble_hash_block(sb: &Superblock, src: &mut &[u8], chunk_size: usize) -> Result<HashBlock> {
    if chunk_size == 0 {
        return Err(VerityError::InvalidLevel("chunk size must be non-zero"));
    }
    Ok(fill_hash_block(sb, src, chunk_size))
}

/// [`assemble_hash_block`] for a `chunk_size` already known to be non-zero.
pub(crate) fn fill_hash_block(sb: &Superblock, src: &mut &[u8], chunk_size: usize) -> HashBlock {
    let hash_block_size = sb.hash_block_size() as usize;
    let mut block = Vec::with_capacity(hash_block_size);
    let mut chunks = 0u64;

    for _ in 0..sb.data_blocks_per_hash_block() {
        if src.is_empty() {
            break;
        }
        let (chunk, rest) = src.split_at(chunk_size.min(src.len()));
        block.extend_from_slice(&sb.salted_digest(chunk));
        chunks += 1;
        *src = rest;
    }

    if chunks == 0 {
        return HashBlock {
            block: None,
            chunks: 0,
            exhausted: true,
        };
    }
    block.resize(hash_block_size, 0);
    HashBlock {
        block: Some(block),
        chunks,
        exhausted: src.is_empty(),
    }
}
