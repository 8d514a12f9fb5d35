//! Streaming accumulation of raw data into the bottom tree level.
//!
//! Data is hashed one full hash block's worth of data blocks at a time.
//! Anything shorter stays in the buffer until more data arrives or the
//! encoder closes, so write boundaries never influence the output.

use crate::hash_block::fill_hash_block;
use crate::superblock::Superblock;

/// Pending data not yet digested, always shorter than one hash block's
/// worth of data blocks.
#[derive(Clone, Debug, Default)]
pub struct DataBuffer {
    pending: Vec<u8>,
}

impl DataBuffer {
    /// Empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes waiting to be digested.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Accept `data`, appending every completed hash block to `bottom`.
    /// Returns the number of data blocks digested.
    pub fn write(&mut self, sb: &Superblock, mut data: &[u8], bottom: &mut Vec<u8>) -> u64 {
        let span = bytes_per_hash_block(sb);
        let mut hashed = 0;

        if !self.pending.is_empty() {
            let take = (span - self.pending.len()).min(data.len());
            self.pending.extend_from_slice(&data[..take]);
            data = &data[take..];
            if self.pending.len() < span {
                return 0;
            }
            hashed += digest_run(sb, &self.pending, bottom);
            self.pending.clear();
        }

        // Whole spans go straight from the caller's slice.
        let whole = data.len() - data.len() % span;
        hashed += digest_run(sb, &data[..whole], bottom);
        self.pending.extend_from_slice(&data[whole..]);
        hashed
    }

    /// Digest whatever is left, including a trailing short data block.
    /// Returns the number of data blocks digested.
    pub fn finish(&mut self, sb: &Superblock, bottom: &mut Vec<u8>) -> u64 {
        let hashed = digest_run(sb, &self.pending, bottom);
        self.pending.clear();
        hashed
    }
}

#[inline]
fn bytes_per_hash_block(sb: &Superblock) -> usize {
    sb.data_blocks_per_hash_block() * sb.data_block_size() as usize
}

fn digest_run(sb: &Superblock, mut run: &[u8], bottom: &mut Vec<u8>) -> u64 {
    let chunk_size = sb.data_block_size() as usize;
    let mut chunks = 0;
    while !run.is_empty() {
        let hb = fill_hash_block(sb, &mut run, chunk_size);
        if let Some(block) = hb.block {
            bottom.extend_from_slice(&block);
        }
        chunks += hb.chunks;
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entropy::SeededEntropy;
    use crate::level::compute_level;
    use crate::params::VerityParams;

    fn sb() -> Superblock {
        Superblock::new(&VerityParams::default(), SeededEntropy::new(5)).unwrap()
    }

    #[test]
    fn holds_back_partial_hash_block() {
        let sb = sb();
        let mut buf = DataBuffer::new();
        let mut bottom = Vec::new();

        // Three full data blocks do not complete a hash block yet.
        assert_eq!(buf.write(&sb, &vec![0u8; 3 * 4096], &mut bottom), 0);
        assert!(bottom.is_empty());
        assert_eq!(buf.pending(), 3 * 4096);

        // Topping up to 128 data blocks plus change flushes exactly one.
        assert_eq!(buf.write(&sb, &vec![0u8; 125 * 4096 + 7], &mut bottom), 128);
        assert_eq!(bottom.len(), 4096);
        assert_eq!(buf.pending(), 7);

        assert_eq!(buf.finish(&sb, &mut bottom), 1);
        assert_eq!(bottom.len(), 2 * 4096);
        assert_eq!(buf.pending(), 0);
    }

    #[test]
    fn split_writes_match_one_shot() {
        let sb = sb();
        let data: Vec<u8> = (0..(4096 * 300 + 123)).map(|i| (i % 253) as u8).collect();

        let mut one = Vec::new();
        let mut buf = DataBuffer::new();
        let mut count = buf.write(&sb, &data, &mut one);
        count += buf.finish(&sb, &mut one);
        assert_eq!(count, 301);
        assert_eq!(one, compute_level(&sb, &data, 4096).unwrap());

        let mut split = Vec::new();
        let mut buf = DataBuffer::new();
        for piece in data.chunks(4093) {
            buf.write(&sb, piece, &mut split);
        }
        buf.finish(&sb, &mut split);
        assert_eq!(split, one);
    }

    #[test]
    fn finish_on_empty_is_noop() {
        let mut bottom = Vec::new();
        assert_eq!(DataBuffer::new().finish(&sb(), &mut bottom), 0);
        assert!(bottom.is_empty());
    }
}
