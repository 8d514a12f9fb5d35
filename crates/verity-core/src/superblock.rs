//! The verity superblock and the salted digest every tree level is built from.
//!
//! On-disk layout (little-endian, 512 bytes, zero-padded to one hash block):
//!
//! | offset | size | field             |
//! |-------:|-----:|-------------------|
//! |      0 |    8 | signature         |
//! |      8 |    4 | version           |
//! |     12 |    4 | hash type         |
//! |     16 |   16 | uuid              |
//! |     32 |   32 | algorithm name    |
//! |     64 |    4 | data block size   |
//! |     68 |    4 | hash block size   |
//! |     72 |    8 | data blocks       |
//! |     80 |    2 | salt size         |
//! |     82 |    6 | reserved          |
//! |     88 |  256 | salt              |
//! |    344 |  168 | reserved          |

use std::io::Write;

use sha2::{Digest, Sha256};

use crate::entropy::EntropySource;
use crate::error::{Result, VerityError};
use crate::params::{
    VerityParams, ALGORITHM, DIGEST_SIZE, FORMAT_VERSION, HASH_TYPE, MAX_SALT_SIZE, SIGNATURE,
    SUPERBLOCK_SIZE,
};

const OFF_VERSION: usize = 8;
const OFF_HASH_TYPE: usize = 12;
const OFF_UUID: usize = 16;
const OFF_ALGORITHM: usize = 32;
const OFF_DATA_BLOCK_SIZE: usize = 64;
const OFF_HASH_BLOCK_SIZE: usize = 68;
const OFF_DATA_BLOCKS: usize = 72;
const OFF_SALT_SIZE: usize = 80;
const OFF_SALT: usize = 88;
const ALGORITHM_FIELD: usize = 32;

/// A salted SHA-256 digest.
pub type Digest32 = [u8; DIGEST_SIZE];

/// `SHA256(salt || block)`.
#[must_use]
pub fn salted_digest(salt: &[u8], block: &[u8]) -> Digest32 {
    let mut h = Sha256::new();
    h.update(salt);
    h.update(block);
    h.finalize().into()
}

/// Hash device parameters. `data_blocks` stays zero until the encoder closes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Superblock {
    uuid: [u8; 16],
    data_block_size: u32,
    hash_block_size: u32,
    data_blocks: u64,
    salt: Vec<u8>,
}

impl Superblock {
    /// Build a superblock for `params`, drawing the UUID and then the salt
    /// from `entropy` unless `params` fixes them.
    pub fn new(params: &VerityParams, mut entropy: impl EntropySource) -> Result<Self> {
        params.validate()?;

        let uuid = match params.uuid {
            Some(uuid) => uuid,
            None => {
                let mut uuid = [0u8; 16];
                entropy.fill_bytes(&mut uuid)?;
                uuid
            }
        };
        let salt = match &params.salt {
            Some(salt) => salt.clone(),
            None => {
                let mut salt = vec![0u8; usize::from(params.salt_size)];
                entropy.fill_bytes(&mut salt)?;
                salt
            }
        };

        Ok(Self {
            uuid,
            data_block_size: params.data_block_size,
            hash_block_size: params.hash_block_size,
            data_blocks: 0,
            salt,
        })
    }

    /// Salt prepended to every digest input.
    #[inline]
    #[must_use]
    pub fn salt(&self) -> &[u8] {
        &self.salt
    }

    /// Hash device UUID.
    #[inline]
    #[must_use]
    pub fn uuid(&self) -> [u8; 16] {
        self.uuid
    }

    /// Name of the digest algorithm.
    #[inline]
    #[must_use]
    pub fn algorithm_name(&self) -> &'static str {
        ALGORITHM
    }

    /// Bytes per data block.
    #[inline]
    #[must_use]
    pub fn data_block_size(&self) -> u32 {
        self.data_block_size
    }

    /// Bytes per hash block.
    #[inline]
    #[must_use]
    pub fn hash_block_size(&self) -> u32 {
        self.hash_block_size
    }

    /// Data blocks hashed so far; final only after the encoder closes.
    #[inline]
    #[must_use]
    pub fn data_blocks(&self) -> u64 {
        self.data_blocks
    }

    pub(crate) fn add_data_blocks(&mut self, n: u64) {
        self.data_blocks += n;
    }

    /// Digests per hash block, which is also the number of data blocks one
    /// hash block covers.
    #[inline]
    #[must_use]
    pub fn data_blocks_per_hash_block(&self) -> usize {
        self.hash_block_size as usize / DIGEST_SIZE
    }

    /// Salted digest of one block, using this superblock's salt.
    #[inline]
    #[must_use]
    pub fn salted_digest(&self, block: &[u8]) -> Digest32 {
        salted_digest(&self.salt, block)
    }

    /// Serialize into exactly one hash block.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut out = vec![0u8; (self.hash_block_size as usize).max(SUPERBLOCK_SIZE)];
        out[..OFF_VERSION].copy_from_slice(&SIGNATURE);
        put(&mut out, OFF_VERSION, &FORMAT_VERSION.to_le_bytes());
        put(&mut out, OFF_HASH_TYPE, &HASH_TYPE.to_le_bytes());
        put(&mut out, OFF_UUID, &self.uuid);
        put(&mut out, OFF_ALGORITHM, ALGORITHM.as_bytes());
        put(&mut out, OFF_DATA_BLOCK_SIZE, &self.data_block_size.to_le_bytes());
        put(&mut out, OFF_HASH_BLOCK_SIZE, &self.hash_block_size.to_le_bytes());
        put(&mut out, OFF_DATA_BLOCKS, &self.data_blocks.to_le_bytes());
        // Salt length is bounded by MAX_SALT_SIZE at construction.
        put(&mut out, OFF_SALT_SIZE, &(self.salt.len() as u16).to_le_bytes());
        put(&mut out, OFF_SALT, &self.salt);
        out
    }

    /// Write the padded superblock block. Returns the bytes written.
    pub fn write_to<W: Write + ?Sized>(&self, w: &mut W) -> Result<u64> {
        let block = self.encode();
        w.write_all(&block)?;
        Ok(block.len() as u64)
    }

    /// Parse a superblock from the start of `bytes`.
    ///
    /// Only the 512 header bytes are read; the padding up to a full hash
    /// block need not be present.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < SUPERBLOCK_SIZE {
            return Err(VerityError::InvalidSuperblock("truncated header"));
        }
        if bytes[..OFF_VERSION] != SIGNATURE {
            return Err(VerityError::InvalidSuperblock("bad signature"));
        }
        if le_u32(bytes, OFF_VERSION) != FORMAT_VERSION {
            return Err(VerityError::InvalidSuperblock("unsupported version"));
        }
        if le_u32(bytes, OFF_HASH_TYPE) != HASH_TYPE {
            return Err(VerityError::InvalidSuperblock("unsupported hash type"));
        }
        let algorithm = &bytes[OFF_ALGORITHM..OFF_ALGORITHM + ALGORITHM_FIELD];
        let name_len = algorithm.iter().position(|&b| b == 0).unwrap_or(ALGORITHM_FIELD);
        if &algorithm[..name_len] != ALGORITHM.as_bytes() {
            return Err(VerityError::InvalidSuperblock("unsupported algorithm"));
        }
        let salt_size = usize::from(le_u16(bytes, OFF_SALT_SIZE));
        if salt_size > MAX_SALT_SIZE {
            return Err(VerityError::InvalidSuperblock("salt size out of range"));
        }

        let mut uuid = [0u8; 16];
        uuid.copy_from_slice(&bytes[OFF_UUID..OFF_UUID + 16]);
        let params = VerityParams {
            data_block_size: le_u32(bytes, OFF_DATA_BLOCK_SIZE),
            hash_block_size: le_u32(bytes, OFF_HASH_BLOCK_SIZE),
            salt_size: salt_size as u16,
            salt: Some(bytes[OFF_SALT..OFF_SALT + salt_size].to_vec()),
            uuid: Some(uuid),
        };
        params
            .validate()
            .map_err(|_| VerityError::InvalidSuperblock("invalid block sizes"))?;

        let mut sb = Self::new(&params, NoEntropy)?;
        sb.data_blocks = le_u64(bytes, OFF_DATA_BLOCKS);
        Ok(sb)
    }
}

/// Decoding never needs randomness: both salt and uuid come from the bytes.
struct NoEntropy;

impl EntropySource for NoEntropy {
    fn fill_bytes(&mut self, _dest: &mut [u8]) -> Result<()> {
        Err(VerityError::Entropy("no entropy while decoding".into()))
    }
}

#[inline]
fn put(out: &mut [u8], off: usize, bytes: &[u8]) {
    out[off..off + bytes.len()].copy_from_slice(bytes);
}

#[inline]
fn le_u16(b: &[u8], off: usize) -> u16 {
    u16::from_le_bytes([b[off], b[off + 1]])
}

#[inline]
fn le_u32(b: &[u8], off: usize) -> u32 {
    let mut x = [0u8; 4];
    x.copy_from_slice(&b[off..off + 4]);
    u32::from_le_bytes(x)
}

#[inline]
fn le_u64(b: &[u8], off: usize) -> u64 {
    let mut x = [0u8; 8];
    x.copy_from_slice(&b[off..off + 8]);
    u64::from_le_bytes(x)
}
