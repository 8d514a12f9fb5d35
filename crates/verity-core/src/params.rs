//! Format constants and encoder configuration.
//!
//! Only the SHA-256 hash type and the version 1 superblock are supported.
//! Block sizes and the salt length are configurable within the bounds
//! enforced by [`VerityParams::validate`].

use serde::{Deserialize, Serialize};

use crate::error::{Result, VerityError};

/// Size of the on-disk superblock header, before padding to a hash block.
pub const SUPERBLOCK_SIZE: usize = 512;
/// Size of a single SHA-256 digest.
pub const DIGEST_SIZE: usize = 32;
/// Device-mapper tables count lengths in 512-byte sectors.
pub const SECTOR_SIZE: u64 = 512;
/// Capacity of the superblock salt field.
pub const MAX_SALT_SIZE: usize = 256;
/// Largest block size accepted for either device.
pub const MAX_BLOCK_SIZE: u32 = 1 << 20;

/// Superblock magic, `"verity\0\0"`.
pub const SIGNATURE: [u8; 8] = *b"verity\0\0";
/// Superblock format version.
pub const FORMAT_VERSION: u32 = 1;
/// Hash type 1 is the normal (non Chrome OS) layout.
pub const HASH_TYPE: u32 = 1;
/// Digest algorithm name stored in the superblock and the mapping table.
pub const ALGORITHM: &str = "sha256";

/// Default data and hash block size.
pub const DEFAULT_BLOCK_SIZE: u32 = 4096;
/// Default salt length.
pub const DEFAULT_SALT_SIZE: u16 = 64;

/// Parameters fixed when an encoder is created.
///
/// The numeric fields can be loaded from a config file. An explicit `salt`
/// or `uuid` replaces the value that would otherwise be drawn from the
/// entropy source; they are never deserialized.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VerityParams {
    /// Bytes per data device block.
    pub data_block_size: u32,
    /// Bytes per hash device block.
    pub hash_block_size: u32,
    /// Length of the random salt. Ignored when `salt` is set.
    pub salt_size: u16,
    /// Fixed salt.
    #[serde(skip)]
    pub salt: Option<Vec<u8>>,
    /// Fixed superblock UUID.
    #[serde(skip)]
    pub uuid: Option<[u8; 16]>,
}

impl Default for VerityParams {
    fn default() -> Self {
        Self {
            data_block_size: DEFAULT_BLOCK_SIZE,
            hash_block_size: DEFAULT_BLOCK_SIZE,
            salt_size: DEFAULT_SALT_SIZE,
            salt: None,
            uuid: None,
        }
    }
}

impl VerityParams {
    /// Default parameters with a fixed salt.
    #[must_use]
    pub fn with_salt(salt: impl Into<Vec<u8>>) -> Self {
        Self {
            salt: Some(salt.into()),
            ..Self::default()
        }
    }

    /// Salt length the superblock will carry.
    #[must_use]
    pub fn effective_salt_size(&self) -> usize {
        self.salt
            .as_ref()
            .map_or(usize::from(self.salt_size), Vec::len)
    }

    /// Check the parameters against the format's limits.
    pub fn validate(&self) -> Result<()> {
        check_block_size("data", self.data_block_size, SECTOR_SIZE as u32)?;
        check_block_size("hash", self.hash_block_size, DIGEST_SIZE as u32 * 2)?;
        if (self.hash_block_size as usize) < SUPERBLOCK_SIZE {
            return Err(VerityError::HashBlockTooSmall {
                hash_block_size: self.hash_block_size,
                required: SUPERBLOCK_SIZE,
            });
        }
        let salt_size = self.effective_salt_size();
        if salt_size > MAX_SALT_SIZE {
            return Err(VerityError::SaltTooLong(salt_size));
        }
        Ok(())
    }
}

fn check_block_size(device: &'static str, size: u32, min: u32) -> Result<()> {
    if size.is_power_of_two() && (min..=MAX_BLOCK_SIZE).contains(&size) {
        Ok(())
    } else {
        Err(VerityError::InvalidBlockSize { device, size })
    }
}
