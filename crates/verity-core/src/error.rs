//! Error type shared by every encoder stage.

use std::io;

/// Everything that can go wrong while building a hash device.
#[derive(Debug, thiserror::Error)]
pub enum VerityError {
    /// A block size is not a power of two or lies outside the supported range.
    #[error("invalid {device} block size: {size}")]
    InvalidBlockSize {
        /// Which device the size belongs to (`data` or `hash`).
        device: &'static str,
        /// The rejected size in bytes.
        size: u32,
    },

    /// The hash block cannot hold the superblock header.
    #[error("hash block size {hash_block_size} is smaller than the {required}-byte superblock")]
    HashBlockTooSmall {
        /// Configured hash block size.
        hash_block_size: u32,
        /// Bytes the superblock needs.
        required: usize,
    },

    /// The salt does not fit the superblock salt field.
    #[error("salt of {0} bytes exceeds the 256-byte superblock field")]
    SaltTooLong(usize),

    /// The randomness source failed while drawing the salt or UUID.
    #[error("entropy source failed: {0}")]
    Entropy(String),

    /// Reading from a source or writing to the hash device failed.
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    /// `write` or `close` was called on a closed encoder.
    #[error("encoder is already closed")]
    Closed,

    /// A mapping table was requested before `close`.
    #[error("encoder was not closed")]
    NotClosed,

    /// A mapping table was requested from an encoder that never saw any data.
    #[error("encoder is empty")]
    Empty,

    /// An earlier `close` failed; the output must be discarded.
    #[error("encoder failed during close and cannot be reused")]
    Poisoned,

    /// A tree level or chunk size handed to the level builders is unusable.
    #[error("invalid tree level: {0}")]
    InvalidLevel(&'static str),

    /// Bytes handed to [`crate::Superblock::decode`] are not a usable superblock.
    #[error("invalid superblock: {0}")]
    InvalidSuperblock(&'static str),
}

/// Result alias for this crate.
pub type Result<T, E = VerityError> = std::result::Result<T, E>;

impl From<VerityError> for io::Error {
    fn from(err: VerityError) -> Self {
        match err {
            VerityError::Io(inner) => inner,
            other => io::Error::other(other),
        }
    }
}
