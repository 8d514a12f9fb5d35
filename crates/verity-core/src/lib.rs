// crates/verity-core/src/lib.rs

//! verity-core — build dm-verity hash devices from a streamed data device.
//!
//! dm-verity checks every block read from a read-only data device against a
//! Merkle tree stored on a hash device. This crate produces that hash device:
//!
//! - the data stream is cut into data blocks, each digested as
//!   `SHA256(salt || block)`;
//! - digests are packed into zero-padded hash blocks, forming the bottom level;
//! - each level is hashed again until a single hash block remains, whose
//!   salted digest is the **root hash**;
//! - the superblock (optional) and the levels, top first, go to the sink;
//! - a [`MappingTable`] renders the device-mapper target line.
//!
//! ```
//! use verity_core::{Encoder, VerityParams};
//!
//! let mut enc = Encoder::new(Vec::new(), VerityParams::default(), false)?;
//! enc.write(&vec![0u8; 1 << 20])?;
//! enc.close()?;
//! let table = enc.mapping_table("/dev/vda1", "/dev/vda2")?;
//! println!("{table}");
//! # Ok::<(), verity_core::VerityError>(())
//! ```

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::cast_possible_truncation,
    clippy::doc_markdown
)]

/// Streaming buffer that feeds raw data into the bottom level.
pub mod data_buffer;
/// The stateful encoder façade.
pub mod encoder;
/// Randomness providers for salts and UUIDs.
pub mod entropy;
/// Error type.
pub mod error;
/// Single hash block assembly.
pub mod hash_block;
/// Whole-level construction.
pub mod level;
/// Format constants and encoder parameters.
pub mod params;
/// Superblock layout and the salted digest.
pub mod superblock;
/// Device-mapper mapping table.
pub mod table;
/// Multi-level hash tree.
pub mod tree;

pub use data_buffer::DataBuffer;
pub use encoder::Encoder;
pub use entropy::{EntropySource, OsEntropy, SeededEntropy};
pub use error::{Result, VerityError};
pub use hash_block::{assemble_hash_block, HashBlock};
pub use level::compute_level;
pub use params::VerityParams;
pub use superblock::{salted_digest, Digest32, Superblock};
pub use table::MappingTable;
pub use tree::HashTree;
