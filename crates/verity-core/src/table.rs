//! Device-mapper `verity` target table.

use std::fmt;

use serde::Serialize;

use crate::params::SECTOR_SIZE;
use crate::superblock::{Digest32, Superblock};

/// Everything needed to map a verity target over a data and hash device.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MappingTable {
    /// Data device path; may be replaced with an alias before rendering.
    pub data_device: String,
    /// Hash device path; may be replaced with an alias before rendering.
    pub hash_device: String,
    /// Bytes per data block.
    pub data_block_size: u32,
    /// Bytes per hash block.
    pub hash_block_size: u32,
    /// Number of data blocks covered by the tree.
    pub data_blocks: u64,
    /// Hash device block where the tree's top level starts.
    pub hash_start: u64,
    /// Digest algorithm name.
    pub algorithm: String,
    /// Salted digest of the top hash block.
    #[serde(with = "hex::serde")]
    pub root_hash: Digest32,
    /// Salt used for every digest.
    #[serde(with = "hex::serde")]
    pub salt: Vec<u8>,
}

impl MappingTable {
    pub(crate) fn new(
        sb: &Superblock,
        root_hash: Digest32,
        hash_start: u64,
        data_device: String,
        hash_device: String,
    ) -> Self {
        Self {
            data_device,
            hash_device,
            data_block_size: sb.data_block_size(),
            hash_block_size: sb.hash_block_size(),
            data_blocks: sb.data_blocks(),
            hash_start,
            algorithm: sb.algorithm_name().to_owned(),
            root_hash,
            salt: sb.salt().to_vec(),
        }
    }

    /// Data device length in 512-byte sectors.
    #[must_use]
    pub fn length(&self) -> u64 {
        self.data_blocks * u64::from(self.data_block_size) / SECTOR_SIZE
    }

    /// The verity target's own arguments, in table order.
    #[must_use]
    pub fn verity_parameters(&self) -> Vec<String> {
        vec![
            "1".to_owned(),
            self.data_device.clone(),
            self.hash_device.clone(),
            self.data_block_size.to_string(),
            self.hash_block_size.to_string(),
            self.data_blocks.to_string(),
            self.hash_start.to_string(),
            self.algorithm.clone(),
            hex::encode(self.root_hash),
            hex::encode(&self.salt),
        ]
    }

    /// Full target line: start sector, length, target type, then the
    /// verity arguments.
    #[must_use]
    pub fn target_parameters(&self) -> Vec<String> {
        let mut params = vec!["0".to_owned(), self.length().to_string(), "verity".to_owned()];
        params.extend(self.verity_parameters());
        params
    }
}

// Device paths are emitted verbatim; whitespace in them is not escaped.
impl fmt::Display for MappingTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.target_parameters().join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> MappingTable {
        MappingTable {
            data_device: "/dev/sda".into(),
            hash_device: "/dev/sdb".into(),
            data_block_size: 4096,
            hash_block_size: 4096,
            data_blocks: 3,
            hash_start: 1,
            algorithm: "sha256".into(),
            root_hash: [0xAB; 32],
            salt: vec![0x01, 0xFE],
        }
    }

    #[test]
    fn length_in_sectors() {
        assert_eq!(table().length(), 24);
    }

    #[test]
    fn renders_target_line() {
        let expected = format!("0 24 verity 1 /dev/sda /dev/sdb 4096 4096 3 1 sha256 {} 01fe", "ab".repeat(32));
        assert_eq!(table().to_string(), expected);
        assert_eq!(table().verity_parameters().len(), 10);
    }

    #[test]
    fn json_uses_hex() {
        let v = serde_json::to_value(table()).unwrap();
        assert_eq!(v["salt"], "01fe");
        assert_eq!(v["root_hash"], "ab".repeat(32));
        assert_eq!(v["hash_start"], 1);
    }
}
