//! Streaming encoder: data in, superblock + hash tree out on `close`.
//!
//! The bottom tree level is kept in memory until `close`, so memory use is
//! roughly `data_size / data_blocks_per_hash_block`. Nothing reaches the
//! sink before `close`.

use std::io::{self, Write};

use tracing::debug;

use crate::data_buffer::DataBuffer;
use crate::entropy::{EntropySource, OsEntropy};
use crate::error::{Result, VerityError};
use crate::params::VerityParams;
use crate::superblock::{Digest32, Superblock};
use crate::table::MappingTable;
use crate::tree::HashTree;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    Open,
    Closed { root_hash: Digest32 },
    ClosedEmpty,
    Poisoned,
}

/// Turns a data device byte stream into a verity hash device.
///
/// ```
/// use verity_core::{Encoder, SeededEntropy, VerityParams};
///
/// let mut hash_dev = Vec::new();
/// let mut enc = Encoder::with_entropy(&mut hash_dev, VerityParams::default(), true, SeededEntropy::new(1))?;
/// enc.write(&[0u8; 8192])?;
/// enc.close()?;
/// let table = enc.mapping_table("/dev/vda", "/dev/vdb")?;
/// assert!(table.to_string().starts_with("0 16 verity 1 /dev/vda /dev/vdb 4096 4096 2 1 sha256 "));
/// # Ok::<(), verity_core::VerityError>(())
/// ```
#[derive(Debug)]
pub struct Encoder<W: Write> {
    out: W,
    write_superblock: bool,
    sb: Superblock,
    data: DataBuffer,
    bottom: Vec<u8>,
    state: State,
}

impl<W: Write> Encoder<W> {
    /// Encoder with a salt and UUID from the operating system.
    /// When `write_superblock` is set the superblock precedes the tree.
    pub fn new(out: W, params: VerityParams, write_superblock: bool) -> Result<Self> {
        Self::with_entropy(out, params, write_superblock, OsEntropy)
    }

    /// Encoder drawing its salt and UUID from `entropy`.
    pub fn with_entropy(
        out: W,
        params: VerityParams,
        write_superblock: bool,
        entropy: impl EntropySource,
    ) -> Result<Self> {
        let sb = Superblock::new(&params, entropy)?;
        Ok(Self {
            out,
            write_superblock,
            sb,
            data: DataBuffer::new(),
            bottom: Vec::new(),
            state: State::Open,
        })
    }

    /// Feed the next bytes of the data device. Always accepts all of `data`.
    pub fn write(&mut self, data: &[u8]) -> Result<usize> {
        self.ensure_open()?;
        let hashed = self.data.write(&self.sb, data, &mut self.bottom);
        self.sb.add_data_blocks(hashed);
        Ok(data.len())
    }

    /// Digest buffered data, build the tree and write it out.
    ///
    /// An encoder that never received data writes nothing. Afterwards the
    /// encoder accepts no more data.
    pub fn close(&mut self) -> Result<()> {
        self.ensure_open()?;
        let hashed = self.data.finish(&self.sb, &mut self.bottom);
        self.sb.add_data_blocks(hashed);

        if self.bottom.is_empty() {
            debug!("closing empty verity encoder, nothing written");
            self.state = State::ClosedEmpty;
            return Ok(());
        }

        let built = HashTree::build(&self.sb, std::mem::take(&mut self.bottom));
        match built.and_then(|tree| self.emit(&tree).map(|written| (tree, written))) {
            Ok((tree, written)) => {
                debug!(
                    data_blocks = self.sb.data_blocks(),
                    levels = tree.height(),
                    bytes = written,
                    "wrote verity hash tree"
                );
                self.state = State::Closed {
                    root_hash: tree.root_hash(),
                };
                Ok(())
            }
            Err(e) => {
                self.state = State::Poisoned;
                Err(e)
            }
        }
    }

    fn emit(&mut self, tree: &HashTree) -> Result<u64> {
        let mut written = 0;
        if self.write_superblock {
            written += self.sb.write_to(&mut self.out)?;
        }
        written += tree.write_to(&mut self.out)?;
        self.out.flush()?;
        Ok(written)
    }

    fn ensure_open(&self) -> Result<()> {
        match self.state {
            State::Open => Ok(()),
            State::Poisoned => Err(VerityError::Poisoned),
            State::Closed { .. } | State::ClosedEmpty => Err(VerityError::Closed),
        }
    }

    /// Mapping table for a hash device that starts at block zero.
    pub fn mapping_table(
        &self,
        data_device: impl Into<String>,
        hash_device: impl Into<String>,
    ) -> Result<MappingTable> {
        self.mapping_table_at(data_device, hash_device, 0)
    }

    /// Mapping table for a hash device whose output begins `offset_blocks`
    /// hash blocks into `hash_device`, as when the tree is appended to the
    /// data image.
    pub fn mapping_table_at(
        &self,
        data_device: impl Into<String>,
        hash_device: impl Into<String>,
        offset_blocks: u64,
    ) -> Result<MappingTable> {
        let root_hash = match self.state {
            State::Closed { root_hash } => root_hash,
            State::Open => return Err(VerityError::NotClosed),
            State::ClosedEmpty => return Err(VerityError::Empty),
            State::Poisoned => return Err(VerityError::Poisoned),
        };
        let hash_start = offset_blocks + u64::from(self.write_superblock);
        Ok(MappingTable::new(
            &self.sb,
            root_hash,
            hash_start,
            data_device.into(),
            hash_device.into(),
        ))
    }

    /// Root hash, once closed with data.
    #[must_use]
    pub fn root_hash(&self) -> Option<Digest32> {
        match self.state {
            State::Closed { root_hash } => Some(root_hash),
            _ => None,
        }
    }

    /// The superblock; `data_blocks` is final after `close`.
    #[must_use]
    pub fn superblock(&self) -> &Superblock {
        &self.sb
    }

    /// Borrow the sink.
    #[must_use]
    pub fn get_ref(&self) -> &W {
        &self.out
    }

    /// Give back the sink.
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Write for Encoder<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Encoder::write(self, buf).map_err(io::Error::from)
    }

    // Output is produced by `close`; there is nothing to flush before it.
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
