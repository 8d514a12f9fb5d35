//! Randomness for superblock UUIDs and salts.
//!
//! Production encoders draw from the operating system. Tests and
//! reproducible image builds plug in [`SeededEntropy`] instead.

use rand::rngs::{OsRng, StdRng};
use rand::{RngCore, SeedableRng, TryRngCore};

use crate::error::{Result, VerityError};

/// Source of the random bytes a superblock needs.
pub trait EntropySource {
    /// Fill `dest` completely.
    fn fill_bytes(&mut self, dest: &mut [u8]) -> Result<()>;
}

/// Operating-system CSPRNG.
#[derive(Clone, Copy, Debug, Default)]
pub struct OsEntropy;

impl EntropySource for OsEntropy {
    fn fill_bytes(&mut self, dest: &mut [u8]) -> Result<()> {
        OsRng
            .try_fill_bytes(dest)
            .map_err(|e| VerityError::Entropy(e.to_string()))
    }
}

/// Deterministic stream derived from a 64-bit seed.
#[derive(Clone, Debug)]
pub struct SeededEntropy {
    rng: StdRng,
}

impl SeededEntropy {
    /// Seeded generator; equal seeds yield equal byte streams.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl EntropySource for SeededEntropy {
    fn fill_bytes(&mut self, dest: &mut [u8]) -> Result<()> {
        self.rng.fill_bytes(dest);
        Ok(())
    }
}

impl<T: EntropySource + ?Sized> EntropySource for &mut T {
    fn fill_bytes(&mut self, dest: &mut [u8]) -> Result<()> {
        (**self).fill_bytes(dest)
    }
}
