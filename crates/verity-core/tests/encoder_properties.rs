//! Behavioural properties of the streaming encoder.
//!
//! - output depends only on the byte stream, not on write boundaries;
//! - equal salts give equal trees, and a single flipped bit moves the root;
//! - edge sizes (one byte, nothing at all) behave as documented.

#![allow(clippy::unwrap_used)]

use proptest::prelude::*;
use verity_core::{Encoder, SeededEntropy, VerityError, VerityParams};

/// Small blocks keep multi-level trees cheap to build.
fn small_params() -> VerityParams {
    VerityParams {
        data_block_size: 512,
        hash_block_size: 512,
        ..VerityParams::default()
    }
}

fn run(params: &VerityParams, seed: u64, pieces: &[&[u8]]) -> ([u8; 32], Vec<u8>) {
    let mut enc = Encoder::with_entropy(Vec::new(), params.clone(), true, SeededEntropy::new(seed)).unwrap();
    for p in pieces {
        assert_eq!(enc.write(p).unwrap(), p.len());
    }
    enc.close().unwrap();
    let root = enc.root_hash().unwrap();
    (root, enc.into_inner())
}

fn pseudo_random(n: usize, seed: u32) -> Vec<u8> {
    let mut x = seed.wrapping_mul(0x9E37_79B9) | 1;
    (0..n)
        .map(|_| {
            x ^= x << 13;
            x ^= x >> 17;
            x ^= x << 5;
            x as u8
        })
        .collect()
}

#[test]
fn deterministic_for_fixed_entropy() {
    let data = pseudo_random(4096 * 200 + 17, 1);
    let a = run(&VerityParams::default(), 42, &[&data[..]]);
    let b = run(&VerityParams::default(), 42, &[&data[..]]);
    assert_eq!(a, b);

    // A different salt gives a different tree.
    let c = run(&VerityParams::default(), 43, &[&data[..]]);
    assert_ne!(a.0, c.0);
}

#[test]
fn byte_at_a_time_matches_one_shot() {
    let data = pseudo_random(512 * 40 + 3, 2);
    let one_shot = run(&small_params(), 7, &[&data[..]]);
    let singles: Vec<&[u8]> = data.chunks(1).collect();
    assert_eq!(run(&small_params(), 7, &singles), one_shot);
}

#[test]
fn single_bit_flip_changes_root() {
    let data = pseudo_random(512 * 70, 3);
    let base = run(&small_params(), 9, &[&data[..]]).0;
    for pos in [0, 511, 512 * 35 + 100, data.len() - 1] {
        let mut flipped = data.clone();
        flipped[pos] ^= 0x01;
        assert_ne!(run(&small_params(), 9, &[&flipped[..]]).0, base, "flip at {pos}");
    }
}

#[test]
fn one_byte_gives_one_padded_block() {
    let params = VerityParams {
        uuid: Some([1; 16]),
        ..VerityParams::with_salt(vec![0x33; 64])
    };
    let mut enc = Encoder::with_entropy(Vec::new(), params, false, SeededEntropy::new(0)).unwrap();
    enc.write(&[0xEE]).unwrap();
    enc.close().unwrap();

    let root = enc.root_hash().unwrap();
    let sb = enc.superblock().clone();
    let out = enc.into_inner();
    assert_eq!(out.len(), 4096);
    assert_eq!(&out[..32], &sb.salted_digest(&[0xEE]));
    assert!(out[32..].iter().all(|&b| b == 0));
    assert_eq!(root, sb.salted_digest(&out));
}

#[test]
fn empty_writes_still_empty() {
    let mut enc = Encoder::with_entropy(Vec::new(), VerityParams::default(), true, SeededEntropy::new(0)).unwrap();
    enc.write(&[]).unwrap();
    enc.close().unwrap();
    assert!(matches!(enc.mapping_table("a", "b"), Err(VerityError::Empty)));
    assert!(enc.into_inner().is_empty());
}

#[test]
fn unusable_params_fail_at_construction() {
    let params = VerityParams {
        hash_block_size: 128,
        ..VerityParams::default()
    };
    let err = Encoder::with_entropy(Vec::new(), params, true, SeededEntropy::new(0)).unwrap_err();
    assert!(matches!(err, VerityError::HashBlockTooSmall { .. }));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Any split of the stream into writes yields the same root and bytes.
    #[test]
    fn write_boundaries_do_not_matter(
        len in 1usize..(512 * 40),
        cuts in proptest::collection::vec(any::<prop::sample::Index>(), 0..12),
        seed in any::<u32>(),
    ) {
        let data = pseudo_random(len, seed);
        let mut offsets: Vec<usize> = cuts.iter().map(|c| c.index(len)).collect();
        offsets.push(0);
        offsets.push(len);
        offsets.sort_unstable();
        offsets.dedup();
        let pieces: Vec<&[u8]> = offsets.windows(2).map(|w| &data[w[0]..w[1]]).collect();

        let whole = run(&small_params(), 5, &[&data[..]]);
        prop_assert_eq!(run(&small_params(), 5, &pieces), whole);
    }

    /// Data block count always covers every byte written.
    #[test]
    fn data_blocks_cover_input(len in 1usize..(512 * 40)) {
        let data = vec![0u8; len];
        let mut enc = Encoder::with_entropy(Vec::new(), small_params(), false, SeededEntropy::new(1)).unwrap();
        enc.write(&data).unwrap();
        enc.close().unwrap();
        prop_assert_eq!(enc.superblock().data_blocks(), len.div_ceil(512) as u64);
    }
}
