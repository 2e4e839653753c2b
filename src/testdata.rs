// Copyright (c) 2022, Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Benchmark fixture format and deterministic test-data generation.
//!
//! The fixture file layout is: an 8-byte little-endian record count `n`, followed by
//! `n * SCALAR_WIDTH` bytes of raw scalar data, followed by `n` affine points stored
//! as two 32-byte little-endian field elements each. No versioning, no checksum;
//! points are validated against the curve equation on read.
//!
//! Data generation mirrors the reference benchmark: scalars come from a Lehmer64
//! multiplicative PRNG with a fixed seed, bases from a Fibonacci-like recurrence
//! starting at the generator. Together they reproduce the published golden MSM
//! result over one million pairs.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};

use crate::bn254::Fq;
use crate::curve::{AffinePoint, CurveAlgebra};
use crate::error::{MsmError, MsmResult};

/// Byte width of the scalars in fixture files.
pub const SCALAR_WIDTH: usize = 32;

/// Multiplicative Lehmer PRNG with 128-bit state, returning the high 64 bits of the
/// state after each step. The default seed and multiplier are the ones the reference
/// benchmark data was generated with.
#[derive(Clone, Debug)]
pub struct Lehmer64 {
    state: u128,
}

impl Lehmer64 {
    const SEED: u128 = 0xAAAA_AAAA_AAAA_AAAA;
    const MULTIPLIER: u128 = 0xda94_2042_e4dd_58b5;

    /// PRNG with the reference seed.
    pub fn new() -> Self {
        Self::from_state(Self::SEED)
    }

    /// PRNG with an explicit starting state.
    pub fn from_state(state: u128) -> Self {
        Self { state }
    }

    /// Next 64 bits of output.
    pub fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_mul(Self::MULTIPLIER);
        (self.state >> 64) as u64
    }
}

impl Default for Lehmer64 {
    fn default() -> Self {
        Self::new()
    }
}

/// Generate `n` raw 32-byte scalars from the reference PRNG, 8 bytes at a time.
/// These are arbitrary 256-bit integers, not reduced modulo the group order.
pub fn random_scalars(n: usize) -> Vec<u8> {
    let mut rng = Lehmer64::new();
    let mut scalars = vec![0u8; n * SCALAR_WIDTH];
    for word in scalars.chunks_exact_mut(8) {
        word.copy_from_slice(&rng.next_u64().to_le_bytes());
    }
    scalars
}

/// Generate `n` bases by the reference recurrence: `base[0] = base[1] = G`,
/// `base[i] = base[i-1] + base[i-2]`.
pub fn fibonacci_bases(algebra: &CurveAlgebra<Fq>, n: usize) -> Vec<AffinePoint<Fq>> {
    let mut bases = Vec::with_capacity(n);
    for i in 0..n {
        if i < 2 {
            bases.push(algebra.generator());
            continue;
        }
        let sum = algebra.add_affine(&bases[i - 1], &bases[i - 2]);
        bases.push(algebra.to_affine(&sum));
    }
    bases
}

/// Write a fixture file. `scalars` must hold exactly `bases.len() * SCALAR_WIDTH`
/// bytes.
pub fn write_fixture(
    path: &Path,
    scalars: &[u8],
    bases: &[AffinePoint<Fq>],
) -> MsmResult<()> {
    if scalars.len() != bases.len() * SCALAR_WIDTH {
        return Err(MsmError::MismatchedLengths(
            bases.len() * SCALAR_WIDTH,
            scalars.len(),
        ));
    }
    let mut writer = BufWriter::new(File::create(path)?);
    writer.write_all(&(bases.len() as u64).to_le_bytes())?;
    writer.write_all(scalars)?;
    for base in bases {
        // Fq serializes compressed as exactly 32 little-endian bytes.
        base.x.serialize_compressed(&mut writer)?;
        base.y.serialize_compressed(&mut writer)?;
    }
    writer.flush()?;
    Ok(())
}

/// Read a fixture file back, validating every point against the curve equation
/// (the identity sentinel is accepted).
pub fn read_fixture(
    path: &Path,
    algebra: &CurveAlgebra<Fq>,
) -> MsmResult<(Vec<u8>, Vec<AffinePoint<Fq>>)> {
    let mut reader = BufReader::new(File::open(path)?);

    let mut count_bytes = [0u8; 8];
    reader.read_exact(&mut count_bytes)?;
    let n = u64::from_le_bytes(count_bytes) as usize;

    let mut scalars = vec![0u8; n * SCALAR_WIDTH];
    reader.read_exact(&mut scalars)?;

    let mut bases = Vec::with_capacity(n);
    for _ in 0..n {
        let x = Fq::deserialize_compressed(&mut reader)?;
        let y = Fq::deserialize_compressed(&mut reader)?;
        let point = AffinePoint::new(x, y);
        if !algebra.is_on_curve(&point) {
            return Err(MsmError::PointNotOnCurve);
        }
        bases.push(point);
    }
    Ok((scalars, bases))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bn254::g1_algebra;

    #[test]
    fn lehmer64_is_deterministic() {
        let mut a = Lehmer64::new();
        let mut b = Lehmer64::new();
        let first = a.next_u64();
        assert_eq!(first, b.next_u64());
        assert_ne!(first, a.next_u64());
    }

    #[test]
    fn fibonacci_bases_follow_the_recurrence() {
        let algebra = g1_algebra();
        let bases = fibonacci_bases(&algebra, 6);
        assert_eq!(bases[0], algebra.generator());
        assert_eq!(bases[1], algebra.generator());
        for i in 2..6 {
            let sum = algebra.to_affine(&algebra.add_affine(&bases[i - 1], &bases[i - 2]));
            assert_eq!(bases[i], sum);
            assert!(algebra.is_on_curve(&bases[i]));
        }
    }

    #[test]
    fn fixture_round_trip() {
        let algebra = g1_algebra();
        let n = 10;
        let scalars = random_scalars(n);
        let bases = fibonacci_bases(&algebra, n);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("testdata.dat");
        write_fixture(&path, &scalars, &bases).unwrap();

        let (read_scalars, read_bases) = read_fixture(&path, &algebra).unwrap();
        assert_eq!(read_scalars, scalars);
        assert_eq!(read_bases, bases);
    }

    #[test]
    fn fixture_rejects_off_curve_points() {
        let algebra = g1_algebra();
        let scalars = random_scalars(1);
        let bogus = AffinePoint::new(Fq::from(5u64), Fq::from(5u64));
        assert!(!algebra.is_on_curve(&bogus));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bogus.dat");
        write_fixture(&path, &scalars, &[bogus]).unwrap();
        assert!(matches!(
            read_fixture(&path, &algebra),
            Err(MsmError::PointNotOnCurve)
        ));
    }

    #[test]
    fn write_fixture_checks_lengths() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("short.dat");
        let result = write_fixture(&path, &[0u8; 16], &[AffinePoint::zero()]);
        assert!(matches!(result, Err(MsmError::MismatchedLengths(32, 16))));
    }
}
