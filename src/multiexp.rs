// Copyright (c) 2022, Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Windowed-bucket (Pippenger-style) parallel multi-scalar multiplication.
//!
//! `multiexp` computes `sum(scalar[i] * base[i])` by splitting every scalar into
//! fixed-width bit windows ("chunks"), bucketing each base by its window digit,
//! summing the buckets through the [`BatchAccumulator`], and reducing the buckets by
//! iterative halving. Chunks are independent and processed in parallel, each with
//! its own accumulator instance; the per-chunk results are combined sequentially
//! with shift-and-add, most-significant chunk first.
//!
//! Scalars are raw little-endian integers of a fixed byte width. No reduction modulo
//! the group order is performed; callers wanting reduced semantics must reduce
//! before calling.

use ark_ff::PrimeField;
use rayon::prelude::*;

use crate::accumulator::BatchAccumulator;
use crate::curve::{AffinePoint, CurveAlgebra, ExtendedPoint};
use crate::error::{MsmError, MsmResult};

/// Bucket-count target: windows are sized so each chunk has about `n / PACK_FACTOR`
/// buckets.
pub const PACK_FACTOR: usize = 2;
/// Lower clamp for the window width in bits.
pub const MIN_CHUNK_SIZE_BITS: usize = 2;
/// Upper clamp for the window width in bits.
pub const MAX_CHUNK_SIZE_BITS: usize = 16;

/// Window decomposition parameters derived from the input size and scalar width.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct ChunkingPlan {
    pub(crate) bits_per_chunk: usize,
    pub(crate) n_chunks: usize,
    pub(crate) accs_per_chunk: usize,
}

impl ChunkingPlan {
    pub(crate) fn new(n: usize, scalar_size: usize) -> Self {
        let ratio = n / PACK_FACTOR;
        let bits_per_chunk = if ratio <= 1 {
            MIN_CHUNK_SIZE_BITS
        } else {
            let log2 = (usize::BITS - 1 - ratio.leading_zeros()) as usize;
            log2.clamp(MIN_CHUNK_SIZE_BITS, MAX_CHUNK_SIZE_BITS)
        };
        let n_chunks = (scalar_size * 8 - 1) / bits_per_chunk + 1;
        let accs_per_chunk = 1 << bits_per_chunk;
        Self {
            bits_per_chunk,
            n_chunks,
            accs_per_chunk,
        }
    }
}

/// Parallel bucket-method multi-exponentiation over one [`CurveAlgebra`].
#[derive(Debug)]
pub struct ParallelMultiexp<'a, F: PrimeField> {
    algebra: &'a CurveAlgebra<F>,
}

impl<'a, F: PrimeField> ParallelMultiexp<'a, F> {
    /// Create a multi-exponentiation engine over `algebra`.
    pub fn new(algebra: &'a CurveAlgebra<F>) -> Self {
        Self { algebra }
    }

    /// Compute `sum(scalar[i] * base[i])`.
    ///
    /// `scalars` is a byte-packed array of `bases.len()` little-endian integers of
    /// `scalar_size` bytes each. Identity bases and zero digits contribute nothing.
    #[tracing::instrument(skip_all, fields(n = bases.len(), scalar_size))]
    pub fn multiexp(
        &self,
        bases: &[AffinePoint<F>],
        scalars: &[u8],
        scalar_size: usize,
    ) -> MsmResult<ExtendedPoint<F>> {
        if scalar_size == 0 {
            return Err(MsmError::InvalidInput);
        }
        let n = bases.len();
        if scalars.len() != n * scalar_size {
            return Err(MsmError::MismatchedLengths(n * scalar_size, scalars.len()));
        }

        if n == 0 {
            return Ok(ExtendedPoint::zero());
        }
        if n == 1 {
            return Ok(self.algebra.mul_by_scalar(&bases[0], scalars));
        }

        let plan = ChunkingPlan::new(n, scalar_size);
        tracing::debug!(
            bits_per_chunk = plan.bits_per_chunk,
            n_chunks = plan.n_chunks,
            "multiexp window plan"
        );

        // Each chunk owns its accumulator instance and output slot, so the chunk
        // loop is pure fork-join with no shared mutable state.
        let chunk_results: Vec<AffinePoint<F>> = (0..plan.n_chunks)
            .into_par_iter()
            .map(|chunk_idx| self.process_chunk(bases, scalars, scalar_size, plan, chunk_idx))
            .collect();

        // Combine chunk results most-significant first: double bits_per_chunk times
        // per step, then add the next chunk down. Strictly sequential.
        let mut r = ExtendedPoint::from_affine(&chunk_results[plan.n_chunks - 1]);
        for chunk_result in chunk_results[..plan.n_chunks - 1].iter().rev() {
            for _ in 0..plan.bits_per_chunk {
                r = self.algebra.double(&r);
            }
            r = self.algebra.add_mixed(&r, chunk_result);
        }
        Ok(r)
    }

    /// Bucket every base by its digit in `chunk_idx`'s window, drain, and reduce to
    /// this chunk's contribution.
    fn process_chunk(
        &self,
        bases: &[AffinePoint<F>],
        scalars: &[u8],
        scalar_size: usize,
        plan: ChunkingPlan,
        chunk_idx: usize,
    ) -> AffinePoint<F> {
        let mut ba = BatchAccumulator::new(self.algebra);
        // Bucket 0 is never populated (a zero digit contributes nothing); one extra
        // slot past the buckets holds the chunk's running result.
        ba.define_accumulators(plan.accs_per_chunk + 1);
        let result_ref = plan.accs_per_chunk;
        ba.setup(bases.len() / 2 + 16);

        for (i, base) in bases.iter().enumerate() {
            if base.is_zero() {
                continue;
            }
            let digit = get_chunk(scalars, scalar_size, i, chunk_idx, plan.bits_per_chunk);
            if digit != 0 {
                ba.add_point(digit, base);
            }
        }
        ba.calculate();

        self.reduce_chunk(&mut ba, plan.bits_per_chunk, result_ref);
        ba.get_value(result_ref)
    }

    /// Bucket reduction by iterative halving: computes
    /// `sum(k * bucket[k] for k in 1..2^bits)` into `result_ref` using O(2^bits)
    /// additions. Every addition goes through the accumulator so it lands in a
    /// batched drain.
    fn reduce_chunk(&self, ba: &mut BatchAccumulator<'_, F>, bits: usize, result_ref: usize) {
        let mut n_bits = bits;
        loop {
            if n_bits == 1 {
                // Last remaining bucket carries weight 1.
                if !ba.is_zero(1) {
                    ba.add(result_ref, 1);
                    ba.calculate();
                }
                return;
            }
            let ndiv2 = 1usize << (n_bits - 1);

            // Fold the top half down: bucket ndiv2+i keeps weight i in bucket i and
            // contributes its ndiv2 factor to the weight-ndiv2 accumulator.
            for i in 1..ndiv2 {
                if ba.is_zero(ndiv2 + i) {
                    continue;
                }
                ba.add(i, ndiv2 + i);
                ba.add(ndiv2, ndiv2 + i);
            }
            ba.calculate();

            // Multiply the weight-ndiv2 accumulator by 2^(n_bits-1) and fold it
            // into the chunk result.
            for _ in 0..n_bits - 1 {
                ba.double(ndiv2);
                ba.calculate();
            }
            if !ba.is_zero(ndiv2) {
                ba.add(result_ref, ndiv2);
                ba.calculate();
            }
            n_bits -= 1;
        }
    }

    /// One-by-one reference evaluation: `sum(mul_by_scalar(base[i], scalar[i]))`.
    /// Exact but slow; it exists as the correctness baseline for the bucket method.
    pub fn multiexp_naive(
        &self,
        bases: &[AffinePoint<F>],
        scalars: &[u8],
        scalar_size: usize,
    ) -> MsmResult<ExtendedPoint<F>> {
        if scalar_size == 0 {
            return Err(MsmError::InvalidInput);
        }
        if scalars.len() != bases.len() * scalar_size {
            return Err(MsmError::MismatchedLengths(
                bases.len() * scalar_size,
                scalars.len(),
            ));
        }
        let mut acc = ExtendedPoint::zero();
        for (i, base) in bases.iter().enumerate() {
            let scalar = &scalars[i * scalar_size..(i + 1) * scalar_size];
            acc = self
                .algebra
                .add(&acc, &self.algebra.mul_by_scalar(base, scalar));
        }
        Ok(acc)
    }
}

/// Extract scalar `scalar_idx`'s `bits`-bit digit for window `chunk_idx`, reading
/// the byte-packed little-endian scalar array.
fn get_chunk(
    scalars: &[u8],
    scalar_size: usize,
    scalar_idx: usize,
    chunk_idx: usize,
    bits: usize,
) -> usize {
    let bit_start = chunk_idx * bits;
    let total_bits = scalar_size * 8;
    let effective_bits = bits.min(total_bits - bit_start);

    let byte_start = bit_start / 8;
    let shift = bit_start - byte_start * 8;

    let scalar = &scalars[scalar_idx * scalar_size..(scalar_idx + 1) * scalar_size];
    let mut window: u64 = 0;
    for (k, byte) in scalar[byte_start..].iter().take(8).enumerate() {
        window |= (*byte as u64) << (8 * k);
    }
    window >>= shift;
    (window & ((1u64 << effective_bits) - 1)) as usize
}
