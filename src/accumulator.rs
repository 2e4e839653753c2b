// Copyright (c) 2022, Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Lazy pairwise-addition scheduler.
//!
//! A [`BatchAccumulator`] owns a flat namespace of named accumulator slots (the MSM
//! engine's buckets) and defers every point addition destined for them. Contributions
//! are paired up as they arrive; the pending pairs are drained in large uniform
//! rounds through [`CurveAlgebra::multi_add`], so each round pays a single batched
//! field inversion instead of one inversion per addition.
//!
//! Each accumulator toggles between two states: `ready` (it holds a settled value)
//! and pending (it holds at most one `single_value` waiting for a partner). A
//! generation counter (`last_loop`) detects two results landing on the same
//! accumulator within one drain round, which re-stages the first as a pending value.

use ark_ff::PrimeField;
use rayon::prelude::*;

use crate::curve::{AffinePoint, CurveAlgebra};

/// Drain-round blocks never shrink below this many pairs.
const MIN_BLOCK_SIZE: usize = 64;
/// Drain-round blocks never grow beyond this many pairs.
const MAX_BLOCK_SIZE: usize = 16 * 1024;

#[derive(Clone, Copy, Debug)]
struct Accumulator<F: PrimeField> {
    value: AffinePoint<F>,
    single_value: AffinePoint<F>,
    ready: bool,
    last_loop: u64,
}

impl<F: PrimeField> Accumulator<F> {
    fn identity() -> Self {
        Self {
            value: AffinePoint::zero(),
            single_value: AffinePoint::zero(),
            ready: true,
            last_loop: 0,
        }
    }
}

/// Counters describing the drain behavior of one accumulator instance. Diagnostic
/// only; kept out of the per-accumulator hot data.
#[derive(Clone, Copy, Debug, Default)]
pub struct BatchStats {
    /// Number of drain rounds executed.
    pub rounds: u64,
    /// Total pairs processed across all rounds.
    pub total_pairs: u64,
    /// Largest single-round pair count.
    pub max_pairs: u64,
    /// Peak pending-queue length observed.
    pub max_pending: u64,
}

/// Per-bucket lazy pairwise-addition scheduler over one [`CurveAlgebra`].
#[derive(Debug)]
pub struct BatchAccumulator<'a, F: PrimeField> {
    algebra: &'a CurveAlgebra<F>,
    accumulators: Vec<Accumulator<F>>,
    defined: usize,
    left: Vec<AffinePoint<F>>,
    right: Vec<AffinePoint<F>>,
    results: Vec<AffinePoint<F>>,
    ids: Vec<usize>,
    current_loop: u64,
    stats: BatchStats,
}

impl<'a, F: PrimeField> BatchAccumulator<'a, F> {
    /// Create an empty scheduler. Call [`Self::define_accumulators`] to reserve
    /// slots, then [`Self::setup`] before the first contribution.
    pub fn new(algebra: &'a CurveAlgebra<F>) -> Self {
        Self {
            algebra,
            accumulators: Vec::new(),
            defined: 0,
            left: Vec::new(),
            right: Vec::new(),
            results: Vec::new(),
            ids: Vec::new(),
            current_loop: 0,
            stats: BatchStats::default(),
        }
    }

    /// Reserve a contiguous range of `count` accumulator slots and return the index
    /// of the first one. Callers compose ranges into a flat bucket namespace.
    pub fn define_accumulators(&mut self, count: usize) -> usize {
        let base = self.defined;
        self.defined += count;
        base
    }

    /// Allocate the accumulator slots and pending-pair buffers. Must be called after
    /// all [`Self::define_accumulators`] calls and before any contribution.
    pub fn setup(&mut self, initial_capacity: usize) {
        let capacity = initial_capacity.max(16);
        self.accumulators = vec![Accumulator::identity(); self.defined];
        self.left = Vec::with_capacity(capacity);
        self.right = Vec::with_capacity(capacity);
        self.results = Vec::with_capacity(capacity);
        self.ids = Vec::with_capacity(capacity);
        self.current_loop = 0;
        self.stats = BatchStats::default();
    }

    /// Number of accumulator slots defined.
    pub fn len(&self) -> usize {
        self.defined
    }

    /// True iff no accumulator slots have been defined.
    pub fn is_empty(&self) -> bool {
        self.defined == 0
    }

    /// Drain statistics for this instance.
    pub fn stats(&self) -> &BatchStats {
        &self.stats
    }

    /// Reset every accumulator to the settled identity and drop all pending pairs.
    /// Buffer capacity is retained.
    pub fn clear(&mut self) {
        for accumulator in &mut self.accumulators {
            *accumulator = Accumulator::identity();
        }
        self.left.clear();
        self.right.clear();
        self.ids.clear();
    }

    /// Contribute `value` to accumulator `id`. Identity contributions are a no-op;
    /// a settled identity absorbs the value at zero cost; anything else enqueues a
    /// pair for the next drain round.
    pub fn add_point(&mut self, id: usize, value: &AffinePoint<F>) {
        if value.is_zero() {
            return;
        }
        if self.accumulators[id].ready {
            if self.accumulators[id].value.is_zero() {
                self.accumulators[id].value = *value;
            } else {
                let settled =
                    std::mem::replace(&mut self.accumulators[id].value, AffinePoint::zero());
                self.accumulators[id].ready = false;
                self.enqueue(id, settled, *value);
            }
            return;
        }
        self.stash(id, *value);
    }

    /// Contribute the settled value of accumulator `other` to accumulator `id`.
    pub fn add(&mut self, id: usize, other: usize) {
        debug_assert!(
            self.accumulators[other].ready,
            "accumulator {other} read before settling"
        );
        let value = self.accumulators[other].value;
        self.add_point(id, &value);
    }

    /// Self-add: contribute accumulator `id`'s own settled value to itself.
    pub fn double(&mut self, id: usize) {
        let value = self.get_value(id);
        self.add_point(id, &value);
    }

    /// The settled value of accumulator `id`. Panics if it has pending work; callers
    /// must run [`Self::calculate`] to the fixed point first.
    pub fn get_value(&self, id: usize) -> AffinePoint<F> {
        assert!(
            self.accumulators[id].ready,
            "accumulator {id} queried before settling"
        );
        self.accumulators[id].value
    }

    /// True iff accumulator `id`'s settled value is the identity.
    pub fn is_zero(&self, id: usize) -> bool {
        self.accumulators[id].value.is_zero()
    }

    /// Drain the pending-pair queue exactly once through a batched multi-add, then
    /// redistribute each result to its accumulator. Returns true iff no new pending
    /// pairs were produced, i.e. every accumulator settled.
    pub fn calculate_only_one_loop(&mut self) -> bool {
        if self.ids.is_empty() {
            return true;
        }

        self.current_loop += 1;
        self.run_multi_add();

        let ids = std::mem::take(&mut self.ids);
        let results = std::mem::take(&mut self.results);
        self.left.clear();
        self.right.clear();

        for (&id, result) in ids.iter().zip(results.iter()) {
            if self.accumulators[id].last_loop != self.current_loop {
                // First result for this accumulator in this round.
                self.accumulators[id].last_loop = self.current_loop;
                if self.accumulators[id].single_value.is_zero() {
                    self.accumulators[id].ready = true;
                    self.accumulators[id].value = *result;
                } else {
                    self.stash(id, *result);
                }
                continue;
            }
            // Same-round collision: a previous result already settled this
            // accumulator, so re-stage its value as pending before adding ours.
            if self.accumulators[id].ready {
                let settled =
                    std::mem::replace(&mut self.accumulators[id].value, AffinePoint::zero());
                self.accumulators[id].single_value = settled;
                self.accumulators[id].ready = false;
            }
            self.stash(id, *result);
        }

        // Reuse the results buffer's capacity for the next round.
        let mut results = results;
        results.clear();
        self.results = results;

        self.ids.is_empty()
    }

    /// Drain to the fixed point: loop [`Self::calculate_only_one_loop`] until every
    /// accumulator settles. This is the entry point every caller actually uses.
    pub fn calculate(&mut self) {
        while !self.calculate_only_one_loop() {}
        tracing::trace!(
            rounds = self.stats.rounds,
            total_pairs = self.stats.total_pairs,
            max_pairs = self.stats.max_pairs,
            "batch accumulator drained"
        );
    }

    /// Renumber all pending accumulator ids by `offset`, in preparation for a
    /// [`Self::join`] into a scheduler where this instance's slots start at `offset`.
    pub fn prepare_to_join(&mut self, offset: usize) {
        for id in &mut self.ids {
            *id += offset;
        }
    }

    /// Merge `other`'s accumulators and pending pairs into this instance, placing
    /// its slots at `offset`. `other` must have run [`Self::prepare_to_join`] with
    /// the same offset, and slots `offset..offset + other.len()` here must still be
    /// untouched.
    pub fn join(&mut self, other: &BatchAccumulator<'_, F>, offset: usize) {
        if self.current_loop < other.current_loop {
            self.current_loop = other.current_loop;
        }
        self.accumulators[offset..offset + other.accumulators.len()]
            .copy_from_slice(&other.accumulators);
        self.left.extend_from_slice(&other.left);
        self.right.extend_from_slice(&other.right);
        self.ids.extend_from_slice(&other.ids);
    }

    /// Internal contribution to an accumulator already flagged pending: stash the
    /// value if the single slot is free, otherwise complete the pair and enqueue it.
    fn stash(&mut self, id: usize, value: AffinePoint<F>) {
        self.accumulators[id].ready = false;
        if self.accumulators[id].single_value.is_zero() {
            self.accumulators[id].single_value = value;
            return;
        }
        let partner =
            std::mem::replace(&mut self.accumulators[id].single_value, AffinePoint::zero());
        self.enqueue(id, partner, value);
    }

    fn enqueue(&mut self, id: usize, left: AffinePoint<F>, right: AffinePoint<F>) {
        self.left.push(left);
        self.right.push(right);
        self.ids.push(id);
        if self.left.len() as u64 > self.stats.max_pending {
            self.stats.max_pending = self.left.len() as u64;
        }
    }

    /// Execute one batched multi-add over all pending pairs, partitioned into blocks
    /// so the field inversions batch well while still parallelizing across cores.
    fn run_multi_add(&mut self) {
        let count = self.left.len();
        let block = Self::block_size(count);

        self.results.clear();
        self.results.resize(count, AffinePoint::zero());

        let algebra = self.algebra;
        self.results
            .par_chunks_mut(block)
            .zip(self.left.par_chunks(block))
            .zip(self.right.par_chunks(block))
            .for_each(|((results, left), right)| algebra.multi_add(results, left, right));

        self.stats.rounds += 1;
        self.stats.total_pairs += count as u64;
        if count as u64 > self.stats.max_pairs {
            self.stats.max_pairs = count as u64;
        }
    }

    fn block_size(count: usize) -> usize {
        if count <= MIN_BLOCK_SIZE {
            return count.max(1);
        }
        (count / 32).clamp(MIN_BLOCK_SIZE, MAX_BLOCK_SIZE)
    }
}
