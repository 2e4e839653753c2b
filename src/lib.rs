// Copyright (c) 2022, Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0
#![warn(missing_docs, unreachable_pub)]
#![deny(unused_must_use, rust_2018_idioms, missing_debug_implementations)]

//! Fastmsm implements batched short-Weierstrass curve arithmetic and a parallel
//! bucket-method multi-scalar multiplication (MSM) engine, instantiated for the
//! BN254 (alt_bn128) G1 group. MSM dominates prover cost in zk-proof systems; the
//! engine here defers point additions into large uniform batches so that the cost
//! of modular inversion is amortized over thousands of affine additions.

/// Lazy pairwise-addition scheduler feeding the batched-affine addition kernel.
pub mod accumulator;

/// BN254 G1 parameters and arkworks interop.
pub mod bn254;

/// Point representations and the group law, including the batched-affine kernel.
pub mod curve;

/// Error types.
pub mod error;

/// Windowed-bucket parallel multi-scalar multiplication.
pub mod multiexp;

/// Benchmark fixture format and deterministic data generation.
pub mod testdata;
