// Copyright (c) 2022, Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! BN254 (alt_bn128) G1 instantiation: `y^2 = x^3 + 3` over the base field, with
//! generator `(1, 2)`, plus conversions to and from the arkworks point types so the
//! rest of the ecosystem (and this crate's tests) can interoperate.

use ark_bn254::G1Affine;
use ark_ec::AffineRepr;
use ark_ff::{One, Zero};

use crate::curve::{AffinePoint, CurveAlgebra};

/// The BN254 base field.
pub type Fq = ark_bn254::Fq;

/// The BN254 scalar field (group order of G1).
pub type Fr = ark_bn254::Fr;

/// The G1 group law: `a = 0`, `b = 3`, generator `(1, 2)`.
pub fn g1_algebra() -> CurveAlgebra<Fq> {
    CurveAlgebra::new(Fq::zero(), Fq::from(3u64), Fq::one(), Fq::from(2u64))
}

/// Convert to the arkworks affine representation. The `(0, 0)` identity sentinel
/// maps to the point at infinity.
pub fn to_ark(p: &AffinePoint<Fq>) -> G1Affine {
    if p.is_zero() {
        return G1Affine::zero();
    }
    G1Affine::new_unchecked(p.x, p.y)
}

/// Convert from the arkworks affine representation. The point at infinity maps to
/// the `(0, 0)` identity sentinel.
pub fn from_ark(p: &G1Affine) -> AffinePoint<Fq> {
    match p.xy() {
        Some((x, y)) => AffinePoint::new(*x, *y),
        None => AffinePoint::zero(),
    }
}
