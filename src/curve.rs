// Copyright (c) 2022, Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Short-Weierstrass point representations and the group law over `y^2 = x^3 + ax + b`.
//!
//! Two representations are used. [`AffinePoint`] is the plain `(x, y)` form with the
//! identity encoded as the `(0, 0)` sentinel, which is not on the curve for the
//! parameters we target. [`ExtendedPoint`] is the XYZZ form `(x, y, zz, zzz)` whose
//! affine value is `(x/zz, y/zzz)`; additions and doublings in this form need no
//! field division, so a division is only paid when converting back to affine.
//!
//! The batched-affine kernel [`CurveAlgebra::multi_add`] is the performance-critical
//! primitive: it adds many independent affine pairs at once, folding all the slope
//! inversions into a single [`batch_inversion`] call.

use std::sync::atomic::{AtomicU64, Ordering};

use ark_ff::{batch_inversion, PrimeField};

/// An affine curve point. The group identity is the `(0, 0)` sentinel.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct AffinePoint<F: PrimeField> {
    /// x coordinate.
    pub x: F,
    /// y coordinate.
    pub y: F,
}

impl<F: PrimeField> AffinePoint<F> {
    /// The identity sentinel `(0, 0)`.
    pub fn zero() -> Self {
        Self {
            x: F::zero(),
            y: F::zero(),
        }
    }

    /// Construct a point from its coordinates. No curve membership check is done.
    pub fn new(x: F, y: F) -> Self {
        Self { x, y }
    }

    /// True iff this is the identity sentinel.
    pub fn is_zero(&self) -> bool {
        self.x.is_zero() && self.y.is_zero()
    }
}

/// A curve point in extended XYZZ coordinates; the affine value is `(x/zz, y/zzz)`.
/// The identity is encoded as `zz == 0`; for any other point `zz` and `zzz` are
/// never zero.
#[derive(Clone, Copy, Debug)]
pub struct ExtendedPoint<F: PrimeField> {
    /// x numerator.
    pub x: F,
    /// y numerator.
    pub y: F,
    /// z^2 denominator of x.
    pub zz: F,
    /// z^3 denominator of y.
    pub zzz: F,
}

impl<F: PrimeField> ExtendedPoint<F> {
    /// The group identity.
    pub fn zero() -> Self {
        Self {
            x: F::one(),
            y: F::one(),
            zz: F::zero(),
            zzz: F::zero(),
        }
    }

    /// Promote an affine point, mapping the `(0, 0)` sentinel to the identity.
    pub fn from_affine(p: &AffinePoint<F>) -> Self {
        if p.is_zero() {
            return Self::zero();
        }
        Self {
            x: p.x,
            y: p.y,
            zz: F::one(),
            zzz: F::one(),
        }
    }

    /// True iff this is the identity.
    pub fn is_zero(&self) -> bool {
        self.zz.is_zero()
    }
}

/// Classification of the curve's `a` coefficient, used to skip the generic
/// multiplication in the doubling formula when a cheaper form applies.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum AClass {
    Zero,
    One,
    MinusOne,
    Generic,
}

/// Diagnostic operation counters. These are not required for correctness; they let
/// tests and benchmarks assert on the mix of operations an algorithm performs.
/// Relaxed atomics so one [`CurveAlgebra`] can be shared across rayon workers.
#[derive(Debug, Default)]
pub struct OpCounters {
    adds: AtomicU64,
    adds_mixed: AtomicU64,
    adds_affine: AtomicU64,
    doubles: AtomicU64,
    doubles_affine: AtomicU64,
    eqs: AtomicU64,
    to_affine: AtomicU64,
    multi_add_batches: AtomicU64,
    multi_add_pairs: AtomicU64,
}

impl OpCounters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Reset all counters to zero.
    pub fn reset(&self) {
        self.adds.store(0, Ordering::Relaxed);
        self.adds_mixed.store(0, Ordering::Relaxed);
        self.adds_affine.store(0, Ordering::Relaxed);
        self.doubles.store(0, Ordering::Relaxed);
        self.doubles_affine.store(0, Ordering::Relaxed);
        self.eqs.store(0, Ordering::Relaxed);
        self.to_affine.store(0, Ordering::Relaxed);
        self.multi_add_batches.store(0, Ordering::Relaxed);
        self.multi_add_pairs.store(0, Ordering::Relaxed);
    }

    /// Extended + extended additions.
    pub fn adds(&self) -> u64 {
        self.adds.load(Ordering::Relaxed)
    }

    /// Extended + affine additions.
    pub fn adds_mixed(&self) -> u64 {
        self.adds_mixed.load(Ordering::Relaxed)
    }

    /// Affine + affine additions.
    pub fn adds_affine(&self) -> u64 {
        self.adds_affine.load(Ordering::Relaxed)
    }

    /// Doublings of extended points.
    pub fn doubles(&self) -> u64 {
        self.doubles.load(Ordering::Relaxed)
    }

    /// Doublings of affine points.
    pub fn doubles_affine(&self) -> u64 {
        self.doubles_affine.load(Ordering::Relaxed)
    }

    /// Equality comparisons of points.
    pub fn eqs(&self) -> u64 {
        self.eqs.load(Ordering::Relaxed)
    }

    /// Conversions to affine form (each costs two field divisions).
    pub fn to_affine(&self) -> u64 {
        self.to_affine.load(Ordering::Relaxed)
    }

    /// Number of batched-affine kernel invocations.
    pub fn multi_add_batches(&self) -> u64 {
        self.multi_add_batches.load(Ordering::Relaxed)
    }

    /// Total point pairs processed by the batched-affine kernel.
    pub fn multi_add_pairs(&self) -> u64 {
        self.multi_add_pairs.load(Ordering::Relaxed)
    }
}

/// The group law for one short-Weierstrass curve. Holds the curve coefficients and
/// the generator; all point operations live here. Shareable across threads.
#[derive(Debug)]
pub struct CurveAlgebra<F: PrimeField> {
    a: F,
    b: F,
    generator: AffinePoint<F>,
    a_class: AClass,
    counters: OpCounters,
}

impl<F: PrimeField> CurveAlgebra<F> {
    /// Create the algebra for `y^2 = x^3 + ax + b` with generator `(gx, gy)`.
    pub fn new(a: F, b: F, gx: F, gy: F) -> Self {
        let a_class = if a.is_zero() {
            AClass::Zero
        } else if a == F::one() {
            AClass::One
        } else if a == -F::one() {
            AClass::MinusOne
        } else {
            AClass::Generic
        };
        Self {
            a,
            b,
            generator: AffinePoint::new(gx, gy),
            a_class,
            counters: OpCounters::default(),
        }
    }

    /// The curve's `a` coefficient.
    pub fn a(&self) -> F {
        self.a
    }

    /// The curve's `b` coefficient.
    pub fn b(&self) -> F {
        self.b
    }

    /// The group generator in affine form.
    pub fn generator(&self) -> AffinePoint<F> {
        self.generator
    }

    /// The group generator in extended form.
    pub fn generator_extended(&self) -> ExtendedPoint<F> {
        ExtendedPoint::from_affine(&self.generator)
    }

    /// Diagnostic operation counters.
    pub fn counters(&self) -> &OpCounters {
        &self.counters
    }

    fn mul_by_a(&self, v: F) -> F {
        match self.a_class {
            AClass::Zero => F::zero(),
            AClass::One => v,
            AClass::MinusOne => -v,
            AClass::Generic => self.a * v,
        }
    }

    /// True iff `p` satisfies the curve equation. The identity sentinel counts as
    /// a valid point.
    pub fn is_on_curve(&self, p: &AffinePoint<F>) -> bool {
        if p.is_zero() {
            return true;
        }
        let lhs = p.y.square();
        let rhs = p.x.square() * p.x + self.a * p.x + self.b;
        lhs == rhs
    }

    /// Extended + extended addition (add-2008-s).
    ///
    /// Identity operands short-circuit to a copy of the other operand; equal points
    /// delegate to [`Self::double`] since the chord formula degenerates there.
    pub fn add(&self, p1: &ExtendedPoint<F>, p2: &ExtendedPoint<F>) -> ExtendedPoint<F> {
        OpCounters::bump(&self.counters.adds);

        if p1.is_zero() {
            return *p2;
        }
        if p2.is_zero() {
            return *p1;
        }

        let u1 = p1.x * p2.zz;
        let u2 = p2.x * p1.zz;
        let s1 = p1.y * p2.zzz;
        let s2 = p2.y * p1.zzz;
        let p = u2 - u1;
        let r = s2 - s1;

        if p.is_zero() && r.is_zero() {
            return self.double(p1);
        }

        let pp = p.square();
        let ppp = p * pp;
        let q = u1 * pp;

        let x3 = r.square() - ppp - q - q;
        let y3 = r * (q - x3) - s1 * ppp;
        let zz3 = p1.zz * p2.zz * pp;
        let zzz3 = p1.zzz * p2.zzz * ppp;

        ExtendedPoint {
            x: x3,
            y: y3,
            zz: zz3,
            zzz: zzz3,
        }
    }

    /// Extended + affine addition (madd-2008-s).
    pub fn add_mixed(&self, p1: &ExtendedPoint<F>, p2: &AffinePoint<F>) -> ExtendedPoint<F> {
        OpCounters::bump(&self.counters.adds_mixed);

        if p1.is_zero() {
            return ExtendedPoint::from_affine(p2);
        }
        if p2.is_zero() {
            return *p1;
        }

        let u2 = p2.x * p1.zz;
        let s2 = p2.y * p1.zzz;
        let p = u2 - p1.x;
        let r = s2 - p1.y;

        if p.is_zero() && r.is_zero() {
            return self.double_affine(p2);
        }

        let pp = p.square();
        let ppp = p * pp;
        let q = p1.x * pp;

        let x3 = r.square() - ppp - q - q;
        let y3 = r * (q - x3) - p1.y * ppp;
        let zz3 = p1.zz * pp;
        let zzz3 = p1.zzz * ppp;

        ExtendedPoint {
            x: x3,
            y: y3,
            zz: zz3,
            zzz: zzz3,
        }
    }

    /// Affine + affine addition (madd-2008-s with both inputs normalized).
    pub fn add_affine(&self, p1: &AffinePoint<F>, p2: &AffinePoint<F>) -> ExtendedPoint<F> {
        OpCounters::bump(&self.counters.adds_affine);

        if p1.is_zero() {
            return ExtendedPoint::from_affine(p2);
        }
        if p2.is_zero() {
            return ExtendedPoint::from_affine(p1);
        }

        let p = p2.x - p1.x;
        let r = p2.y - p1.y;

        if p.is_zero() && r.is_zero() {
            return self.double_affine(p2);
        }

        let pp = p.square();
        let ppp = p * pp;
        let q = p1.x * pp;

        let x3 = r.square() - ppp - q - q;
        let y3 = r * (q - x3) - p1.y * ppp;

        ExtendedPoint {
            x: x3,
            y: y3,
            zz: pp,
            zzz: ppp,
        }
    }

    /// Doubling of an extended point (dbl-2008-s). Identity maps to identity.
    pub fn double(&self, p1: &ExtendedPoint<F>) -> ExtendedPoint<F> {
        OpCounters::bump(&self.counters.doubles);

        if p1.is_zero() {
            return *p1;
        }

        let u = p1.y + p1.y;
        let v = u.square();
        let w = u * v;
        let s = p1.x * v;

        // M = 3*X1^2 + a*ZZ1^2
        let x_sq = p1.x.square();
        let mut m = x_sq + x_sq + x_sq;
        if self.a_class != AClass::Zero {
            m += self.mul_by_a(p1.zz.square());
        }

        let x3 = m.square() - s - s;
        let y3 = m * (s - x3) - w * p1.y;
        let zz3 = v * p1.zz;
        let zzz3 = w * p1.zzz;

        ExtendedPoint {
            x: x3,
            y: y3,
            zz: zz3,
            zzz: zzz3,
        }
    }

    /// Doubling of an affine point. Identity maps to identity.
    pub fn double_affine(&self, p1: &AffinePoint<F>) -> ExtendedPoint<F> {
        OpCounters::bump(&self.counters.doubles_affine);

        if p1.is_zero() {
            return ExtendedPoint::zero();
        }

        let u = p1.y + p1.y;
        let v = u.square();
        let w = u * v;
        let s = p1.x * v;

        // M = 3*X1^2 + a
        let x_sq = p1.x.square();
        let m = x_sq + x_sq + x_sq + self.a;

        let x3 = m.square() - s - s;
        let y3 = m * (s - x3) - w * p1.y;

        ExtendedPoint {
            x: x3,
            y: y3,
            zz: v,
            zzz: w,
        }
    }

    /// Negation of an extended point.
    pub fn neg(&self, p: &ExtendedPoint<F>) -> ExtendedPoint<F> {
        ExtendedPoint {
            x: p.x,
            y: -p.y,
            zz: p.zz,
            zzz: p.zzz,
        }
    }

    /// Negation of an affine point. The identity sentinel is its own negation.
    pub fn neg_affine(&self, p: &AffinePoint<F>) -> AffinePoint<F> {
        AffinePoint {
            x: p.x,
            y: -p.y,
        }
    }

    /// Subtraction of extended points.
    pub fn sub(&self, p1: &ExtendedPoint<F>, p2: &ExtendedPoint<F>) -> ExtendedPoint<F> {
        self.add(p1, &self.neg(p2))
    }

    /// Equality of extended points by cross-multiplied comparison, avoiding the
    /// divisions an affine conversion would cost.
    pub fn eq(&self, p1: &ExtendedPoint<F>, p2: &ExtendedPoint<F>) -> bool {
        OpCounters::bump(&self.counters.eqs);

        if p1.is_zero() {
            return p2.is_zero();
        }
        if p2.is_zero() {
            return false;
        }

        let u1 = p1.x * p2.zz;
        let u2 = p2.x * p1.zz;
        let s1 = p1.y * p2.zzz;
        let s2 = p2.y * p1.zzz;

        (u2 - u1).is_zero() && (s2 - s1).is_zero()
    }

    /// Equality of an extended and an affine point, also division-free.
    pub fn eq_mixed(&self, p1: &ExtendedPoint<F>, p2: &AffinePoint<F>) -> bool {
        OpCounters::bump(&self.counters.eqs);

        if p1.is_zero() {
            return p2.is_zero();
        }
        if p2.is_zero() {
            return false;
        }

        let u2 = p2.x * p1.zz;
        let s2 = p2.y * p1.zzz;

        (u2 - p1.x).is_zero() && (s2 - p1.y).is_zero()
    }

    /// Convert to affine form. Identity maps to the `(0, 0)` sentinel; otherwise
    /// this costs two field divisions.
    pub fn to_affine(&self, p: &ExtendedPoint<F>) -> AffinePoint<F> {
        OpCounters::bump(&self.counters.to_affine);

        if p.is_zero() {
            return AffinePoint::zero();
        }
        let zz_inv = p.zz.inverse().expect("zz is nonzero for non-identity points");
        let zzz_inv = p
            .zzz
            .inverse()
            .expect("zzz is nonzero for non-identity points");
        AffinePoint {
            x: p.x * zz_inv,
            y: p.y * zzz_inv,
        }
    }

    /// Batched-affine addition: `result[i] = left[i] + right[i]` for `count`
    /// independent pairs, with all slope inversions folded into one
    /// [`batch_inversion`] call.
    ///
    /// Caller contract: no operand may be the identity sentinel, and no pair may be
    /// mutual inverses `(P, -P)`; both would feed a zero denominator into the batch
    /// inversion. The bucket accumulator guarantees this by filtering identities on
    /// entry and never negating bucket contents.
    pub fn multi_add(
        &self,
        result: &mut [AffinePoint<F>],
        left: &[AffinePoint<F>],
        right: &[AffinePoint<F>],
    ) {
        assert_eq!(left.len(), right.len());
        assert_eq!(left.len(), result.len());

        OpCounters::bump(&self.counters.multi_add_batches);
        self.counters
            .multi_add_pairs
            .fetch_add(left.len() as u64, Ordering::Relaxed);

        // Slope denominators: 2*y1 for a doubling pair, x2-x1 otherwise.
        let mut lambdas: Vec<F> = Vec::with_capacity(left.len());
        for (p1, p2) in left.iter().zip(right.iter()) {
            if p1.x == p2.x && p1.y == p2.y {
                lambdas.push(p1.y + p1.y);
            } else {
                lambdas.push(p2.x - p1.x);
            }
        }

        batch_inversion(&mut lambdas);

        for (index, (p1, p2)) in left.iter().zip(right.iter()).enumerate() {
            let lambda = if p1.x == p2.x && p1.y == p2.y {
                let x_sq = p1.x.square();
                lambdas[index] * (x_sq + x_sq + x_sq + self.a)
            } else {
                lambdas[index] * (p2.y - p1.y)
            };

            let x3 = lambda.square() - (p1.x + p2.x);
            let y3 = lambda * (p1.x - x3) - p1.y;
            result[index] = AffinePoint { x: x3, y: y3 };
        }
    }

    /// Scalar multiplication by a raw little-endian integer (no modular reduction),
    /// via plain double-and-add. This is the `n == 1` path of the MSM engine and the
    /// reference for its tests; it is not meant to be fast.
    pub fn mul_by_scalar(&self, base: &AffinePoint<F>, scalar: &[u8]) -> ExtendedPoint<F> {
        let mut r = ExtendedPoint::zero();
        if base.is_zero() {
            return r;
        }
        for byte in scalar.iter().rev() {
            for bit in (0..8).rev() {
                r = self.double(&r);
                if (byte >> bit) & 1 == 1 {
                    r = self.add_mixed(&r, base);
                }
            }
        }
        r
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bn254::{g1_algebra, to_ark, Fq};
    use ark_ec::{AffineRepr, CurveGroup};
    use proptest::prelude::*;

    fn small_multiple(algebra: &CurveAlgebra<Fq>, k: u64) -> ExtendedPoint<Fq> {
        algebra.mul_by_scalar(&algebra.generator(), &k.to_le_bytes())
    }

    #[test]
    fn identity_laws() {
        let algebra = g1_algebra();
        let zero = ExtendedPoint::zero();
        let p = small_multiple(&algebra, 17);

        assert!(zero.is_zero());
        assert!(algebra.eq(&algebra.add(&p, &zero), &p));
        assert!(algebra.eq(&algebra.add(&zero, &p), &p));
        assert!(!algebra.add_mixed(&zero, &algebra.generator()).is_zero());
        assert!(algebra.add(&zero, &zero).is_zero());
        assert!(algebra.to_affine(&zero).is_zero());
    }

    #[test]
    fn doubling_consistency() {
        let algebra = g1_algebra();
        for k in [1u64, 2, 3, 5, 101, 999] {
            let p = small_multiple(&algebra, k);
            assert!(algebra.eq(&algebra.add(&p, &p), &algebra.double(&p)));
        }
        // Affine variants agree as well.
        let g = algebra.generator();
        assert!(algebra.eq(&algebra.add_affine(&g, &g), &algebra.double_affine(&g)));
        let two_g = small_multiple(&algebra, 2);
        let two_g_affine = algebra.to_affine(&two_g);
        assert!(algebra.eq(
            &algebra.add_mixed(&two_g, &two_g_affine),
            &algebra.double(&two_g)
        ));
    }

    #[test]
    fn doubling_identity() {
        let algebra = g1_algebra();
        assert!(algebra.double(&ExtendedPoint::zero()).is_zero());
        assert!(algebra.double_affine(&AffinePoint::zero()).is_zero());
    }

    #[test]
    fn negation_cancels() {
        let algebra = g1_algebra();
        let p = small_multiple(&algebra, 42);
        assert!(algebra.add(&p, &algebra.neg(&p)).is_zero());
        assert!(algebra.sub(&p, &p).is_zero());
        let pa = algebra.to_affine(&p);
        assert!(algebra
            .add_mixed(&p, &algebra.neg_affine(&pa))
            .is_zero());
    }

    #[test]
    fn mixed_representations_agree() {
        let algebra = g1_algebra();
        let p = small_multiple(&algebra, 7);
        let q = small_multiple(&algebra, 11);
        let pa = algebra.to_affine(&p);
        let qa = algebra.to_affine(&q);

        let full = algebra.add(&p, &q);
        assert!(algebra.eq(&algebra.add_mixed(&p, &qa), &full));
        assert!(algebra.eq(&algebra.add_affine(&pa, &qa), &full));
        assert!(algebra.eq_mixed(&full, &algebra.to_affine(&full)));
    }

    #[test]
    fn affine_round_trip_matches_arkworks() {
        let algebra = g1_algebra();
        let p = small_multiple(&algebra, 12345);
        let pa = algebra.to_affine(&p);
        assert!(algebra.is_on_curve(&pa));

        let ark = (ark_bn254::G1Affine::generator() * ark_bn254::Fr::from(12345u64)).into_affine();
        assert_eq!(to_ark(&pa), ark);
    }

    #[test]
    fn multi_add_matches_serial_addition() {
        let algebra = g1_algebra();
        let mut left = Vec::new();
        let mut right = Vec::new();
        let mut expected = Vec::new();
        // Mix of generic additions and one doubling pair (k == l).
        for (k, l) in [(1u64, 2u64), (3, 3), (5, 8), (13, 21), (7, 7)] {
            let p = algebra.to_affine(&small_multiple(&algebra, k));
            let q = algebra.to_affine(&small_multiple(&algebra, l));
            expected.push(algebra.to_affine(&algebra.add_affine(&p, &q)));
            left.push(p);
            right.push(q);
        }

        let mut result = vec![AffinePoint::zero(); left.len()];
        algebra.multi_add(&mut result, &left, &right);
        assert_eq!(result, expected);
    }

    #[test]
    fn op_counters_track_usage() {
        let algebra = g1_algebra();
        algebra.counters().reset();
        let p = small_multiple(&algebra, 3);
        let before = algebra.counters().adds();
        let _ = algebra.add(&p, &p);
        assert_eq!(algebra.counters().adds(), before + 1);
        assert!(algebra.counters().doubles() > 0);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn addition_commutes(k1 in 1u64..1_000_000, k2 in 1u64..1_000_000) {
            let algebra = g1_algebra();
            let p = small_multiple(&algebra, k1);
            let q = small_multiple(&algebra, k2);
            prop_assert!(algebra.eq(&algebra.add(&p, &q), &algebra.add(&q, &p)));
        }

        #[test]
        fn addition_associates(k1 in 1u64..100_000, k2 in 1u64..100_000, k3 in 1u64..100_000) {
            let algebra = g1_algebra();
            let p = small_multiple(&algebra, k1);
            let q = small_multiple(&algebra, k2);
            let r = small_multiple(&algebra, k3);
            let lhs = algebra.add(&algebra.add(&p, &q), &r);
            let rhs = algebra.add(&p, &algebra.add(&q, &r));
            prop_assert!(algebra.eq(&lhs, &rhs));
        }
    }
}
