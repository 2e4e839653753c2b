// Copyright (c) 2022, Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use criterion::{criterion_group, criterion_main, BenchmarkGroup, Criterion};
use fastmsm::bn254::g1_algebra;
use fastmsm::multiexp::ParallelMultiexp;
use fastmsm::testdata::{fibonacci_bases, random_scalars, SCALAR_WIDTH};

mod multiexp_benches {
    use super::*;

    fn multiexp(c: &mut Criterion) {
        const SIZES: [usize; 5] = [1 << 10, 1 << 12, 1 << 14, 1 << 16, 1 << 18];

        let algebra = g1_algebra();
        let engine = ParallelMultiexp::new(&algebra);

        {
            let mut bucket_method: BenchmarkGroup<_> = c.benchmark_group("Bucket-method MSM");
            bucket_method.sample_size(10);
            for n in SIZES {
                let scalars = random_scalars(n);
                let bases = fibonacci_bases(&algebra, n);
                bucket_method.bench_function(format!("n={}", n).as_str(), |b| {
                    b.iter(|| engine.multiexp(&bases, &scalars, SCALAR_WIDTH).unwrap())
                });
            }
        }

        {
            let mut naive: BenchmarkGroup<_> = c.benchmark_group("Naive MSM");
            naive.sample_size(10);
            for n in [1 << 8, 1 << 10] {
                let scalars = random_scalars(n);
                let bases = fibonacci_bases(&algebra, n);
                naive.bench_function(format!("n={}", n).as_str(), |b| {
                    b.iter(|| engine.multiexp_naive(&bases, &scalars, SCALAR_WIDTH).unwrap())
                });
            }
        }
    }

    criterion_group! {
        name = multiexp_benches;
        config = Criterion::default();
        targets = multiexp,
    }
}

criterion_main!(multiexp_benches::multiexp_benches);
