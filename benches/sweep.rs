use criterion::{criterion_group, criterion_main, Criterion};
use knn_cv::{CrossValidationOptions, Kernel, Table};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::num::NonZeroUsize;

fn housing_like(n: usize) -> (Vec<f64>, Vec<f64>) {
    let mut rng = StdRng::seed_from_u64(0);
    let mut lstat = Vec::new();
    let mut medv = Vec::new();
    for _ in 0..n {
        let x: f64 = rng.gen_range(1.7..38.0);
        let noise: f64 = rng.gen_range(-5.0..5.0);
        lstat.push(x);
        medv.push(45.0 * (-x / 12.0).exp() + 10.0 + noise);
    }
    (lstat, medv)
}

fn sweep(c: &mut Criterion) {
    let (lstat, medv) = housing_like(506);
    let table = Table::new(&lstat, &medv).unwrap();
    let ks = (1..=50).collect::<Vec<_>>();
    let options = CrossValidationOptions::new()
        .folds(NonZeroUsize::new(10).unwrap())
        .repetitions(NonZeroUsize::new(5).unwrap())
        .seed(0);

    c.bench_function("rectangular, k=1..50, folds=10, repetitions=5, n=506", |b| {
        b.iter(|| options.sweep(&table, &ks).unwrap())
    });

    let triangular = options.clone().kernel(Kernel::Triangular);
    c.bench_function("triangular, k=1..50, folds=10, repetitions=5, n=506", |b| {
        b.iter(|| triangular.sweep(&table, &ks).unwrap())
    });

    let parallel = options.parallel(true);
    c.bench_function("parallel, k=1..50, folds=10, repetitions=5, n=506", |b| {
        b.iter(|| parallel.sweep(&table, &ks).unwrap())
    });
}

criterion_group!(benches, sweep);
criterion_main!(benches);
