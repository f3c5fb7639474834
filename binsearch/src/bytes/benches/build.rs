use super::utils;
use binsearch::{CounterBytesBuilder, KeyBytes, KeyBytesBuilder};
use criterion::{criterion_group, Criterion};

fn bench_build(c: &mut Criterion) {
    for n in [1_000, 10_000, 100_000] {
        for max_len in [8, 64] {
            let keys = utils::keys(n, max_len);
            c.bench_function(
                &format!("{}/variant=builder n={n} max_len={max_len}", module_path!()),
                |b| {
                    b.iter(|| {
                        let mut builder = KeyBytesBuilder::new();
                        for key in &keys {
                            builder.add_unsorted(key).unwrap();
                        }
                        builder.build()
                    })
                },
            );
            c.bench_function(
                &format!("{}/variant=counter n={n} max_len={max_len}", module_path!()),
                |b| {
                    b.iter(|| {
                        let mut builder = CounterBytesBuilder::new();
                        for key in &keys {
                            builder.add_unsorted(key, 1).unwrap();
                        }
                        builder.build()
                    })
                },
            );

            // Incremental inserts are quadratic, so skip the largest size.
            if n > 10_000 {
                continue;
            }
            c.bench_function(
                &format!("{}/variant=add n={n} max_len={max_len}", module_path!()),
                |b| {
                    b.iter(|| {
                        let mut index = KeyBytes::new();
                        for key in &keys {
                            index.add(key).unwrap();
                        }
                        index
                    })
                },
            );
        }
    }
}

criterion_group! {
    name = benches;
    config = Criterion::default().sample_size(10);
    targets = bench_build
}
