use super::utils;
use binsearch::KeyBytesBuilder;
use criterion::{black_box, criterion_group, Criterion};

fn bench_find(c: &mut Criterion) {
    for n in [1_000, 100_000] {
        for max_len in [8, 64] {
            let keys = utils::keys(n, max_len);
            let mut builder = KeyBytesBuilder::new();
            for key in &keys {
                builder.add_unsorted(key).unwrap();
            }
            let (index, _) = builder.build();

            c.bench_function(
                &format!("{}/n={n} max_len={max_len}", module_path!()),
                |b| {
                    b.iter(|| {
                        for key in &keys {
                            black_box(index.find(key).unwrap());
                        }
                    })
                },
            );
        }
    }
}

criterion_group! {
    name = benches;
    config = Criterion::default().sample_size(10);
    targets = bench_find
}
