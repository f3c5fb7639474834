use binsearch::numeric::{KeyU32, KeyValInt};
use criterion::{black_box, criterion_group, Criterion};
use rand::{rngs::StdRng, Rng, SeedableRng};

fn bench_find(c: &mut Criterion) {
    for n in [10_000, 100_000] {
        let mut rng = StdRng::seed_from_u64(0);
        let mut keys = KeyU32::new();
        let mut values = KeyValInt::new();
        let mut probes = Vec::with_capacity(n);
        for _ in 0..n {
            let key: u32 = rng.gen();
            keys.add(key);
            values.add(key as i64 - i32::MAX as i64, 1);
            probes.push(key);
        }

        c.bench_function(&format!("{}/variant=key n={n}", module_path!()), |b| {
            b.iter(|| {
                for key in &probes {
                    black_box(keys.find(*key));
                }
            })
        });
        c.bench_function(&format!("{}/variant=key_val n={n}", module_path!()), |b| {
            b.iter(|| {
                for key in &probes {
                    black_box(values.find(*key as i64 - i32::MAX as i64));
                }
            })
        });
    }
}

criterion_group! {
    name = benches;
    config = Criterion::default().sample_size(10);
    targets = bench_find
}
