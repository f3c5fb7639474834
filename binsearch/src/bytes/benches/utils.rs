use rand::{rngs::StdRng, Rng, SeedableRng};

/// Generates `n` random keys of 1 to `max_len` bytes.
pub fn keys(n: usize, max_len: usize) -> Vec<Vec<u8>> {
    let mut rng = StdRng::seed_from_u64(0);
    (0..n)
        .map(|_| {
            let len = rng.gen_range(1..=max_len);
            (0..len).map(|_| rng.gen()).collect()
        })
        .collect()
}
