#![no_main]

use arbitrary::Arbitrary;
use binsearch::{
    numeric::{CounterInt, KeyU16, KeyValBuilder},
    Config, Search,
};
use binsearch_codec::{Decode, Encode};
use libfuzzer_sys::fuzz_target;
use std::collections::BTreeMap;

#[derive(Arbitrary, Debug)]
enum Operation {
    Add { key: i64, value: i64 },
    AddAt { key: u16, rank: usize },
    Find { key: i64 },
    Update { key: i64, value: i64 },
    Restore,
}

#[derive(Arbitrary, Debug)]
struct FuzzInput {
    operations: Vec<Operation>,
    unsorted: Vec<(i64, i64)>,
}

fn fuzz(input: FuzzInput) {
    let cfg = Config {
        max_entries: 1 << 16,
    };
    let mut counter = CounterInt::new();
    let mut counts: BTreeMap<i64, i64> = BTreeMap::new();
    let mut keys = KeyU16::new();
    let mut set: Vec<u16> = Vec::new();

    for op in input.operations {
        match op {
            Operation::Add { key, value } => {
                let existed = counter.add(key, value);
                assert_eq!(existed, counts.contains_key(&key));
                let count = counts.entry(key).or_default();
                *count = count.saturating_add(value);
            }
            Operation::AddAt { key, rank } => {
                let expected = set.binary_search(&key);
                let valid = expected == Err(rank);
                assert_eq!(keys.add_at(key, rank).is_ok(), valid);
                if valid {
                    set.insert(rank, key);
                }
                let expected = match set.binary_search(&key) {
                    Ok(rank) => Search::Found(rank),
                    Err(rank) => Search::Absent(rank),
                };
                assert_eq!(keys.find(key), expected);
            }
            Operation::Find { key } => {
                assert_eq!(counter.find(key), counts.get(&key).copied());
            }
            Operation::Update { key, value } => {
                let updated = counter.update(key, |_| value);
                assert_eq!(updated, counts.contains_key(&key));
                if let Some(count) = counts.get_mut(&key) {
                    *count = value;
                }
            }
            Operation::Restore => {
                counter = CounterInt::decode_cfg(&counter.encode(), &cfg).unwrap();
                keys = KeyU16::decode_cfg(&keys.encode(), &cfg).unwrap();
            }
        }
    }
    assert_eq!(
        counter.iter().collect::<Vec<_>>(),
        counts.into_iter().collect::<Vec<_>>()
    );
    assert_eq!(keys.keys(), &set[..]);

    // The builder keeps the last value of each key.
    let mut builder = KeyValBuilder::new();
    let mut latest = BTreeMap::new();
    for (key, value) in input.unsorted {
        builder.add_unsorted(key, value);
        latest.insert(key, value);
    }
    let map = builder.build();
    assert_eq!(
        map.iter().collect::<Vec<_>>(),
        latest.into_iter().collect::<Vec<_>>()
    );
}

fuzz_target!(|input: FuzzInput| {
    fuzz(input);
});
