#![no_main]

use arbitrary::Arbitrary;
use binsearch::{Config, CounterBytes, Error, KeyBytes, KeyValBytes, Search};
use binsearch_codec::{Decode, Encode};
use libfuzzer_sys::fuzz_target;
use std::collections::BTreeSet;

#[derive(Arbitrary, Debug)]
enum Operation {
    Add { key: Vec<u8>, value: i64 },
    AddAt { key: Vec<u8>, rank: usize },
    Find { key: Vec<u8> },
    Update { key: Vec<u8>, delta: i64 },
    Next,
    Reset,
    Optimize,
    Rebuild { extra: Vec<Vec<u8>> },
    Restore,
}

#[derive(Arbitrary, Debug)]
struct FuzzInput {
    operations: Vec<Operation>,
}

/// Keys ordered by length, then bytes.
type Model = BTreeSet<(usize, Vec<u8>)>;

fn entry(key: &[u8]) -> (usize, Vec<u8>) {
    (key.len(), key.to_vec())
}

fn rank(model: &Model, key: &[u8]) -> usize {
    model.range(..entry(key)).count()
}

fn storable(key: &[u8]) -> bool {
    !key.is_empty() && key.len() <= 64
}

fn fuzz(input: FuzzInput) {
    let cfg = Config {
        max_entries: 1 << 16,
    };
    let mut keys = KeyBytes::new();
    let mut counter = CounterBytes::new();
    let mut model = Model::new();
    let mut cursor = 0usize;

    for op in input.operations {
        match op {
            Operation::Add { key, value } => {
                let result = keys.add(&key);
                let counted = counter.add(&key, value);
                if key.is_empty() {
                    assert!(matches!(result, Err(Error::EmptyKey)));
                    assert!(matches!(counted, Err(Error::EmptyKey)));
                    continue;
                }
                if key.len() > 64 {
                    assert!(matches!(result, Err(Error::KeyTooLong(_))));
                    assert!(matches!(counted, Err(Error::KeyTooLong(_))));
                    continue;
                }
                let expected = rank(&model, &key);
                let inserted = model.insert(entry(&key));
                let result = result.unwrap();
                assert_eq!(result.is_found(), !inserted);
                assert_eq!(result.rank(), expected);
                assert_eq!(counted.unwrap(), !inserted);
                if inserted {
                    keys.reset();
                    cursor = 0;
                }
            }
            Operation::AddAt { key, rank: at } => {
                if !storable(&key) {
                    assert!(keys.add_at(&key, at).is_err());
                    continue;
                }
                let valid = at == rank(&model, &key) && !model.contains(&entry(&key));
                assert_eq!(keys.add_at(&key, at).is_ok(), valid);
                if valid {
                    counter.add(&key, 0).unwrap();
                    model.insert(entry(&key));
                    keys.reset();
                    cursor = 0;
                }
            }
            Operation::Find { key } => {
                if !storable(&key) {
                    assert!(keys.find(&key).is_err());
                    assert!(counter.find(&key).is_err());
                    continue;
                }
                let present = model.contains(&entry(&key));
                let expected = if present {
                    Search::Found(rank(&model, &key))
                } else {
                    Search::Absent(rank(&model, &key))
                };
                assert_eq!(keys.find(&key).unwrap(), expected);
                assert_eq!(counter.find(&key).unwrap().is_some(), present);
            }
            Operation::Update { key, delta } => {
                let updated = counter.update(&key, |v| v.wrapping_add(delta));
                if storable(&key) {
                    assert_eq!(updated.unwrap(), model.contains(&entry(&key)));
                } else {
                    assert!(updated.is_err());
                }
            }
            Operation::Next => {
                let next = keys.next();
                if model.is_empty() {
                    assert!(next.is_none());
                    continue;
                }
                let (key, last) = next.unwrap();
                let (_, expected) = model.iter().nth(cursor).unwrap();
                assert_eq!(&key, expected);
                cursor += 1;
                assert_eq!(last, cursor == model.len());
                if last {
                    cursor = 0;
                }
            }
            Operation::Reset => {
                assert_eq!(keys.reset(), !model.is_empty());
                cursor = 0;
            }
            Operation::Optimize => {
                keys.optimize();
                counter.optimize();
            }
            Operation::Rebuild { extra } => {
                let mut builder = keys.into_builder();
                let mut counts = counter.into_builder();
                for key in extra {
                    if !storable(&key) {
                        assert!(builder.add_unsorted(&key).is_err());
                        continue;
                    }
                    builder.add_unsorted(&key).unwrap();
                    counts.add_unsorted(&key, 0).unwrap();
                    model.insert(entry(&key));
                }
                let (rebuilt, remap) = builder.build();
                assert_eq!(remap.len(), model.len());
                keys = rebuilt;
                counter = counts.build();
                cursor = 0;
            }
            Operation::Restore => {
                keys = KeyBytes::decode_cfg(&keys.encode(), &cfg).unwrap();
                counter = CounterBytes::decode_cfg(&counter.encode(), &cfg).unwrap();
                cursor = 0;
            }
        }
        assert_eq!(keys.len(), model.len());
        assert_eq!(counter.len(), model.len());
    }

    let expected: Vec<Vec<u8>> = model.into_iter().map(|(_, key)| key).collect();
    assert_eq!(keys.keys(), expected);
    let map: KeyValBytes = counter.to_key_val_bytes();
    assert_eq!(map.keys(), expected);
    assert_eq!(counter.to_key_bytes(), keys);
}

fuzz_target!(|input: FuzzInput| {
    fuzz(input);
});
