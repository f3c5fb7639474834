#![no_main]

use binsearch::{
    numeric::{CounterU8, KeyInt, KeyU16, KeyValU64},
    Config, CounterBytes, KeyBytes, KeyValBytes,
};
use binsearch_codec::{Decode, Encode};
use libfuzzer_sys::fuzz_target;

const CFG: Config = Config {
    max_entries: 1 << 16,
};

/// Anything that decodes must encode back to the same bytes.
fn check<T: Decode<Cfg = Config> + Encode>(data: &[u8]) {
    if let Ok(decoded) = T::decode_cfg(data, &CFG) {
        assert_eq!(decoded.encode_size(), data.len());
        assert_eq!(&decoded.encode()[..], data);
    }
}

fuzz_target!(|data: &[u8]| {
    check::<KeyBytes>(data);
    check::<KeyValBytes>(data);
    check::<CounterBytes>(data);
    check::<KeyU16>(data);
    check::<KeyInt>(data);
    check::<KeyValU64>(data);
    check::<CounterU8>(data);
});
