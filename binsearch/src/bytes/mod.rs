//! Containers keyed by byte strings of 1 to 64 bytes.
//!
//! - [KeyBytes]: keys only, addressed by rank
//! - [KeyValBytes]: one `i64` per key, later values replace earlier ones
//! - [CounterBytes]: one `i64` per key, later values are added to earlier ones

mod keys;
mod values;

pub use keys::{KeyBytes, KeyBytesBuilder};
pub use values::{
    CounterBytes, CounterBytesBuilder, KeyValBytes, KeyValBytesBuilder, ValueBytes,
    ValueBytesBuilder,
};
