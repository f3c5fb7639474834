//! Persist compact indices through byte sinks and sources.
//!
//! # Overview
//!
//! Structures are written to a [Sink] and read back from a [Source]. Both expose the
//! same small vocabulary:
//! - Single bytes and raw 8-byte little-endian words (`write_u64`/`read_u64`)
//! - Length-prefixed variable-length integers ([varint])
//! - Opaque byte runs (`write_bytes`/`read_exact`)
//!
//! In-memory buffers (`Vec<u8>`, `BytesMut`, `&[u8]`, `Bytes`) implement the traits
//! directly. [std::io] streams are wrapped in a [buffer::BufferedWriter] or
//! [buffer::BufferedReader].
//!
//! Types implement [Write], [Read], and [EncodeSize] to gain [Encode] and [Decode].
//! [Read] carries a configuration (`Cfg`) used to bound allocations when decoding
//! untrusted input.
//!
//! # Example
//!
//! ```
//! use binsearch_codec::{
//!     read_len, varint, Decode, Encode, EncodeSize, Error, Read, Sink, Source, Write,
//! };
//!
//! // A list of words preceded by its length.
//! #[derive(Debug, PartialEq)]
//! struct Words(Vec<u64>);
//!
//! impl Write for Words {
//!     fn write(&self, sink: &mut impl Sink) -> Result<(), Error> {
//!         sink.write_varint_u64(self.0.len() as u64)?;
//!         for word in &self.0 {
//!             sink.write_u64(*word)?;
//!         }
//!         Ok(())
//!     }
//! }
//!
//! impl Read for Words {
//!     // Maximum number of words to accept.
//!     type Cfg = usize;
//!
//!     fn read_cfg(source: &mut impl Source, max: &usize) -> Result<Self, Error> {
//!         let len = read_len(source, *max)?;
//!         let mut words = Vec::with_capacity(len);
//!         for _ in 0..len {
//!             words.push(source.read_u64()?);
//!         }
//!         Ok(Self(words))
//!     }
//! }
//!
//! impl EncodeSize for Words {
//!     fn encode_size(&self) -> usize {
//!         varint::size(self.0.len() as u64) + self.0.len() * 8
//!     }
//! }
//!
//! let words = Words(vec![1, 2, 3]);
//! let encoded = words.encode();
//! assert_eq!(Words::decode_cfg(&encoded, &16).unwrap(), words);
//! ```

pub mod buffer;
pub mod codec;
pub mod error;
pub mod io;
pub mod varint;

// Re-export main types and traits
pub use codec::{read_len, Decode, DecodeExt, Encode, EncodeSize, Read, ReadExt, Write};
pub use error::Error;
pub use io::{Sink, Source};
