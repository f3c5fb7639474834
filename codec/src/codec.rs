//! Core codec traits

use crate::{Error, Sink, Source};
use bytes::BytesMut;

/// Trait for types that can be written (encoded) to a [Sink].
pub trait Write {
    /// Encodes this value by writing to a sink.
    fn write(&self, sink: &mut impl Sink) -> Result<(), Error>;
}

/// Trait for types that can be read (decoded) from a [Source].
///
/// The `Cfg` type allows for configuration during the read process. For example, it can
/// be used to limit the number of entries allocated when decoding untrusted data.
/// Use `()` for types that do not require configuration.
pub trait Read: Sized {
    /// The configuration used to read values of this type.
    type Cfg;

    /// Reads a value from the source using the provided configuration `cfg`, consuming the
    /// necessary bytes.
    fn read_cfg(source: &mut impl Source, cfg: &Self::Cfg) -> Result<Self, Error>;
}

/// Trait for types whose encoded size can be computed without encoding them.
pub trait EncodeSize {
    /// Returns the encoded size of this value (in bytes).
    ///
    /// This method MUST return the exact number of bytes that will be written by `write()`.
    fn encode_size(&self) -> usize;
}

/// Trait for types that can be encoded to a new buffer.
pub trait Encode: Write + EncodeSize {
    /// Encodes a value to a `BytesMut` buffer.
    ///
    /// Panics if the `write` implementation does not write the expected number of bytes.
    ///
    /// (Provided method).
    fn encode(&self) -> BytesMut {
        let len = self.encode_size();
        let mut buffer = BytesMut::with_capacity(len);
        self.write(&mut buffer).expect("writing to memory cannot fail");
        assert_eq!(buffer.len(), len, "write() did not write expected bytes");
        buffer
    }
}

// Automatically implement `Encode` for types that implement `Write` and `EncodeSize`.
impl<T: Write + EncodeSize> Encode for T {}

/// Trait for types that can be decoded from a buffer, ensuring the entire buffer is consumed.
pub trait Decode: Read {
    /// Decodes a value from `buf`, failing with [Error::ExtraData] if any bytes remain.
    ///
    /// (Provided method).
    fn decode_cfg(buf: &[u8], cfg: &Self::Cfg) -> Result<Self, Error> {
        let mut source = buf;
        let result = Self::read_cfg(&mut source, cfg)?;
        if !source.is_empty() {
            return Err(Error::ExtraData(source.len()));
        }
        Ok(result)
    }
}

// Automatically implement `Decode` for types that implement `Read`.
impl<T: Read> Decode for T {}

/// Extension trait providing an ergonomic read method for types requiring no configuration.
pub trait ReadExt: Read<Cfg = ()> {
    /// Reads a value using the default `()` config.
    fn read(source: &mut impl Source) -> Result<Self, Error> {
        Self::read_cfg(source, &())
    }
}

// Automatically implement `ReadExt` for types that implement `Read` with no config.
impl<T: Read<Cfg = ()>> ReadExt for T {}

/// Extension trait providing an ergonomic decode method for types requiring no configuration.
pub trait DecodeExt: Decode + Read<Cfg = ()> {
    /// Decodes a value using the default `()` config.
    fn decode(buf: &[u8]) -> Result<Self, Error> {
        Self::decode_cfg(buf, &())
    }
}

// Automatically implement `DecodeExt` for types that implement `Decode` with no config.
impl<T: Decode + Read<Cfg = ()>> DecodeExt for T {}

/// Reads a length-prefixed count, failing if it exceeds `max`.
pub fn read_len(source: &mut impl Source, max: usize) -> Result<usize, Error> {
    let len = source.read_varint_u64()?;
    let len = usize::try_from(len).map_err(|_| Error::InvalidVarint)?;
    if len > max {
        return Err(Error::InvalidLength(len));
    }
    Ok(len)
}
