//! Byte sinks and sources.
//!
//! Every persisted structure writes itself to a [Sink] and reads itself back from a
//! [Source]. In-memory buffers implement both directly. Streams (files, sockets) are
//! adapted through [crate::buffer::BufferedWriter] and [crate::buffer::BufferedReader].

use crate::{varint, Error};
use bytes::{Buf, Bytes, BytesMut};

/// Largest chunk allocated up front by [Source::read_exact].
const READ_CHUNK: usize = 64 * 1024;

/// A destination for encoded bytes.
pub trait Sink {
    /// Appends `bytes` to the sink.
    fn put_slice(&mut self, bytes: &[u8]) -> Result<(), Error>;

    /// Writes a single byte.
    fn write_u8(&mut self, value: u8) -> Result<(), Error> {
        self.put_slice(&[value])
    }

    /// Writes `value` as 8 raw little-endian bytes.
    fn write_u64(&mut self, value: u64) -> Result<(), Error> {
        self.put_slice(&value.to_le_bytes())
    }

    /// Writes `value` with the length-prefixed [varint] encoding.
    fn write_varint_u64(&mut self, value: u64) -> Result<(), Error> {
        varint::write(value, self)
    }

    /// Writes `bytes` verbatim.
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), Error> {
        self.put_slice(bytes)
    }

    /// Pushes any buffered bytes to the underlying destination.
    fn flush(&mut self) -> Result<(), Error> {
        Ok(())
    }
}

impl Sink for Vec<u8> {
    fn put_slice(&mut self, bytes: &[u8]) -> Result<(), Error> {
        self.extend_from_slice(bytes);
        Ok(())
    }
}

impl Sink for BytesMut {
    fn put_slice(&mut self, bytes: &[u8]) -> Result<(), Error> {
        self.extend_from_slice(bytes);
        Ok(())
    }
}

/// An origin of encoded bytes.
///
/// Reading past the end of a fixed-length source fails with [Error::EndOfBuffer].
pub trait Source {
    /// Fills `buf` completely or fails.
    fn read_into(&mut self, buf: &mut [u8]) -> Result<(), Error>;

    /// Returns the number of unread bytes, if known.
    fn remaining(&self) -> Option<usize> {
        None
    }

    /// Reads a single byte.
    fn read_u8(&mut self) -> Result<u8, Error> {
        let mut buf = [0u8; 1];
        self.read_into(&mut buf)?;
        Ok(buf[0])
    }

    /// Reads 8 raw little-endian bytes.
    fn read_u64(&mut self) -> Result<u64, Error> {
        let mut buf = [0u8; 8];
        self.read_into(&mut buf)?;
        Ok(u64::from_le_bytes(buf))
    }

    /// Reads a length-prefixed [varint].
    fn read_varint_u64(&mut self) -> Result<u64, Error> {
        varint::read(self)
    }

    /// Reads exactly `n` bytes.
    ///
    /// Memory is committed in bounded chunks so a forged length cannot reserve more
    /// than the source can actually deliver.
    fn read_exact(&mut self, n: usize) -> Result<Vec<u8>, Error> {
        if let Some(remaining) = self.remaining() {
            if remaining < n {
                return Err(Error::EndOfBuffer);
            }
        }
        let mut out = Vec::with_capacity(n.min(READ_CHUNK));
        while out.len() < n {
            let start = out.len();
            let chunk = (n - start).min(READ_CHUNK);
            out.resize(start + chunk, 0);
            self.read_into(&mut out[start..])?;
        }
        Ok(out)
    }
}

impl Source for &[u8] {
    fn read_into(&mut self, buf: &mut [u8]) -> Result<(), Error> {
        if self.len() < buf.len() {
            return Err(Error::EndOfBuffer);
        }
        let (head, tail) = self.split_at(buf.len());
        buf.copy_from_slice(head);
        *self = tail;
        Ok(())
    }

    fn remaining(&self) -> Option<usize> {
        Some(self.len())
    }
}

impl Source for Bytes {
    fn read_into(&mut self, buf: &mut [u8]) -> Result<(), Error> {
        if Buf::remaining(self) < buf.len() {
            return Err(Error::EndOfBuffer);
        }
        self.copy_to_slice(buf);
        Ok(())
    }

    fn remaining(&self) -> Option<usize> {
        Some(Buf::remaining(self))
    }
}
