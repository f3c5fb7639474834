//! Buffered adapters between [std::io] streams and the codec's [Sink] and [Source].

use crate::{Error, Sink, Source};
use std::{
    io::{self, ErrorKind},
    num::NonZeroUsize,
};
use tracing::{debug, warn};

/// Default buffer size for [BufferedWriter] and [BufferedReader].
pub const DEFAULT_BUFFER: NonZeroUsize = match NonZeroUsize::new(64 * 1024) {
    Some(size) => size,
    None => unreachable!(),
};

/// A [Sink] that accumulates bytes before handing them to an [io::Write].
///
/// Bytes are written through to the inner writer whenever the buffer would overflow.
/// Writes at least as large as the buffer bypass it. Buffered bytes reach the inner
/// writer on [Sink::flush], on [BufferedWriter::close], or (best-effort) on drop.
///
/// # Example
///
/// ```
/// use binsearch_codec::{buffer::{BufferedWriter, DEFAULT_BUFFER}, Sink};
///
/// let mut writer = BufferedWriter::new(Vec::new(), DEFAULT_BUFFER);
/// writer.write_varint_u64(300).unwrap();
/// writer.write_bytes(b"hello").unwrap();
/// let inner = writer.close().unwrap();
/// assert_eq!(inner, [0x02, 0x2C, 0x01, b'h', b'e', b'l', b'l', b'o']);
/// ```
pub struct BufferedWriter<W: io::Write> {
    /// The destination of flushed bytes. Only `None` after [BufferedWriter::close].
    inner: Option<W>,
    /// Bytes not yet written to `inner`.
    buffer: Vec<u8>,
    /// The maximum size of the buffer.
    capacity: usize,
    /// Total bytes accepted (buffered or not).
    written: u64,
}

impl<W: io::Write> BufferedWriter<W> {
    /// Creates a new writer with a buffer of `capacity` bytes.
    pub fn new(inner: W, capacity: NonZeroUsize) -> Self {
        Self {
            inner: Some(inner),
            buffer: Vec::with_capacity(capacity.get()),
            capacity: capacity.get(),
            written: 0,
        }
    }

    /// Returns the total number of bytes accepted by this writer.
    pub fn bytes_written(&self) -> u64 {
        self.written
    }

    /// Returns the number of bytes waiting in the buffer.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Writes buffered bytes to the inner writer without flushing it.
    fn drain(&mut self) -> Result<(), Error> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        let Some(inner) = self.inner.as_mut() else {
            return Ok(());
        };
        inner.write_all(&self.buffer)?;
        self.buffer.clear();
        Ok(())
    }

    /// Flushes all buffered bytes and returns the inner writer.
    pub fn close(mut self) -> Result<W, Error> {
        Sink::flush(&mut self)?;
        debug!(bytes = self.written, "closed buffered writer");
        Ok(self.inner.take().expect("writer only taken on close"))
    }
}

impl<W: io::Write> Sink for BufferedWriter<W> {
    fn put_slice(&mut self, bytes: &[u8]) -> Result<(), Error> {
        if self.buffer.len() + bytes.len() > self.capacity {
            self.drain()?;
        }
        if bytes.len() >= self.capacity {
            if let Some(inner) = self.inner.as_mut() {
                inner.write_all(bytes)?;
            }
        } else {
            self.buffer.extend_from_slice(bytes);
        }
        self.written += bytes.len() as u64;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), Error> {
        self.drain()?;
        if let Some(inner) = self.inner.as_mut() {
            inner.flush()?;
        }
        Ok(())
    }
}

impl<W: io::Write> Drop for BufferedWriter<W> {
    fn drop(&mut self) {
        if self.inner.is_none() || self.buffer.is_empty() {
            return;
        }
        if let Err(err) = Sink::flush(self) {
            warn!(?err, pending = self.buffer.len(), "failed to flush dropped writer");
        }
    }
}

/// A [Source] that reads from an [io::Read] through an internal buffer.
///
/// Reaching the end of the inner reader before a request is satisfied fails with
/// [Error::EndOfBuffer].
pub struct BufferedReader<R: io::Read> {
    inner: R,
    buffer: Box<[u8]>,
    /// Next unread byte in `buffer`.
    position: usize,
    /// Number of valid bytes in `buffer`.
    filled: usize,
}

impl<R: io::Read> BufferedReader<R> {
    /// Creates a new reader with a buffer of `capacity` bytes.
    pub fn new(inner: R, capacity: NonZeroUsize) -> Self {
        Self {
            inner,
            buffer: vec![0; capacity.get()].into_boxed_slice(),
            position: 0,
            filled: 0,
        }
    }

    /// Returns the inner reader. Buffered but unread bytes are discarded.
    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Reads from the inner reader, retrying on interruption. Returns 0 at end of stream.
    fn fill(inner: &mut R, buf: &mut [u8]) -> Result<usize, Error> {
        loop {
            match inner.read(buf) {
                Ok(n) => return Ok(n),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(err.into()),
            }
        }
    }
}

impl<R: io::Read> Source for BufferedReader<R> {
    fn read_into(&mut self, mut buf: &mut [u8]) -> Result<(), Error> {
        while !buf.is_empty() {
            // Serve from the buffer first.
            if self.position < self.filled {
                let n = buf.len().min(self.filled - self.position);
                buf[..n].copy_from_slice(&self.buffer[self.position..self.position + n]);
                self.position += n;
                buf = &mut std::mem::take(&mut buf)[n..];
                continue;
            }

            // Large requests skip the buffer.
            if buf.len() >= self.buffer.len() {
                let n = Self::fill(&mut self.inner, buf)?;
                if n == 0 {
                    return Err(Error::EndOfBuffer);
                }
                buf = &mut std::mem::take(&mut buf)[n..];
                continue;
            }

            let n = Self::fill(&mut self.inner, &mut self.buffer)?;
            if n == 0 {
                return Err(Error::EndOfBuffer);
            }
            self.position = 0;
            self.filled = n;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use binsearch_macros::test_traced;
    use std::num::NonZeroUsize;

    fn nz(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    /// An [io::Write] that records every call it receives.
    #[derive(Default)]
    struct Recorder {
        data: Vec<u8>,
        writes: usize,
        flushes: usize,
    }

    impl io::Write for Recorder {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.data.extend_from_slice(buf);
            self.writes += 1;
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            self.flushes += 1;
            Ok(())
        }
    }

    /// An [io::Write] that always fails.
    struct Broken;

    impl io::Write for Broken {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::other("broken"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::other("broken"))
        }
    }

    /// An [io::Read] that hands out at most one byte per call.
    struct Trickle<'a>(&'a [u8]);

    impl io::Read for Trickle<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.0.is_empty() || buf.is_empty() {
                return Ok(0);
            }
            buf[0] = self.0[0];
            self.0 = &self.0[1..];
            Ok(1)
        }
    }

    #[test_traced]
    fn test_writer_buffers_until_full() {
        let mut writer = BufferedWriter::new(Recorder::default(), nz(8));
        writer.write_bytes(b"abcd").unwrap();
        writer.write_bytes(b"efg").unwrap();
        assert_eq!(writer.buffered(), 7);

        // Overflow drains the buffer before accepting the new bytes.
        writer.write_bytes(b"hi").unwrap();
        assert_eq!(writer.buffered(), 2);
        assert_eq!(writer.bytes_written(), 9);

        let inner = writer.close().unwrap();
        assert_eq!(inner.data, b"abcdefghi");
        assert_eq!(inner.writes, 2);
        assert_eq!(inner.flushes, 1);
    }

    #[test_traced]
    fn test_writer_large_write_bypasses_buffer() {
        let mut writer = BufferedWriter::new(Recorder::default(), nz(4));
        writer.write_u8(1).unwrap();
        writer.write_u64(u64::MAX).unwrap();
        assert_eq!(writer.buffered(), 0);
        let inner = writer.close().unwrap();
        assert_eq!(inner.data.len(), 9);
        assert_eq!(inner.data[0], 1);
    }

    #[test_traced]
    fn test_writer_flush_drains() {
        let mut writer = BufferedWriter::new(Vec::new(), DEFAULT_BUFFER);
        writer.write_varint_u64(0).unwrap();
        writer.flush().unwrap();
        assert_eq!(writer.buffered(), 0);
        assert_eq!(writer.close().unwrap(), [0x00]);
    }

    #[test_traced]
    fn test_writer_drop_flushes() {
        let mut out = Vec::new();
        {
            let mut writer = BufferedWriter::new(&mut out, DEFAULT_BUFFER);
            writer.write_bytes(b"pending").unwrap();
        }
        assert_eq!(out, b"pending");
    }

    #[test_traced("WARN")]
    fn test_writer_errors_propagate() {
        let mut writer = BufferedWriter::new(Broken, nz(2));
        writer.write_u8(1).unwrap();
        assert!(matches!(writer.write_bytes(b"xyz"), Err(Error::Io(_))));
        assert!(matches!(writer.close(), Err(Error::Io(_))));
    }

    #[test_traced]
    fn test_reader_round_trip() {
        let mut writer = BufferedWriter::new(Vec::new(), nz(16));
        for i in 0..1_000u64 {
            writer.write_varint_u64(i * 7919).unwrap();
            writer.write_u64(i).unwrap();
        }
        let data = writer.close().unwrap();

        let mut reader = BufferedReader::new(&data[..], nz(16));
        for i in 0..1_000u64 {
            assert_eq!(reader.read_varint_u64().unwrap(), i * 7919);
            assert_eq!(reader.read_u64().unwrap(), i);
        }
        assert!(matches!(reader.read_u8(), Err(Error::EndOfBuffer)));
    }

    #[test_traced]
    fn test_reader_short_reads() {
        let data: Vec<u8> = (0..100u8).collect();
        let mut reader = BufferedReader::new(Trickle(&data), nz(8));
        assert_eq!(reader.read_exact(50).unwrap(), &data[..50]);
        let mut rest = [0u8; 50];
        reader.read_into(&mut rest).unwrap();
        assert_eq!(&rest[..], &data[50..]);
        assert!(matches!(reader.read_u64(), Err(Error::EndOfBuffer)));
    }
}
