//! Read-ahead buffer shared by the raw header-blob scanner (writer side)
//! and the zpkglist frame reader.
//!
//! Ported from the combined behaviour of `areader.c` (buffered ingestion of
//! raw header blobs, with the already-peeked lead bytes spliced back in)
//! and the `reada`/`peeka`/`tella` helpers `zreader.c` relies on. Unlike the
//! C version this is generic over any [`Read`] source, not a raw fd.

use std::io::{self, Read};

use crate::config::AREADER_WINDOW;

/// Buffers ahead of the caller so frame/header lead bytes can be peeked
/// without consuming them, then consumed (or re-peeked) later.
pub struct AReader<R> {
    inner: R,
    buf: Vec<u8>,
    pos: usize,
    filled: usize,
    tell: u64,
    eof: bool,
}

impl<R: Read> AReader<R> {
    pub fn new(inner: R) -> Self {
        AReader {
            inner,
            buf: Vec::new(),
            pos: 0,
            filled: 0,
            tell: 0,
            eof: false,
        }
    }

    /// Absolute count of bytes handed to the caller so far (via `read` or
    /// `consume`), i.e. the logical stream position just past the last
    /// delivered byte.
    pub fn tell(&self) -> u64 {
        self.tell
    }

    fn compact(&mut self) {
        if self.pos > 0 {
            self.buf.copy_within(self.pos..self.filled, 0);
            self.filled -= self.pos;
            self.pos = 0;
        }
    }

    /// Low-level fill: read one chunk from `inner` into the buffer tail,
    /// retrying transparently on `Interrupted`. This is the crate's sole
    /// `EINTR`-equivalent retry point.
    fn fill_once(&mut self, want_total: usize) -> io::Result<()> {
        self.compact();
        if self.buf.len() < want_total {
            self.buf.resize(want_total.max(AREADER_WINDOW), 0);
        }
        loop {
            match self.inner.read(&mut self.buf[self.filled..]) {
                Ok(0) => {
                    self.eof = true;
                    return Ok(());
                }
                Ok(n) => {
                    self.filled += n;
                    return Ok(());
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }

    /// Ensures at least `min(n, bytes-until-EOF)` bytes are buffered ahead
    /// of the current position, then returns a slice over whatever ended up
    /// available (shorter than `n` only at EOF).
    pub fn peek(&mut self, n: usize) -> io::Result<&[u8]> {
        while self.filled - self.pos < n && !self.eof {
            self.fill_once(self.pos + n)?;
        }
        let end = self.pos + n.min(self.filled - self.pos);
        Ok(&self.buf[self.pos..end])
    }

    /// Advances past `n` already-peeked bytes.
    pub fn consume(&mut self, n: usize) {
        debug_assert!(self.pos + n <= self.filled);
        self.pos += n;
        self.tell += n as u64;
    }

    /// Reads up to `out.len()` bytes, first draining any peeked-but-
    /// unconsumed bytes, then reading directly from the source. Returns the
    /// number of bytes delivered; `0` only at true EOF.
    pub fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        let buffered = self.filled - self.pos;
        if buffered > 0 {
            let n = buffered.min(out.len());
            out[..n].copy_from_slice(&self.buf[self.pos..self.pos + n]);
            self.consume(n);
            return Ok(n);
        }
        if self.eof {
            return Ok(0);
        }
        loop {
            match self.inner.read(out) {
                Ok(n) => {
                    if n == 0 {
                        self.eof = true;
                    }
                    self.tell += n as u64;
                    return Ok(n);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }

    /// Returns whatever is currently sitting in the read-ahead window
    /// (pulling in one fresh chunk first if the window is empty and not at
    /// EOF), and marks it all consumed. Unlike `read`, never copies into a
    /// caller buffer — used by disciplines that don't care about structural
    /// boundaries, such as the raw backend's `bulk`.
    pub fn take_buffered(&mut self, max: usize) -> io::Result<&[u8]> {
        if self.filled - self.pos == 0 && !self.eof {
            self.fill_once(self.pos + 1)?;
        }
        let n = (self.filled - self.pos).min(max);
        let start = self.pos;
        self.consume(n);
        Ok(&self.buf[start..start + n])
    }

    /// Reads exactly `out.len()` bytes, or fewer at EOF (returning the
    /// short count rather than erroring — callers decide whether a short
    /// read is a format error).
    pub fn read_full(&mut self, out: &mut [u8]) -> io::Result<usize> {
        let mut got = 0;
        while got < out.len() {
            let n = self.read(&mut out[got..])?;
            if n == 0 {
                break;
            }
            got += n;
        }
        Ok(got)
    }
}

impl<R: Read> io::Read for AReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        AReader::read(self, buf)
    }
}

/// Lets external-codec readers (the `zstd` backend in particular, via
/// `Decoder::with_buffer`) draw directly on the same window this type
/// already maintains, instead of wrapping it in a second `BufReader`.
impl<R: Read> io::BufRead for AReader<R> {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        self.peek(AREADER_WINDOW)
    }

    fn consume(&mut self, amt: usize) {
        AReader::consume(self, amt);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn peek_does_not_consume() {
        let mut a = AReader::new(Cursor::new(b"hello world".to_vec()));
        assert_eq!(a.peek(5).unwrap(), b"hello");
        assert_eq!(a.peek(5).unwrap(), b"hello");
        assert_eq!(a.tell(), 0);
    }

    #[test]
    fn consume_advances_tell() {
        let mut a = AReader::new(Cursor::new(b"hello world".to_vec()));
        a.peek(5).unwrap();
        a.consume(5);
        assert_eq!(a.tell(), 5);
        let mut buf = [0u8; 6];
        assert_eq!(a.read_full(&mut buf).unwrap(), 6);
        assert_eq!(&buf, b" world");
        assert_eq!(a.tell(), 11);
    }

    #[test]
    fn read_full_short_at_eof() {
        let mut a = AReader::new(Cursor::new(b"abc".to_vec()));
        let mut buf = [0u8; 10];
        assert_eq!(a.read_full(&mut buf).unwrap(), 3);
        assert_eq!(&buf[..3], b"abc");
    }

    #[test]
    fn peek_then_read_larger_than_buffer_window() {
        let data = vec![7u8; 200 * 1024];
        let mut a = AReader::new(Cursor::new(data.clone()));
        assert_eq!(a.peek(16).unwrap(), &data[..16]);
        let mut out = vec![0u8; data.len()];
        assert_eq!(a.read_full(&mut out).unwrap(), data.len());
        assert_eq!(out, data);
    }

    struct FlakyReader {
        data: Vec<u8>,
        pos: usize,
        interrupt_once: bool,
    }

    impl Read for FlakyReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.interrupt_once {
                self.interrupt_once = false;
                return Err(io::Error::new(io::ErrorKind::Interrupted, "eintr"));
            }
            let n = (self.data.len() - self.pos).min(buf.len());
            buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }

    #[test]
    fn retries_transparently_on_interrupted() {
        let mut a = AReader::new(FlakyReader {
            data: b"retried".to_vec(),
            pos: 0,
            interrupt_once: true,
        });
        let mut buf = [0u8; 7];
        assert_eq!(a.read_full(&mut buf).unwrap(), 7);
        assert_eq!(&buf, b"retried");
    }
}
