//! The polymorphic reader: magic-sniffs one of {raw RPM headers, zpkglist,
//! zstd, xz}, transparently concatenates further recognized streams once a
//! backend runs dry, and exposes the three read disciplines (bulk bytes,
//! blob view, blob malloc) over whichever backend is currently active.
//!
//! Ported from the combined `areader.c`/`zreader.c` dispatcher, restated as
//! a closed backend enum instead of a function-pointer table: the four
//! backends don't share a type parameter, so switching between them mid
//! stream (on concatenation) never runs into the self-referential-struct
//! problems a `Box<dyn Backend>` over a generic reader would hit reclaiming
//! that reader back. Each backend instead wraps the same erased
//! `Box<dyn BufRead>`, and the zstd/liblzma wrappers hand it straight back
//! via `finish`/`into_inner` once exhausted.

mod backends;

use std::io::{BufRead, Read};
use std::marker::PhantomData;

use backends::{RawBackend, XzBackend, ZstdBackend};

use crate::areader::AReader;
use crate::config::{
    READER_BULK_BUFFER, VIEW_GROWTH_ROUND, VIEW_GROWTH_SLACK, VIEW_SHRINK_FLOOR, XZ_MAGIC_BE,
    ZSTD_MAGIC,
};
use crate::container::{Envelope, FramePos, ZReader};
use crate::error::{Result, ZpkglistError};
use crate::header;

/// The dispatcher never holds on to the original reader type: every backend
/// is handed the same erased, bufferable stream, and reclaims the same
/// object when it hands off to the next backend at a concatenation
/// boundary.
pub(crate) type Erased = Box<dyn BufRead>;

/// Shared vtable for the three backends that don't have a faster native
/// path: `read` is required, everything else has a generic default the
/// dispatcher drives directly (zpkglist is handled separately below, since
/// it specializes `bulk` to avoid a copy — see `Reader::bulk`).
pub(crate) trait Backend {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;
    fn content_size(&self) -> Option<u64> {
        None
    }
}

enum State {
    Zpkglist(ZReader<Erased>),
    Raw(RawBackend),
    Zstd(ZstdBackend),
    Xz(XzBackend),
}

impl State {
    fn content_size(&self) -> Option<u64> {
        match self {
            State::Zpkglist(z) => Some(z.content_size()),
            State::Raw(b) => b.content_size(),
            State::Zstd(b) => b.content_size(),
            State::Xz(b) => b.content_size(),
        }
    }
}

/// Classifies the next stream in a concatenated sequence from its leading
/// bytes, and opens the matching backend. `Ok(None)` means physical EOF —
/// there is nothing more to read, recognized or not.
fn open_next(mut ar: Erased) -> Result<Option<State>> {
    let peeked = ar.fill_buf()?;
    if peeked.is_empty() {
        return Ok(None);
    }
    if peeked.len() >= 4 && header::check_magic(peeked) {
        let areader = AReader::new(ar);
        let raw = RawBackend::new(areader);
        return Ok(Some(State::Raw(raw)));
    }
    if peeked.len() >= 4 {
        let first4 = u32::from_le_bytes(peeked[0..4].try_into().unwrap());
        if first4 == crate::config::ENVELOPE_MAGIC {
            let areader = AReader::new(ar);
            return match ZReader::open_with_areader(areader)? {
                Some(z) => Ok(Some(State::Zpkglist(z))),
                None => Ok(None),
            };
        }
        if first4 == ZSTD_MAGIC {
            return Ok(Some(State::Zstd(ZstdBackend::open(ar)?)));
        }
        let first4_be = u32::from_be_bytes(peeked[0..4].try_into().unwrap());
        if first4_be == XZ_MAGIC_BE {
            return Ok(Some(State::Xz(XzBackend::open(ar))));
        }
    }
    Err(ZpkglistError::BadMagic("unrecognized container magic"))
}

/// A polymorphic reader over one of the four recognized container formats,
/// transparently concatenating further recognized streams once the current
/// one is exhausted (e.g. `cat a.zpkglist b.xz | read` is one logical
/// stream of header blobs).
///
/// Holds `R` by value, so dropping a `Reader` drops the underlying
/// descriptor too — there is no separate "free but don't close" step in
/// safe Rust; callers who want that keep `R` outside (e.g. a `&mut File`,
/// or a `BufReader` they still own) and open a `Reader` over a borrow of
/// it instead. Like the writer's `Lz4Stream`, a `Reader` is `Send` but not
/// `Sync`: nothing here is safe to call from two threads at once.
pub struct Reader<R> {
    state: Option<State>,
    content_size: Option<u64>,
    bulk_buf: Vec<u8>,
    view_buf: Vec<u8>,
    /// 16-byte header lead for whichever blob `next_view`/`next_malloc`
    /// will return next, shared across all four backends per `spec.md`
    /// §4.5's blob-iteration discipline.
    lead: [u8; header::LEAD_SIZE],
    lead_valid: bool,
    /// Decompressed bytes from the current zpkglist frame not yet drained
    /// by the generic `read`-based blob walk (bulk bypasses this; it pulls
    /// whole frames directly).
    zpk_leftover: Vec<u8>,
    zpk_leftover_pos: usize,
    pos_counter: u64,
    _marker: PhantomData<R>,
}

impl<R: Read + 'static> Reader<R> {
    /// Opens a reader over `inner`, sniffing its first backend. Returns
    /// `Ok(None)` if `inner` is empty — a state distinguishable from any
    /// error, matching `spec.md`'s "no handle" convention.
    pub fn open(inner: R) -> Result<Option<Self>> {
        let ar: Erased = Box::new(AReader::new(inner));
        match open_next(ar)? {
            None => Ok(None),
            Some(state) => Ok(Some(Reader {
                content_size: state.content_size(),
                state: Some(state),
                bulk_buf: Vec::new(),
                view_buf: Vec::new(),
                lead: [0u8; header::LEAD_SIZE],
                lead_valid: false,
                zpk_leftover: Vec::new(),
                zpk_leftover_pos: 0,
                pos_counter: 0,
                _marker: PhantomData,
            })),
        }
    }

    /// Total uncompressed content size of the *current* backend, if known
    /// (`Some` for zpkglist and zstd frames that declare one; `None` for
    /// xz, raw, or once concatenation has moved past the first stream).
    pub fn content_size(&self) -> Option<u64> {
        self.content_size
    }

    /// Reclaims the current backend's underlying stream and tries to open
    /// the next recognized format on it. Returns `Ok(true)` if a new
    /// backend was opened, `Ok(false)` at true end of the concatenated
    /// stream.
    fn advance(&mut self) -> Result<bool> {
        let ar = match self.state.take() {
            None => return Ok(false),
            Some(State::Zpkglist(z)) => Box::new(z.into_areader()) as Erased,
            Some(State::Raw(b)) => b.into_inner(),
            Some(State::Zstd(b)) => b.into_inner(),
            Some(State::Xz(b)) => b.into_inner(),
        };
        match open_next(ar)? {
            None => Ok(false),
            Some(state) => {
                self.content_size = state.content_size();
                self.state = Some(state);
                Ok(true)
            }
        }
    }

    fn read_current(&mut self, buf: &mut [u8]) -> Result<usize> {
        match self.state.as_mut() {
            None => Ok(0),
            Some(State::Zpkglist(z)) => {
                if self.zpk_leftover_pos >= self.zpk_leftover.len() {
                    match z.get_frame(false)? {
                        None => return Ok(0),
                        Some((frame, _pos)) => {
                            self.zpk_leftover.clear();
                            self.zpk_leftover.extend_from_slice(frame.as_bytes());
                            self.zpk_leftover_pos = 0;
                        }
                    }
                }
                let n = (self.zpk_leftover.len() - self.zpk_leftover_pos).min(buf.len());
                buf[..n].copy_from_slice(
                    &self.zpk_leftover[self.zpk_leftover_pos..self.zpk_leftover_pos + n],
                );
                self.zpk_leftover_pos += n;
                Ok(n)
            }
            Some(State::Raw(b)) => b.read(buf),
            Some(State::Zstd(b)) => b.read(buf),
            Some(State::Xz(b)) => b.read(buf),
        }
    }

    /// Reads exactly `buf.len()` bytes across backend/format boundaries,
    /// transparently advancing to the next concatenated stream whenever
    /// the current one runs dry. Returns the short count only at the true
    /// end of the whole concatenated sequence.
    fn read_full_concat(&mut self, buf: &mut [u8]) -> Result<usize> {
        let mut got = 0;
        while got < buf.len() {
            let n = self.read_current(&mut buf[got..])?;
            if n == 0 {
                if !self.advance()? {
                    break;
                }
                continue;
            }
            got += n;
        }
        Ok(got)
    }

    /// Bulk read discipline: returns one chunk of uncompressed bytes with
    /// no structural boundaries honoured, or `Ok(None)` at true end of
    /// stream. For zpkglist, one call yields one frame's contents (with
    /// its synthetic magic) straight out of the frame reader's own buffer,
    /// no copy. For the other backends, fills a shared scratch buffer via
    /// `read`.
    pub fn bulk(&mut self) -> Result<Option<&[u8]>> {
        loop {
            let zpkglist_eof = match self.state.as_ref() {
                None => return Ok(None),
                Some(State::Zpkglist(z)) => Some(z.is_eof()),
                Some(_) => None,
            };
            if let Some(true) = zpkglist_eof {
                if !self.advance()? {
                    return Ok(None);
                }
                continue;
            }
            break;
        }

        if let Some(State::Zpkglist(z)) = self.state.as_mut() {
            return match z.get_frame(false)? {
                None => unreachable!("is_eof() was false"),
                Some((crate::container::Frame::Owned(v), _pos)) => {
                    self.bulk_buf = v;
                    Ok(Some(&self.bulk_buf[..]))
                }
                Some((crate::container::Frame::Borrowed(b), _pos)) => Ok(Some(b)),
            };
        }

        let mut buf = std::mem::take(&mut self.bulk_buf);
        buf.resize(READER_BULK_BUFFER, 0);
        loop {
            let n = self.read_current(&mut buf[..READER_BULK_BUFFER])?;
            if n > 0 {
                self.bulk_buf = buf;
                return Ok(Some(&self.bulk_buf[..n]));
            }
            if !self.advance()? {
                self.bulk_buf = buf;
                return Ok(None);
            }
        }
    }

    /// Tries to prime `self.lead` with the next blob's 16-byte header,
    /// advancing across concatenated streams as needed. `Ok(false)` means
    /// there is no next blob anywhere in the remaining stream.
    fn prime_lead(&mut self) -> Result<bool> {
        if self.lead_valid {
            return Ok(true);
        }
        loop {
            let mut lead = [0u8; header::LEAD_SIZE];
            let got = self.read_full_concat(&mut lead)?;
            if got == header::LEAD_SIZE {
                if !header::check_magic(&lead) {
                    return Err(ZpkglistError::BadMagic("header blob"));
                }
                self.lead = lead;
                self.lead_valid = true;
                return Ok(true);
            }
            if got == 0 {
                return Ok(false);
            }
            // A short, non-zero remainder after the last blob is trailing
            // slack rather than a truncated blob: treat it as end of
            // stream, matching spec.md's "marks EOF if fewer than 16 bytes
            // remain after the payload".
            return Ok(false);
        }
    }

    /// Reads the next blob's lead + body into `dest` (overwriting it), and
    /// immediately primes `self.lead` with the following blob's header (or
    /// clears it at end of stream). Returns the blob's logical position.
    fn next_blob_into(&mut self, dest: &mut Vec<u8>) -> Result<Option<FramePos>> {
        if !self.prime_lead()? {
            return Ok(None);
        }
        let pos = FramePos::new(self.pos_counter, 0);
        let size = header::data_size(&self.lead)? as usize;
        dest.clear();
        dest.reserve(header::LEAD_SIZE + size);
        dest.extend_from_slice(&self.lead);
        dest.resize(header::LEAD_SIZE + size, 0);
        let got = self.read_full_concat(&mut dest[header::LEAD_SIZE..])?;
        if got != size {
            return Err(ZpkglistError::UnexpectedEof);
        }
        self.pos_counter += (header::LEAD_SIZE + size) as u64;
        self.lead_valid = false;
        Ok(Some(pos))
    }

    /// Header blob iteration, view discipline: returns the blob body
    /// (the 8-byte magic stripped; `(il, dl)` stays part of the body),
    /// borrowed from an internal buffer that the next call on this
    /// `Reader` invalidates. The buffer is shrunk
    /// back down once it's more than twice the observed need and above
    /// `VIEW_SHRINK_FLOOR`, so one oversized blob doesn't pin a large
    /// allocation for the rest of the stream.
    pub fn next_view(&mut self) -> Result<Option<(&[u8], FramePos)>> {
        let mut dest = std::mem::take(&mut self.view_buf);
        let result = self.next_blob_into(&mut dest);
        if dest.capacity() > dest.len().saturating_mul(2) && dest.capacity() > VIEW_SHRINK_FLOOR {
            let rounded = (dest.len() + VIEW_GROWTH_ROUND - 1) / VIEW_GROWTH_ROUND * VIEW_GROWTH_ROUND;
            let mut shrunk = Vec::with_capacity(rounded + VIEW_GROWTH_SLACK);
            shrunk.extend_from_slice(&dest);
            dest = shrunk;
        }
        self.view_buf = dest;
        match result? {
            None => Ok(None),
            Some(pos) => Ok(Some((&self.view_buf[header::MAGIC_SIZE..], pos))),
        }
    }

    /// Header blob iteration, malloc discipline: identical contract to
    /// [`next_view`](Self::next_view) but the blob body is returned as a
    /// freshly owned buffer the caller keeps.
    pub fn next_malloc(&mut self) -> Result<Option<(Vec<u8>, FramePos)>> {
        let mut dest = Vec::new();
        match self.next_blob_into(&mut dest)? {
            None => Ok(None),
            Some(pos) => {
                dest.drain(..header::MAGIC_SIZE);
                Ok(Some((dest, pos)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn make_blob(il: u32, data: &[u8]) -> Vec<u8> {
        let mut b = Vec::new();
        b.extend_from_slice(&crate::config::HEADER_MAGIC);
        b.extend_from_slice(&il.to_be_bytes());
        b.extend_from_slice(&(data.len() as u32).to_be_bytes());
        b.resize(b.len() + 16 * il as usize, 0);
        b.extend_from_slice(data);
        b
    }

    #[test]
    fn empty_input_opens_to_no_handle() {
        assert!(Reader::open(Cursor::new(Vec::<u8>::new())).unwrap().is_none());
    }

    #[test]
    fn unrecognized_magic_is_an_error() {
        let err = Reader::open(Cursor::new(vec![1u8, 2, 3, 4, 5, 6, 7, 8])).unwrap_err();
        assert!(matches!(err, ZpkglistError::BadMagic(_)));
    }

    #[test]
    fn raw_backend_iterates_blobs_via_view() {
        let a = make_blob(1, b"alpha");
        let b = make_blob(2, b"beta-two");
        let mut input = a.clone();
        input.extend_from_slice(&b);

        let mut r = Reader::open(Cursor::new(input)).unwrap().unwrap();
        let (v1, _) = r.next_view().unwrap().unwrap();
        assert_eq!(v1, &a[header::MAGIC_SIZE..]);
        let (v2, _) = r.next_view().unwrap().unwrap();
        assert_eq!(v2, &b[header::MAGIC_SIZE..]);
        assert!(r.next_view().unwrap().is_none());
    }

    #[test]
    fn raw_backend_bulk_reproduces_bytes() {
        let a = make_blob(1, b"bulk-payload-one");
        let b = make_blob(3, b"bulk-payload-two");
        let mut input = a.clone();
        input.extend_from_slice(&b);

        let mut r = Reader::open(Cursor::new(input.clone())).unwrap().unwrap();
        let mut out = Vec::new();
        while let Some(chunk) = r.bulk().unwrap() {
            out.extend_from_slice(chunk);
        }
        assert_eq!(out, input);
    }

    #[test]
    fn zpkglist_then_raw_concatenation_yields_both_blobs() {
        let a = make_blob(1, b"in-the-container");
        let b = make_blob(2, b"trailing-raw-blob");

        let mut container = Cursor::new(Vec::new());
        crate::container::compress(Cursor::new(a.clone()), &mut container, None).unwrap();
        let mut concatenated = container.into_inner();
        concatenated.extend_from_slice(&b);

        let mut r = Reader::open(Cursor::new(concatenated)).unwrap().unwrap();
        let (v1, _) = r.next_view().unwrap().unwrap();
        assert_eq!(v1, &a[header::MAGIC_SIZE..]);
        let (v2, _) = r.next_view().unwrap().unwrap();
        assert_eq!(v2, &b[header::MAGIC_SIZE..]);
        assert!(r.next_view().unwrap().is_none());
    }

    #[test]
    fn next_malloc_matches_next_view_contents() {
        let a = make_blob(4, b"owned-vs-borrowed");
        let mut r1 = Reader::open(Cursor::new(a.clone())).unwrap().unwrap();
        let (view, pos1) = r1.next_view().unwrap().unwrap();
        let view = view.to_vec();

        let mut r2 = Reader::open(Cursor::new(a.clone())).unwrap().unwrap();
        let (owned, pos2) = r2.next_malloc().unwrap().unwrap();

        assert_eq!(view, owned);
        assert_eq!(pos1, pos2);
    }

    #[test]
    fn content_size_reflects_zpkglist_envelope() {
        let blob = make_blob(1, b"sized-blob");
        let mut container = Cursor::new(Vec::new());
        crate::container::compress(Cursor::new(blob.clone()), &mut container, None).unwrap();
        let r = Reader::open(Cursor::new(container.into_inner())).unwrap().unwrap();
        assert_eq!(r.content_size(), Some(blob.len() as u64));
    }

    #[test]
    fn content_size_unknown_for_raw_backend() {
        let blob = make_blob(1, b"raw-no-size-hint");
        let r = Reader::open(Cursor::new(blob)).unwrap().unwrap();
        assert_eq!(r.content_size(), None);
    }
}
