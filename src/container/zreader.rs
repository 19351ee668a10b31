//! The zpkglist frame decompressor. Ported from `zreader.c`.

use std::io::Read;
use std::ops::Deref;

use crate::areader::AReader;
use crate::block::{compress_bound, decompress_safe, decompress_safe_using_dict};
use crate::config::{
    lz4_compress_bound, DATA_FRAME_MAGIC, DICT_FRAME_MAGIC, DICT_SIZE, HEADER_MAGIC,
    REGULAR_FRAME_MAX,
};
use crate::container::{Envelope, FramePos};
use crate::error::{Result, ZpkglistError};

const LEAD_SIZE: usize = 12;
const MIN_DICT_ZSIZE: usize = 257;

/// A decompressed zpkglist frame: either a view into the reader's internal
/// scratch buffer (valid until the next call into the same `ZReader`), or,
/// for a jumbo frame decompressed with `malloc_jumbo`, an owned buffer.
///
/// Either way the first 8 bytes are a synthetic RPM header magic, so the
/// whole slice reads exactly like `[magic][il][dl][data...]`, possibly
/// followed by up to three more back-to-back blobs for a regular frame.
pub enum Frame<'a> {
    Borrowed(&'a [u8]),
    Owned(Vec<u8>),
}

impl<'a> Frame<'a> {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Frame::Borrowed(b) => b,
            Frame::Owned(v) => v,
        }
    }
}

impl<'a> Deref for Frame<'a> {
    type Target = [u8];
    fn deref(&self) -> &[u8] {
        self.as_bytes()
    }
}

/// Decompresses a zpkglist container one frame at a time.
pub struct ZReader<R> {
    ar: AReader<R>,
    content_size: u64,
    buf1size: u32,
    jbufsize: u32,
    content_size_so_far: u64,
    sequential: bool,
    eof: bool,
    /// `arena[..DICT_SIZE]` holds the decompressed dictionary;
    /// `arena[DICT_SIZE..]` is the `buf1size`-byte scratch region used both
    /// to decompress regular-frame content and to stage jumbo compressed
    /// bytes before they're decompressed elsewhere.
    arena: Vec<u8>,
    /// Real bytes of the dictionary's last 8 bytes, clobbered to and fro
    /// with the synthetic header magic around each regular-frame decompress.
    save: [u8; 8],
    /// Lazily allocated malloc-jumbo destination: an 8-byte magic guard
    /// followed by `jbufsize` usable bytes, reused across jumbo frames.
    jbuf: Option<Vec<u8>>,
    /// The next data frame's already-peeked 12-byte lead.
    lead: [u8; LEAD_SIZE],
    /// Absolute file offset where `lead` begins.
    lead_offset: u64,
}

impl<R: Read> ZReader<R> {
    /// Opens a zpkglist container for reading. Returns `Ok(None)` if `r` is
    /// at physical EOF before any bytes are read at all — the signal the
    /// polymorphic reader uses to stop trying backends. A valid envelope
    /// with zero content (no dictionary frame, nothing to decompress) is
    /// NOT physical EOF: it comes back as a reader that immediately reports
    /// end-of-stream from `get_frame`.
    pub fn open(r: R) -> Result<Option<Self>> {
        Self::open_with_areader(AReader::new(r))
    }

    /// Same as [`open`](Self::open), but takes an already-buffered
    /// [`AReader`] instead of constructing a fresh one. The polymorphic
    /// dispatcher (`crate::reader`) uses this when a zpkglist container is
    /// found mid-stream, after a previous backend already peeked ahead of
    /// it: any bytes that reader had buffered but not consumed stay live
    /// instead of being silently dropped.
    pub fn open_with_areader(mut ar: AReader<R>) -> Result<Option<Self>> {
        let env = match Envelope::read_from_areader(&mut ar)? {
            None => return Ok(None),
            Some(e) => e,
        };

        let peeked = ar.peek(8)?;
        let has_dict_magic = peeked.len() >= 4
            && u32::from_le_bytes(peeked[0..4].try_into().unwrap()) == DICT_FRAME_MAGIC;

        if !has_dict_magic {
            if env.content_size == 0 {
                return Ok(Some(ZReader {
                    ar,
                    content_size: 0,
                    buf1size: 0,
                    jbufsize: 0,
                    content_size_so_far: 0,
                    sequential: true,
                    eof: true,
                    arena: Vec::new(),
                    save: [0; 8],
                    jbuf: None,
                    lead: [0; LEAD_SIZE],
                    lead_offset: 0,
                }));
            }
            if peeked.len() < 4 {
                return Err(ZpkglistError::UnexpectedEof);
            }
            return Err(ZpkglistError::BadMagic("zpkglist dictionary frame"));
        }

        if env.content_size == 0 {
            return Err(ZpkglistError::BadSize(
                "dictionary frame present but content size is zero",
            ));
        }
        if peeked.len() < 8 {
            return Err(ZpkglistError::UnexpectedEof);
        }
        let zsize = u32::from_le_bytes(peeked[4..8].try_into().unwrap()) as usize;
        ar.consume(8);

        if zsize < MIN_DICT_ZSIZE || zsize > compress_bound(DICT_SIZE as i32) as usize {
            return Err(ZpkglistError::BadSize("zpkglist dictionary zsize"));
        }
        if (env.buf1size as usize) < zsize {
            return Err(ZpkglistError::BadSize("buf1size"));
        }

        let mut arena = vec![0u8; DICT_SIZE + env.buf1size as usize];
        {
            let (dict_part, rest) = arena.split_at_mut(DICT_SIZE);
            let got = ar.read_full(&mut rest[..zsize])?;
            if got != zsize {
                return Err(ZpkglistError::UnexpectedEof);
            }
            let n = decompress_safe(&rest[..zsize], dict_part)
                .map_err(|_| ZpkglistError::Decompression("cannot decompress dictionary"))?;
            if n != DICT_SIZE {
                return Err(ZpkglistError::Decompression("cannot decompress dictionary"));
            }
        }

        let mut lead = [0u8; LEAD_SIZE];
        let lead_offset = ar.tell();
        let got = ar.read_full(&mut lead)?;
        if got != LEAD_SIZE {
            return Err(ZpkglistError::UnexpectedEof);
        }
        if u32::from_le_bytes(lead[0..4].try_into().unwrap()) != DATA_FRAME_MAGIC {
            return Err(ZpkglistError::BadMagic("zpkglist data frame"));
        }

        let mut save = [0u8; 8];
        save.copy_from_slice(&arena[DICT_SIZE - 8..DICT_SIZE]);

        Ok(Some(ZReader {
            ar,
            content_size: env.content_size,
            buf1size: env.buf1size,
            jbufsize: env.jbufsize,
            content_size_so_far: 0,
            sequential: true,
            eof: false,
            arena,
            save,
            jbuf: None,
            lead,
            lead_offset,
        }))
    }

    /// Total uncompressed content size declared by the envelope.
    pub fn content_size(&self) -> u64 {
        self.content_size
    }

    /// Whether the container is exhausted (last `get_frame` returned `None`,
    /// or it was empty from the start).
    pub fn is_eof(&self) -> bool {
        self.eof
    }

    /// Reclaims the underlying buffered reader, including any bytes already
    /// peeked past this container's last frame. Used by the polymorphic
    /// dispatcher to keep reading whatever format follows once this
    /// container is exhausted; meaningless (and wasteful, since whatever is
    /// left is mid-container) if called before EOF.
    pub fn into_areader(self) -> AReader<R> {
        self.ar
    }

    /// Decompresses and returns the next frame, or `Ok(None)` at end of
    /// stream. `malloc_jumbo` selects, for jumbo (>128 KiB) frames only,
    /// whether the caller gets a freshly allocated buffer (`Frame::Owned`)
    /// or a view into a buffer this `ZReader` reuses across calls
    /// (`Frame::Borrowed`); regular frames are always `Frame::Borrowed`.
    pub fn get_frame(&mut self, malloc_jumbo: bool) -> Result<Option<(Frame<'_>, FramePos)>> {
        if self.eof {
            return Ok(None);
        }

        let zsize = u32::from_le_bytes(self.lead[4..8].try_into().unwrap()) as usize;
        if zsize < 4 {
            return Err(ZpkglistError::BadSize("zpkglist data zsize"));
        }
        let zsize = zsize - 4;
        let size = u32::from_le_bytes(self.lead[8..12].try_into().unwrap()) as usize;
        let pos = FramePos::new(self.lead_offset, 0);

        let jumbo = size > REGULAR_FRAME_MAX;
        if jumbo {
            if size > self.jbufsize as usize {
                return Err(ZpkglistError::BadSize("data size"));
            }
            if zsize > self.buf1size as usize {
                return Err(ZpkglistError::BadSize("data zsize"));
            }
        } else {
            if size < 8 {
                return Err(ZpkglistError::BadSize("data size"));
            }
            if size + zsize > self.buf1size as usize {
                return Err(ZpkglistError::BadSize("data size+zsize"));
            }
        }
        if zsize == 0 || zsize > lz4_compress_bound(size) {
            return Err(ZpkglistError::BadSize("data zsize"));
        }

        self.content_size_so_far += 8 + size as u64;
        if self.content_size_so_far > self.content_size {
            return Err(ZpkglistError::BadSize("data size"));
        }

        let zbuf_start = if jumbo { DICT_SIZE } else { DICT_SIZE + size };
        let got = self.ar.read_full(&mut self.arena[zbuf_start..zbuf_start + zsize])?;
        if got != zsize {
            return Err(ZpkglistError::UnexpectedEof);
        }

        let mut next_lead = [0u8; LEAD_SIZE];
        let peeked_len = {
            let peeked = self.ar.peek(LEAD_SIZE)?;
            let n = peeked.len().min(LEAD_SIZE);
            next_lead[..n].copy_from_slice(&peeked[..n]);
            n
        };
        let has_magic = peeked_len >= 4
            && u32::from_le_bytes(next_lead[0..4].try_into().unwrap()) == DATA_FRAME_MAGIC;
        if !has_magic {
            if self.sequential && self.content_size_so_far != self.content_size {
                return Err(ZpkglistError::BadSize("content size"));
            }
            self.eof = true;
        } else {
            if peeked_len != LEAD_SIZE {
                return Err(ZpkglistError::UnexpectedEof);
            }
            self.lead_offset = self.ar.tell();
            self.ar.consume(LEAD_SIZE);
            self.lead = next_lead;
        }

        if jumbo {
            let src = &self.arena[DICT_SIZE..DICT_SIZE + zsize];
            if malloc_jumbo {
                let mut out = vec![0u8; size];
                let n = decompress_safe(src, &mut out)
                    .map_err(|_| ZpkglistError::Decompression("jumbo frame decompression failed"))?;
                if n != size {
                    return Err(ZpkglistError::Decompression("jumbo frame decompression failed"));
                }
                return Ok(Some((Frame::Owned(out), pos)));
            }
            if self.jbuf.is_none() {
                let mut jbuf = vec![0u8; 8 + self.jbufsize as usize];
                jbuf[..8].copy_from_slice(&HEADER_MAGIC);
                self.jbuf = Some(jbuf);
            }
            let jbuf = self.jbuf.as_mut().unwrap();
            let n = decompress_safe(src, &mut jbuf[8..8 + size])
                .map_err(|_| ZpkglistError::Decompression("jumbo frame decompression failed"))?;
            if n != size {
                return Err(ZpkglistError::Decompression("jumbo frame decompression failed"));
            }
            return Ok(Some((Frame::Borrowed(&jbuf[..8 + size]), pos)));
        }

        self.arena[DICT_SIZE - 8..DICT_SIZE].copy_from_slice(&self.save);
        // SAFETY: `arena` is one contiguous allocation; `dict_start` points
        // at its first `DICT_SIZE` bytes and `content_ptr` at the
        // `DICT_SIZE`-byte-aligned content region immediately after, so the
        // dictionary is adjacent to the destination and the fast prefix
        // path applies. `src_ptr` addresses the just-read compressed bytes
        // at `arena[DICT_SIZE+size..]`, disjoint from the destination.
        unsafe {
            let base = self.arena.as_mut_ptr();
            let dict_start = base as *const u8;
            let content_ptr = base.add(DICT_SIZE);
            let src_ptr = base.add(DICT_SIZE + size) as *const u8;
            let n = decompress_safe_using_dict(src_ptr, content_ptr, zsize, size, dict_start, DICT_SIZE)
                .map_err(|_| ZpkglistError::Decompression("frame decompression failed"))?;
            if n != size {
                return Err(ZpkglistError::Decompression("frame decompression failed"));
            }
        }
        self.arena[DICT_SIZE - 8..DICT_SIZE].copy_from_slice(&HEADER_MAGIC);
        Ok(Some((Frame::Borrowed(&self.arena[DICT_SIZE - 8..DICT_SIZE + size]), pos)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::compress;
    use std::io::{Cursor, Seek};

    fn make_blob(il: u32, data: &[u8]) -> Vec<u8> {
        let mut b = Vec::new();
        b.extend_from_slice(&HEADER_MAGIC);
        b.extend_from_slice(&il.to_be_bytes());
        b.extend_from_slice(&(data.len() as u32).to_be_bytes());
        b.resize(b.len() + 16 * il as usize, 0);
        b.extend_from_slice(data);
        b
    }

    fn compress_to_vec(input: &[u8]) -> Vec<u8> {
        let mut out = Cursor::new(Vec::new());
        compress(Cursor::new(input.to_vec()), &mut out, None).unwrap();
        out.into_inner()
    }

    #[test]
    fn empty_container_round_trips_as_immediate_eof() {
        let container = compress_to_vec(&[]);
        let mut z = ZReader::open(Cursor::new(container)).unwrap().unwrap();
        assert_eq!(z.content_size(), 0);
        assert!(z.get_frame(false).unwrap().is_none());
    }

    #[test]
    fn single_blob_round_trips() {
        let blob = make_blob(2, b"payload-bytes-here");
        let container = compress_to_vec(&blob);
        let mut z = ZReader::open(Cursor::new(container)).unwrap().unwrap();
        assert_eq!(z.content_size(), blob.len() as u64);
        let (frame, _pos) = z.get_frame(false).unwrap().unwrap();
        assert_eq!(frame.as_bytes(), &blob[..]);
        assert!(z.get_frame(false).unwrap().is_none());
    }

    #[test]
    fn multiple_blobs_round_trip_across_frames() {
        let mut input = Vec::new();
        for i in 0..20u32 {
            input.extend_from_slice(&make_blob(i + 1, format!("blob number {i}").as_bytes()));
        }
        let container = compress_to_vec(&input);
        let mut z = ZReader::open(Cursor::new(container)).unwrap().unwrap();
        let mut out = Vec::new();
        while let Some((frame, _pos)) = z.get_frame(false).unwrap() {
            out.extend_from_slice(frame.as_bytes());
        }
        assert_eq!(out, input);
    }

    #[test]
    fn jumbo_blob_round_trips_malloc_and_reused() {
        let big = vec![0x5au8; 200 * 1024];
        let blob = make_blob(1, &big);
        let container = compress_to_vec(&blob);

        let mut z = ZReader::open(Cursor::new(container.clone())).unwrap().unwrap();
        let (frame, _pos) = z.get_frame(true).unwrap().unwrap();
        assert_eq!(frame.as_bytes(), &blob[..]);
        assert!(matches!(frame, Frame::Owned(_)));

        let mut z2 = ZReader::open(Cursor::new(container)).unwrap().unwrap();
        let (frame2, _pos2) = z2.get_frame(false).unwrap().unwrap();
        assert_eq!(frame2.as_bytes(), &blob[..]);
        assert!(matches!(frame2, Frame::Borrowed(_)));
    }

    #[test]
    fn frame_positions_are_strictly_increasing() {
        let mut input = Vec::new();
        for i in 0..9u32 {
            input.extend_from_slice(&make_blob(i + 1, b"x"));
        }
        let container = compress_to_vec(&input);
        let mut z = ZReader::open(Cursor::new(container)).unwrap().unwrap();
        let mut last: Option<FramePos> = None;
        while let Some((_frame, pos)) = z.get_frame(false).unwrap() {
            if let Some(l) = last {
                assert!(pos > l);
            }
            last = Some(pos);
        }
    }

    #[test]
    fn rejects_truncated_container() {
        let blob = make_blob(1, b"some payload data");
        let mut container = compress_to_vec(&blob);
        container.truncate(container.len() - 4);
        let mut z = ZReader::open(Cursor::new(container)).unwrap().unwrap();
        assert!(z.get_frame(false).is_err());
    }
}
