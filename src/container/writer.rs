//! The zpkglist compressor. Ported from `compress.c`'s `zNew`/`zLoop`/
//! `zpkglistCompress`.

use std::io::{Read, Seek, Write};

use crate::areader::AReader;
use crate::block::Lz4Stream;
use crate::config::{
    lz4_compress_bound, DATA_FRAME_MAGIC, DICT_SIZE, LZ4_ACCELERATION, MAX_BLOBS_PER_FRAME,
    REGULAR_FRAME_MAX,
};
use crate::container::Envelope;
use crate::dict::{dict_frame, dict_zsize, RPM_HEADER_DICT};
use crate::error::{Result, ZpkglistError};
use crate::header::{self, LEAD_SIZE};

/// Compresses a raw concatenation of RPM header blobs read from `input`
/// into the zpkglist container format, written to `output`.
///
/// `output` must be positioned at the start of an empty, seekable
/// destination: the leading frame is written as a placeholder first and
/// rewritten once the true totals are known, mirroring the `fstat`/`lseek`
/// checks in `zpkglistCompress`. `hash`, if given, is invoked once per
/// frame's worth of *uncompressed* bytes (magic included) in the order they
/// appear in `input` — concatenating every call's bytes reproduces `input`
/// exactly.
///
/// Returns `Ok(0)` for empty input (a valid, all-zero envelope is still
/// written). Otherwise returns the total uncompressed content size.
pub fn compress<R: Read, W: Write + Seek>(
    input: R,
    mut output: W,
    mut hash: Option<&mut dyn FnMut(&[u8])>,
) -> Result<u64> {
    if output.stream_position()? != 0 {
        return Err(ZpkglistError::Usage(
            "output must be positioned at the beginning",
        ));
    }
    Envelope::default().write(&mut output)?;

    let mut ar = AReader::new(input);
    let mut lead = match read_lead(&mut ar)? {
        None => return Ok(0),
        Some(l) => l,
    };

    output.write_all(dict_frame())?;

    let arena_len = DICT_SIZE + REGULAR_FRAME_MAX + lz4_compress_bound(REGULAR_FRAME_MAX);
    let mut arena = vec![0u8; arena_len];
    arena[..DICT_SIZE].copy_from_slice(RPM_HEADER_DICT.as_slice());
    let mut stream0 = *Lz4Stream::new();
    stream0.load_dict(&arena[..DICT_SIZE]);

    let mut total: u64 = 0;
    let mut buf1size: u32 = dict_zsize() as u32;
    let mut jbufsize: u32 = 0;

    let mut data_size = header::data_size(&lead)?;

    loop {
        if 8 + data_size > REGULAR_FRAME_MAX as u64 {
            let eof = write_jumbo_frame(
                &mut ar,
                &mut output,
                &lead,
                data_size,
                &mut hash,
                &mut total,
                &mut buf1size,
                &mut jbufsize,
            )?;
            if eof.is_done() {
                break;
            }
            lead = eof.next_lead();
            data_size = header::data_size(&lead)?;
            continue;
        }

        let eof = write_regular_frame(
            &mut ar,
            &mut output,
            &mut arena,
            &mut stream0,
            &mut lead,
            data_size,
            &mut hash,
            &mut total,
            &mut buf1size,
        )?;
        if eof {
            break;
        }
        data_size = header::data_size(&lead)?;
    }

    if total == 0 {
        return Ok(0);
    }
    if total > u32::MAX as u64 {
        return Err(ZpkglistError::BadSize("output too big"));
    }

    output.seek(std::io::SeekFrom::Start(0))?;
    Envelope { content_size: total, buf1size, jbufsize }.write(&mut output)?;
    Ok(total)
}

fn read_lead<R: Read>(ar: &mut AReader<R>) -> Result<Option<[u8; LEAD_SIZE]>> {
    let mut lead = [0u8; LEAD_SIZE];
    let got = ar.read_full(&mut lead)?;
    if got == 0 {
        return Ok(None);
    }
    if got < LEAD_SIZE {
        return Err(ZpkglistError::UnexpectedEof);
    }
    if !header::check_magic(&lead) {
        return Err(ZpkglistError::BadMagic("header blob"));
    }
    Ok(Some(lead))
}

/// Overlays the RPM header magic onto the 8 bytes immediately preceding
/// `content`, invokes `hash` with the combined `[magic][content]` view,
/// then restores the original bytes. `content` must be a suffix of the same
/// allocation as the 8 guard bytes before it.
fn hash_with_synthetic_magic(
    hash: &mut Option<&mut dyn FnMut(&[u8])>,
    guard_and_content: &mut [u8],
) {
    if let Some(hash) = hash.as_mut() {
        let mut save = [0u8; 8];
        save.copy_from_slice(&guard_and_content[..8]);
        guard_and_content[..8].copy_from_slice(&crate::config::HEADER_MAGIC);
        hash(guard_and_content);
        guard_and_content[..8].copy_from_slice(&save);
    }
}

struct JumboOutcome {
    eof: bool,
    next_lead: [u8; LEAD_SIZE],
}

impl JumboOutcome {
    fn is_done(&self) -> bool {
        self.eof
    }
    fn next_lead(&self) -> [u8; LEAD_SIZE] {
        self.next_lead
    }
}

#[allow(clippy::too_many_arguments)]
fn write_jumbo_frame<R: Read, W: Write>(
    ar: &mut AReader<R>,
    output: &mut W,
    lead: &[u8; LEAD_SIZE],
    data_size: u64,
    hash: &mut Option<&mut dyn FnMut(&[u8])>,
    total: &mut u64,
    buf1size: &mut u32,
    jbufsize: &mut u32,
) -> Result<JumboOutcome> {
    // 8 guard bytes + 8 (lead's il/dl) + dataSize + 16 (next lead lookahead).
    let mut buf = vec![0u8; 8 + 8 + data_size as usize + 16];
    buf[8..16].copy_from_slice(&lead[8..16]);
    let got = ar.read_full(&mut buf[16..])? as u64;

    let mut next_lead = [0u8; LEAD_SIZE];
    let eof = if got == data_size {
        true
    } else if got != data_size + 16 {
        return Err(ZpkglistError::UnexpectedEof);
    } else {
        next_lead.copy_from_slice(&buf[16 + data_size as usize..16 + data_size as usize + 16]);
        if !header::check_magic(&next_lead) {
            return Err(ZpkglistError::BadMagic("header blob"));
        }
        false
    };

    let content_len = 8 + data_size as usize;
    hash_with_synthetic_magic(hash, &mut buf[0..8 + content_len]);

    let bound = lz4_compress_bound(content_len);
    let mut zbuf = vec![0u8; bound];
    let zsize = crate::block::compress_fast(&buf[8..8 + content_len], &mut zbuf, LZ4_ACCELERATION)
        .map_err(|_| ZpkglistError::Decompression("jumbo frame compression failed"))?;

    let mut header_bytes = [0u8; 12];
    header_bytes[0..4].copy_from_slice(&DATA_FRAME_MAGIC.to_le_bytes());
    header_bytes[4..8].copy_from_slice(&((zsize as u32) + 4).to_le_bytes());
    header_bytes[8..12].copy_from_slice(&(content_len as u32).to_le_bytes());
    output.write_all(&header_bytes)?;
    output.write_all(&zbuf[..zsize])?;

    *total += 16 + data_size;
    if *buf1size < zsize as u32 {
        *buf1size = zsize as u32;
    }
    if *jbufsize < content_len as u32 {
        *jbufsize = content_len as u32;
    }

    Ok(JumboOutcome { eof, next_lead })
}

#[allow(clippy::too_many_arguments)]
fn write_regular_frame<R: Read, W: Write>(
    ar: &mut AReader<R>,
    output: &mut W,
    arena: &mut [u8],
    stream0: &mut Lz4Stream,
    lead: &mut [u8; LEAD_SIZE],
    mut data_size: u64,
    hash: &mut Option<&mut dyn FnMut(&[u8])>,
    total: &mut u64,
    buf1size: &mut u32,
) -> Result<bool> {
    let mut cur = DICT_SIZE;
    let mut eof = false;

    for i in 0..MAX_BLOBS_PER_FRAME {
        if i == 0 {
            arena[cur..cur + 8].copy_from_slice(&lead[8..16]);
            cur += 8;
        } else {
            arena[cur..cur + LEAD_SIZE].copy_from_slice(lead);
            cur += LEAD_SIZE;
        }

        let want = data_size as usize + LEAD_SIZE;
        let got = ar.read_full(&mut arena[cur..cur + want])? as u64;
        cur += data_size as usize;

        if got == data_size {
            eof = true;
            break;
        }
        if got != data_size + LEAD_SIZE as u64 {
            return Err(ZpkglistError::UnexpectedEof);
        }

        lead.copy_from_slice(&arena[cur..cur + LEAD_SIZE]);
        if !header::check_magic(lead) {
            return Err(ZpkglistError::BadMagic("header blob"));
        }
        data_size = header::data_size(lead)?;

        if (cur - DICT_SIZE) + LEAD_SIZE + data_size as usize > REGULAR_FRAME_MAX {
            break;
        }
    }

    let fill = cur - DICT_SIZE;

    hash_with_synthetic_magic(hash, &mut arena[DICT_SIZE - 8..DICT_SIZE + fill]);

    let mut stream = stream0.clone();
    let (left, right) = arena.split_at_mut(DICT_SIZE + fill);
    let src = &left[DICT_SIZE..DICT_SIZE + fill];
    let zsize = stream.compress_fast_continue(src, right, LZ4_ACCELERATION);
    if zsize < 1 {
        return Err(ZpkglistError::Decompression("regular frame compression failed"));
    }
    let zsize = zsize as usize;

    let mut header_bytes = [0u8; 12];
    header_bytes[0..4].copy_from_slice(&DATA_FRAME_MAGIC.to_le_bytes());
    header_bytes[4..8].copy_from_slice(&((zsize as u32) + 4).to_le_bytes());
    header_bytes[8..12].copy_from_slice(&(fill as u32).to_le_bytes());
    output.write_all(&header_bytes)?;
    output.write_all(&right[..zsize])?;

    *total += 8 + fill as u64;
    if *buf1size < (fill + zsize) as u32 {
        *buf1size = (fill + zsize) as u32;
    }

    Ok(eof)
}
