//! The 24-byte leading frame of a zpkglist container.

use std::io::{Read, Write};

use crate::areader::AReader;
use crate::config::{ENVELOPE_MAGIC, ENVELOPE_SIZE};
use crate::error::{Result, ZpkglistError};

/// Decoded leading frame: total uncompressed content size and the two
/// buffer-sizing hints a reader needs before it can allocate anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Envelope {
    /// Sum of `8 + size` over every blob in the stream (size = 16*il+dl).
    /// Zero iff the input was empty.
    pub content_size: u64,
    /// Largest `content + compressed` byte count any single frame needs
    /// while being written or read. Also doubles as the minimum scratch
    /// buffer size a reader must allocate.
    pub buf1size: u32,
    /// Uncompressed size of the largest jumbo (>128 KiB) blob, or 0 if the
    /// stream has no jumbo frames.
    pub jbufsize: u32,
}

impl Envelope {
    pub fn write<W: Write>(&self, mut out: W) -> Result<()> {
        let mut bytes = [0u8; ENVELOPE_SIZE];
        bytes[0..4].copy_from_slice(&ENVELOPE_MAGIC.to_le_bytes());
        bytes[4..8].copy_from_slice(&16u32.to_le_bytes());
        bytes[8..16].copy_from_slice(&self.content_size.to_le_bytes());
        bytes[16..20].copy_from_slice(&self.buf1size.to_le_bytes());
        bytes[20..24].copy_from_slice(&self.jbufsize.to_le_bytes());
        out.write_all(&bytes)?;
        Ok(())
    }

    /// Parses an already-read 24-byte envelope and validates the size
    /// relationships `zreader_begin` enforces (content/buf1size zero
    /// together, jumbo-size bounds, buf1size bounds).
    pub fn parse(bytes: &[u8; ENVELOPE_SIZE]) -> Result<Self> {
        let magic = u32::from_le_bytes(bytes[0..4].try_into().unwrap());
        if magic != ENVELOPE_MAGIC {
            return Err(ZpkglistError::BadMagic("zpkglist envelope"));
        }
        let size16 = u32::from_le_bytes(bytes[4..8].try_into().unwrap());
        if size16 != 16 {
            return Err(ZpkglistError::BadSize("zpkglist envelope frame size"));
        }
        let content_size = u64::from_le_bytes(bytes[8..16].try_into().unwrap());
        let buf1size = u32::from_le_bytes(bytes[16..20].try_into().unwrap());
        let jbufsize = u32::from_le_bytes(bytes[20..24].try_into().unwrap());

        let env = Envelope { content_size, buf1size, jbufsize };
        env.validate()?;
        Ok(env)
    }

    fn validate(&self) -> Result<()> {
        use crate::config::{lz4_compress_bound, HEADER_MAX_SIZE, REGULAR_FRAME_MAX};

        if (self.buf1size == 0) != (self.content_size == 0) {
            return Err(ZpkglistError::BadSize("buf1size"));
        }
        if self.jbufsize != 0 {
            if self.buf1size == 0 {
                return Err(ZpkglistError::BadSize("buf1size"));
            }
            if self.jbufsize as u64 > HEADER_MAX_SIZE || (self.jbufsize as u64) > self.content_size {
                return Err(ZpkglistError::BadSize("jbufsize"));
            }
            if self.jbufsize as usize <= REGULAR_FRAME_MAX {
                return Err(ZpkglistError::BadSize("jbufsize"));
            }
        }
        let regular_bound = (REGULAR_FRAME_MAX + lz4_compress_bound(REGULAR_FRAME_MAX)) as u32;
        if self.buf1size > regular_bound
            && self.buf1size as usize > lz4_compress_bound(self.jbufsize as usize)
        {
            return Err(ZpkglistError::BadSize("buf1size"));
        }
        Ok(())
    }

    /// Reads and parses the envelope from `r`. Returns `Ok(None)` if `r` is
    /// at EOF before any bytes are read (the "no container here" case the
    /// polymorphic reader uses to detect physical end of input).
    pub fn read_from<R: Read>(mut r: R) -> Result<Option<Self>> {
        let mut bytes = [0u8; ENVELOPE_SIZE];
        let mut got = 0;
        loop {
            match r.read(&mut bytes[got..]) {
                Ok(0) => break,
                Ok(n) => got += n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
            if got == bytes.len() {
                break;
            }
        }
        if got == 0 {
            return Ok(None);
        }
        if got != bytes.len() {
            return Err(ZpkglistError::UnexpectedEof);
        }
        Ok(Some(Self::parse(&bytes)?))
    }

    /// Same as [`read_from`](Self::read_from), but reads through an
    /// [`AReader`] so the dictionary/data frames that follow can be peeked
    /// from the same buffered source.
    pub fn read_from_areader<R: Read>(ar: &mut AReader<R>) -> Result<Option<Self>> {
        let mut bytes = [0u8; ENVELOPE_SIZE];
        let got = ar.read_full(&mut bytes)?;
        if got == 0 {
            return Ok(None);
        }
        if got != bytes.len() {
            return Err(ZpkglistError::UnexpectedEof);
        }
        Ok(Some(Self::parse(&bytes)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_write_and_parse() {
        let env = Envelope { content_size: 12_345, buf1size: 9000, jbufsize: 0 };
        let mut buf = Vec::new();
        env.write(&mut buf).unwrap();
        assert_eq!(buf.len(), ENVELOPE_SIZE);
        let parsed = Envelope::read_from(&buf[..]).unwrap().unwrap();
        assert_eq!(parsed, env);
    }

    #[test]
    fn empty_stream_envelope_is_all_zero() {
        let env = Envelope::default();
        let mut buf = Vec::new();
        env.write(&mut buf).unwrap();
        let parsed = Envelope::read_from(&buf[..]).unwrap().unwrap();
        assert_eq!(parsed.content_size, 0);
        assert_eq!(parsed.buf1size, 0);
    }

    #[test]
    fn rejects_bad_magic() {
        let mut buf = vec![0u8; ENVELOPE_SIZE];
        buf[4..8].copy_from_slice(&16u32.to_le_bytes());
        assert!(matches!(
            Envelope::read_from(&buf[..]),
            Err(ZpkglistError::BadMagic(_))
        ));
    }

    #[test]
    fn rejects_mismatched_buf1size_contentsize_zeroness() {
        let mut bytes = [0u8; ENVELOPE_SIZE];
        bytes[0..4].copy_from_slice(&ENVELOPE_MAGIC.to_le_bytes());
        bytes[4..8].copy_from_slice(&16u32.to_le_bytes());
        bytes[8..16].copy_from_slice(&0u64.to_le_bytes());
        bytes[16..20].copy_from_slice(&500u32.to_le_bytes());
        assert!(Envelope::parse(&bytes).is_err());
    }

    #[test]
    fn physical_eof_returns_none() {
        assert!(Envelope::read_from(&[][..]).unwrap().is_none());
    }
}
