//! RPM header blob framing.
//!
//! An RPM header blob is 8 bytes of magic, followed by two big-endian `u32`
//! counts `(il, dl)`, followed by `16*il + dl` bytes of tag/data payload.
//! Ported from `header.h`'s `headerCheckMagic`/`headerDataSize`.

use crate::config::{HEADER_MAGIC, HEADER_MAX_DATA, HEADER_MAX_TAGS};
use crate::error::{Result, ZpkglistError};

/// Byte length of the magic + `(il, dl)` lead that precedes every header's
/// data payload.
pub const LEAD_SIZE: usize = 16;

/// Byte length of the magic alone (the part view/malloc iteration elides;
/// `(il, dl)` stays part of the returned body, per `spec.md` §4.5: "the
/// 8-byte magic is not included; the body starts at (il,dl)").
pub const MAGIC_SIZE: usize = 8;

/// Returns `true` if `lead` begins with the 8-byte RPM header magic.
///
/// `lead` must be at least 8 bytes long.
#[inline]
pub fn check_magic(lead: &[u8]) -> bool {
    lead.len() >= 8 && lead[..8] == HEADER_MAGIC
}

/// Decodes the `(il, dl)` pair from a 16-byte lead (magic + il + dl) and
/// returns the size, in bytes, of the data that follows the lead.
///
/// Returns `Err` if `il`/`dl` are zero or exceed the limits rpm <= 4.13
/// enforces, mirroring `headerDataSize`'s `il - 1 > headerMaxTags - 1`
/// idiom (true iff `il` is outside `1..=headerMaxTags`).
pub fn data_size(lead: &[u8; LEAD_SIZE]) -> Result<u64> {
    let il = u32::from_be_bytes(lead[8..12].try_into().unwrap());
    let dl = u32::from_be_bytes(lead[12..16].try_into().unwrap());
    if il.wrapping_sub(1) > HEADER_MAX_TAGS - 1 {
        return Err(ZpkglistError::BadSize("il"));
    }
    if dl.wrapping_sub(1) > HEADER_MAX_DATA - 1 {
        return Err(ZpkglistError::BadSize("dl"));
    }
    Ok(16u64 * il as u64 + dl as u64)
}

/// Total size in bytes of a header blob (lead + data), given its lead.
pub fn blob_size(lead: &[u8; LEAD_SIZE]) -> Result<u64> {
    Ok(LEAD_SIZE as u64 + data_size(lead)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lead(il: u32, dl: u32) -> [u8; LEAD_SIZE] {
        let mut l = [0u8; LEAD_SIZE];
        l[..8].copy_from_slice(&HEADER_MAGIC);
        l[8..12].copy_from_slice(&il.to_be_bytes());
        l[12..16].copy_from_slice(&dl.to_be_bytes());
        l
    }

    #[test]
    fn recognizes_magic() {
        let l = lead(1, 0);
        assert!(check_magic(&l));
        let mut bad = l;
        bad[0] ^= 0xff;
        assert!(!check_magic(&bad));
    }

    #[test]
    fn rejects_zero_counts() {
        assert!(data_size(&lead(0, 1)).is_err());
        assert!(data_size(&lead(1, 0)).is_err());
        assert!(data_size(&lead(0, 0)).is_err());
        assert!(data_size(&lead(1, 1)).is_ok());
    }

    #[test]
    fn rejects_oversized_counts() {
        assert!(data_size(&lead(HEADER_MAX_TAGS + 1, 1)).is_err());
        assert!(data_size(&lead(1, HEADER_MAX_DATA + 1)).is_err());
        assert!(data_size(&lead(HEADER_MAX_TAGS, 1)).is_ok());
    }

    #[test]
    fn computes_data_size() {
        let l = lead(3, 10);
        assert_eq!(data_size(&l).unwrap(), 16 * 3 + 10);
        assert_eq!(blob_size(&l).unwrap(), LEAD_SIZE as u64 + 16 * 3 + 10);
    }
}
