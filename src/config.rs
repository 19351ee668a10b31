// config.rs — Compile-time configuration constants for the zpkglist codec.
//
// Migrated from header.h, zpkglist.h, magic4.h, and compress.c (svpv/zpkglist):
// magic numbers, size limits, and the display-level verbosity plumbing all
// live here, the way lz4conf.h collects the upstream lz4 CLI's tunables.

use std::sync::atomic::{AtomicU32, Ordering};

// ── RPM header limits (header.h) ──────────────────────────────────────────────

/// Max number of index entries ("il") a header may declare.
pub const HEADER_MAX_TAGS: u32 = (64 << 10) - 1;

/// Max size in bytes of a header's data segment ("dl").
pub const HEADER_MAX_DATA: u32 = (16 << 20) - 1;

/// Max total size of a single header blob, magic included.
pub const HEADER_MAX_SIZE: u64 = 8 + 16 * HEADER_MAX_TAGS as u64 + HEADER_MAX_DATA as u64;

/// The 8-byte magic every RPM header blob begins with.
pub const HEADER_MAGIC: [u8; 8] = [0x8e, 0xad, 0xe8, 0x01, 0x00, 0x00, 0x00, 0x00];

// ── zpkglist container magics (zpkglist.h / magic4.h) ─────────────────────────

/// Leading-frame ("envelope") magic. Falls inside the LZ4 frame format's
/// reserved skippable-frame range (0x184D2A50..=0x184D2A5F).
pub const ENVELOPE_MAGIC: u32 = 0x184D2A55;
/// Dictionary-frame magic.
pub const DICT_FRAME_MAGIC: u32 = 0x184D2A56;
/// Data-frame magic.
pub const DATA_FRAME_MAGIC: u32 = 0x184D2A57;

/// zstd frame magic (RFC 8878).
pub const ZSTD_MAGIC: u32 = 0xFD2FB528;
/// xz frame magic, as read from the first 4 bytes on the wire.
pub const XZ_MAGIC_BE: u32 = 0xFD37_7A58;

/// Size of the leading envelope frame: 4 (magic) + 4 (payload len) + 8
/// (contentSize) + 4 (buf1size) + 4 (jbufsize).
pub const ENVELOPE_SIZE: usize = 24;

// ── Frame/grouping constants (compress.c) ─────────────────────────────────────

/// Dictionary size: 64 KiB.
pub const DICT_SIZE: usize = 64 << 10;

/// Max uncompressed content size of a regular (non-jumbo) frame.
pub const REGULAR_FRAME_MAX: usize = 128 << 10;

/// Max number of header blobs packed into one regular frame.
pub const MAX_BLOBS_PER_FRAME: usize = 4;

/// Acceleration factor passed to every LZ4 compression call (matches the
/// `1` literal used throughout compress.c).
pub const LZ4_ACCELERATION: i32 = 1;

/// Worst-case LZ4-compressed size for a given uncompressed size.
/// Equivalent to the `LZ4_COMPRESSBOUND` macro.
#[inline]
pub const fn lz4_compress_bound(input_size: usize) -> usize {
    input_size + (input_size / 255) + 16
}

// ── Read-ahead buffer (areader.c) ─────────────────────────────────────────────

/// Minimum window size for the read-ahead buffer.
pub const AREADER_WINDOW: usize = 64 << 10;

// ── Polymorphic reader (areader.c / zreader.c "backend" layer) ───────────────

/// Size of the scratch buffer the bulk discipline fills via `read` for
/// backends that don't hand back whole chunks natively (everything but
/// zpkglist, which yields one frame per call instead).
pub const READER_BULK_BUFFER: usize = 128 << 10;

/// View-buffer growth: round the needed size up to this boundary, plus
/// `VIEW_GROWTH_SLACK`, to absorb adjacent similarly-sized blobs without
/// reallocating every call.
pub const VIEW_GROWTH_ROUND: usize = 1 << 10;
pub const VIEW_GROWTH_SLACK: usize = 1536;

/// The view buffer is shrunk back down once its capacity exceeds twice the
/// observed need and is bigger than this floor, so one oversized blob
/// doesn't pin the allocation for the rest of the stream.
pub const VIEW_SHRINK_FLOOR: usize = 80 << 10;

// ── Display / verbosity globals ───────────────────────────────────────────────

/// Global notification level for the CLI: 0 = silent, 1 = errors only,
/// 2 = normal, 3 = progress, 4+ = verbose. The library itself never
/// consults this; only `src/cli` and `src/main.rs` do.
pub static DISPLAY_LEVEL: AtomicU32 = AtomicU32::new(2);

#[inline]
pub fn display_level() -> u32 {
    DISPLAY_LEVEL.load(Ordering::Relaxed)
}

#[inline]
pub fn set_display_level(level: u32) {
    DISPLAY_LEVEL.store(level, Ordering::Relaxed);
}

/// Conditionally print to stderr at or above `level` — equivalent to the
/// upstream `DISPLAYLEVEL` macro.
#[macro_export]
macro_rules! displaylevel {
    ($level:expr, $($arg:tt)*) => {
        if $crate::config::display_level() >= $level {
            eprint!($($arg)*);
        }
    };
}
