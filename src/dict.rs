//! The constant 64 KiB dictionary primed into every regular frame's LZ4
//! stream, and its serialized on-disk dictionary-frame form.
//!
//! Ported from `compress.c`'s `rpmhdrzdict` blob (produced offline by the
//! `train`/`blob2inc` tool, which this crate does not reimplement). Since we
//! cannot run that offline trainer, the *uncompressed* dictionary content is
//! checked in as a binary asset and compiled in via `include_bytes!`; its
//! LZ4-compressed dictionary-frame encoding is computed once per process and
//! cached, rather than also being pre-baked.

use std::sync::OnceLock;

use crate::block::{compress_bound, compress_fast};
use crate::config::{DICT_FRAME_MAGIC, DICT_SIZE, LZ4_ACCELERATION};

/// The raw (uncompressed) 64 KiB dictionary primed into every regular
/// frame's streaming LZ4 state.
pub static RPM_HEADER_DICT: &[u8; DICT_SIZE] =
    include_bytes!("../assets/rpmhdr.dict");

/// Returns the dictionary frame (`magic` + `zsize` + compressed bytes) as it
/// should appear immediately after the envelope in a freshly written
/// zpkglist container.
///
/// The encoding is computed on first use and cached; every call after the
/// first is a cheap slice clone.
pub fn dict_frame() -> &'static [u8] {
    static FRAME: OnceLock<Vec<u8>> = OnceLock::new();
    FRAME.get_or_init(build_dict_frame).as_slice()
}

fn build_dict_frame() -> Vec<u8> {
    let bound = compress_bound(DICT_SIZE as i32) as usize;
    let mut compressed = vec![0u8; bound];
    let zsize = compress_fast(RPM_HEADER_DICT.as_slice(), &mut compressed, LZ4_ACCELERATION)
        .expect("dictionary asset must be compressible");
    compressed.truncate(zsize);

    let mut frame = Vec::with_capacity(8 + zsize);
    frame.extend_from_slice(&DICT_FRAME_MAGIC.to_le_bytes());
    frame.extend_from_slice(&(zsize as u32).to_le_bytes());
    frame.extend_from_slice(&compressed);
    frame
}

/// Compressed size of the dictionary frame's payload (excludes the 8-byte
/// magic+size lead). This is the value `container::writer` reports as the
/// envelope's minimum `buf1size` when no data frame ever needs a larger
/// buffer.
pub fn dict_zsize() -> usize {
    dict_frame().len() - 8
}
