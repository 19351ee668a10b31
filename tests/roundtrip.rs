//! Round-trip, hash-equivalence, bulk-equivalence, and envelope-consistency
//! properties, plus the S1-S5 boundary scenarios for the zpkglist writer and
//! reader (compress/decompress through `zpkglist::container` and
//! `zpkglist::Reader`).

use std::io::Cursor;

use zpkglist::config::{HEADER_MAGIC, REGULAR_FRAME_MAX};
use zpkglist::{compress, Reader};

fn make_blob(il: u32, data: &[u8]) -> Vec<u8> {
    let mut b = Vec::with_capacity(16 + 16 * il as usize + data.len());
    b.extend_from_slice(&HEADER_MAGIC);
    b.extend_from_slice(&il.to_be_bytes());
    b.extend_from_slice(&(data.len() as u32).to_be_bytes());
    b.resize(b.len() + 16 * il as usize, 0);
    b.extend_from_slice(data);
    b
}

fn compress_to_vec(blobs: &[Vec<u8>]) -> Vec<u8> {
    let mut input = Vec::new();
    for b in blobs {
        input.extend_from_slice(b);
    }
    let mut out = Cursor::new(Vec::new());
    compress(Cursor::new(input), &mut out, None).unwrap();
    out.into_inner()
}

fn decode_all_view(container: Vec<u8>) -> Vec<u8> {
    let mut r = match Reader::open(Cursor::new(container)).unwrap() {
        None => return Vec::new(),
        Some(r) => r,
    };
    let mut out = Vec::new();
    while let Some((body, _pos)) = r.next_view().unwrap() {
        out.extend_from_slice(&HEADER_MAGIC);
        out.extend_from_slice(body);
    }
    out
}

/// S1: empty input compresses to a bare 24-byte all-zero envelope, and
/// decoding it yields zero blobs without error.
#[test]
fn s1_empty_input() {
    let mut out = Cursor::new(Vec::new());
    let n = compress(Cursor::new(Vec::<u8>::new()), &mut out, None).unwrap();
    assert_eq!(n, 0);
    let bytes = out.into_inner();
    assert_eq!(bytes.len(), 24);
    assert_eq!(&bytes[8..24], &[0u8; 16]);

    let mut r = Reader::open(Cursor::new(bytes)).unwrap().unwrap();
    assert!(r.next_view().unwrap().is_none());
}

/// S2: one small blob (il=1, dl=16, body size 32) produces a single regular
/// frame whose uncompressed size is 8+32=40, and the envelope's contentSize
/// is 48.
#[test]
fn s2_single_small_blob() {
    let blob = make_blob(1, &[0u8; 16]);
    assert_eq!(blob.len() - 8, 32); // body size (il,dl + data) excludes magic

    let input = blob.clone();
    let mut out = Cursor::new(Vec::new());
    let n = compress(Cursor::new(input.clone()), &mut out, None).unwrap();
    assert_eq!(n, 48);

    let bytes = out.into_inner();
    let content_size = u64::from_le_bytes(bytes[8..16].try_into().unwrap());
    assert_eq!(content_size, 48);

    let decoded = decode_all_view(bytes);
    assert_eq!(decoded, input);
}

/// S3: four blobs of 30,000 bytes each pack into a single regular frame
/// (their combined content fits within 128 KiB), so no jumbo frame appears.
#[test]
fn s3_four_blobs_one_regular_frame() {
    let blobs: Vec<Vec<u8>> = (0..4).map(|i| make_blob(i + 1, &vec![7u8; 30_000])).collect();
    let container = compress_to_vec(&blobs);

    let jbufsize = u32::from_le_bytes(container[20..24].try_into().unwrap());
    assert_eq!(jbufsize, 0, "four 30KB blobs must not produce a jumbo frame");

    let mut expected = Vec::new();
    for b in &blobs {
        expected.extend_from_slice(b);
    }
    assert_eq!(decode_all_view(container), expected);
}

/// S4: a single blob whose body exceeds 128 KiB - 8 becomes a jumbo frame;
/// the envelope's jbufsize is nonzero and contentSize = 8 + body size.
#[test]
fn s4_single_jumbo_blob() {
    let body = vec![0x42u8; 200_000];
    let blob = make_blob(1, &body);
    let mut out = Cursor::new(Vec::new());
    let n = compress(Cursor::new(blob.clone()), &mut out, None).unwrap();
    assert_eq!(n, 8 + (16 + 200_000) as u64);

    let bytes = out.into_inner();
    let jbufsize = u32::from_le_bytes(bytes[20..24].try_into().unwrap());
    assert!(jbufsize as usize > REGULAR_FRAME_MAX);

    assert_eq!(decode_all_view(bytes), blob);
}

/// S5: five 40,000-byte blobs split 4+1 across two regular frames (four pack
/// into one frame at the 128 KiB boundary, the fifth starts a new one).
#[test]
fn s5_five_blobs_split_across_frames() {
    let blobs: Vec<Vec<u8>> = (0..5).map(|i| make_blob(i + 1, &vec![9u8; 40_000])).collect();
    let container = compress_to_vec(&blobs);

    let mut expected = Vec::new();
    for b in &blobs {
        expected.extend_from_slice(b);
    }
    assert_eq!(decode_all_view(container), expected);
}

/// S6: corrupting the envelope's magic byte makes `open` reject the stream
/// with a bad-magic error rather than silently misparsing it.
#[test]
fn s6_corrupted_envelope_magic_rejected() {
    let blob = make_blob(1, b"whatever");
    let mut container = compress_to_vec(&[blob]);
    container[1] ^= 0xff;
    let err = Reader::open(Cursor::new(container)).unwrap_err();
    assert!(format!("{err}").to_lowercase().contains("magic"));
}

/// Hash-equivalence: the callback observes the exact original byte sequence
/// (magic included) in input order, for a multi-frame input.
#[test]
fn hash_callback_reconstructs_original_bytes() {
    let blobs: Vec<Vec<u8>> = (0..10)
        .map(|i| make_blob(i + 1, format!("payload number {i}").as_bytes()))
        .collect();
    let mut input = Vec::new();
    for b in &blobs {
        input.extend_from_slice(b);
    }

    let mut hashed = Vec::new();
    {
        let mut sink = |bytes: &[u8]| hashed.extend_from_slice(bytes);
        let mut out = Cursor::new(Vec::new());
        compress(Cursor::new(input.clone()), &mut out, Some(&mut sink)).unwrap();
    }
    assert_eq!(hashed, input);
}

/// Bulk-equivalence: concatenating every `bulk()` call's bytes reproduces
/// the original blob stream exactly.
#[test]
fn bulk_reads_reconstruct_original_stream() {
    let blobs: Vec<Vec<u8>> = (0..12)
        .map(|i| make_blob((i % 5) + 1, &vec![i as u8; 500 + i as usize * 37]))
        .collect();
    let mut input = Vec::new();
    for b in &blobs {
        input.extend_from_slice(b);
    }
    let container = compress_to_vec(&blobs);

    let mut r = Reader::open(Cursor::new(container)).unwrap().unwrap();
    let mut out = Vec::new();
    while let Some(chunk) = r.bulk().unwrap() {
        out.extend_from_slice(chunk);
    }
    assert_eq!(out, input);
}

/// Envelope consistency: contentSize equals the sum of (8 + uncompressed
/// frame size) over every emitted frame, for a multi-frame container.
#[test]
fn envelope_content_size_matches_sum_of_frames() {
    let blobs: Vec<Vec<u8>> = (0..9).map(|i| make_blob(i + 1, &vec![1u8; 50_000])).collect();
    let mut total_body = 0u64;
    for b in &blobs {
        total_body += (b.len() - 8) as u64;
    }
    let container = compress_to_vec(&blobs);
    let content_size = u64::from_le_bytes(container[8..16].try_into().unwrap());
    assert_eq!(content_size, total_body);
}

/// A full random-but-deterministic round trip across many blob sizes,
/// using both read disciplines, and via `next_malloc` as well.
#[test]
fn many_blobs_round_trip_via_malloc() {
    let blobs: Vec<Vec<u8>> = (0..40)
        .map(|i| make_blob((i % 7) + 1, &vec![(i * 3) as u8; 1 + (i as usize * 911) % 5000]))
        .collect();
    let mut expected = Vec::new();
    for b in &blobs {
        expected.extend_from_slice(b);
    }
    let container = compress_to_vec(&blobs);

    let mut r = Reader::open(Cursor::new(container)).unwrap().unwrap();
    let mut out = Vec::new();
    while let Some((body, _pos)) = r.next_malloc().unwrap() {
        out.extend_from_slice(&HEADER_MAGIC);
        out.extend_from_slice(&body);
    }
    assert_eq!(out, expected);
}
