//! Position round-trip: the `FramePos` sequence `next_view`/`next_malloc`
//! hand back for a given container is a deterministic function of its
//! bytes, is strictly increasing, and is identical across independent
//! reopenings of the same bytes.

use std::io::Cursor;

use zpkglist::config::HEADER_MAGIC;
use zpkglist::{compress, FramePos, Reader};

fn make_blob(il: u32, data: &[u8]) -> Vec<u8> {
    let mut b = Vec::with_capacity(16 + 16 * il as usize + data.len());
    b.extend_from_slice(&HEADER_MAGIC);
    b.extend_from_slice(&il.to_be_bytes());
    b.extend_from_slice(&(data.len() as u32).to_be_bytes());
    b.resize(b.len() + 16 * il as usize, 0);
    b.extend_from_slice(data);
    b
}

fn positions(container: &[u8]) -> Vec<FramePos> {
    let mut r = Reader::open(Cursor::new(container.to_vec())).unwrap().unwrap();
    let mut out = Vec::new();
    while let Some((_body, pos)) = r.next_view().unwrap() {
        out.push(pos);
    }
    out
}

#[test]
fn positions_are_identical_across_reopenings() {
    let blobs: Vec<Vec<u8>> = (0..15)
        .map(|i| make_blob(i + 1, &vec![i as u8; 2000 + i as usize * 400]))
        .collect();
    let mut input = Vec::new();
    for b in &blobs {
        input.extend_from_slice(b);
    }
    let mut container = Cursor::new(Vec::new());
    compress(Cursor::new(input), &mut container, None).unwrap();
    let bytes = container.into_inner();

    let first = positions(&bytes);
    let second = positions(&bytes);
    assert_eq!(first, second);
    assert_eq!(first.len(), blobs.len());
}

#[test]
fn positions_strictly_increase_within_a_stream() {
    let blobs: Vec<Vec<u8>> = (0..20).map(|i| make_blob(i + 1, &vec![3u8; 9000])).collect();
    let mut input = Vec::new();
    for b in &blobs {
        input.extend_from_slice(b);
    }
    let mut container = Cursor::new(Vec::new());
    compress(Cursor::new(input), &mut container, None).unwrap();
    let bytes = container.into_inner();

    let pos = positions(&bytes);
    for w in pos.windows(2) {
        assert!(w[0] < w[1]);
    }
}

#[test]
fn raw_backend_positions_track_blob_offsets() {
    let blobs: Vec<Vec<u8>> = (0..6).map(|i| make_blob(i + 1, &vec![i as u8; 64])).collect();
    let mut input = Vec::new();
    for b in &blobs {
        input.extend_from_slice(b);
    }
    let pos = positions(&input);
    assert_eq!(pos.len(), blobs.len());
    for w in pos.windows(2) {
        assert!(w[0] < w[1]);
    }
}
