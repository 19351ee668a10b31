//! Concatenation transparency: a reader opened over several back-to-back
//! recognized streams (zpkglist, raw, zstd, xz, in any combination) yields
//! the exact same blob sequence as reading each stream on its own, as if
//! `cat a b c | read` were one logical stream.

use std::io::{Cursor, Write};

use liblzma::write::XzEncoder;
use zpkglist::config::HEADER_MAGIC;
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

fn as_zpkglist(raw: &[u8]) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    compress(Cursor::new(raw.to_vec()), &mut out, None).unwrap();
    out.into_inner()
}

fn as_zstd(raw: &[u8]) -> Vec<u8> {
    zstd::stream::encode_all(Cursor::new(raw.to_vec()), 3).unwrap()
}

fn as_xz(raw: &[u8]) -> Vec<u8> {
    let mut enc = XzEncoder::new(Vec::new(), 6);
    enc.write_all(raw).unwrap();
    enc.finish().unwrap()
}

fn collect_blobs<R: std::io::Read + 'static>(container: R) -> Vec<Vec<u8>> {
    let mut r = match Reader::open(container).unwrap() {
        None => return Vec::new(),
        Some(r) => r,
    };
    let mut blobs = Vec::new();
    while let Some((body, _pos)) = r.next_view().unwrap() {
        let mut whole = Vec::with_capacity(8 + body.len());
        whole.extend_from_slice(&HEADER_MAGIC);
        whole.extend_from_slice(body);
        blobs.push(whole);
    }
    blobs
}

#[test]
fn zpkglist_then_xz_concatenate_transparently() {
    let a = make_blob(1, b"first-segment-in-zpkglist-form");
    let b = make_blob(2, b"second-segment-in-xz-form");

    let mut stream = as_zpkglist(&a);
    stream.extend_from_slice(&as_xz(&b));

    let blobs = collect_blobs(Cursor::new(stream));
    assert_eq!(blobs, vec![a, b]);
}

#[test]
fn raw_then_zpkglist_then_zstd_three_way() {
    let a = make_blob(1, b"raw-passthrough-segment");
    let b = make_blob(2, &vec![0xab; 5000]);
    let c = make_blob(3, b"trailing-zstd-segment");

    let mut stream = a.clone();
    stream.extend_from_slice(&as_zpkglist(&b));
    stream.extend_from_slice(&as_zstd(&c));

    let blobs = collect_blobs(Cursor::new(stream));
    assert_eq!(blobs, vec![a, b, c]);
}

#[test]
fn xz_then_raw_two_way() {
    let a = make_blob(4, b"xz-first");
    let b = make_blob(5, b"raw-second");

    let mut stream = as_xz(&a);
    stream.extend_from_slice(&b);

    let blobs = collect_blobs(Cursor::new(stream));
    assert_eq!(blobs, vec![a, b]);
}

#[test]
fn bulk_reproduces_bytes_across_a_concatenation_boundary() {
    let a = make_blob(1, b"bulk-side-a");
    let b = make_blob(2, b"bulk-side-b");

    let mut stream = as_zpkglist(&a);
    stream.extend_from_slice(&as_zstd(&b));

    let mut expected = a.clone();
    expected.extend_from_slice(&b);

    let mut r = Reader::open(Cursor::new(stream)).unwrap().unwrap();
    let mut out = Vec::new();
    while let Some(chunk) = r.bulk().unwrap() {
        out.extend_from_slice(chunk);
    }
    assert_eq!(out, expected);
}

#[test]
fn unrecognized_trailing_garbage_errors_instead_of_silently_truncating() {
    let a = make_blob(1, b"good-segment");
    let mut stream = as_zpkglist(&a);
    stream.extend_from_slice(&[0xde, 0xad, 0xbe, 0xef, 0x01, 0x02, 0x03, 0x04]);

    let mut r = Reader::open(Cursor::new(stream)).unwrap().unwrap();
    assert!(r.next_view().unwrap().is_some());
    assert!(r.next_view().unwrap_err().to_string().contains("magic"));
}
