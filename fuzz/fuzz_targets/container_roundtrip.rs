#![no_main]
use std::io::Cursor;

use arbitrary::{Arbitrary, Unstructured};
use libfuzzer_sys::fuzz_target;
use zpkglist::config::HEADER_MAGIC;
use zpkglist::{compress, Reader};

// Structured generator: the fuzzer's raw bytes drive the shape (blob count,
// per-blob size, per-blob fill byte) rather than being fed straight through
// as a blob stream, so most runs actually exercise the regular/jumbo frame
// split instead of bottoming out on a bad-magic error immediately.
fn build_blob_stream(u: &mut Unstructured) -> Option<Vec<u8>> {
    let blob_count = u.int_in_range(0..=16u32).ok()?;
    let mut out = Vec::new();
    for _ in 0..blob_count {
        let dl = u.int_in_range(0..=60_000u32).ok()?;
        let il = u.int_in_range(0..=8u32).ok()?;
        let fill = u8::arbitrary(u).ok()?;
        out.extend_from_slice(&HEADER_MAGIC);
        out.extend_from_slice(&il.to_be_bytes());
        out.extend_from_slice(&dl.to_be_bytes());
        out.resize(out.len() + 16 * il as usize + dl as usize, fill);
    }
    Some(out)
}

fuzz_target!(|data: &[u8]| {
    let mut u = Unstructured::new(data);
    let Some(input) = build_blob_stream(&mut u) else {
        return;
    };

    let mut container = Cursor::new(Vec::new());
    if compress(Cursor::new(input.clone()), &mut container, None).is_err() {
        return;
    }
    let bytes = container.into_inner();

    let mut decoded = Vec::new();
    match Reader::open(Cursor::new(bytes)) {
        Ok(None) => {}
        Ok(Some(mut r)) => loop {
            match r.next_view() {
                Ok(Some((body, _pos))) => {
                    decoded.extend_from_slice(&HEADER_MAGIC);
                    decoded.extend_from_slice(body);
                }
                Ok(None) => break,
                Err(_) => panic!("decoding a stream this crate just wrote must not error"),
            }
        },
        Err(_) => panic!("opening a stream this crate just wrote must not error"),
    }

    assert_eq!(decoded, input, "container round-trip mismatch");
});
