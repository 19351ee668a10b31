#![no_main]
use libfuzzer_sys::fuzz_target;
use zpkglist::block::{compress_bound, compress_fast, decompress_safe, LZ4_ACCELERATION_DEFAULT};

fuzz_target!(|data: &[u8]| {
    if data.len() > (16 << 20) {
        return;
    }

    let bound = compress_bound(data.len() as i32);
    if bound <= 0 {
        return;
    }
    let mut compressed = vec![0u8; bound as usize];
    let n = match compress_fast(data, &mut compressed, LZ4_ACCELERATION_DEFAULT) {
        Ok(n) => n,
        Err(_) => return,
    };
    compressed.truncate(n);

    let mut recovered = vec![0u8; data.len()];
    let m = decompress_safe(&compressed, &mut recovered)
        .expect("block produced by compress_fast must decompress cleanly");
    assert_eq!(m, data.len());
    assert_eq!(&recovered[..m], data, "block round-trip mismatch");
});
