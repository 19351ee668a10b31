#![no_main]
use std::io::Cursor;

use libfuzzer_sys::fuzz_target;
use zpkglist::Reader;

// Fully adversarial input: no attempt to look like a recognized container.
// `Err` anywhere is fine and expected; what this guards against is a panic
// or hang while sniffing a backend or walking its frames/blobs.
fuzz_target!(|data: &[u8]| {
    let mut r = match Reader::open(Cursor::new(data.to_vec())) {
        Ok(Some(r)) => r,
        Ok(None) | Err(_) => return,
    };

    for _ in 0..10_000 {
        match r.next_view() {
            Ok(Some(_)) => continue,
            Ok(None) | Err(_) => break,
        }
    }
});
