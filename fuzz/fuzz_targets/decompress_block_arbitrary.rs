#![no_main]
use libfuzzer_sys::fuzz_target;
use zpkglist::block::decompress_safe;

// Adversarial input through the block decompressor: `Err` is expected and
// fine for most inputs, what this checks is the absence of panics or UB
// across a spread of output-buffer sizes.
fuzz_target!(|data: &[u8]| {
    {
        let mut dst = vec![0u8; 0];
        let _ = decompress_safe(data, &mut dst);
    }

    {
        let mut dst = vec![0u8; 4096];
        let _ = decompress_safe(data, &mut dst);
    }

    if !data.is_empty() {
        let mut dst = vec![0u8; data.len()];
        let _ = decompress_safe(data, &mut dst);
    }

    {
        let large = (data.len().saturating_mul(255)).min(1 << 20);
        let mut dst = vec![0u8; large];
        let _ = decompress_safe(data, &mut dst);
    }
});
