#![no_main]
use libfuzzer_sys::fuzz_target;
use lcwdelta::lcw::{self, CompressOptions};

fuzz_target!(|data: &[u8]| {
    if data.is_empty() {
        return;
    }

    // First byte picks the level; level 9 only on small inputs.
    let level = u32::from(data[0] % 10);
    let input = &data[1..];
    if level == 9 && input.len() > 4096 {
        return;
    }

    let packed = lcw::compress_with(input, &CompressOptions { level });
    assert!(packed.len() <= lcw::worst_case_len(input.len()));
    assert_eq!(lcw::decompress(&packed, input.len()), input);
});
