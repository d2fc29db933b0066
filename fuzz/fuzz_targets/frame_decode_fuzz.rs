#![no_main]
use libfuzzer_sys::fuzz_target;
use lcwdelta::frame;

fuzz_target!(|data: &[u8]| {
    // Malformed framed streams are errors, never panics.
    let _ = frame::decompress_all(data);
});
