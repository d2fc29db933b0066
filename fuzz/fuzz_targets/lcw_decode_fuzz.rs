#![no_main]
use libfuzzer_sys::fuzz_target;
use lcwdelta::lcw;

fuzz_target!(|data: &[u8]| {
    // Arbitrary streams must stop early, never panic or overrun.
    if data.len() < 2 {
        return;
    }
    let capacity = usize::from(u16::from_le_bytes([data[0], data[1]]));
    let stream = &data[2..];
    let mut out = vec![0u8; capacity];
    let decoded = lcw::decompress_into(stream, &mut out);
    assert!(decoded.written <= capacity);
    assert!(decoded.consumed <= stream.len());

    for cmd in lcw::Commands::new(stream) {
        let _ = cmd.output_len();
    }
});
