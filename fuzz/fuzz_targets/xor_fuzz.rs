#![no_main]
use libfuzzer_sys::fuzz_target;
use lcwdelta::xor::{self, ApplyMode, Region};

fuzz_target!(|data: &[u8]| {
    if data.len() < 3 {
        return;
    }

    // Round trip: split the payload into base and source frames.
    let payload = &data[2..];
    let (base, source) = payload.split_at(payload.len() / 2);
    let delta = xor::generate_delta(source, base);
    assert!(delta.len() <= xor::worst_case_len(base.len().min(source.len())));
    let mut frame = base.to_vec();
    xor::apply_delta(&mut frame, &delta);
    let n = base.len().min(source.len());
    assert_eq!(&frame[..n], &source[..n]);

    // Arbitrary deltas through an arbitrary region must not panic.
    let width = usize::from(data[0]).max(1);
    let stride = width + usize::from(data[1] & 0x1F);
    if let Ok(region) = Region::new(width, stride) {
        let mut page = vec![0u8; 1024];
        let applied = xor::apply_delta_region(&mut page, region, ApplyMode::Copy, payload);
        assert!(applied.position <= region.extent(page.len()));
    }
});
