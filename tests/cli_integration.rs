use std::process::Command;
use tempfile::tempdir;

fn bin() -> String {
    env!("CARGO_BIN_EXE_lcwdelta").to_string()
}

fn frame_bytes(len: usize, salt: u8) -> Vec<u8> {
    (0..len)
        .map(|i| if i % 50 < 10 { (i as u8) ^ salt } else { (i / 50) as u8 })
        .collect()
}

#[test]
fn cli_compress_decompress_roundtrip() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("in.bin");
    let packed = dir.path().join("in.lcw");
    let output = dir.path().join("out.bin");
    let data = frame_bytes(5000, 0);
    std::fs::write(&input, &data).unwrap();

    let st = Command::new(bin())
        .args(["compress", "--level", "9"])
        .arg(&input)
        .arg(&packed)
        .status()
        .unwrap();
    assert!(st.success());
    assert_eq!(
        std::fs::read(&packed).unwrap(),
        lcwdelta::lcw::compress_with(&data, &lcwdelta::lcw::CompressOptions { level: 9 })
    );

    let st = Command::new(bin())
        .args(["decompress", "--size", "5000"])
        .arg(&packed)
        .arg(&output)
        .status()
        .unwrap();
    assert!(st.success());
    assert_eq!(std::fs::read(&output).unwrap(), data);
}

#[test]
fn cli_framed_roundtrip() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("in.bin");
    let packed = dir.path().join("in.lcwf");
    let output = dir.path().join("out.bin");
    let data = frame_bytes(100_000, 3);
    std::fs::write(&input, &data).unwrap();

    let st = Command::new(bin())
        .args(["compress", "--framed", "--block-size", "4K", "--input"])
        .arg(&input)
        .arg("--output")
        .arg(&packed)
        .status()
        .unwrap();
    assert!(st.success());

    let st = Command::new(bin())
        .args(["decompress", "--framed"])
        .arg(&packed)
        .arg(&output)
        .status()
        .unwrap();
    assert!(st.success());
    assert_eq!(std::fs::read(&output).unwrap(), data);
}

#[test]
fn cli_diff_patch_roundtrip() {
    let dir = tempdir().unwrap();
    let base = dir.path().join("base.bin");
    let next = dir.path().join("next.bin");
    let delta = dir.path().join("next.xor");
    let output = dir.path().join("out.bin");
    std::fs::write(&base, frame_bytes(4000, 0)).unwrap();
    std::fs::write(&next, frame_bytes(4000, 0x5A)).unwrap();

    let st = Command::new(bin())
        .args(["diff", "--base"])
        .arg(&base)
        .arg(&next)
        .arg(&delta)
        .status()
        .unwrap();
    assert!(st.success());

    let st = Command::new(bin())
        .args(["patch", "--base"])
        .arg(&base)
        .arg(&delta)
        .arg(&output)
        .status()
        .unwrap();
    assert!(st.success());
    assert_eq!(std::fs::read(&output).unwrap(), std::fs::read(&next).unwrap());
}

#[test]
fn cli_patch_region() {
    let dir = tempdir().unwrap();
    let page = dir.path().join("page.bin");
    let delta = dir.path().join("sprite.xor");
    let output = dir.path().join("out.bin");
    std::fs::write(&page, vec![0u8; 32]).unwrap();
    // 2x2 sprite into an 8-wide page
    std::fs::write(&delta, [0x04, 1, 2, 3, 4, 0x80, 0, 0]).unwrap();

    let st = Command::new(bin())
        .args(["patch", "--width", "2", "--stride", "8", "--base"])
        .arg(&page)
        .arg(&delta)
        .arg(&output)
        .status()
        .unwrap();
    assert!(st.success());
    let out = std::fs::read(&output).unwrap();
    assert_eq!(&out[..2], &[1, 2]);
    assert_eq!(&out[8..10], &[3, 4]);
    assert!(out[2..8].iter().all(|&b| b == 0));
}

#[test]
fn cli_truncated_stream_fails() {
    let dir = tempdir().unwrap();
    let packed = dir.path().join("cut.lcw");
    let output = dir.path().join("out.bin");
    std::fs::write(&packed, [0x85, b'a', b'b']).unwrap();

    let out = Command::new(bin())
        .args(["decompress", "--size", "5"])
        .arg(&packed)
        .arg(&output)
        .output()
        .unwrap();
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("lcwdelta: decompress error"));
    // The decoded prefix is still written.
    assert_eq!(std::fs::read(&output).unwrap(), b"ab");
}

#[test]
fn cli_refuses_to_overwrite_without_force() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("in.bin");
    let output = dir.path().join("out.lcw");
    std::fs::write(&input, b"payload payload").unwrap();
    std::fs::write(&output, b"keep").unwrap();

    let st = Command::new(bin())
        .arg("compress")
        .arg(&input)
        .arg(&output)
        .status()
        .unwrap();
    assert!(!st.success());
    assert_eq!(std::fs::read(&output).unwrap(), b"keep");

    let st = Command::new(bin())
        .args(["--force", "compress"])
        .arg(&input)
        .arg(&output)
        .status()
        .unwrap();
    assert!(st.success());
}

#[test]
fn cli_inspect_lists_commands() {
    let dir = tempdir().unwrap();
    let packed = dir.path().join("a.lcw");
    std::fs::write(&packed, lcwdelta::lcw::compress(&[0xAA; 100])).unwrap();

    let out = Command::new(bin())
        .args(["--json", "inspect"])
        .arg(&packed)
        .output()
        .unwrap();
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("Fill { len: 99, value: 170 }"));
    let json: serde_json::Value = serde_json::from_slice(&out.stderr).unwrap();
    assert_eq!(json["commands"], 3);
    assert_eq!(json["output_size"], 100);
}

#[test]
fn cli_inspect_xor_delta() {
    let dir = tempdir().unwrap();
    let delta_path = dir.path().join("a.xor");
    let base = frame_bytes(600, 0);
    let next = frame_bytes(600, 0x33);
    let delta = lcwdelta::xor::generate_delta(&next, &base);
    std::fs::write(&delta_path, &delta).unwrap();

    let out = Command::new(bin())
        .args(["--json", "inspect", "--kind", "xor"])
        .arg(&delta_path)
        .output()
        .unwrap();
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("XOR commands:"));
    assert!(stdout.contains("XOR frame span:"));
    let json: serde_json::Value = serde_json::from_slice(&out.stderr).unwrap();
    assert_eq!(json["kind"], "xor");
    assert_eq!(json["commands"], lcwdelta::xor::Commands::new(&delta).count());
    assert_eq!(json["malformed"], false);
}

#[test]
fn cli_decompress_oversized_size_is_bounded() {
    let dir = tempdir().unwrap();
    let packed = dir.path().join("in.lcw");
    let output = dir.path().join("out.bin");
    let data = frame_bytes(5000, 7);
    std::fs::write(&packed, lcwdelta::lcw::compress(&data)).unwrap();

    let st = Command::new(bin())
        .args(["decompress", "--size", "1000G"])
        .arg(&packed)
        .arg(&output)
        .status()
        .unwrap();
    assert!(st.success());
    assert_eq!(std::fs::read(&output).unwrap(), data);
}

#[test]
fn cli_config_works() {
    let out = Command::new(bin()).arg("config").output().unwrap();
    assert!(out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("MAX_BLOCK_SIZE=64510"));
}
