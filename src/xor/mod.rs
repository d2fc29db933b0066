// XOR-delta ("format40") frame differencing.
//
// A delta is a sequence of commands over the XOR of a source frame and a
// base frame:
//
//   0x00               fill: count byte, value byte
//   0x01..=0x7F        copy: count = B, count XOR bytes follow
//   0x81..=0xFF        skip: count = B & 0x7F
//   0x80 + u16 word    word == 0          terminator
//                      bit 15 clear       skip, count = word
//                      bit 15, !bit 14    copy, count = word & 0x3FFF
//                      bit 15, bit 14     fill, count = word & 0x3FFF, value byte
//
// - `generator`: `generate_delta`
// - `applier`: `apply_delta`, `apply_delta_region` and the `Applied` outcome
// - `command`: command iterator for inspection

pub mod applier;
pub mod command;
pub mod generator;

pub use applier::{
    ApplyMode, ApplyStatus, Applied, Region, RegionError, apply_delta, apply_delta_region,
};
pub use command::{Command, Commands};
pub use generator::generate_delta;

pub(crate) const CMD_FILL: u8 = 0x00;
pub(crate) const CMD_SKIP: u8 = 0x80;
pub(crate) const CMD_LONG: u8 = 0x80;

pub(crate) const LONG_COPY_FLAG: u16 = 0x8000;
pub(crate) const LONG_FILL_FLAG: u16 = 0xC000;
pub(crate) const LONG_COUNT_MASK: u16 = 0x3FFF;

/// The terminating long skip of zero.
pub const TERMINATOR: [u8; 3] = [CMD_LONG, 0, 0];

/// Longest short copy or skip.
pub const MAX_SHORT: usize = 0x7F;

/// Longest short fill, and the run length from which long forms pay off.
pub const MAX_SHORT_FILL: usize = 0xFF;

/// Longest long copy or fill.
pub const MAX_LONG: usize = 0x3FFF;

/// Longest long skip.
pub const MAX_LONG_SKIP: usize = 0x7FFF;

/// Shortest constant run the generator turns into a fill.
pub const MIN_FILL: usize = 4;

/// Largest delta `generate_delta` can produce for frames of `len` bytes.
///
/// The worst input alternates one changed and one unchanged byte, costing
/// three delta bytes per two frame bytes, plus the terminator.
pub fn worst_case_len(len: usize) -> usize {
    len + len.div_ceil(2) + TERMINATOR.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worst_case_covers_alternating_changes() {
        let base = vec![0u8; 1001];
        let source: Vec<u8> = (0..1001).map(|i| (i % 2) as u8).collect();
        let delta = generate_delta(&source, &base);
        assert!(delta.len() <= worst_case_len(1001));

        let source: Vec<u8> = (0..1001).map(|i| ((i + 1) % 2) as u8).collect();
        let delta = generate_delta(&source, &base);
        assert!(delta.len() <= worst_case_len(1001));
    }

    #[test]
    fn worst_case_of_empty_is_terminator() {
        assert_eq!(worst_case_len(0), 3);
        assert_eq!(generate_delta(&[], &[]), TERMINATOR.to_vec());
    }
}
