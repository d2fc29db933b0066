// LCW encoder.
//
// Greedy single pass over the input:
//   - Long runs of one byte (>= 65) become a 4-byte fill
//   - Otherwise the longest earlier match decides between a literal byte,
//     a 2-byte short copy, a 3-byte copy and a 5-byte long copy
//   - Literal bytes accumulate into the open literal run (max 63)
//
// The stream always opens with a literal run for the first byte, so copy
// commands are never the first command after the optional mode byte.

use super::config::{self, MAX_MATCH, MIN_FILL, MIN_MATCH, RELATIVE_WINDOW};
use super::matcher::{Match, MatchFinder};
use super::{
    AddressMode, CMD_COPY, CMD_END, CMD_FILL, CMD_LITERAL, CMD_LONG_COPY, MAX_COPY, MAX_LITERAL,
    MAX_SHORT_COPY, MAX_SHORT_DISTANCE, RELATIVE_FLAG, worst_case_len,
};

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Configuration for the LCW encoder.
#[derive(Debug, Clone)]
pub struct CompressOptions {
    /// Compression level (0-9). Level 0 = literal runs only.
    pub level: u32,
}

impl Default for CompressOptions {
    fn default() -> Self {
        Self {
            level: config::DEFAULT_LEVEL,
        }
    }
}

// ---------------------------------------------------------------------------
// Encoder
// ---------------------------------------------------------------------------

/// Compress `input` with the default options.
///
/// Empty input yields an empty stream (no end marker).
pub fn compress(input: &[u8]) -> Vec<u8> {
    compress_with(input, &CompressOptions::default())
}

/// Compress `input` with explicit options.
pub fn compress_with(input: &[u8], opts: &CompressOptions) -> Vec<u8> {
    if input.is_empty() {
        return Vec::new();
    }

    let config = config::config_for_level(opts.level);
    let mode = AddressMode::for_len(input.len());
    let mut finder = MatchFinder::new(config, input.len());
    let mut stream = Stream::new(mode, worst_case_len(input.len()));

    stream.literal(input[0]);
    let mut cursor = 1usize;

    while cursor < input.len() {
        if finder.enabled()
            && let Some(run) = fill_run(input, cursor)
        {
            stream.fill(run, input[cursor]);
            cursor += run;
            continue;
        }

        let window_start = match mode {
            AddressMode::Absolute => 0,
            AddressMode::Relative => cursor.saturating_sub(RELATIVE_WINDOW),
        };
        let found = finder.find(input, cursor, window_start);

        if worth_copying(found, cursor) {
            stream.copy(found, cursor);
            cursor += found.len;
        } else {
            stream.literal(input[cursor]);
            cursor += 1;
        }
    }

    let out = stream.finish();
    debug_assert!(out.len() <= worst_case_len(input.len()));
    log::debug!(
        "lcw: compressed {} -> {} bytes ({:?}, profile {})",
        input.len(),
        out.len(),
        mode,
        config.name
    );
    out
}

/// Length of the fill run at `cursor`, if one is worth a fill command.
///
/// The cheap probe at `cursor + 64` skips the scan for most positions.
fn fill_run(input: &[u8], cursor: usize) -> Option<usize> {
    let remaining = input.len() - cursor;
    if remaining < MIN_FILL || input[cursor] != input[cursor + MIN_FILL - 1] {
        return None;
    }
    let byte = input[cursor];
    let limit = remaining.min(MAX_MATCH);
    let run = input[cursor..cursor + limit]
        .iter()
        .take_while(|&&b| b == byte)
        .count();
    (run >= MIN_FILL).then_some(run)
}

/// Whether a match saves anything over emitting its bytes as literals.
///
/// A 3-byte match out of short-copy reach needs the 3-byte copy command,
/// which costs as much as the literals and would split the literal run.
fn worth_copying(found: Match, cursor: usize) -> bool {
    let distance = cursor - found.pos;
    found.len > MIN_MATCH || (found.len == MIN_MATCH && distance <= MAX_SHORT_DISTANCE)
}

// ---------------------------------------------------------------------------
// Command writer
// ---------------------------------------------------------------------------

/// Output buffer plus the literal run currently open for appending.
struct Stream {
    out: Vec<u8>,
    mode: AddressMode,
    /// Index of the open literal command byte.
    open_literal: Option<usize>,
}

impl Stream {
    fn new(mode: AddressMode, capacity: usize) -> Self {
        let mut out = Vec::with_capacity(capacity);
        if mode == AddressMode::Relative {
            out.push(RELATIVE_FLAG);
        }
        Self {
            out,
            mode,
            open_literal: None,
        }
    }

    fn literal(&mut self, byte: u8) {
        match self.open_literal {
            Some(at) if usize::from(self.out[at] & 0x3F) < MAX_LITERAL => self.out[at] += 1,
            _ => {
                self.open_literal = Some(self.out.len());
                self.out.push(CMD_LITERAL | 1);
            }
        }
        self.out.push(byte);
    }

    fn fill(&mut self, len: usize, byte: u8) {
        self.open_literal = None;
        self.out.push(CMD_FILL);
        self.out.extend_from_slice(&(len as u16).to_le_bytes());
        self.out.push(byte);
    }

    fn copy(&mut self, found: Match, cursor: usize) {
        self.open_literal = None;
        let len = found.len;
        let distance = cursor - found.pos;

        if len > MAX_SHORT_COPY || distance > MAX_SHORT_DISTANCE {
            if len > MAX_COPY {
                self.out.push(CMD_LONG_COPY);
                self.out.extend_from_slice(&(len as u16).to_le_bytes());
            } else {
                self.out.push(CMD_COPY | (len - MIN_MATCH) as u8);
            }
            let offset = match self.mode {
                AddressMode::Absolute => found.pos,
                AddressMode::Relative => distance,
            };
            debug_assert!(offset <= 0xFFFF);
            self.out.extend_from_slice(&(offset as u16).to_le_bytes());
        } else {
            // 0LLLDDDD DDDDDDDD
            self.out
                .push((((len - MIN_MATCH) << 4) | (distance >> 8)) as u8);
            self.out.push(distance as u8);
        }
    }

    fn finish(mut self) -> Vec<u8> {
        self.out.push(CMD_END);
        self.out
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_is_empty_stream() {
        assert!(compress(b"").is_empty());
    }

    #[test]
    fn single_byte() {
        assert_eq!(compress(b"Z"), vec![0x81, b'Z', 0x80]);
    }

    #[test]
    fn repeated_pattern_uses_short_copy() {
        // "ABC" literal, then a 6-byte copy from 3 back that overlaps itself.
        assert_eq!(
            compress(b"ABCABCABC"),
            vec![0x83, b'A', b'B', b'C', 0x30, 0x03, 0x80]
        );
    }

    #[test]
    fn long_run_uses_fill() {
        assert_eq!(
            compress(&[0xAA; 100]),
            vec![0x81, 0xAA, 0xFE, 99, 0, 0xAA, 0x80]
        );
    }

    #[test]
    fn short_run_uses_copy_instead_of_fill() {
        // 40 bytes: too short for the fill probe, so a copy from 1 back.
        let out = compress(&[7; 40]);
        assert_eq!(out, vec![0x81, 7, 0xC0 | (39 - 3), 0, 0, 0x80]);
    }

    #[test]
    fn two_byte_match_stays_literal() {
        assert_eq!(
            compress(b"ABxAB"),
            vec![0x85, b'A', b'B', b'x', b'A', b'B', 0x80]
        );
    }

    #[test]
    fn literal_run_splits_at_63() {
        let input: Vec<u8> = (0..100u8).collect();
        let out = compress(&input);
        assert_eq!(out[0], 0xBF);
        assert_eq!(out[64], 0x80 | 37);
        assert_eq!(out.len(), 100 + 2 + 1);
        assert_eq!(*out.last().unwrap(), 0x80);
    }

    #[test]
    fn long_match_uses_five_byte_copy() {
        let block: Vec<u8> = (0..80u8).collect();
        let mut input = block.clone();
        input.extend_from_slice(&block);
        let out = compress(&input);
        // literal 63 + literal 17 + long copy(80, absolute 0) + end
        let tail = &out[out.len() - 6..];
        assert_eq!(tail, &[0xFF, 80, 0, 0, 0, 0x80]);
    }

    #[test]
    fn relative_mode_for_large_input() {
        let input: Vec<u8> = (0..70_000u32).map(|i| (i % 251) as u8).collect();
        let out = compress(&input);
        assert_eq!(out[0], 0x00);
        assert_eq!(out[1], 0xBF);
        assert!(out.len() < 1000);
    }

    #[test]
    fn store_level_emits_only_literals() {
        let out = compress_with(&[1; 200], &CompressOptions { level: 0 });
        assert_eq!(out.len(), worst_case_len(200));
    }

    #[test]
    fn default_and_exhaustive_levels_agree() {
        let input = b"she sells sea shells by the sea shore, the shells she sells are sea shells";
        let reference = compress_with(input, &CompressOptions { level: 9 });
        for level in 4..=8 {
            assert_eq!(
                compress_with(input, &CompressOptions { level }),
                reference,
                "level {level}"
            );
        }
    }
}
