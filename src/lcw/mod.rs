// LCW ("format80") dictionary/run-length compression.
//
// A stream is a sequence of commands, each introduced by one command byte:
//
//   0x80           end of stream
//   0x81..=0xBF    literal run, count = B & 0x3F
//   0xC0..=0xFD    copy, count = (B & 0x3F) + 3, u16 offset follows
//   0xFE           fill, u16 count and a fill byte follow
//   0xFF           long copy, u16 count and u16 offset follow
//   0x00..=0x7F    short relative copy, count = (B >> 4) + 3,
//                  distance = ((B & 0x0F) << 8) | next byte
//
// A leading 0x00 switches the copy/long copy offsets from absolute
// positions to backward distances. The encoder uses that for inputs
// larger than 64 KiB.
//
// - `config`: matcher profiles and compression levels
// - `matcher`: exhaustive and hash-chained back-reference search
// - `encoder`: `compress`
// - `decoder`: `decompress` and the fail-soft `Decoded` outcome
// - `command`: command iterator for inspection

pub mod command;
pub mod config;
pub mod decoder;
pub mod encoder;
pub mod matcher;

pub use command::{Command, Commands};
pub use decoder::{DecodeStatus, Decoded, decompress, decompress_into};
pub use encoder::{CompressOptions, compress, compress_with};

pub(crate) const CMD_END: u8 = 0x80;
pub(crate) const CMD_LITERAL: u8 = 0x80;
pub(crate) const CMD_COPY: u8 = 0xC0;
pub(crate) const CMD_FILL: u8 = 0xFE;
pub(crate) const CMD_LONG_COPY: u8 = 0xFF;
pub(crate) const RELATIVE_FLAG: u8 = 0x00;

/// Longest literal run a single command can carry.
pub const MAX_LITERAL: usize = 0x3F;

/// Longest match the 2-byte short copy can express.
pub const MAX_SHORT_COPY: usize = 10;

/// Largest distance the 2-byte short copy can express.
pub const MAX_SHORT_DISTANCE: usize = 0xFFF;

/// Longest match the 3-byte copy can express.
pub const MAX_COPY: usize = 64;

/// Inputs longer than this are compressed with relative addressing.
pub const MAX_ABSOLUTE_LEN: usize = 0xFFFF;

/// How copy offsets in a stream are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressMode {
    /// Offsets are positions from the start of the output.
    Absolute,
    /// Offsets are distances back from the current output position.
    Relative,
}

impl AddressMode {
    /// The mode the encoder picks for an input of `len` bytes.
    pub fn for_len(len: usize) -> Self {
        if len > MAX_ABSOLUTE_LEN {
            Self::Relative
        } else {
            Self::Absolute
        }
    }

    /// The mode a stream declares, and how many header bytes declare it.
    pub fn of_stream(stream: &[u8]) -> (Self, usize) {
        match stream.first() {
            Some(&RELATIVE_FLAG) => (Self::Relative, 1),
            _ => (Self::Absolute, 0),
        }
    }
}

/// Largest stream `compress` can produce for `len` input bytes.
///
/// One header byte per 63 literals and the end marker. Inputs above
/// 64 KiB also carry the leading relative-mode byte, so a stream with no
/// usable matches is one byte longer than the literal-only count.
pub fn worst_case_len(len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    let mode = usize::from(AddressMode::for_len(len) == AddressMode::Relative);
    len + len.div_ceil(MAX_LITERAL) + 1 + mode
}
