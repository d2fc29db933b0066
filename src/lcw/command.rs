// Command-level view of an LCW stream.
//
// Parses commands without expanding them, for tooling (`inspect`) and
// tests that need to see which command variants the encoder chose.

use super::{AddressMode, CMD_END, CMD_FILL, CMD_LONG_COPY};

/// One LCW command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// `len` literal bytes follow the command byte.
    Literal { len: usize },
    /// 2-byte copy from `distance` bytes back.
    ShortCopy { len: usize, distance: usize },
    /// 3-byte copy. `offset` is a position or a distance per the stream mode.
    Copy { len: usize, offset: usize },
    /// 5-byte copy. `offset` is a position or a distance per the stream mode.
    LongCopy { len: usize, offset: usize },
    /// `len` copies of `value`.
    Fill { len: usize, value: u8 },
    /// End of stream.
    End,
}

impl Command {
    /// Bytes this command produces.
    pub fn output_len(&self) -> usize {
        match *self {
            Self::Literal { len }
            | Self::ShortCopy { len, .. }
            | Self::Copy { len, .. }
            | Self::LongCopy { len, .. }
            | Self::Fill { len, .. } => len,
            Self::End => 0,
        }
    }

    /// Bytes this command occupies in the stream.
    pub fn encoded_len(&self) -> usize {
        match *self {
            Self::Literal { len } => 1 + len,
            Self::ShortCopy { .. } => 2,
            Self::Copy { .. } => 3,
            Self::LongCopy { .. } => 5,
            Self::Fill { .. } => 4,
            Self::End => 1,
        }
    }

    /// Whether this is one of the back-reference commands.
    pub fn is_copy(&self) -> bool {
        matches!(
            self,
            Self::ShortCopy { .. } | Self::Copy { .. } | Self::LongCopy { .. }
        )
    }
}

/// Iterator over the commands of an LCW stream.
///
/// Stops after [`Command::End`], at the end of the stream, or at the first
/// command whose operands are cut off (see [`Commands::is_malformed`]).
pub struct Commands<'a> {
    stream: &'a [u8],
    pos: usize,
    mode: AddressMode,
    done: bool,
    malformed: bool,
}

impl<'a> Commands<'a> {
    pub fn new(stream: &'a [u8]) -> Self {
        let (mode, header) = AddressMode::of_stream(stream);
        Self {
            stream,
            pos: header,
            mode,
            done: false,
            malformed: false,
        }
    }

    /// Addressing mode declared by the stream.
    pub fn mode(&self) -> AddressMode {
        self.mode
    }

    /// Offset of the next unread stream byte.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Whether iteration stopped on a cut-off command.
    pub fn is_malformed(&self) -> bool {
        self.malformed
    }

    fn operands(&mut self, n: usize) -> Option<&'a [u8]> {
        let bytes = self.stream.get(self.pos..self.pos + n)?;
        self.pos += n;
        Some(bytes)
    }

    fn parse(&mut self, cmd: u8) -> Option<Command> {
        let word = |b: &[u8], at: usize| usize::from(u16::from_le_bytes([b[at], b[at + 1]]));
        let command = match cmd {
            CMD_END => Command::End,
            0x81..=0xBF => {
                let len = usize::from(cmd & 0x3F);
                self.operands(len)?;
                Command::Literal { len }
            }
            CMD_FILL => {
                let ops = self.operands(3)?;
                Command::Fill {
                    len: word(ops, 0),
                    value: ops[2],
                }
            }
            CMD_LONG_COPY => {
                let ops = self.operands(4)?;
                Command::LongCopy {
                    len: word(ops, 0),
                    offset: word(ops, 2),
                }
            }
            0xC0..=0xFD => {
                let ops = self.operands(2)?;
                Command::Copy {
                    len: usize::from(cmd & 0x3F) + 3,
                    offset: word(ops, 0),
                }
            }
            0x00..=0x7F => {
                let ops = self.operands(1)?;
                Command::ShortCopy {
                    len: usize::from(cmd >> 4) + 3,
                    distance: (usize::from(cmd & 0x0F) << 8) | usize::from(ops[0]),
                }
            }
        };
        Some(command)
    }
}

impl Iterator for Commands<'_> {
    type Item = Command;

    fn next(&mut self) -> Option<Command> {
        if self.done {
            return None;
        }
        let Some(&cmd) = self.stream.get(self.pos) else {
            self.done = true;
            return None;
        };
        self.pos += 1;
        match self.parse(cmd) {
            Some(command) => {
                self.done = command == Command::End;
                Some(command)
            }
            None => {
                self.done = true;
                self.malformed = true;
                None
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_every_variant() {
        let stream = [
            0x82, b'a', b'b', // literal 2
            0x10, 0x02, // short copy 4 from 2 back
            0xC1, 0x00, 0x00, // copy 4 from 0
            0xFF, 0x50, 0x00, 0x01, 0x00, // long copy 80 from 1
            0xFE, 0x64, 0x00, 0x2A, // fill 100 x 0x2A
            0x80,
        ];
        let commands: Vec<_> = Commands::new(&stream).collect();
        assert_eq!(
            commands,
            vec![
                Command::Literal { len: 2 },
                Command::ShortCopy { len: 4, distance: 2 },
                Command::Copy { len: 4, offset: 0 },
                Command::LongCopy { len: 80, offset: 1 },
                Command::Fill { len: 100, value: 0x2A },
                Command::End,
            ]
        );
        let encoded: usize = commands.iter().map(Command::encoded_len).sum();
        assert_eq!(encoded, stream.len());
        let produced: usize = commands.iter().map(Command::output_len).sum();
        assert_eq!(produced, 2 + 4 + 4 + 80 + 100);
    }

    #[test]
    fn reports_relative_mode() {
        let stream = [0x00, 0x81, 7, 0x80];
        let mut it = Commands::new(&stream);
        assert_eq!(it.mode(), AddressMode::Relative);
        assert_eq!(it.next(), Some(Command::Literal { len: 1 }));
        assert_eq!(it.next(), Some(Command::End));
        assert_eq!(it.next(), None);
        assert_eq!(it.position(), stream.len());
    }

    #[test]
    fn stops_on_cut_off_command() {
        let stream = [0x81, 7, 0xFF, 0x10];
        let mut it = Commands::new(&stream);
        assert_eq!(it.next(), Some(Command::Literal { len: 1 }));
        assert_eq!(it.next(), None);
        assert!(it.is_malformed());
    }

    #[test]
    fn stream_without_end_marker_is_not_malformed() {
        let stream = [0x81, 7];
        let mut it = Commands::new(&stream);
        assert_eq!(it.next(), Some(Command::Literal { len: 1 }));
        assert_eq!(it.next(), None);
        assert!(!it.is_malformed());
    }
}
