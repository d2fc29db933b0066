// Command-level view of an XOR delta.

use super::{CMD_FILL, LONG_COPY_FLAG, LONG_COUNT_MASK, LONG_FILL_FLAG};

/// One XOR-delta command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Leave `len` destination bytes unchanged.
    Skip { len: usize },
    /// XOR `len` destination bytes with `value`.
    Fill { len: usize, value: u8 },
    /// XOR `len` destination bytes with the `len` bytes that follow.
    Copy { len: usize },
    /// Terminator.
    End,
}

impl Command {
    /// Destination bytes this command covers.
    pub fn span(&self) -> usize {
        match *self {
            Self::Skip { len } | Self::Fill { len, .. } | Self::Copy { len } => len,
            Self::End => 0,
        }
    }
}

/// Iterator over the commands of an XOR delta.
///
/// Stops after [`Command::End`], at the end of the delta, or at the first
/// cut-off command (see [`Commands::is_malformed`]).
pub struct Commands<'a> {
    delta: &'a [u8],
    pos: usize,
    done: bool,
    malformed: bool,
}

impl<'a> Commands<'a> {
    pub fn new(delta: &'a [u8]) -> Self {
        Self {
            delta,
            pos: 0,
            done: false,
            malformed: false,
        }
    }

    /// Offset of the next unread delta byte.
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn is_malformed(&self) -> bool {
        self.malformed
    }

    fn operands(&mut self, n: usize) -> Option<&'a [u8]> {
        let bytes = self.delta.get(self.pos..self.pos + n)?;
        self.pos += n;
        Some(bytes)
    }

    fn parse(&mut self, cmd: u8) -> Option<Command> {
        let command = match cmd {
            CMD_FILL => {
                let ops = self.operands(2)?;
                Command::Fill {
                    len: usize::from(ops[0]),
                    value: ops[1],
                }
            }
            0x01..=0x7F => {
                let len = usize::from(cmd);
                self.operands(len)?;
                Command::Copy { len }
            }
            0x81..=0xFF => Command::Skip {
                len: usize::from(cmd & 0x7F),
            },
            0x80 => {
                let ops = self.operands(2)?;
                let word = u16::from_le_bytes([ops[0], ops[1]]);
                let len = usize::from(word & LONG_COUNT_MASK);
                if word == 0 {
                    Command::End
                } else if word & LONG_COPY_FLAG == 0 {
                    Command::Skip {
                        len: usize::from(word),
                    }
                } else if word & LONG_FILL_FLAG == LONG_FILL_FLAG {
                    let value = self.operands(1)?[0];
                    Command::Fill { len, value }
                } else {
                    self.operands(len)?;
                    Command::Copy { len }
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
        let Some(&cmd) = self.delta.get(self.pos) else {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xor::generate_delta;

    #[test]
    fn lists_every_variant() {
        let delta = [
            0x82, 0x02, 0x11, 0x22, 0x00, 0x03, 0x0F, 0x80, 0x02, 0x00, 0x80, 0x01, 0x80, 0x33,
            0x80, 0x02, 0xC0, 0x44, 0x80, 0x00, 0x00,
        ];
        let commands: Vec<_> = Commands::new(&delta).collect();
        assert_eq!(
            commands,
            vec![
                Command::Skip { len: 2 },
                Command::Copy { len: 2 },
                Command::Fill { len: 3, value: 0x0F },
                Command::Skip { len: 2 },
                Command::Copy { len: 1 },
                Command::Fill { len: 2, value: 0x44 },
                Command::End,
            ]
        );
        assert_eq!(commands.iter().map(Command::span).sum::<usize>(), 12);
    }

    #[test]
    fn spans_add_up_to_frame_length() {
        let base: Vec<u8> = (0..3000u32).map(|i| (i % 13) as u8).collect();
        let mut source = base.clone();
        source[100..900].fill(0x55);
        source[2000] ^= 1;
        let delta = generate_delta(&source, &base);
        let mut it = Commands::new(&delta);
        let span: usize = it.by_ref().map(|c| c.span()).sum();
        assert_eq!(span, 3000);
        assert!(!it.is_malformed());
        assert_eq!(it.position(), delta.len());
    }

    #[test]
    fn stops_on_cut_off_copy() {
        let mut it = Commands::new(&[0x81, 0x03, 1]);
        assert_eq!(it.next(), Some(Command::Skip { len: 1 }));
        assert_eq!(it.next(), None);
        assert!(it.is_malformed());
    }
}
