// LCW decoder.
//
// Decodes into a caller-sized buffer and never grows it. Every read from
// the stream and every write to the output is bounds-checked; a stream
// that runs out, overflows the output, or references bytes that do not
// exist yet ends decoding early and reports how far it got.
//
// Copies run byte-by-byte in increasing address order. A copy whose
// distance is smaller than its length reads bytes it wrote itself, which
// is how runs are expressed through back-references.

use super::{AddressMode, CMD_END, CMD_FILL, CMD_LONG_COPY};

/// Why decoding stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeStatus {
    /// The end marker was read.
    EndMarker,
    /// The output buffer is full. A command may have been cut short.
    OutputFull,
    /// The stream ended before the end marker, possibly mid-command.
    Truncated,
    /// A copy referenced output that has not been written.
    BadReference,
}

/// Outcome of a decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decoded {
    /// Bytes written to the output.
    pub written: usize,
    /// Stream bytes consumed, including the mode byte and end marker.
    pub consumed: usize,
    /// Why decoding stopped.
    pub status: DecodeStatus,
}

impl Decoded {
    /// Whether the stream was cut short or corrupt.
    pub fn is_truncated(&self) -> bool {
        matches!(
            self.status,
            DecodeStatus::Truncated | DecodeStatus::BadReference
        )
    }
}

/// Decode `input` into a new buffer of at most `capacity` bytes.
///
/// The returned buffer holds exactly the bytes written; its length is the
/// decoded size even when the stream was truncated.
pub fn decompress(input: &[u8], capacity: usize) -> Vec<u8> {
    let mut output = vec![0u8; capacity];
    let decoded = decompress_into(input, &mut output);
    output.truncate(decoded.written);
    output
}

/// Decode `input` into `output`, returning how far decoding got.
pub fn decompress_into(input: &[u8], output: &mut [u8]) -> Decoded {
    let (mode, header) = AddressMode::of_stream(input);
    let mut dec = Decoder {
        input,
        output,
        read: header,
        write: 0,
    };
    let status = dec.run(mode);
    if status != DecodeStatus::EndMarker {
        log::debug!(
            "lcw: decode stopped early ({status:?}) at input {} / {}, output {} / {}",
            dec.read,
            input.len(),
            dec.write,
            dec.output.len()
        );
    }
    Decoded {
        written: dec.write,
        consumed: dec.read,
        status,
    }
}

// ---------------------------------------------------------------------------
// Decode loop
// ---------------------------------------------------------------------------

struct Decoder<'a, 'b> {
    input: &'a [u8],
    output: &'b mut [u8],
    /// Read cursor into `input`.
    read: usize,
    /// Write cursor into `output`.
    write: usize,
}

/// Early exit from a command.
type Step = Result<(), DecodeStatus>;

impl Decoder<'_, '_> {
    fn run(&mut self, mode: AddressMode) -> DecodeStatus {
        while self.write < self.output.len() {
            let Some(cmd) = self.byte() else {
                return DecodeStatus::Truncated;
            };
            let step = match cmd {
                CMD_END => return DecodeStatus::EndMarker,
                0x81..=0xBF => self.literal(usize::from(cmd & 0x3F)),
                CMD_FILL => self.fill(),
                CMD_LONG_COPY => self.long_copy(mode),
                0xC0..=0xFD => self.copy(usize::from(cmd & 0x3F) + 3, mode),
                0x00..=0x7F => self.short_copy(cmd),
            };
            if let Err(status) = step {
                return status;
            }
        }

        // Output is full; a well-formed stream has only its end marker left.
        if self.input.get(self.read) == Some(&CMD_END) {
            self.read += 1;
            DecodeStatus::EndMarker
        } else {
            DecodeStatus::OutputFull
        }
    }

    #[inline]
    fn byte(&mut self) -> Option<u8> {
        let b = *self.input.get(self.read)?;
        self.read += 1;
        Some(b)
    }

    #[inline]
    fn word(&mut self) -> Result<usize, DecodeStatus> {
        let lo = self.byte().ok_or(DecodeStatus::Truncated)?;
        let hi = self.byte().ok_or(DecodeStatus::Truncated)?;
        Ok(usize::from(u16::from_le_bytes([lo, hi])))
    }

    #[inline]
    fn put(&mut self, b: u8) -> Step {
        let slot = self
            .output
            .get_mut(self.write)
            .ok_or(DecodeStatus::OutputFull)?;
        *slot = b;
        self.write += 1;
        Ok(())
    }

    fn literal(&mut self, count: usize) -> Step {
        for _ in 0..count {
            let b = self.byte().ok_or(DecodeStatus::Truncated)?;
            self.put(b)?;
        }
        Ok(())
    }

    fn fill(&mut self) -> Step {
        let count = self.word()?;
        let value = self.byte().ok_or(DecodeStatus::Truncated)?;
        for _ in 0..count {
            self.put(value)?;
        }
        Ok(())
    }

    fn long_copy(&mut self, mode: AddressMode) -> Step {
        let count = self.word()?;
        self.copy(count, mode)
    }

    fn copy(&mut self, count: usize, mode: AddressMode) -> Step {
        let offset = self.word()?;
        let src = match mode {
            AddressMode::Absolute => offset,
            AddressMode::Relative => self
                .write
                .checked_sub(offset)
                .ok_or(DecodeStatus::BadReference)?,
        };
        self.copy_from(src, count)
    }

    fn short_copy(&mut self, cmd: u8) -> Step {
        let count = usize::from(cmd >> 4) + 3;
        let lo = self.byte().ok_or(DecodeStatus::Truncated)?;
        let distance = (usize::from(cmd & 0x0F) << 8) | usize::from(lo);
        let src = self
            .write
            .checked_sub(distance)
            .ok_or(DecodeStatus::BadReference)?;
        self.copy_from(src, count)
    }

    /// Copy `count` bytes starting at output position `src`.
    ///
    /// `src` must lie strictly before the write cursor; it then stays
    /// behind it for the whole copy.
    fn copy_from(&mut self, mut src: usize, count: usize) -> Step {
        if src >= self.write {
            return Err(DecodeStatus::BadReference);
        }
        for _ in 0..count {
            let b = self.output[src];
            self.put(b)?;
            src += 1;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
