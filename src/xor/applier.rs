// XOR-delta applier.
//
// Replays a delta onto a destination that already holds the base frame.
// The destination is either a plain buffer or a rectangular region of a
// larger buffer (an animation frame drawn into a page); both are walked
// through a logical cursor that only ever moves forward.
//
// Nothing here panics on bad input: a delta that runs out, or commands
// that reach past the destination, stop the walk and leave everything
// applied so far in place.

use thiserror::Error;

use super::{CMD_FILL, LONG_COPY_FLAG, LONG_COUNT_MASK, LONG_FILL_FLAG, TERMINATOR};

/// Why applying stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyStatus {
    /// The terminator was read.
    Terminator,
    /// The destination is fully covered; the delta continues past it.
    DestinationEnd,
    /// The delta ended before its terminator, possibly mid-command.
    Truncated,
    /// A command reached past the end of the destination.
    Overrun,
}

/// Outcome of applying a delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Applied {
    /// Logical destination position reached.
    pub position: usize,
    /// Delta bytes consumed, including the terminator.
    pub consumed: usize,
    /// Why applying stopped.
    pub status: ApplyStatus,
}

impl Applied {
    /// Whether the delta was cut short or did not fit the destination.
    pub fn is_truncated(&self) -> bool {
        matches!(self.status, ApplyStatus::Truncated | ApplyStatus::Overrun)
    }
}

/// How delta bytes combine with the destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ApplyMode {
    /// XOR into the existing bytes.
    #[default]
    Xor,
    /// Overwrite the existing bytes with the delta bytes.
    Copy,
}

/// Error building a [`Region`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegionError {
    #[error("region width must be non-zero")]
    ZeroWidth,
    #[error("region width {width} exceeds row stride {stride}")]
    WidthExceedsStride { width: usize, stride: usize },
}

/// A `width`-byte-wide window whose rows lie `stride` bytes apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    width: usize,
    stride: usize,
}

impl Region {
    pub fn new(width: usize, stride: usize) -> Result<Self, RegionError> {
        if width == 0 {
            return Err(RegionError::ZeroWidth);
        }
        if width > stride {
            return Err(RegionError::WidthExceedsStride { width, stride });
        }
        Ok(Self { width, stride })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Logical bytes addressable inside a buffer of `len` bytes.
    ///
    /// Only complete rows count.
    pub fn extent(&self, len: usize) -> usize {
        if len < self.width {
            return 0;
        }
        ((len - self.width) / self.stride + 1) * self.width
    }

    /// Buffer index of logical position `pos`.
    #[inline]
    pub fn index(&self, pos: usize) -> usize {
        (pos / self.width) * self.stride + pos % self.width
    }
}

// ---------------------------------------------------------------------------
// Destinations
// ---------------------------------------------------------------------------

/// Something a delta can be applied to, addressed by logical position.
trait Surface {
    fn extent(&self) -> usize;
    /// `pos < extent()`.
    fn combine(&mut self, pos: usize, value: u8);
}

struct Linear<'a>(&'a mut [u8]);

impl Surface for Linear<'_> {
    fn extent(&self) -> usize {
        self.0.len()
    }

    #[inline]
    fn combine(&mut self, pos: usize, value: u8) {
        self.0[pos] ^= value;
    }
}

struct Windowed<'a> {
    buf: &'a mut [u8],
    region: Region,
    mode: ApplyMode,
}

impl Surface for Windowed<'_> {
    fn extent(&self) -> usize {
        self.region.extent(self.buf.len())
    }

    #[inline]
    fn combine(&mut self, pos: usize, value: u8) {
        let slot = &mut self.buf[self.region.index(pos)];
        match self.mode {
            ApplyMode::Xor => *slot ^= value,
            ApplyMode::Copy => *slot = value,
        }
    }
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// XOR `delta` into `dest`, which must hold the base frame.
pub fn apply_delta(dest: &mut [u8], delta: &[u8]) -> Applied {
    run(Linear(dest), delta)
}

/// Apply `delta` to the `region` of `dest`.
///
/// Logical position `k` of the delta lands at
/// `(k / width) * stride + k % width`. With [`ApplyMode::Copy`] the delta
/// bytes are stored rather than XORed, which draws a delta taken against
/// a zeroed base.
pub fn apply_delta_region(dest: &mut [u8], region: Region, mode: ApplyMode, delta: &[u8]) -> Applied {
    run(
        Windowed {
            buf: dest,
            region,
            mode,
        },
        delta,
    )
}

fn run<S: Surface>(surface: S, delta: &[u8]) -> Applied {
    let mut applier = Applier {
        extent: surface.extent(),
        surface,
        delta,
        read: 0,
        write: 0,
    };
    let status = applier.walk();
    if status != ApplyStatus::Terminator && status != ApplyStatus::DestinationEnd {
        log::debug!(
            "xor: apply stopped early ({status:?}) at delta {} / {}, position {} / {}",
            applier.read,
            delta.len(),
            applier.write,
            applier.extent
        );
    }
    Applied {
        position: applier.write,
        consumed: applier.read,
        status,
    }
}

// ---------------------------------------------------------------------------
// Command loop
// ---------------------------------------------------------------------------

struct Applier<'d, S> {
    surface: S,
    extent: usize,
    delta: &'d [u8],
    /// Read cursor into `delta`.
    read: usize,
    /// Logical write cursor into `surface`.
    write: usize,
}

/// Early exit from a command; `Terminator` included.
type Step = Result<(), ApplyStatus>;

impl<S: Surface> Applier<'_, S> {
    fn walk(&mut self) -> ApplyStatus {
        loop {
            if self.write == self.extent {
                return self.at_end();
            }
            let Some(cmd) = self.byte() else {
                return ApplyStatus::Truncated;
            };
            let step = match cmd {
                CMD_FILL => self.short_fill(),
                0x01..=0x7F => self.copy(usize::from(cmd)),
                0x81..=0xFF => self.skip(usize::from(cmd & 0x7F)),
                0x80 => self.long(),
            };
            if let Err(status) = step {
                return status;
            }
        }
    }

    /// Destination covered: consume a terminator if one follows.
    fn at_end(&mut self) -> ApplyStatus {
        if self.delta.get(self.read..self.read + TERMINATOR.len()) == Some(&TERMINATOR[..]) {
            self.read += TERMINATOR.len();
            ApplyStatus::Terminator
        } else {
            ApplyStatus::DestinationEnd
        }
    }

    #[inline]
    fn byte(&mut self) -> Option<u8> {
        let b = *self.delta.get(self.read)?;
        self.read += 1;
        Some(b)
    }

    fn long(&mut self) -> Step {
        let lo = self.byte().ok_or(ApplyStatus::Truncated)?;
        let hi = self.byte().ok_or(ApplyStatus::Truncated)?;
        let word = u16::from_le_bytes([lo, hi]);
        let count = usize::from(word & LONG_COUNT_MASK);

        if word == 0 {
            Err(ApplyStatus::Terminator)
        } else if word & LONG_COPY_FLAG == 0 {
            self.skip(usize::from(word))
        } else if word & LONG_FILL_FLAG == LONG_FILL_FLAG {
            let value = self.byte().ok_or(ApplyStatus::Truncated)?;
            self.fill(count, value)
        } else {
            self.copy(count)
        }
    }

    fn skip(&mut self, count: usize) -> Step {
        if count > self.extent - self.write {
            self.write = self.extent;
            return Err(ApplyStatus::Overrun);
        }
        self.write += count;
        Ok(())
    }

    fn short_fill(&mut self) -> Step {
        let count = self.byte().ok_or(ApplyStatus::Truncated)?;
        let value = self.byte().ok_or(ApplyStatus::Truncated)?;
        self.fill(usize::from(count), value)
    }

    fn fill(&mut self, count: usize, value: u8) -> Step {
        for _ in 0..count {
            if self.write == self.extent {
                return Err(ApplyStatus::Overrun);
            }
            self.surface.combine(self.write, value);
            self.write += 1;
        }
        Ok(())
    }

    fn copy(&mut self, count: usize) -> Step {
        for _ in 0..count {
            if self.write == self.extent {
                return Err(ApplyStatus::Overrun);
            }
            let value = self.byte().ok_or(ApplyStatus::Truncated)?;
            self.surface.combine(self.write, value);
            self.write += 1;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
