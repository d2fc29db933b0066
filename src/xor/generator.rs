// XOR-delta generator.
//
// Walks source and base together and classifies each stretch:
//   1. Bytes that differ are scanned until they agree again or until a
//      run of one repeated XOR value (>= 4 long) is followed by a
//      different value. The repeated tail becomes a fill, the rest a copy.
//   2. Bytes that agree become a skip.
//
// Counts below 255 are written as repeated short commands, which is never
// larger than the 3-byte long form.

use super::{
    CMD_FILL, CMD_LONG, CMD_SKIP, LONG_COPY_FLAG, LONG_FILL_FLAG, MAX_LONG, MAX_LONG_SKIP,
    MAX_SHORT, MAX_SHORT_FILL, MIN_FILL, TERMINATOR, worst_case_len,
};

/// A stretch of differing bytes: a copy part followed by a fill part.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Changes {
    copy: usize,
    fill: usize,
    value: u8,
}

/// Encode the difference between `source` and `base`.
///
/// Covers the first `min(source.len(), base.len())` bytes. Applying the
/// result to a copy of `base` reproduces that prefix of `source`.
pub fn generate_delta(source: &[u8], base: &[u8]) -> Vec<u8> {
    let end = source.len().min(base.len());
    let mut out = Vec::with_capacity(worst_case_len(end));
    let mut pos = 0usize;

    while pos < end {
        let changes = scan_changes(source, base, pos, end);

        emit_copy(&mut out, &source[pos..pos + changes.copy], &base[pos..]);
        pos += changes.copy;

        emit_fill(&mut out, changes.fill, changes.value);
        pos += changes.fill;

        let same = source[pos..end]
            .iter()
            .zip(&base[pos..end])
            .take_while(|(s, b)| s == b)
            .count();
        emit_skip(&mut out, same);
        pos += same;
    }

    out.extend_from_slice(&TERMINATOR);
    debug_assert!(out.len() <= worst_case_len(end));
    log::debug!("xor: {} byte frames -> {} byte delta", end, out.len());
    out
}

/// Measure the differing stretch starting at `pos`.
fn scan_changes(source: &[u8], base: &[u8], pos: usize, end: usize) -> Changes {
    let mut last = source[pos] ^ base[pos];
    let mut repeat = 0usize;
    let mut total = 0usize;
    let mut i = pos;

    while i < end && source[i] != base[i] {
        let x = source[i] ^ base[i];
        if x == last {
            repeat += 1;
        } else {
            if repeat >= MIN_FILL {
                break;
            }
            last = x;
            repeat = 1;
        }
        total += 1;
        i += 1;
    }

    let fill = if repeat >= MIN_FILL { repeat } else { 0 };
    Changes {
        copy: total - fill,
        fill,
        value: last,
    }
}

fn emit_copy(out: &mut Vec<u8>, source: &[u8], base: &[u8]) {
    let mut done = 0usize;
    while done < source.len() {
        let remaining = source.len() - done;
        let count = if remaining < MAX_SHORT_FILL {
            let count = remaining.min(MAX_SHORT);
            out.push(count as u8);
            count
        } else {
            let count = remaining.min(MAX_LONG);
            out.push(CMD_LONG);
            out.extend_from_slice(&(count as u16 | LONG_COPY_FLAG).to_le_bytes());
            count
        };
        for i in done..done + count {
            out.push(source[i] ^ base[i]);
        }
        done += count;
    }
}

fn emit_fill(out: &mut Vec<u8>, mut remaining: usize, value: u8) {
    while remaining > 0 {
        let count = if remaining <= MAX_SHORT_FILL {
            out.push(CMD_FILL);
            out.push(remaining as u8);
            remaining
        } else {
            let count = remaining.min(MAX_LONG);
            out.push(CMD_LONG);
            out.extend_from_slice(&(count as u16 | LONG_FILL_FLAG).to_le_bytes());
            count
        };
        out.push(value);
        remaining -= count;
    }
}

fn emit_skip(out: &mut Vec<u8>, mut remaining: usize) {
    while remaining > 0 {
        let count = if remaining < MAX_SHORT_FILL {
            let count = remaining.min(MAX_SHORT);
            out.push(CMD_SKIP | count as u8);
            count
        } else {
            let count = remaining.min(MAX_LONG_SKIP);
            out.push(CMD_LONG);
            out.extend_from_slice(&(count as u16).to_le_bytes());
            count
        };
        remaining -= count;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
