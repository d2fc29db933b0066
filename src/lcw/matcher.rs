// Back-reference search for the LCW encoder.
//
// Two searchers share one contract: given the cursor and the start of the
// reachable window, return the longest earlier match, preferring the most
// recent position when lengths tie.
//
//   - **Exhaustive**: scans every window position. O(n * window).
//   - **Chained**: a hash table keyed by 3-byte prefixes with a `prev`
//     array linking older positions of the same bucket. With an unbounded
//     walk it visits every position that can produce a usable match, so
//     it selects exactly what the exhaustive scan selects.
//
// Stored positions carry CHAIN_OFFSET so that 0 means "empty".

use super::config::{MAX_MATCH, MIN_MATCH, MatcherConfig, Search};

/// LCG multiplier used to spread 3-byte prefixes over the buckets.
const HASH_MULT_32: u32 = 1_597_334_677;

/// Offset added to stored positions so 0 means "empty bucket".
const CHAIN_OFFSET: u32 = 1;

/// log2 of the bucket count.
const HASH_BITS: u32 = 16;

/// A candidate back-reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Match {
    /// Number of bytes that match forward from the cursor.
    pub len: usize,
    /// Absolute position the match starts at.
    pub pos: usize,
}

/// Length of the common run starting at `pos` and `cursor`, up to `limit`.
///
/// `pos < cursor`, so the candidate may run into the bytes being encoded;
/// the decoder copies byte-by-byte and reproduces that overlap.
#[inline]
fn match_len(input: &[u8], pos: usize, cursor: usize, limit: usize) -> usize {
    let mut len = 0;
    while len < limit && input[pos + len] == input[cursor + len] {
        len += 1;
    }
    len
}

#[inline]
fn prefix_hash(bytes: &[u8]) -> usize {
    let key = u32::from(bytes[0]) | (u32::from(bytes[1]) << 8) | (u32::from(bytes[2]) << 16);
    (key.wrapping_mul(HASH_MULT_32) >> (32 - HASH_BITS)) as usize
}

// ---------------------------------------------------------------------------
// Chain table
// ---------------------------------------------------------------------------

/// Hash table with full-length chaining via a `prev` array.
///
/// Unlike a circular chain buffer, `prev` holds one slot per input
/// position, so chains never go stale inside a single buffer.
pub struct ChainTable {
    head: Vec<u32>,
    prev: Vec<u32>,
    /// Next position not yet inserted.
    next: usize,
}

impl ChainTable {
    /// Create a table for an input of `len` bytes.
    pub fn new(len: usize) -> Self {
        Self {
            head: vec![0; 1 << HASH_BITS],
            prev: vec![0; len],
            next: 0,
        }
    }

    /// Insert every position before `cursor` that has a full prefix.
    pub fn insert_until(&mut self, input: &[u8], cursor: usize) {
        let last = input.len().saturating_sub(MIN_MATCH - 1).min(cursor);
        while self.next < last {
            let pos = self.next;
            let Ok(stored) = u32::try_from(pos + CHAIN_OFFSET as usize) else {
                // Positions beyond u32 are never reachable by a 16-bit offset.
                self.next = cursor;
                return;
            };
            let bucket = prefix_hash(&input[pos..]);
            self.prev[pos] = self.head[bucket];
            self.head[bucket] = stored;
            self.next += 1;
        }
    }

    /// Most recent position stored for the prefix at `bytes`.
    #[inline]
    pub fn lookup(&self, bytes: &[u8]) -> Option<usize> {
        let val = self.head[prefix_hash(bytes)];
        (val != 0).then(|| (val - CHAIN_OFFSET) as usize)
    }

    /// The next older position in the chain of `pos`.
    #[inline]
    pub fn chain_prev(&self, pos: usize) -> Option<usize> {
        let val = *self.prev.get(pos)?;
        (val != 0).then(|| (val - CHAIN_OFFSET) as usize)
    }
}

// ---------------------------------------------------------------------------
// Match finder
// ---------------------------------------------------------------------------

/// Back-reference searcher built from a [`MatcherConfig`].
pub enum MatchFinder {
    Store,
    Chained { table: ChainTable, depth: usize },
    Exhaustive,
}

impl MatchFinder {
    /// Build the searcher for an input of `len` bytes.
    pub fn new(config: MatcherConfig, len: usize) -> Self {
        match config.search {
            Search::Store => Self::Store,
            Search::Chain { depth } => Self::Chained {
                table: ChainTable::new(len),
                depth: depth.max(1),
            },
            Search::Exhaustive => Self::Exhaustive,
        }
    }

    /// Whether this searcher ever returns matches (and RLE should be tried).
    pub fn enabled(&self) -> bool {
        !matches!(self, Self::Store)
    }

    /// Longest match for `input[cursor..]` starting in `[window_start, cursor)`.
    ///
    /// Returns a zero-length match when nothing at all matches.
    pub fn find(&mut self, input: &[u8], cursor: usize, window_start: usize) -> Match {
        let limit = (input.len() - cursor).min(MAX_MATCH);
        match self {
            Self::Store => Match::default(),
            Self::Exhaustive => scan(input, cursor, window_start, limit),
            Self::Chained { table, depth } => {
                table.insert_until(input, cursor);
                if limit < MIN_MATCH {
                    return Match::default();
                }
                walk(table, *depth, input, cursor, window_start, limit)
            }
        }
    }
}

fn scan(input: &[u8], cursor: usize, window_start: usize, limit: usize) -> Match {
    let first = input[cursor];
    let mut best = Match::default();
    for pos in window_start..cursor {
        if input[pos] != first {
            continue;
        }
        let len = match_len(input, pos, cursor, limit);
        if len >= best.len {
            best = Match { len, pos };
        }
    }
    best
}

fn walk(
    table: &ChainTable,
    depth: usize,
    input: &[u8],
    cursor: usize,
    window_start: usize,
    limit: usize,
) -> Match {
    let mut best = Match::default();
    let mut candidate = table.lookup(&input[cursor..]);
    let mut visited = 0usize;

    while let Some(pos) = candidate {
        if pos < window_start || visited == depth {
            break;
        }
        visited += 1;
        let len = match_len(input, pos, cursor, limit);
        if len > best.len {
            best = Match { len, pos };
            if len == limit {
                break;
            }
        }
        candidate = table.chain_prev(pos);
    }
    best
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lcw::config::{DEFAULT, EXHAUSTIVE, FAST, STORE};

    #[test]
    fn chain_table_links_equal_prefixes() {
        let input = b"abcXabcYabc";
        let mut t = ChainTable::new(input.len());
        t.insert_until(input, 9);
        assert_eq!(t.lookup(b"abc"), Some(8));
        assert_eq!(t.chain_prev(8), Some(4));
        assert_eq!(t.chain_prev(4), Some(0));
        assert_eq!(t.chain_prev(0), None);
    }

    #[test]
    fn chain_table_skips_positions_without_full_prefix() {
        let input = b"abcab";
        let mut t = ChainTable::new(input.len());
        t.insert_until(input, input.len());
        // Positions 3 and 4 have fewer than three bytes left.
        assert_eq!(t.lookup(b"cab"), Some(2));
        assert_eq!(t.lookup(b"abc"), Some(0));
    }

    #[test]
    fn exhaustive_prefers_most_recent_on_tie() {
        let input = b"abcdXabcdYabcd";
        let mut f = MatchFinder::new(EXHAUSTIVE, input.len());
        let m = f.find(input, 10, 0);
        assert_eq!(m, Match { len: 4, pos: 5 });
    }

    #[test]
    fn chained_agrees_with_exhaustive() {
        let input = b"the cat sat on the mat with the hat on the cat";
        let mut chained = MatchFinder::new(DEFAULT, input.len());
        let mut exhaustive = MatchFinder::new(EXHAUSTIVE, input.len());
        for cursor in 1..input.len() {
            let a = chained.find(input, cursor, 0);
            let b = exhaustive.find(input, cursor, 0);
            if b.len >= MIN_MATCH {
                assert_eq!(a, b, "cursor {cursor}");
            } else {
                assert!(a.len < MIN_MATCH, "cursor {cursor}");
            }
        }
    }

    #[test]
    fn overlapping_match_runs_into_cursor() {
        let input = b"xyxyxyxyxy";
        let mut f = MatchFinder::new(DEFAULT, input.len());
        let m = f.find(input, 2, 0);
        assert_eq!(m, Match { len: 8, pos: 0 });
    }

    #[test]
    fn window_start_hides_older_positions() {
        let input = b"abcd----abcd";
        let mut f = MatchFinder::new(FAST, input.len());
        assert_eq!(f.find(input, 8, 0).len, 4);
        let mut f = MatchFinder::new(FAST, input.len());
        assert!(f.find(input, 8, 1).len < MIN_MATCH);
    }

    #[test]
    fn store_never_matches() {
        let input = [7u8; 32];
        let mut f = MatchFinder::new(STORE, input.len());
        assert!(!f.enabled());
        assert_eq!(f.find(&input, 16, 0), Match::default());
    }
}
