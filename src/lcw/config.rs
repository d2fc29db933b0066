// Matcher profiles for the LCW encoder.
//
// Each profile decides how the encoder looks for back-references. Levels
// map onto profiles the same way regardless of input size.

/// Shortest match the encoder will turn into a copy command.
pub const MIN_MATCH: usize = 3;

/// Longest match (and longest copy command) a single command can express.
pub const MAX_MATCH: usize = 0xFFFF;

/// Shortest run the RLE-Fill command is used for.
pub const MIN_FILL: usize = 65;

/// How far back a relative stream may reference.
pub const RELATIVE_WINDOW: usize = 0xFFFF;

/// Default compression level.
pub const DEFAULT_LEVEL: u32 = 6;

/// Back-reference search method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Search {
    /// Literal runs only: no copies and no fills.
    Store,
    /// Hash chains over 3-byte prefixes, walking at most `depth` candidates.
    /// `usize::MAX` walks the whole window.
    Chain { depth: usize },
    /// Brute-force scan of every earlier position.
    Exhaustive,
}

/// Matcher profile configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatcherConfig {
    /// Name for display purposes.
    pub name: &'static str,
    /// Search method.
    pub search: Search,
}

/// Compression levels mapping to profiles.
///
/// - Level 0: store (literal runs only)
/// - Levels 1-3: fast
/// - Levels 4-8: default
/// - Level 9: exhaustive
///
/// Levels 4 through 9 find the same matches and produce identical output;
/// level 9 only differs in how long it takes.
pub fn config_for_level(level: u32) -> MatcherConfig {
    match level {
        0 => STORE,
        1..=3 => FAST,
        4..=8 => DEFAULT,
        _ => EXHAUSTIVE,
    }
}

pub const STORE: MatcherConfig = MatcherConfig {
    name: "store",
    search: Search::Store,
};

pub const FAST: MatcherConfig = MatcherConfig {
    name: "fast",
    search: Search::Chain { depth: 16 },
};

pub const DEFAULT: MatcherConfig = MatcherConfig {
    name: "default",
    search: Search::Chain { depth: usize::MAX },
};

pub const EXHAUSTIVE: MatcherConfig = MatcherConfig {
    name: "exhaustive",
    search: Search::Exhaustive,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_mapping() {
        assert_eq!(config_for_level(0).name, "store");
        assert_eq!(config_for_level(1).name, "fast");
        assert_eq!(config_for_level(3).name, "fast");
        assert_eq!(config_for_level(4).name, "default");
        assert_eq!(config_for_level(DEFAULT_LEVEL).name, "default");
        assert_eq!(config_for_level(8).name, "default");
        assert_eq!(config_for_level(9).name, "exhaustive");
        assert_eq!(config_for_level(200).name, "exhaustive");
    }

    #[test]
    fn only_store_disables_matching() {
        for level in 0..=9 {
            let store = config_for_level(level).search == Search::Store;
            assert_eq!(store, level == 0, "level {level}");
        }
    }
}
