//! Block text normalisation and diagnostics.
//!
//! [`clean`] is the single deterministic rule applied to every block before
//! it is sent to the model: collapse whitespace runs, trim the edges.
//! [`analyze`] computes lightweight statistics over the *raw* block text
//! (line count comes from the original newline structure, before cleaning
//! flattens it) — used only for logging, never for control flow.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

static RE_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Collapse any run of whitespace characters (including newlines) into a
/// single space, then trim leading/trailing whitespace.
///
/// Empty or whitespace-only input yields the empty string.
pub fn clean(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    RE_WHITESPACE.replace_all(text, " ").trim().to_string()
}

/// Statistics for a single raw block, computed by [`analyze`].
#[derive(Debug, Clone, PartialEq)]
pub struct BlockStats {
    pub word_count: usize,
    pub char_count: usize,
    pub line_count: usize,
    pub is_empty: bool,
    pub avg_words_per_line: f64,
}

impl fmt::Display for BlockStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} words, {} chars, {} lines",
            self.word_count, self.char_count, self.line_count
        )
    }
}

/// Analyze a raw block and return its statistics.
///
/// Pure and side-effect free; operates on the pre-clean text so the line
/// count reflects the block's original newline-delimited structure.
pub fn analyze(text: &str) -> BlockStats {
    if text.is_empty() {
        return BlockStats {
            word_count: 0,
            char_count: 0,
            line_count: 0,
            is_empty: true,
            avg_words_per_line: 0.0,
        };
    }

    let line_count = text.split('\n').count();
    let word_count = text.split_whitespace().count();

    BlockStats {
        word_count,
        char_count: text.chars().count(),
        line_count,
        is_empty: false,
        avg_words_per_line: word_count as f64 / line_count as f64,
    }
}
