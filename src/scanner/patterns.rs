//! Compiled citation patterns.
//!
//! All patterns are compiled once on first use. The `regex` crate has no look-around, so
//! the "space before a capital letter" separator is expressed by consuming the capital
//! and, where only the separator is wanted, stepping back one character (see
//! [`split_author_segments`]).

use regex::Regex;
use std::sync::LazyLock;

/// Narrative family: `Name [and Name] [et al.] (Year[, p. N] ...)`
pub static NARRATIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"[A-Z][a-zA-Z'-]+(?:[-\s]+[a-z]+)*",
        r"(?:(?:,\s+and|\s+and|,|\s+&)\s+[A-Z][a-zA-Z'-]+(?:[-\s]+[a-z]+)*)*",
        r"(?:\s+et\s+al\.?)?",
        r"\s*\((?:forthcoming|\d{4}[a-z]?)",
        r"(?:,\s*(?:p+\.?|pp\.?|ch\.?)\s*\d+(?:\-\d+)?)?",
        r"[^)]*\)",
    ))
    .expect("narrative pattern is valid")
});

/// Parenthetical family: `([filler] Name [and Name] [et al.][,] Year ...)`
pub static PARENTHETICAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"\([^)]*?[A-Z][a-zA-Z'-]+",
        r"(?:(?:\s+and\s+|\s+&\s+|,\s+|\s+)[A-Z][a-zA-Z'-]+)*",
        r"(?:\s+et\s+al\.?)?",
        r"\s*,?\s*(?:forthcoming|\d{4}[a-z]?)",
        r"[^)]*\)",
    ))
    .expect("parenthetical pattern is valid")
});

/// A capitalized name token with optional lowercase continuation words
pub static NAME_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Z][a-zA-Z'-]+(?:[-\s]+[a-z]+)*").expect("valid regex"));

/// Separators between author segments inside a bracketed citation
static AUTHOR_SEPARATOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\s+and\s+|\s+&\s+|,\s+|\s+[A-Z]").expect("valid regex")
});

pub static ET_AL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+et\s+al\.?").expect("valid regex"));

/// Year range anywhere in a narrative match
pub static YEAR_RANGE_PAREN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(\d{4}\-\d{4}\)").expect("valid regex"));

/// Bracket content that is nothing but a year range
pub static YEAR_RANGE_ONLY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}\-\d{4}$").expect("valid regex"));

pub static NARRATIVE_YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\((\d{4}|forthcoming)").expect("valid regex"));

pub static YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{4}|forthcoming)").expect("valid regex"));

/// Name-shaped tokens that are really years
pub static YEAR_LIKE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:\d{4}|forthcoming)").expect("valid regex"));

pub static LOCATOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(p+\.\s*\d+|pp\.\s*\d+-\d+|ch\.\s*\d+)").expect("valid regex")
});

/// One or more chained signal phrases at the start of bracket content
pub static PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^((?:see|e\.g\.|i\.e\.|cf\.)(?:\s+(?:see|e\.g\.|i\.e\.|cf\.))*)\s+")
        .expect("valid regex")
});

/// Text after the last semicolon in bracket content
pub static SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r";\s*([^;]*)$").expect("valid regex"));

pub static ACK_HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)##\s+.*acknowledg").expect("valid regex"));

pub static HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"##\s+").expect("valid regex"));

pub static BIB_BEGIN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\begin\{thebibliography\}").expect("valid regex"));

pub static BIB_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\end\{thebibliography\}").expect("valid regex"));

/// Split bracket content into author segments.
///
/// Splits on "and", "&", commas, and whitespace immediately preceding a capital letter.
/// The capital letter stays with the following segment.
pub fn split_author_segments(content: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut start = 0;

    for m in AUTHOR_SEPARATOR.find_iter(content) {
        segments.push(&content[start..m.start()]);
        start = if m.as_str().ends_with(|c: char| c.is_ascii_uppercase()) {
            m.end() - 1
        } else {
            m.end()
        };
    }
    segments.push(&content[start..]);
    segments
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_keeps_capital_with_next_segment() {
        let parts = split_author_segments("Suri 2011; Conley and Udry 2010");
        assert_eq!(parts, vec!["Suri 2011;", "Conley", "Udry 2010"]);
    }

    #[test]
    fn test_split_on_commas_and_ampersand() {
        let parts = split_author_segments("Duflo, Kremer & Robinson 2011");
        assert_eq!(parts, vec!["Duflo", "Kremer", "Robinson 2011"]);
    }

    #[test]
    fn test_split_without_separators() {
        assert_eq!(split_author_segments("2011"), vec!["2011"]);
    }

    #[test]
    fn test_prefix_chains_signal_phrases() {
        let caps = PREFIX.captures("see e.g. Suri 2011").unwrap();
        assert_eq!(&caps[1], "see e.g.");
        let caps = PREFIX.captures("Cf. Suri 2011").unwrap();
        assert_eq!(&caps[1], "Cf.");
        assert!(PREFIX.captures("Seemingly Suri 2011").is_none());
    }

    #[test]
    fn test_narrative_pattern_spans() {
        let m = NARRATIVE.find("Conley and Udry (2010) show").unwrap();
        assert_eq!(m.as_str(), "Conley and Udry (2010)");
        assert!(NARRATIVE.find("results (Suri 2011).").is_none());
    }

    #[test]
    fn test_parenthetical_pattern_needs_a_name() {
        assert!(PARENTHETICAL.find("The period (2011) mattered").is_none());
        let m = PARENTHETICAL.find("shown (Suri 2011, p. 45) here").unwrap();
        assert_eq!(m.as_str(), "(Suri 2011, p. 45)");
    }
}
