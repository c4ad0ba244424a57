//! Bare citation model produced by the manuscript scanner.

use serde::{Deserialize, Serialize};

/// Which pattern family produced a citation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CitationType {
    /// `Smith (2020) argues ...`
    Narrative,
    /// `... as shown (Smith 2020).`
    Parenthetical,
}

impl CitationType {
    /// Returns the identifier used in tool output
    pub fn as_str(&self) -> &'static str {
        match self {
            CitationType::Narrative => "narrative",
            CitationType::Parenthetical => "parenthetical",
        }
    }
}

impl std::fmt::Display for CitationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A bare (unformatted) citation detected in a manuscript
///
/// Every field is always present; anything the extractor could not determine is left
/// empty (`""`, `[]` or `false`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    /// Exact matched substring
    pub text: String,

    /// 1-based line number in the source document
    pub line: usize,

    /// 0-based character offset of the match within the line
    pub column: usize,

    /// Author last names in first-seen order, without duplicates
    pub authors: Vec<String>,

    /// Four-digit year, `forthcoming`, or empty
    pub year: String,

    /// Pattern family that produced the match
    pub citation_type: CitationType,

    /// Whether a page/chapter locator was found
    pub has_locator: bool,

    /// Locator text such as `p. 45`
    pub locator: String,

    /// Leading signal phrase (parenthetical only)
    pub prefix: String,

    /// Trailing annotation after the last semicolon (parenthetical only)
    pub suffix: String,

    /// Whether the citation uses an `'s` possessive (narrative only)
    pub is_possessive: bool,
}

impl Citation {
    /// Create an empty citation of the given type at a position
    pub fn new(text: impl Into<String>, citation_type: CitationType) -> Self {
        Self {
            text: text.into(),
            line: 1,
            column: 0,
            authors: Vec::new(),
            year: String::new(),
            citation_type,
            has_locator: false,
            locator: String::new(),
            prefix: String::new(),
            suffix: String::new(),
            is_possessive: false,
        }
    }

    /// Set the position of the citation in its document
    pub fn at(mut self, line: usize, column: usize) -> Self {
        self.line = line;
        self.column = column;
        self
    }

    /// Whether this is a narrative citation
    pub fn is_narrative(&self) -> bool {
        self.citation_type == CitationType::Narrative
    }

    /// First author, if any was extracted
    pub fn first_author(&self) -> Option<&str> {
        self.authors.first().map(|s| s.as_str())
    }
}
