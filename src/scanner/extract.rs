//! Component extraction: turns one matched span into a structured [`Citation`].
//!
//! Extraction is total. Anything that cannot be determined is left empty.

use super::patterns::{
    split_author_segments, ET_AL, LOCATOR, NAME_TOKEN, NARRATIVE_YEAR, PREFIX, SUFFIX, YEAR,
    YEAR_LIKE,
};
use crate::models::{Citation, CitationType};

/// Tokens that are never author names, compared lowercased
const AUTHOR_STOP_TOKENS: [&str; 4] = ["et", "al", "and", "&"];

/// Extract the structured fields of a matched citation span.
///
/// The returned citation is positioned at line 1, column 0; the scanner overwrites the
/// position with the real one.
pub fn extract_components(text: &str, citation_type: CitationType) -> Citation {
    match citation_type {
        CitationType::Narrative => extract_narrative(text),
        CitationType::Parenthetical => extract_parenthetical(text),
    }
}

impl Citation {
    /// Classify a bare citation string and extract its components.
    ///
    /// Text opening with `(` or `[` is parenthetical, anything else is narrative.
    pub fn from_text(text: &str) -> Self {
        let trimmed = text.trim();
        let citation_type = if trimmed.starts_with('(') || trimmed.starts_with('[') {
            CitationType::Parenthetical
        } else {
            CitationType::Narrative
        };
        extract_components(trimmed, citation_type)
    }
}

fn extract_narrative(text: &str) -> Citation {
    let mut citation = Citation::new(text, CitationType::Narrative);

    let author_text = match text.find('(') {
        Some(idx) => text[..idx].trim(),
        None => text.trim(),
    };

    for m in NAME_TOKEN.find_iter(author_text) {
        let mut candidate = m.as_str().trim();
        if let Some(stripped) = candidate.strip_suffix(" and") {
            candidate = stripped.trim();
        }
        if is_stop_token(candidate) {
            continue;
        }
        push_unique(&mut citation.authors, candidate);
    }

    if let Some(caps) = NARRATIVE_YEAR.captures(text) {
        citation.year = caps[1].to_string();
    }

    citation.is_possessive = text.contains("'s");
    set_locator(&mut citation, text);
    citation
}

fn extract_parenthetical(text: &str) -> Citation {
    let mut citation = Citation::new(text, CitationType::Parenthetical);
    let content = strip_brackets(text);

    if let Some(caps) = PREFIX.captures(content) {
        citation.prefix = caps[1].to_string();
    }

    let without_et_al = ET_AL.replace_all(content, "");
    for segment in split_author_segments(&without_et_al) {
        // Only the first usable name of each segment is taken
        for m in NAME_TOKEN.find_iter(segment.trim()) {
            let candidate = m.as_str().trim();
            if YEAR_LIKE.is_match(candidate) || is_stop_token(candidate) {
                continue;
            }
            if push_unique(&mut citation.authors, candidate) {
                break;
            }
        }
    }

    if let Some(caps) = YEAR.captures(content) {
        citation.year = caps[1].to_string();
    }

    if let Some(caps) = SUFFIX.captures(content) {
        citation.suffix = caps[1].trim().to_string();
    }

    set_locator(&mut citation, content);
    citation
}

/// Content between the outer bracket characters
pub(crate) fn strip_brackets(text: &str) -> &str {
    let mut chars = text.chars();
    chars.next();
    chars.next_back();
    chars.as_str()
}

fn set_locator(citation: &mut Citation, haystack: &str) {
    if let Some(m) = LOCATOR.find(haystack) {
        citation.locator = m.as_str().to_string();
        citation.has_locator = true;
    }
}

fn is_stop_token(candidate: &str) -> bool {
    AUTHOR_STOP_TOKENS.contains(&candidate.to_lowercase().as_str())
}

fn push_unique(authors: &mut Vec<String>, candidate: &str) -> bool {
    if authors.iter().any(|a| a == candidate) {
        return false;
    }
    authors.push(candidate.to_string());
    true
}
