//! Bare citation scanner.
//!
//! Finds free-text author-year citations in Quarto/Markdown and LaTeX manuscripts that
//! were written without the document system's citation markup, so that they can be
//! replaced with proper `@key` / `\cite{key}` references.
//!
//! Scanning is line based:
//!
//! 1. [`SectionTracker`] skips acknowledgments sections and `thebibliography` blocks.
//! 2. Lines that already contain `@` or `\cite` are skipped entirely.
//! 3. The narrative pattern runs over the line, then the parenthetical pattern.
//! 4. Each match is decomposed by [`extract_components`].
//!
//! The patterns are deliberately permissive approximations. Matches from the two
//! families are not deduplicated against each other.

mod extract;
mod patterns;
mod sections;

pub use extract::extract_components;
pub use sections::{has_citation_markup, LineClass, SectionTracker};

use crate::models::{Citation, CitationType};
use patterns::{NARRATIVE, PARENTHETICAL, YEAR_RANGE_ONLY, YEAR_RANGE_PAREN};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while scanning a document
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Error scanning {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ScanError {
    /// Error code used in tagged tool results
    pub fn code(&self) -> &'static str {
        match self {
            ScanError::NotFound(_) => "file_not_found",
            ScanError::Io { .. } => "scan_error",
        }
    }
}

/// Scan a manuscript file for bare citations.
///
/// Returns every detected citation in line order. A missing file yields
/// [`ScanError::NotFound`]; on any failure no partial result is returned.
pub fn scan_bare_citations(path: impl AsRef<Path>) -> Result<Vec<Citation>, ScanError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(ScanError::NotFound(path.to_path_buf()));
    }

    let content = std::fs::read_to_string(path).map_err(|source| ScanError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let citations = scan_document(&content);
    tracing::info!(
        "Scanned {}: {} bare citation(s)",
        path.display(),
        citations.len()
    );
    Ok(citations)
}

/// Scan document text for bare citations.
///
/// Pure function of its input: scanning the same text twice yields the same result.
pub fn scan_document(content: &str) -> Vec<Citation> {
    let mut tracker = SectionTracker::new();
    let mut citations = Vec::new();

    for (idx, line) in content.lines().enumerate() {
        let line_num = idx + 1;

        match tracker.classify(line) {
            LineClass::Scannable => {}
            LineClass::Marker | LineClass::Protected => {
                tracing::debug!("Skipping protected line {}", line_num);
                continue;
            }
        }

        if has_citation_markup(line) {
            tracing::debug!("Skipping line {} with existing citation markup", line_num);
            continue;
        }

        scan_line(line, line_num, &mut citations);
    }

    tracing::debug!("Found {} bare citation(s)", citations.len());
    citations
}

fn scan_line(line: &str, line_num: usize, citations: &mut Vec<Citation>) {
    for m in NARRATIVE.find_iter(line) {
        let text = m.as_str();
        if YEAR_RANGE_PAREN.is_match(text) {
            continue;
        }
        let column = char_column(line, m.start());
        citations.push(extract_components(text, CitationType::Narrative).at(line_num, column));
    }

    for m in PARENTHETICAL.find_iter(line) {
        let text = m.as_str();
        if YEAR_RANGE_ONLY.is_match(extract::strip_brackets(text).trim()) {
            continue;
        }
        let column = char_column(line, m.start());
        citations.push(extract_components(text, CitationType::Parenthetical).at(line_num, column));
    }
}

/// Character offset of a byte index within a line
fn char_column(line: &str, byte_idx: usize) -> usize {
    line[..byte_idx].chars().count()
}
