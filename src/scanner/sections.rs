//! Line classification for regions that must never be scanned.

use super::patterns::{ACK_HEADING, BIB_BEGIN, BIB_END, HEADING};

/// How a single line should be treated by the scanner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineClass {
    /// Scan the line for citations
    Scannable,
    /// A section marker line; never scanned
    Marker,
    /// Inside an acknowledgments section or a bibliography block
    Protected,
}

/// Two-flag state machine over the lines of one document.
///
/// The acknowledgments region starts at a `## ...acknowledg...` heading (case-insensitive)
/// and ends at the next `## ` heading, which is itself scanned. The bibliography region is
/// delimited by `\begin{thebibliography}` and `\end{thebibliography}`, both skipped.
/// An unclosed region protects every remaining line.
#[derive(Debug, Default)]
pub struct SectionTracker {
    in_acknowledgments: bool,
    in_bibliography: bool,
}

impl SectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance the tracker by one line and classify it
    pub fn classify(&mut self, line: &str) -> LineClass {
        if ACK_HEADING.is_match(line) {
            self.in_acknowledgments = true;
            return LineClass::Marker;
        }

        if self.in_acknowledgments && HEADING.is_match(line) {
            self.in_acknowledgments = false;
        }

        if BIB_BEGIN.is_match(line) {
            self.in_bibliography = true;
            return LineClass::Marker;
        }

        if BIB_END.is_match(line) {
            self.in_bibliography = false;
            return LineClass::Marker;
        }

        if self.in_acknowledgments || self.in_bibliography {
            LineClass::Protected
        } else {
            LineClass::Scannable
        }
    }
}

/// Whether a line already carries citation markup (`@key` or a `\cite...` command)
pub fn has_citation_markup(line: &str) -> bool {
    line.contains('@') || line.contains("\\cite")
}
