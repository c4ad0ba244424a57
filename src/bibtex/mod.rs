//! BibTeX bibliography operations.
//!
//! - [`parse_bib`] builds an author-year index over a `.bib` file
//! - [`rekey_entry`] rewrites an entry key to a project convention
//! - [`add_entry`] appends an entry to a `.bib` file
//! - [`suggest_replacement`] turns a bare citation into a citation command
//! - [`clean_bib`] normalises a bibliography for journal submission

mod entry;
mod index;
mod janitor;
mod rekey;
mod replacement;

pub use entry::{add_entry, existing_keys};
pub use index::parse_bib;
pub use janitor::{
    apply_title_case, clean_bib, clean_record, ensure_nber_format, handle_url_doi, load_records,
    prune_fields, standardize_journal_name, validate_record, write_bib, write_cleaned, CleanReport,
};
pub use rekey::{generate_key, normalize_name, rekey_entry, remove_accents, KeyConvention};
pub use replacement::suggest_replacement;

use biblatex::{Bibliography, Chunk, Entry, Spanned};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur in bibliography operations
#[derive(Debug, Error)]
pub enum BibError {
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("{0}")]
    Parse(String),

    #[error("Key already exists: {0}")]
    DuplicateKey(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BibError {
    /// Error code used in tagged tool results
    pub fn code(&self) -> &'static str {
        match self {
            BibError::FileNotFound(_) => "file_not_found",
            BibError::Parse(_) => "parse_error",
            BibError::DuplicateKey(_) | BibError::Io(_) => "bibtex_error",
        }
    }
}

/// Fields whose whole value is kept verbatim by the parser
const VERBATIM_FIELDS: &[&str] = &["url", "doi", "file", "eprint", "pdf", "urlraw", "uri"];

/// Read and parse a `.bib` file
pub(crate) fn read_bibliography(path: &Path) -> Result<Bibliography, BibError> {
    if !path.exists() {
        return Err(BibError::FileNotFound(path.to_path_buf()));
    }
    let content = std::fs::read_to_string(path)?;
    Bibliography::parse(&content)
        .map_err(|e| BibError::Parse(format!("Error parsing {}: {}", path.display(), e)))
}

/// All fields of an entry rendered back to BibTeX source text (without outer braces)
pub(crate) fn entry_fields(entry: &Entry) -> BTreeMap<String, String> {
    entry
        .fields
        .iter()
        .map(|(name, chunks)| (name.to_lowercase(), field_text(name, chunks)))
        .collect()
}

/// Render a parsed field value as BibTeX source.
///
/// Braced groups are restored so that case protection survives a round trip.
pub(crate) fn field_text(name: &str, chunks: &[Spanned<Chunk>]) -> String {
    let verbatim_field = VERBATIM_FIELDS.contains(&name.to_lowercase().as_str());
    chunks
        .iter()
        .map(|chunk| match &chunk.v {
            Chunk::Normal(s) if verbatim_field => s.clone(),
            Chunk::Normal(s) => escape_special(s),
            Chunk::Verbatim(s) if verbatim_field => s.clone(),
            Chunk::Verbatim(s) => format!("{{{}}}", s),
            Chunk::Math(s) => format!("${}$", s),
        })
        .collect()
}

fn escape_special(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '&' | '%' | '#') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(BibError::FileNotFound(PathBuf::from("x.bib")).code(), "file_not_found");
        assert_eq!(BibError::Parse("bad".into()).code(), "parse_error");
        assert_eq!(BibError::DuplicateKey("k".into()).code(), "bibtex_error");
    }

    #[test]
    fn test_duplicate_key_message() {
        let err = BibError::DuplicateKey("suri2011".to_string());
        assert_eq!(err.to_string(), "Key already exists: suri2011");
    }

    #[test]
    fn test_field_text_restores_braces() {
        let bib = Bibliography::parse(
            "@article{k,\n  title = {Testing {GDP} growth},\n  url = {https://example.com/a_b},\n}",
        )
        .unwrap();
        let entry = bib.iter().next().unwrap();
        let fields = entry_fields(entry);
        assert_eq!(fields["title"], "Testing {GDP} growth");
        assert_eq!(fields["url"], "https://example.com/a_b");
    }

    #[test]
    fn test_escape_special() {
        assert_eq!(escape_special("R&D"), "R\\&D");
    }
}
