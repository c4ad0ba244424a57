//! Bibliography models: indexed entries, editable records, and replacement suggestions.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A bibliography entry as returned by the author-year index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BibIndexEntry {
    /// Citation key
    pub key: String,

    /// Entry type, lowercase (`article`, `techreport`, ...)
    #[serde(rename = "type")]
    pub entry_type: String,

    /// Author last names in order
    pub authors: Vec<String>,

    /// Publication year as written in the file
    pub year: String,

    /// Title as written in the file
    pub title: String,

    /// All fields of the entry
    pub fields: BTreeMap<String, String>,
}

/// Entries grouped under `"<FirstAuthor>-<year>"`
pub type BibIndex = BTreeMap<String, Vec<BibIndexEntry>>;

/// A mutable BibTeX record used when normalising a bibliography
///
/// Fields are kept in a sorted map, which is also the order they are written back in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BibRecord {
    pub key: String,
    pub entry_type: String,
    pub fields: BTreeMap<String, String>,
}

impl BibRecord {
    /// Create a record with no fields
    pub fn new(key: impl Into<String>, entry_type: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            entry_type: entry_type.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Builder-style field setter
    pub fn field(mut self, name: &str, value: impl Into<String>) -> Self {
        self.set(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(|s| s.as_str())
    }

    pub fn has(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        self.fields.insert(name.to_lowercase(), value.into());
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.fields.remove(name)
    }
}

/// Target citation dialect for replacement suggestions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// Quarto / Pandoc markdown (`@key`, `[@key]`)
    Quarto,
    /// LaTeX with natbib (`\citet`, `\citep`)
    Natbib,
    /// LaTeX with biblatex (`\textcite`, `\parencite`)
    Biblatex,
}

impl Dialect {
    /// Resolve a dialect from a document type (`qmd` / `tex`) and the natbib flag
    pub fn from_doc_type(doc_type: &str, natbib: bool) -> Self {
        match doc_type.trim().to_lowercase().as_str() {
            "qmd" | "md" | "quarto" | "markdown" => Dialect::Quarto,
            _ if natbib => Dialect::Natbib,
            _ => Dialect::Biblatex,
        }
    }
}

/// A suggested citation-command replacement for a bare citation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Replacement {
    /// The bare citation text as detected
    pub original: String,

    /// The properly formatted citation command
    pub replacement: String,

    /// Caveats for the author (empty when none)
    pub notes: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_field_names_are_lowercased() {
        let record = BibRecord::new("test2023", "article").field("Journal", "JPE");
        assert_eq!(record.get("journal"), Some("JPE"));
        assert!(record.has("journal"));
        assert!(!record.has("Journal"));
    }

    #[test]
    fn test_dialect_from_doc_type() {
        assert_eq!(Dialect::from_doc_type("qmd", true), Dialect::Quarto);
        assert_eq!(Dialect::from_doc_type("tex", true), Dialect::Natbib);
        assert_eq!(Dialect::from_doc_type("tex", false), Dialect::Biblatex);
    }

    #[test]
    fn test_index_entry_serializes_type_field() {
        let entry = BibIndexEntry {
            key: "suri2011selection".to_string(),
            entry_type: "article".to_string(),
            authors: vec!["Suri".to_string()],
            year: "2011".to_string(),
            title: "Selection".to_string(),
            fields: BTreeMap::new(),
        };
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["type"], "article");
    }
}
