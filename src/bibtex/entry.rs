//! Appending entries to a `.bib` file.

use super::BibError;
use regex::Regex;
use std::io::Write;
use std::path::Path;
use std::sync::LazyLock;

static ENTRY_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@\w+\{(\w+)").expect("valid entry key regex"));

/// All citation keys declared in BibTeX source text
pub fn existing_keys(content: &str) -> Vec<String> {
    ENTRY_KEY
        .captures_iter(content)
        .map(|c| c[1].to_string())
        .collect()
}

/// Append a BibTeX entry to an existing `.bib` file.
///
/// The entry is separated from the previous content by a blank line. Fails without
/// touching the file when the entry's key is already declared.
pub fn add_entry(bib_path: impl AsRef<Path>, entry: &str) -> Result<String, BibError> {
    let bib_path = bib_path.as_ref();
    if !bib_path.exists() {
        return Err(BibError::FileNotFound(bib_path.to_path_buf()));
    }

    let new_key = ENTRY_KEY
        .captures(entry)
        .map(|c| c[1].to_string())
        .ok_or_else(|| BibError::Parse("Invalid BibTeX entry format".to_string()))?;

    let content = std::fs::read_to_string(bib_path)?;
    if existing_keys(&content).contains(&new_key) {
        return Err(BibError::DuplicateKey(new_key));
    }

    let mut file = std::fs::OpenOptions::new().append(true).open(bib_path)?;
    if !content.is_empty() && !content.ends_with('\n') {
        file.write_all(b"\n")?;
    }
    write!(file, "\n{}\n", entry)?;

    tracing::info!("Added entry {} to {}", new_key, bib_path.display());
    Ok(format!("Added entry with key: {}", new_key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const EXISTING: &str = "@article{suri2011selection,\n  author = {Suri, Tavneet},\n  year = {2011},\n}";
    const NEW: &str = "@article{conley2010learning,\n  author = {Conley, Timothy},\n  year = {2010},\n}";

    #[test]
    fn test_add_entry_appends() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("refs.bib");
        std::fs::write(&path, EXISTING).unwrap();

        let message = add_entry(&path, NEW).unwrap();
        assert_eq!(message, "Added entry with key: conley2010learning");

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, format!("{}\n\n{}\n", EXISTING, NEW));
        assert_eq!(existing_keys(&content), vec!["suri2011selection", "conley2010learning"]);
    }

    #[test]
    fn test_add_entry_rejects_duplicate() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("refs.bib");
        std::fs::write(&path, EXISTING).unwrap();

        let err = add_entry(&path, EXISTING).unwrap_err();
        assert!(matches!(err, BibError::DuplicateKey(ref k) if k == "suri2011selection"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), EXISTING);
    }

    #[test]
    fn test_add_entry_invalid_entry() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("refs.bib");
        std::fs::write(&path, "").unwrap();
        assert!(matches!(add_entry(&path, "garbage"), Err(BibError::Parse(_))));
    }

    #[test]
    fn test_add_entry_missing_file() {
        let err = add_entry("/nonexistent/refs.bib", NEW).unwrap_err();
        assert!(matches!(err, BibError::FileNotFound(_)));
    }
}
