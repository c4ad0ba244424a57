//! Author-year index over a `.bib` file.

use super::{entry_fields, read_bibliography, BibError};
use crate::models::{BibIndex, BibIndexEntry};
use std::path::Path;

/// Parse a `.bib` file into an index keyed by `"<FirstAuthor>-<year>"`.
///
/// Entries without authors are filed under `"unknown-<year>"`. Several entries may share
/// one index key (e.g. two 2011 papers by the same first author).
pub fn parse_bib(path: impl AsRef<Path>) -> Result<BibIndex, BibError> {
    let path = path.as_ref();
    let bibliography = read_bibliography(path)?;
    let mut index = BibIndex::new();

    for entry in bibliography.iter() {
        let authors: Vec<String> = entry
            .author()
            .map(|people| {
                people
                    .iter()
                    .filter_map(|p| p.name.split_whitespace().next().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();

        let fields = entry_fields(entry);
        let year = fields.get("year").cloned().unwrap_or_default();
        let title = fields.get("title").cloned().unwrap_or_default();

        let index_key = format!(
            "{}-{}",
            authors.first().map(String::as_str).unwrap_or("unknown"),
            year
        );

        index.entry(index_key).or_default().push(BibIndexEntry {
            key: entry.key.clone(),
            entry_type: entry.entry_type.to_string().to_lowercase(),
            authors,
            year,
            title,
            fields,
        });
    }

    tracing::debug!(
        "Indexed {} entries from {} under {} author-year keys",
        bibliography.len(),
        path.display(),
        index.len()
    );
    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SAMPLE: &str = r#"
@article{suri2011selection,
  author = {Suri, Tavneet},
  title = {Selection and Comparative Advantage in Technology Adoption},
  journal = {Econometrica},
  year = {2011},
}

@article{conley2010learning,
  author = {Conley, Timothy G. and Udry, Christopher R.},
  title = {Learning about a New Technology},
  journal = {American Economic Review},
  year = {2010},
}

@techreport{anon2020,
  title = {An Untitled Report},
  institution = {Somewhere},
  year = {2020},
}
"#;

    fn bib_file(content: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".bib").tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_index_by_author_year() {
        let file = bib_file(SAMPLE);
        let index = parse_bib(file.path()).unwrap();

        let suri = &index["Suri-2011"];
        assert_eq!(suri.len(), 1);
        assert_eq!(suri[0].key, "suri2011selection");
        assert_eq!(suri[0].entry_type, "article");
        assert_eq!(suri[0].year, "2011");
        assert_eq!(suri[0].fields["journal"], "Econometrica");

        let conley = &index["Conley-2010"];
        assert_eq!(conley[0].authors, vec!["Conley", "Udry"]);
    }

    #[test]
    fn test_entries_without_authors() {
        let file = bib_file(SAMPLE);
        let index = parse_bib(file.path()).unwrap();
        assert!(index.contains_key("unknown-2020"));
    }

    #[test]
    fn test_shared_author_year() {
        let file = bib_file(
            "@article{a, author = {Suri, T.}, title = {One}, year = {2011}}\n\
             @article{b, author = {Suri, T.}, title = {Two}, year = {2011}}\n",
        );
        let index = parse_bib(file.path()).unwrap();
        assert_eq!(index["Suri-2011"].len(), 2);
    }

    #[test]
    fn test_missing_file() {
        let err = parse_bib("/nonexistent/refs.bib").unwrap_err();
        assert!(matches!(err, BibError::FileNotFound(_)));
    }
}
