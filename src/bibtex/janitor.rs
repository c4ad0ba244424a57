//! Bibliography clean-up for journal submission.
//!
//! Each entry goes through, in order: NBER working-paper detection, journal name
//! standardisation, title casing, junk-field pruning, URL handling and finally
//! validation. Validation only produces warnings.

use super::{entry_fields, read_bibliography, BibError};
use crate::models::BibRecord;
use regex::Regex;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// Acronyms kept upper-case with brace protection
const ACRONYMS: &[&str] = &[
    "gdp", "gnp", "cpi", "ppi", "var", "arma", "arima", "garch", "dsge", "iv", "ols", "gls",
    "gmm", "ml", "mle", "mcmc", "usa", "uk", "eu", "oecd", "imf", "fed", "ecb", "nber", "cepr",
    "iza", "covid", "aids", "nato",
];

/// Proper names and adjectives that keep their capital letter
const PROPER_NAMES: &[&str] = &[
    "keynesian", "bayesian", "ricardian", "malthusian", "smithian", "walrasian", "marshallian",
    "fisherian", "friedman", "samuelson", "gaussian", "poisson", "bernoulli", "markov",
];

/// Words lower-cased in titles unless they come first
const SMALL_WORDS: &[&str] = &[
    "a", "an", "the", "and", "but", "or", "for", "nor", "on", "at", "to", "from", "by", "of",
    "in",
];

/// Fields journals do not want in a submitted bibliography
const JUNK_FIELDS: &[&str] = &[
    "abstract",
    "keywords",
    "issn",
    "file",
    "mendeley-groups",
    "mendeley-tags",
    "annotation",
    "note",
];

/// Lower-cased journal spellings and their formal names
const JOURNAL_MAPPINGS: &[(&str, &str)] = &[
    ("jpe", "Journal of Political Economy"),
    ("j pol econ", "Journal of Political Economy"),
    ("j. pol. econ.", "Journal of Political Economy"),
    ("journal of pol. econ.", "Journal of Political Economy"),
    ("journal of political economy", "Journal of Political Economy"),
    ("qje", "Quarterly Journal of Economics"),
    ("q j econ", "Quarterly Journal of Economics"),
    ("quarterly journal of economics", "Quarterly Journal of Economics"),
    ("aer", "American Economic Review"),
    ("amer econ rev", "American Economic Review"),
    ("american economic review", "American Economic Review"),
    ("econometrica", "Econometrica"),
    ("restat", "Review of Economics and Statistics"),
    ("rev econ stat", "Review of Economics and Statistics"),
    ("review of economics and statistics", "Review of Economics and Statistics"),
    ("jeea", "Journal of the European Economic Association"),
    (
        "journal of the european economic association",
        "Journal of the European Economic Association",
    ),
    ("jel", "Journal of Economic Literature"),
    ("journal of economic literature", "Journal of Economic Literature"),
    ("restud", "Review of Economic Studies"),
    ("rev econ stud", "Review of Economic Studies"),
    ("review of economic studies", "Review of Economic Studies"),
    ("jf", "Journal of Finance"),
    ("j finance", "Journal of Finance"),
    ("journal of finance", "Journal of Finance"),
    ("jfe", "Journal of Financial Economics"),
    ("journal of financial economics", "Journal of Financial Economics"),
];

const NBER_INSTITUTION: &str = "National Bureau of Economic Research";

static BRACED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{[^}]+\}").expect("valid braced-group regex"));
static NBER_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[/w](\d{4,5})").expect("valid NBER number regex"));

const PLACEHOLDER_PREFIX: &str = "__BRACED_";

/// Result of cleaning a bibliography
#[derive(Debug, Clone, Serialize)]
pub struct CleanReport {
    /// Cleaned BibTeX source
    pub output: String,
    /// Number of entries processed
    pub entries: usize,
    /// Validation warnings, one per problem
    pub warnings: Vec<String>,
}

/// Load every entry of a `.bib` file as an editable record
pub fn load_records(path: impl AsRef<Path>) -> Result<Vec<BibRecord>, BibError> {
    let bibliography = read_bibliography(path.as_ref())?;
    Ok(bibliography
        .iter()
        .map(|entry| BibRecord {
            key: entry.key.clone(),
            entry_type: entry.entry_type.to_string().to_lowercase(),
            fields: entry_fields(entry),
        })
        .collect())
}

/// Clean a `.bib` file and return the normalised source with any warnings.
///
/// The file itself is not modified.
pub fn clean_bib(path: impl AsRef<Path>) -> Result<CleanReport, BibError> {
    let path = path.as_ref();
    let mut records = load_records(path)?;

    let mut warnings = Vec::new();
    for record in records.iter_mut() {
        warnings.extend(clean_record(record));
    }

    tracing::info!(
        "Cleaned {} entries from {} ({} warnings)",
        records.len(),
        path.display(),
        warnings.len()
    );

    Ok(CleanReport {
        output: write_bib(&records),
        entries: records.len(),
        warnings,
    })
}

/// Replace a `.bib` file with cleaned output, keeping the original as `<file>.bib.backup`.
///
/// Returns the backup path.
pub fn write_cleaned(path: impl AsRef<Path>, report: &CleanReport) -> Result<PathBuf, BibError> {
    let path = path.as_ref();
    let backup = path.with_extension("bib.backup");
    std::fs::copy(path, &backup)?;
    std::fs::write(path, &report.output)?;
    tracing::info!("Wrote {} (backup at {})", path.display(), backup.display());
    Ok(backup)
}

/// Apply every cleaning step to one record and return its validation warnings
pub fn clean_record(record: &mut BibRecord) -> Vec<String> {
    ensure_nber_format(record);
    standardize_journal_name(record);
    if let Some(title) = record.get("title") {
        let cased = apply_title_case(title);
        record.set("title", cased);
    }
    prune_fields(record);
    handle_url_doi(record);
    validate_record(record)
}

/// Turn NBER working papers into `techreport` entries
pub fn ensure_nber_format(record: &mut BibRecord) {
    let url = record.get("url").unwrap_or_default().to_string();
    let journal = record.get("journal").unwrap_or_default().to_lowercase();
    let institution = record.get("institution").unwrap_or_default().to_lowercase();

    let is_nber = url.to_lowercase().contains("nber.org")
        || journal.contains("nber")
        || institution.contains("nber")
        || institution.contains("national bureau");
    if !is_nber {
        return;
    }

    record.entry_type = "techreport".to_string();
    record.set("institution", NBER_INSTITUTION);
    record.set("type", "Working Paper");
    record.remove("journal");

    if !record.has("number") && !url.is_empty() {
        if let Some(caps) = NBER_NUMBER.captures(&url) {
            record.set("number", &caps[1]);
        }
    }
}

/// Replace abbreviated journal names with their formal names
pub fn standardize_journal_name(record: &mut BibRecord) {
    let Some(journal) = record.get("journal") else {
        return;
    };
    let lower = journal.trim().to_lowercase();
    if let Some((_, full)) = JOURNAL_MAPPINGS.iter().find(|(abbr, _)| *abbr == lower) {
        record.set("journal", *full);
    }
}

/// Title-case a title, protecting acronyms and proper names with braces.
///
/// Existing braced groups are left exactly as written.
pub fn apply_title_case(title: &str) -> String {
    let mut protected = Vec::new();
    let masked = BRACED.replace_all(title, |caps: &regex::Captures| {
        let placeholder = format!("{}{}__", PLACEHOLDER_PREFIX, protected.len());
        protected.push(caps[0].to_string());
        placeholder
    });

    let words: Vec<String> = masked
        .split_whitespace()
        .enumerate()
        .map(|(i, word)| case_word(i, word))
        .collect();

    let mut result = words.join(" ");
    for (i, group) in protected.iter().enumerate() {
        result = result.replace(&format!("{}{}__", PLACEHOLDER_PREFIX, i), group);
    }
    result
}

fn case_word(position: usize, word: &str) -> String {
    if word.starts_with(PLACEHOLDER_PREFIX) {
        return word.to_string();
    }

    let word_clean: String = word
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_')
        .collect();
    let clean_lower = word_clean.to_lowercase();

    let all_alpha = !word_clean.is_empty() && word_clean.chars().all(char::is_alphabetic);
    if all_alpha
        && word_clean.chars().count() >= 2
        && word_clean.to_uppercase() == word_clean
        && ACRONYMS.contains(&clean_lower.as_str())
    {
        return word.replace(&word_clean, &format!("{{{}}}", word_clean));
    }

    if !word_clean.is_empty() && PROPER_NAMES.contains(&clean_lower.as_str()) {
        return word.replace(&word_clean, &format!("{{{}}}", capitalize(&word_clean)));
    }

    if position > 0 && SMALL_WORDS.contains(&word.to_lowercase().as_str()) {
        word.to_lowercase()
    } else {
        capitalize(word)
    }
}

/// Upper-case the first character and lower-case the rest
fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

/// Remove fields journals do not want
pub fn prune_fields(record: &mut BibRecord) {
    for field in JUNK_FIELDS {
        record.remove(field);
    }
}

/// Drop `url`/`urldate` from articles; reports and unpublished work keep them
pub fn handle_url_doi(record: &mut BibRecord) {
    if record.entry_type.eq_ignore_ascii_case("article") {
        record.remove("url");
        record.remove("urldate");
    }
}

/// Check required fields and return one warning per missing field
pub fn validate_record(record: &BibRecord) -> Vec<String> {
    let id = if record.key.is_empty() {
        "unknown"
    } else {
        record.key.as_str()
    };
    let entry_type = record.entry_type.to_lowercase();
    let mut warnings = Vec::new();

    if !record.has("author") && !record.has("editor") {
        warnings.push(format!("[{}] Missing required field: author or editor", id));
    }
    if !record.has("year") {
        warnings.push(format!("[{}] Missing required field: year", id));
    }
    if !record.has("title") {
        warnings.push(format!("[{}] Missing required field: title", id));
    }

    match entry_type.as_str() {
        "article" if !record.has("journal") => {
            warnings.push(format!("[{}] Article missing required field: journal", id));
        }
        "techreport" if !record.has("institution") => {
            warnings.push(format!(
                "[{}] Techreport missing required field: institution",
                id
            ));
        }
        "book" if !record.has("publisher") => {
            warnings.push(format!("[{}] Book missing required field: publisher", id));
        }
        "inproceedings" | "incollection" if !record.has("booktitle") => {
            warnings.push(format!(
                "[{}] {} missing required field: booktitle",
                id, entry_type
            ));
        }
        _ => {}
    }

    warnings
}

/// Render records as BibTeX, fields sorted by name and indented two spaces
pub fn write_bib(records: &[BibRecord]) -> String {
    let mut out = String::new();
    for record in records {
        out.push('@');
        out.push_str(&record.entry_type);
        out.push('{');
        out.push_str(&record.key);
        for (name, value) in &record.fields {
            out.push_str(&format!(",\n  {} = {{{}}}", name, value));
        }
        out.push_str("\n}\n\n");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn article() -> BibRecord {
        BibRecord::new("test2023", "article")
            .field("author", "Test, Author")
            .field("title", "Test Paper")
            .field("journal", "JPE")
            .field("year", "2023")
    }

    #[test]
    fn test_title_case() {
        assert_eq!(
            apply_title_case("the effect of GDP on keynesian models in USA"),
            "The Effect of {GDP} on {Keynesian} Models in {USA}"
        );
        assert_eq!(apply_title_case("testing {GDP} growth"), "Testing {GDP} Growth");
        assert_eq!(apply_title_case("the {McDonald}s effect"), "The {McDonald}s Effect");
        assert_eq!(
            apply_title_case("VAR models and DSGE estimation"),
            "{VAR} Models and {DSGE} Estimation"
        );
    }

    #[test]
    fn test_title_case_keeps_punctuation_on_acronyms() {
        assert_eq!(apply_title_case("growth in the USA."), "Growth in the {USA}.");
        assert_eq!(apply_title_case("markov chains"), "{Markov} Chains");
    }

    #[test]
    fn test_standardize_journal_names() {
        let cases = [
            ("JPE", "Journal of Political Economy"),
            ("j. pol. econ.", "Journal of Political Economy"),
            ("QJE", "Quarterly Journal of Economics"),
            ("amer econ rev", "American Economic Review"),
            ("econometrica", "Econometrica"),
        ];
        for (input, expected) in cases {
            let mut record = article().field("journal", input);
            standardize_journal_name(&mut record);
            assert_eq!(record.get("journal"), Some(expected));
        }

        let mut unknown = article().field("journal", "Journal of Obscure Studies");
        standardize_journal_name(&mut unknown);
        assert_eq!(unknown.get("journal"), Some("Journal of Obscure Studies"));
    }

    #[test]
    fn test_prune_fields() {
        let mut record = article()
            .field("abstract", "Long")
            .field("keywords", "a, b")
            .field("issn", "1234")
            .field("file", "paper.pdf")
            .field("mendeley-groups", "x");
        prune_fields(&mut record);
        for kept in ["author", "title", "journal", "year"] {
            assert!(record.has(kept));
        }
        for gone in ["abstract", "keywords", "issn", "file", "mendeley-groups"] {
            assert!(!record.has(gone));
        }
    }

    #[test]
    fn test_url_handling_by_type() {
        let mut record = article()
            .field("url", "https://example.com")
            .field("urldate", "2023-01-01")
            .field("doi", "10.1/x");
        handle_url_doi(&mut record);
        assert!(!record.has("url") && !record.has("urldate") && record.has("doi"));

        let mut report = BibRecord::new("r", "techreport")
            .field("url", "https://example.com")
            .field("urldate", "2023-01-01");
        handle_url_doi(&mut report);
        assert!(report.has("url") && report.has("urldate"));

        let mut unpublished = BibRecord::new("u", "unpublished").field("url", "https://x.org");
        handle_url_doi(&mut unpublished);
        assert!(unpublished.has("url"));
    }

    #[test]
    fn test_nber_from_journal() {
        let mut record = BibRecord::new("acemoglu2023", "article")
            .field("author", "Acemoglu, Daron")
            .field("title", "Test Paper")
            .field("journal", "NBER Working Paper")
            .field("year", "2023")
            .field("number", "12345");
        ensure_nber_format(&mut record);
        assert_eq!(record.entry_type, "techreport");
        assert_eq!(record.get("institution"), Some(NBER_INSTITUTION));
        assert_eq!(record.get("type"), Some("Working Paper"));
        assert!(!record.has("journal"));
    }

    #[test]
    fn test_nber_number_from_url() {
        let mut record = BibRecord::new("test2023", "unpublished")
            .field("title", "Test Paper")
            .field("url", "https://www.nber.org/papers/w12345");
        ensure_nber_format(&mut record);
        assert_eq!(record.entry_type, "techreport");
        assert_eq!(record.get("number"), Some("12345"));
    }

    #[test]
    fn test_nber_already_correct_is_unchanged() {
        let original = BibRecord::new("test2023", "techreport")
            .field("author", "Test, Author")
            .field("title", "Test Paper")
            .field("institution", NBER_INSTITUTION)
            .field("type", "Working Paper")
            .field("year", "2023")
            .field("number", "12345");
        let mut record = original.clone();
        ensure_nber_format(&mut record);
        assert_eq!(record, original);
    }

    #[test]
    fn test_validation() {
        assert!(validate_record(&article()).is_empty());

        let mut no_author = article();
        no_author.remove("author");
        let warnings = validate_record(&no_author);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("author"));

        let mut no_year = article();
        no_year.remove("year");
        let warnings = validate_record(&no_year);
        assert_eq!(warnings, vec!["[test2023] Missing required field: year"]);

        let report = BibRecord::new("r", "techreport")
            .field("author", "A")
            .field("title", "T")
            .field("year", "2020");
        let warnings = validate_record(&report);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("institution"));

        let chapter = BibRecord::new("c", "incollection")
            .field("editor", "E")
            .field("title", "T")
            .field("year", "2020");
        assert_eq!(
            validate_record(&chapter),
            vec!["[c] incollection missing required field: booktitle"]
        );
    }

    #[test]
    fn test_write_bib_format() {
        let record = BibRecord::new("k", "article")
            .field("year", "2020")
            .field("author", "A");
        assert_eq!(
            write_bib(&[record]),
            "@article{k,\n  author = {A},\n  year = {2020}\n}\n\n"
        );
    }

    #[test]
    fn test_clean_bib_file() {
        let mut file = tempfile::Builder::new().suffix(".bib").tempfile().unwrap();
        file.write_all(
            br#"
@article{test2023,
  author = {Test, Author},
  title = {the effect of GDP on economic growth in USA},
  journal = {JPE},
  year = {2023},
  abstract = {This is a long abstract that should be removed.},
  keywords = {economics, growth},
  url = {https://example.com/paper.pdf},
  urldate = {2023-01-01},
}

@article{nber_paper,
  author = {Smith, John},
  title = {testing NBER working papers},
  journal = {NBER Working Paper},
  year = {2023},
  number = {12345},
  url = {https://www.nber.org/papers/w12345},
}
"#,
        )
        .unwrap();

        let report = clean_bib(file.path()).unwrap();
        assert_eq!(report.entries, 2);
        assert!(report.warnings.is_empty());
        assert!(report.output.contains("Journal of Political Economy"));
        assert!(report
            .output
            .contains("The Effect of {GDP} on Economic Growth in {USA}"));
        assert!(!report.output.contains("abstract"));
        assert!(!report.output.contains("keywords"));
        assert!(report.output.contains("@techreport{nber_paper"));
        assert!(report
            .output
            .contains("institution = {National Bureau of Economic Research}"));
    }

    #[test]
    fn test_write_cleaned_keeps_backup() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("refs.bib");
        let original = "@article{k,\n  title = {lower case title},\n  year = {2020},\n}\n";
        std::fs::write(&path, original).unwrap();

        let report = clean_bib(&path).unwrap();
        let backup = write_cleaned(&path, &report).unwrap();

        assert_eq!(backup, dir.path().join("refs.bib.backup"));
        assert_eq!(std::fs::read_to_string(&backup).unwrap(), original);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), report.output);
        assert!(report.output.contains("title = {Lower Case Title}"));
    }
}
