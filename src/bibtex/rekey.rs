//! Citation key generation and rewriting.

use super::BibError;
use regex::Regex;
use std::str::FromStr;
use std::sync::LazyLock;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

static HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^@(\w+)\{(\w+)").expect("valid entry header regex"));
static AUTHOR_FIELD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"author\s*=\s*\{([^}]+)\}").expect("valid author regex"));
static YEAR_FIELD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"year\s*=\s*\{?(\d{4})\}?").expect("valid year regex"));
static TITLE_FIELD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"title\s*=\s*\{([^}]+)\}").expect("valid title regex"));

/// Title words never used as the key's title component
const STOPWORDS: [&str; 8] = ["a", "an", "the", "on", "in", "at", "to", "for"];

/// Letters appended to disambiguate colliding keys
const DISAMBIGUATORS: [char; 6] = ['a', 'b', 'c', 'd', 'e', 'f'];

/// Key naming convention
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum KeyConvention {
    /// `{firstauthor}{year}{titleword}`
    #[default]
    Auto,
    /// Custom template using `{firstauthor}`, `{year}` and `{titleword}`
    Template(String),
}

impl KeyConvention {
    const DEFAULT_TEMPLATE: &'static str = "{firstauthor}{year}{titleword}";

    fn template(&self) -> &str {
        match self {
            KeyConvention::Auto => Self::DEFAULT_TEMPLATE,
            KeyConvention::Template(t) => t,
        }
    }
}

impl FromStr for KeyConvention {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || s.eq_ignore_ascii_case("auto") {
            Ok(KeyConvention::Auto)
        } else {
            Ok(KeyConvention::Template(s.to_string()))
        }
    }
}

/// Strip combining accents (`Müller` → `Muller`)
pub fn remove_accents(text: &str) -> String {
    text.nfd().filter(|c| !is_combining_mark(*c)).collect()
}

/// Normalise a surname for use in a key: no accents, hyphens or spaces; lowercase
pub fn normalize_name(name: &str) -> String {
    remove_accents(name)
        .replace(['-', ' '], "")
        .to_lowercase()
}

/// Build a key from raw `author`, `year` and `title` field values.
///
/// When the key is taken, the first free letter `a`–`f` is appended. If all six are
/// taken the base key is returned unchanged.
pub fn generate_key(
    author: &str,
    year: &str,
    title: &str,
    existing_keys: &[String],
    convention: &KeyConvention,
) -> String {
    let author_part = author
        .split(" and ")
        .next()
        .and_then(|first| first.split(',').next())
        .filter(|_| !author.is_empty())
        .map(normalize_name)
        .unwrap_or_default();

    let title_lower = title.to_lowercase();
    let title_part = title_lower
        .split_whitespace()
        .map(|w| w.trim_matches(|c| matches!(c, '.' | ',' | ';' | ':')))
        .find(|w| !STOPWORDS.contains(w))
        .unwrap_or_default();

    let base_key = convention
        .template()
        .replace("{firstauthor}", &author_part)
        .replace("{year}", year)
        .replace("{titleword}", title_part);

    let taken = |candidate: &str| existing_keys.iter().any(|k| k == candidate);
    if !taken(&base_key) {
        return base_key;
    }

    DISAMBIGUATORS
        .iter()
        .map(|suffix| format!("{}{}", base_key, suffix))
        .find(|candidate| !taken(candidate))
        .unwrap_or(base_key)
}

/// Rewrite the key of a raw BibTeX entry.
///
/// Only the first line (`@type{key,`) changes; every following line is preserved.
pub fn rekey_entry(
    bibtex: &str,
    existing_keys: &[String],
    convention: &KeyConvention,
) -> Result<String, BibError> {
    let lines: Vec<&str> = bibtex.trim().split('\n').collect();
    let first_line = lines.first().copied().unwrap_or_default();

    let caps = HEADER
        .captures(first_line)
        .ok_or_else(|| BibError::Parse("Invalid BibTeX entry format".to_string()))?;
    let entry_type = &caps[1];
    let old_key = &caps[2];

    let body = lines[1..].join("\n");
    let fields_text = body.trim_end_matches('}');

    let capture = |re: &Regex| {
        re.captures(fields_text)
            .map(|c| c[1].to_string())
            .unwrap_or_default()
    };
    let author = capture(&AUTHOR_FIELD);
    let year = capture(&YEAR_FIELD);
    let title = capture(&TITLE_FIELD);

    let new_key = generate_key(&author, &year, &title, existing_keys, convention);
    tracing::debug!("Rekeyed {} -> {}", old_key, new_key);

    Ok(format!("@{}{{{},\n{}", entry_type, new_key, body))
}
