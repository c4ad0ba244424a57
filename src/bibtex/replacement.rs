//! Citation command suggestions for detected bare citations.

use crate::models::{Citation, Dialect, Replacement};

const QUARTO_POSSESSIVE_NOTE: &str =
    "Possessive form: create a composed citation or use manual format";
const NATBIB_POSSESSIVE_NOTE: &str = "Possessive form requires composed command";
const BIBLATEX_NOTE: &str = "Using biblatex syntax (cite biblatex package)";

/// Suggest the citation command that should replace a bare citation.
pub fn suggest_replacement(citation: &Citation, key: &str, dialect: Dialect) -> Replacement {
    let (replacement, notes) = match dialect {
        Dialect::Quarto => quarto(citation, key),
        Dialect::Natbib => natbib(citation, key),
        Dialect::Biblatex => biblatex(citation, key),
    };

    Replacement {
        original: citation.text.clone(),
        replacement,
        notes: notes.to_string(),
    }
}

/// Suffix text, unless it only repeats the locator
fn distinct_suffix(citation: &Citation) -> &str {
    if citation.suffix == citation.locator {
        ""
    } else {
        &citation.suffix
    }
}

fn quarto(citation: &Citation, key: &str) -> (String, &'static str) {
    if citation.is_possessive {
        return (format!("{}'s ", key), QUARTO_POSSESSIVE_NOTE);
    }
    if citation.is_narrative() {
        return (format!("@{}", key), "");
    }

    let mut parts = vec![format!("@{}", key)];
    if !citation.locator.is_empty() {
        parts.push(citation.locator.clone());
    }
    let suffix = distinct_suffix(citation);
    if !suffix.is_empty() {
        parts.push(suffix.to_string());
    }

    let body = parts.join(", ");
    let replacement = if citation.prefix.is_empty() {
        format!("[{}]", body)
    } else {
        format!("[{} {}]", citation.prefix, body)
    };
    (replacement, "")
}

/// Optional `[pre][post]` notes shared by `\citep` and `\parencite`
fn latex_notes(citation: &Citation) -> String {
    let post = if citation.locator.is_empty() {
        distinct_suffix(citation)
    } else {
        citation.locator.as_str()
    };

    match (citation.prefix.is_empty(), post.is_empty()) {
        (true, true) => String::new(),
        (true, false) => format!("[{}]", post),
        (false, _) => format!("[{}][{}]", citation.prefix, post),
    }
}

fn natbib(citation: &Citation, key: &str) -> (String, &'static str) {
    if citation.is_possessive {
        return (
            format!("\\citeauthor{{{key}}}'s (\\citeyear{{{key}}})"),
            NATBIB_POSSESSIVE_NOTE,
        );
    }
    if citation.is_narrative() {
        return (format!("\\citet{{{}}}", key), "");
    }
    (format!("\\citep{}{{{}}}", latex_notes(citation), key), "")
}

fn biblatex(citation: &Citation, key: &str) -> (String, &'static str) {
    let replacement = if citation.is_narrative() {
        format!("\\textcite{{{}}}", key)
    } else {
        format!("\\parencite{}{{{}}}", latex_notes(citation), key)
    };
    (replacement, BIBLATEX_NOTE)
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "conley2010learning";

    fn suggest(text: &str, dialect: Dialect) -> Replacement {
        suggest_replacement(&Citation::from_text(text), KEY, dialect)
    }

    #[test]
    fn test_quarto_narrative() {
        let r = suggest("Conley and Udry (2010)", Dialect::Quarto);
        assert_eq!(r.original, "Conley and Udry (2010)");
        assert_eq!(r.replacement, "@conley2010learning");
        assert!(r.notes.is_empty());
    }

    #[test]
    fn test_quarto_parenthetical_with_prefix_and_locator() {
        let r = suggest("(see Conley and Udry 2010, p. 45)", Dialect::Quarto);
        assert_eq!(r.replacement, "[see @conley2010learning, p. 45]");
    }

    #[test]
    fn test_quarto_parenthetical_plain() {
        let r = suggest("(Conley and Udry 2010)", Dialect::Quarto);
        assert_eq!(r.replacement, "[@conley2010learning]");
    }

    #[test]
    fn test_quarto_possessive() {
        let r = suggest("Conley's (2010)", Dialect::Quarto);
        assert_eq!(r.replacement, "conley2010learning's ");
        assert!(r.notes.contains("Possessive"));
    }

    #[test]
    fn test_natbib_forms() {
        assert_eq!(
            suggest("Conley and Udry (2010)", Dialect::Natbib).replacement,
            "\\citet{conley2010learning}"
        );
        assert_eq!(
            suggest("(Conley and Udry 2010)", Dialect::Natbib).replacement,
            "\\citep{conley2010learning}"
        );
        assert_eq!(
            suggest("(Conley and Udry 2010, p. 45)", Dialect::Natbib).replacement,
            "\\citep[p. 45]{conley2010learning}"
        );
        assert_eq!(
            suggest("(see Conley and Udry 2010)", Dialect::Natbib).replacement,
            "\\citep[see][]{conley2010learning}"
        );
    }

    #[test]
    fn test_natbib_possessive() {
        let r = suggest("Conley's (2010)", Dialect::Natbib);
        assert_eq!(
            r.replacement,
            "\\citeauthor{conley2010learning}'s (\\citeyear{conley2010learning})"
        );
        assert!(!r.notes.is_empty());
    }

    #[test]
    fn test_biblatex_forms() {
        let r = suggest("Conley and Udry (2010)", Dialect::Biblatex);
        assert_eq!(r.replacement, "\\textcite{conley2010learning}");
        assert!(r.notes.contains("biblatex"));

        let r = suggest("(cf. Conley and Udry 2010, ch. 3)", Dialect::Biblatex);
        assert_eq!(r.replacement, "\\parencite[cf.][ch. 3]{conley2010learning}");
    }
}
