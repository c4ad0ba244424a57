//! Handlers for the bibliography and manuscript tools.

use serde_json::{json, Value};

use super::tools::{optional_bool, optional_str, required_str, string_list, ToolError, ToolHandler};
use crate::bibtex::{self, BibError, KeyConvention};
use crate::models::{Citation, Dialect};
use crate::scanner;

/// Handler for `parse_bib`
#[derive(Debug)]
pub struct ParseBibHandler;

#[async_trait::async_trait]
impl ToolHandler for ParseBibHandler {
    async fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let path = required_str(&args, "path")?;
        let index = bibtex::parse_bib(path)?;
        Ok(serde_json::to_value(index)?)
    }
}

/// Handler for `scan_bare_citations`
#[derive(Debug)]
pub struct ScanBareCitationsHandler;

#[async_trait::async_trait]
impl ToolHandler for ScanBareCitationsHandler {
    async fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let path = required_str(&args, "path")?;
        let citations = scanner::scan_bare_citations(path)?;
        Ok(serde_json::to_value(citations)?)
    }
}

/// Handler for `rekey_entry`; the result is the rewritten entry as a plain string
#[derive(Debug)]
pub struct RekeyEntryHandler;

#[async_trait::async_trait]
impl ToolHandler for RekeyEntryHandler {
    async fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let entry = required_str(&args, "bibtex")?;
        let existing_keys = string_list(&args, "existing_keys");
        let convention: KeyConvention = optional_str(&args, "convention")
            .unwrap_or("auto")
            .parse()
            .unwrap_or_default();

        let rekeyed = bibtex::rekey_entry(entry, &existing_keys, &convention).map_err(|e| match e {
            BibError::Parse(_) => e.into(),
            _ => ToolError::new("rekey_error", e.to_string()),
        })?;
        Ok(Value::String(rekeyed))
    }
}

/// Handler for `add_entry`
#[derive(Debug)]
pub struct AddEntryHandler;

#[async_trait::async_trait]
impl ToolHandler for AddEntryHandler {
    async fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let bib_path = required_str(&args, "bib_path")?;
        let entry = required_str(&args, "entry")?;

        let message = bibtex::add_entry(bib_path, entry)?;
        Ok(json!({ "status": "success", "message": message }))
    }
}

/// Handler for `suggest_replacement`
#[derive(Debug)]
pub struct SuggestReplacementHandler;

#[async_trait::async_trait]
impl ToolHandler for SuggestReplacementHandler {
    async fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let missing = |e: ToolError| ToolError::new("replacement_error", e.message);
        let citation_text = required_str(&args, "citation_text").map_err(missing)?;
        let key = required_str(&args, "key").map_err(missing)?;
        let doc_type = required_str(&args, "doc_type").map_err(missing)?;
        let natbib = optional_bool(&args, "natbib", true);

        let citation = Citation::from_text(citation_text);
        let replacement =
            bibtex::suggest_replacement(&citation, key, Dialect::from_doc_type(doc_type, natbib));
        Ok(serde_json::to_value(replacement)?)
    }
}

/// Handler for `clean_bib`
#[derive(Debug)]
pub struct CleanBibHandler;

#[async_trait::async_trait]
impl ToolHandler for CleanBibHandler {
    async fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let path = required_str(&args, "path")?;
        let write = optional_bool(&args, "write", false);

        let report = bibtex::clean_bib(path).map_err(clean_error)?;
        let mut result = serde_json::to_value(&report)?;

        if write {
            let backup = bibtex::write_cleaned(path, &report).map_err(clean_error)?;
            result["backup"] = Value::String(backup.display().to_string());
        }

        Ok(result)
    }
}

fn clean_error(err: BibError) -> ToolError {
    match err {
        BibError::FileNotFound(_) => err.into(),
        _ => ToolError::new("clean_error", err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_add_entry_reports_success() {
        let mut file = tempfile::Builder::new().suffix(".bib").tempfile().unwrap();
        writeln!(file, "@article{{existing2020,\n  title = {{Old}},\n}}").unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let result = AddEntryHandler
            .execute(json!({
                "bib_path": path,
                "entry": "@article{new2021,\n  title = {New},\n}"
            }))
            .await
            .unwrap();
        assert_eq!(result["status"], "success");
        assert_eq!(result["message"], "Added entry with key: new2021");

        let err = AddEntryHandler
            .execute(json!({
                "bib_path": path,
                "entry": "@article{existing2020,\n  title = {Again},\n}"
            }))
            .await
            .unwrap_err();
        assert_eq!(err.code, "bibtex_error");
        assert_eq!(err.message, "Key already exists: existing2020");
    }

    #[tokio::test]
    async fn test_rekey_returns_plain_string() {
        let result = RekeyEntryHandler
            .execute(json!({
                "bibtex": "@article{Conley_2010,\n  author = {Conley, Timothy and Udry, Christopher},\n  title = {Learning about a New Technology},\n  year = {2010},\n}",
                "existing_keys": ["conley2010learning"]
            }))
            .await
            .unwrap();
        let text = result.as_str().unwrap();
        assert!(text.starts_with("@article{conley2010learninga,"));
    }

    #[tokio::test]
    async fn test_rekey_invalid_entry() {
        let err = RekeyEntryHandler
            .execute(json!({ "bibtex": "not bibtex" }))
            .await
            .unwrap_err();
        assert_eq!(err.code, "parse_error");
    }

    #[tokio::test]
    async fn test_suggest_replacement_natbib_default() {
        let result = SuggestReplacementHandler
            .execute(json!({
                "citation_text": "Conley and Udry (2010)",
                "key": "conley2010learning",
                "doc_type": "tex"
            }))
            .await
            .unwrap();
        assert_eq!(result["original"], "Conley and Udry (2010)");
        assert_eq!(result["replacement"], "\\citet{conley2010learning}");
    }

    #[tokio::test]
    async fn test_suggest_replacement_missing_key() {
        let err = SuggestReplacementHandler
            .execute(json!({ "citation_text": "Suri (2011)", "doc_type": "qmd" }))
            .await
            .unwrap_err();
        assert_eq!(err.code, "replacement_error");
    }

    #[tokio::test]
    async fn test_scan_missing_file() {
        let err = ScanBareCitationsHandler
            .execute(json!({ "path": "/nonexistent/paper.qmd" }))
            .await
            .unwrap_err();
        assert_eq!(err.code, "file_not_found");
    }

    #[tokio::test]
    async fn test_clean_bib_dry_run_leaves_file() {
        let mut file = tempfile::Builder::new().suffix(".bib").tempfile().unwrap();
        let original = "@article{k,\n  author = {A, B},\n  title = {a study of VAR models},\n  journal = {QJE},\n  year = {2020},\n}\n";
        file.write_all(original.as_bytes()).unwrap();

        let result = CleanBibHandler
            .execute(json!({ "path": file.path().to_str().unwrap() }))
            .await
            .unwrap();
        assert_eq!(result["entries"], 1);
        assert!(result["output"]
            .as_str()
            .unwrap()
            .contains("Quarterly Journal of Economics"));
        assert!(result.get("backup").is_none());
        assert_eq!(std::fs::read_to_string(file.path()).unwrap(), original);
    }
}
