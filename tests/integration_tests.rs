//! Integration tests for manuscript-tools
//!
//! These exercise the public library API and the MCP tool registry end to end, against
//! temporary files and a mock metadata source. No network access is needed.

use manuscript_tools::bibtex;
use manuscript_tools::mcp::{McpServer, ToolRegistry};
use manuscript_tools::models::{CitationType, Work};
use manuscript_tools::sources::{MockSource, Source};
use manuscript_tools::{scan_bare_citations, scan_document};
use serde_json::json;
use std::io::Write;
use std::sync::Arc;
use tempfile::NamedTempFile;

const MANUSCRIPT: &str = "# Introduction

Suri (2011) demonstrates selection effects.
Studies show results (Suri 2011).

## Acknowledgments
We thank Smith (2010) for comments.

## Data
Already cited @conley2010learning and Jones (2012).
";

const BIB: &str = r#"@article{suri2011selection,
  author = {Suri, Tavneet},
  title = {Selection and Comparative Advantage in Technology Adoption},
  journal = {Econometrica},
  year = {2011},
}
"#;

fn temp_file(content: &str, suffix: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

fn mock_source() -> Arc<MockSource> {
    let source = Arc::new(MockSource::new());
    source.set_works(vec![Work {
        title: "Learning about a New Technology: Pineapple in Ghana".to_string(),
        year: Some(2010),
        journal: "American Economic Review".to_string(),
        doi: Some("10.1257/aer.100.1.35".to_string()),
        work_type: Some("journal-article".to_string()),
        confidence_score: 8,
        ..Default::default()
    }]);
    source
}

#[test]
fn test_scan_manuscript_file() {
    let file = temp_file(MANUSCRIPT, ".qmd");
    let citations = scan_bare_citations(file.path()).unwrap();

    assert_eq!(citations.len(), 2);
    assert_eq!(citations[0].line, 3);
    assert_eq!(citations[0].citation_type, CitationType::Narrative);
    assert_eq!(citations[1].line, 4);
    assert_eq!(citations[1].citation_type, CitationType::Parenthetical);
    assert!(citations.iter().all(|c| c.authors == vec!["Suri"]));
}

#[test]
fn test_scan_file_matches_scan_document() {
    let file = temp_file(MANUSCRIPT, ".tex");
    assert_eq!(
        scan_bare_citations(file.path()).unwrap(),
        scan_document(MANUSCRIPT)
    );
}

#[test]
fn test_add_then_index_then_rekey() {
    let file = temp_file(BIB, ".bib");

    let entry = "@article{Conley_2010,\n  author = {Conley, Timothy G. and Udry, Christopher R.},\n  title = {Learning about a New Technology},\n  journal = {American Economic Review},\n  year = {2010},\n}";
    let message = bibtex::add_entry(file.path(), entry).unwrap();
    assert_eq!(message, "Added entry with key: Conley_2010");

    let index = bibtex::parse_bib(file.path()).unwrap();
    assert_eq!(index["Suri-2011"][0].key, "suri2011selection");
    assert_eq!(index["Conley-2010"][0].key, "Conley_2010");

    let content = std::fs::read_to_string(file.path()).unwrap();
    let existing = bibtex::existing_keys(&content);
    assert!(existing.contains(&"suri2011selection".to_string()));

    let rekeyed = bibtex::rekey_entry(entry, &existing, &Default::default()).unwrap();
    assert!(rekeyed.starts_with("@article{conley2010learning,"));
}

#[tokio::test]
async fn test_registry_bibtex_tools() {
    let registry = ToolRegistry::new().with_bibtex_tools();
    assert_eq!(registry.len(), 6);

    let doc = temp_file(MANUSCRIPT, ".qmd");
    let result = registry
        .call(
            "scan_bare_citations",
            json!({ "path": doc.path().to_str().unwrap() }),
        )
        .await;
    assert_eq!(result.as_array().unwrap().len(), 2);
    assert_eq!(result[0]["text"], "Suri (2011)");

    let bib = temp_file(BIB, ".bib");
    let result = registry
        .call(
            "add_entry",
            json!({
                "bib_path": bib.path().to_str().unwrap(),
                "entry": "@article{suri2011selection, title = {Dup}}"
            }),
        )
        .await;
    assert_eq!(result["error"], "bibtex_error");
    assert_eq!(result["message"], "Key already exists: suri2011selection");
}

#[tokio::test]
async fn test_registry_tagged_errors() {
    let registry = ToolRegistry::new().with_bibtex_tools();

    let result = registry
        .call("parse_bib", json!({ "path": "/nonexistent/refs.bib" }))
        .await;
    assert_eq!(result["error"], "file_not_found");

    let result = registry.call("no_such_tool", json!({})).await;
    assert_eq!(result["error"], "invalid_request");

    let result = registry.call("parse_bib", json!({})).await;
    assert_eq!(result["error"], "invalid_request");
}

#[tokio::test]
async fn test_registry_crossref_tools() {
    let source = mock_source();
    let registry =
        ToolRegistry::new().with_crossref_tools(source.clone() as Arc<dyn Source>);
    assert_eq!(registry.len(), 4);

    let result = registry
        .call("search", json!({ "author": "Conley", "year": 2010 }))
        .await;
    assert_eq!(result[0]["doi"], "10.1257/aer.100.1.35");
    assert_eq!(result[0]["type"], "journal-article");

    let result = registry
        .call("get_bibtex", json!({ "doi": "10.1257/aer.100.1.35" }))
        .await;
    assert_eq!(result["error"], "bibtex_unavailable");

    source.set_rate_limited(None);
    let result = registry.call("search", json!({ "query": "pineapple" })).await;
    assert_eq!(result["error"], "rate_limited");
    assert!(result["retry_after_seconds"].is_null());
}

#[tokio::test]
async fn test_find_published_version_through_registry() {
    let source = mock_source();
    source.set_bibtex("10.1257/aer.100.1.35", "@article{Conley_2010, year = {2010}}");
    let registry =
        ToolRegistry::new().with_crossref_tools(source.clone() as Arc<dyn Source>);

    let result = registry
        .call(
            "find_published_version",
            json!({
                "title": "Learning about a New Technology: Pineapple in Ghana",
                "author": "Conley",
                "working_paper_year": 2005
            }),
        )
        .await;
    assert_eq!(result["doi"], "10.1257/aer.100.1.35");
    assert_eq!(result["similarity"], 1.0);
    assert_eq!(result["bibtex"], "@article{Conley_2010, year = {2010}}");

    let query = source.last_query().unwrap();
    assert_eq!(query.work_type.as_deref(), Some("journal-article"));
}

#[test]
fn test_server_builds_with_all_tools() {
    let registry = ToolRegistry::new()
        .with_bibtex_tools()
        .with_crossref_tools(mock_source() as Arc<dyn Source>);
    assert_eq!(registry.len(), 10);
    assert!(McpServer::new(&registry).is_ok());
}
