//! Tool registry for MCP tools.

use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::bibtex::BibError;
use crate::scanner::ScanError;
use crate::sources::{Source, SourceError};

use super::bibtex_tools::{
    AddEntryHandler, CleanBibHandler, ParseBibHandler, RekeyEntryHandler,
    ScanBareCitationsHandler, SuggestReplacementHandler,
};
use super::crossref_tools::{
    FindPublishedVersionHandler, GetBibtexHandler, GetMetadataHandler, SearchHandler,
};

/// An MCP tool that can be called by the client
#[derive(Clone)]
pub struct Tool {
    /// Tool name (e.g., "scan_bare_citations")
    pub name: String,

    /// Human-readable description
    pub description: String,

    /// JSON Schema for input parameters
    pub input_schema: Value,

    /// Handler function to execute the tool
    pub handler: Arc<dyn ToolHandler>,
}

impl std::fmt::Debug for Tool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tool")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("input_schema", &self.input_schema)
            .finish()
    }
}

/// Handler for executing a tool
#[async_trait::async_trait]
pub trait ToolHandler: Send + Sync + std::fmt::Debug {
    /// Execute the tool with the given arguments
    async fn execute(&self, args: Value) -> Result<Value, ToolError>;
}

/// A tool failure, reported to the client as `{"error": code, "message": ..., ...extra}`
#[derive(Debug, Clone, PartialEq)]
pub struct ToolError {
    pub code: String,
    pub message: String,
    pub extra: Map<String, Value>,
}

impl ToolError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            extra: Map::new(),
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new("invalid_request", message)
    }

    /// Attach an extra field to the error object
    pub fn with_extra(mut self, key: &str, value: Value) -> Self {
        self.extra.insert(key.to_string(), value);
        self
    }

    /// The tagged error object
    pub fn to_json(&self) -> Value {
        let mut object = Map::new();
        object.insert("error".to_string(), Value::String(self.code.clone()));
        object.insert("message".to_string(), Value::String(self.message.clone()));
        for (key, value) in &self.extra {
            object.insert(key.clone(), value.clone());
        }
        Value::Object(object)
    }
}

impl std::fmt::Display for ToolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ToolError {}

impl From<BibError> for ToolError {
    fn from(err: BibError) -> Self {
        ToolError::new(err.code(), err.to_string())
    }
}

impl From<ScanError> for ToolError {
    fn from(err: ScanError) -> Self {
        ToolError::new(err.code(), err.to_string())
    }
}

impl From<SourceError> for ToolError {
    fn from(err: SourceError) -> Self {
        let tool_error = ToolError::new(err.code(), err.to_string());
        match err {
            SourceError::RateLimit { retry_after } => {
                tool_error.with_extra("retry_after_seconds", Value::from(retry_after))
            }
            _ => tool_error,
        }
    }
}

impl From<serde_json::Error> for ToolError {
    fn from(err: serde_json::Error) -> Self {
        ToolError::new("internal_error", format!("Failed to serialize result: {}", err))
    }
}

/// Required string argument
pub(crate) fn required_str<'a>(args: &'a Value, name: &str) -> Result<&'a str, ToolError> {
    args.get(name)
        .and_then(|v| v.as_str())
        .ok_or_else(|| ToolError::invalid_request(format!("Missing '{}' parameter", name)))
}

/// Optional string argument; empty strings count as absent
pub(crate) fn optional_str<'a>(args: &'a Value, name: &str) -> Option<&'a str> {
    args.get(name)
        .and_then(|v| v.as_str())
        .filter(|s| !s.trim().is_empty())
}

pub(crate) fn optional_i64(args: &Value, name: &str) -> Option<i64> {
    args.get(name).and_then(|v| v.as_i64())
}

pub(crate) fn optional_bool(args: &Value, name: &str, default: bool) -> bool {
    args.get(name).and_then(|v| v.as_bool()).unwrap_or(default)
}

/// Optional array of strings; non-string items are ignored
pub(crate) fn string_list(args: &Value, name: &str) -> Vec<String> {
    args.get(name)
        .and_then(|v| v.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.as_str().map(String::from))
                .collect()
        })
        .unwrap_or_default()
}

/// Named group of tools served together
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toolset {
    /// Bibliography and manuscript tools
    Bibtex,
    /// CrossRef metadata tools
    Crossref,
}

impl Toolset {
    pub fn as_str(&self) -> &'static str {
        match self {
            Toolset::Bibtex => "bibtex",
            Toolset::Crossref => "crossref",
        }
    }
}

impl FromStr for Toolset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "bibtex" => Ok(Toolset::Bibtex),
            "crossref" => Ok(Toolset::Crossref),
            other => Err(format!("Unknown toolset '{}'", other)),
        }
    }
}

/// Registry for all MCP tools
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Tool>,
}

impl ToolRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the bibliography and manuscript tools
    pub fn with_bibtex_tools(mut self) -> Self {
        self.register_bibtex_tools();
        self
    }

    /// Add the CrossRef metadata tools, served by `source`
    pub fn with_crossref_tools(mut self, source: Arc<dyn Source>) -> Self {
        self.register_crossref_tools(source);
        self
    }

    fn register_bibtex_tools(&mut self) {
        self.register(Tool {
            name: "parse_bib".to_string(),
            description: "Parse a .bib file and return a structured index of all entries, keyed by \
                          '<FirstAuthor>-<year>'. Each entry contains key, type, authors, year, \
                          title, and fields."
                .to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "path": {
                        "type": "string",
                        "description": "Path to the .bib file"
                    }
                },
                "required": ["path"]
            }),
            handler: Arc::new(ParseBibHandler),
        });

        self.register(Tool {
            name: "scan_bare_citations".to_string(),
            description: "Scan a .qmd or .tex file for bare (written-out) citations like \
                          'Author (Year)' or '(Author Year)'. Lines that already use @key or \
                          \\cite markup are skipped, as are acknowledgments and bibliography \
                          sections."
                .to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "path": {
                        "type": "string",
                        "description": "Path to the document file (.qmd or .tex)"
                    }
                },
                "required": ["path"]
            }),
            handler: Arc::new(ScanBareCitationsHandler),
        });

        self.register(Tool {
            name: "rekey_entry".to_string(),
            description: "Rewrite the key of a BibTeX entry to {firstauthor}{year}{titleword}, \
                          all lowercase (e.g. 'conley2010learning'), disambiguating against \
                          existing keys."
                .to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "bibtex": {
                        "type": "string",
                        "description": "A raw BibTeX entry string"
                    },
                    "existing_keys": {
                        "type": "array",
                        "items": {"type": "string"},
                        "description": "All keys currently in the project's .bib file"
                    },
                    "convention": {
                        "type": "string",
                        "description": "'auto' or a template using {firstauthor}, {year}, {titleword}",
                        "default": "auto"
                    }
                },
                "required": ["bibtex"]
            }),
            handler: Arc::new(RekeyEntryHandler),
        });

        self.register(Tool {
            name: "add_entry".to_string(),
            description: "Append a BibTeX entry to a .bib file, refusing duplicate keys."
                .to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "bib_path": {
                        "type": "string",
                        "description": "Path to the .bib file"
                    },
                    "entry": {
                        "type": "string",
                        "description": "The BibTeX entry string to add"
                    }
                },
                "required": ["bib_path", "entry"]
            }),
            handler: Arc::new(AddEntryHandler),
        });

        self.register(Tool {
            name: "suggest_replacement".to_string(),
            description: "Given a bare citation and a resolved BibTeX key, return the proper \
                          citation command for Quarto, natbib or biblatex."
                .to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "citation_text": {
                        "type": "string",
                        "description": "The bare citation text (e.g., 'Conley and Udry (2010)')"
                    },
                    "key": {
                        "type": "string",
                        "description": "The resolved BibTeX key (e.g., 'conley2010learning')"
                    },
                    "doc_type": {
                        "type": "string",
                        "description": "'qmd' for Quarto or 'tex' for LaTeX"
                    },
                    "natbib": {
                        "type": "boolean",
                        "description": "For LaTeX, use natbib (\\citet/\\citep) instead of biblatex (\\textcite/\\parencite)",
                        "default": true
                    }
                },
                "required": ["citation_text", "key", "doc_type"]
            }),
            handler: Arc::new(SuggestReplacementHandler),
        });

        self.register(Tool {
            name: "clean_bib".to_string(),
            description: "Normalise a .bib file for journal submission: NBER working papers, \
                          journal names, title case, junk fields. Returns the cleaned source \
                          and validation warnings."
                .to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "path": {
                        "type": "string",
                        "description": "Path to the .bib file"
                    },
                    "write": {
                        "type": "boolean",
                        "description": "Rewrite the file in place, keeping <file>.bib.backup",
                        "default": false
                    }
                },
                "required": ["path"]
            }),
            handler: Arc::new(CleanBibHandler),
        });
    }

    fn register_crossref_tools(&mut self, source: Arc<dyn Source>) {
        self.register(Tool {
            name: "search".to_string(),
            description: format!(
                "Search {} for scholarly works. Results include title, authors, year, \
                 journal, volume, issue, pages, DOI, type, and confidence_score.",
                source.name()
            ),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "Free-text search query (e.g., 'learning technology Ghana')"
                    },
                    "author": {
                        "type": "string",
                        "description": "Filter by author name (e.g., 'Conley')"
                    },
                    "title": {
                        "type": "string",
                        "description": "Filter by title keywords"
                    },
                    "year": {
                        "type": "integer",
                        "description": "Filter by publication year (exact match)"
                    },
                    "work_type": {
                        "type": "string",
                        "description": "Filter by work type (e.g., 'journal-article', 'book')"
                    },
                    "rows": {
                        "type": "integer",
                        "description": "Maximum number of results",
                        "default": 5
                    }
                }
            }),
            handler: Arc::new(SearchHandler {
                source: source.clone(),
            }),
        });

        self.register(Tool {
            name: "get_metadata".to_string(),
            description: "Retrieve full metadata for a work by DOI.".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "doi": {
                        "type": "string",
                        "description": "Digital Object Identifier (e.g., '10.1257/aer.100.1.35')"
                    }
                },
                "required": ["doi"]
            }),
            handler: Arc::new(GetMetadataHandler {
                source: source.clone(),
            }),
        });

        self.register(Tool {
            name: "get_bibtex".to_string(),
            description: "Retrieve the BibTeX entry for a work by DOI.".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "doi": {
                        "type": "string",
                        "description": "Digital Object Identifier"
                    }
                },
                "required": ["doi"]
            }),
            handler: Arc::new(GetBibtexHandler {
                source: source.clone(),
            }),
        });

        self.register(Tool {
            name: "find_published_version".to_string(),
            description: "Find the published journal version of a working paper. Returns the \
                          best match with BibTeX only when title similarity exceeds 0.5 and a \
                          DOI is available, otherwise null."
                .to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "title": {
                        "type": "string",
                        "description": "Title of the working paper"
                    },
                    "author": {
                        "type": "string",
                        "description": "Primary author name"
                    },
                    "working_paper_year": {
                        "type": "integer",
                        "description": "Year the working paper was released"
                    }
                },
                "required": ["title"]
            }),
            handler: Arc::new(FindPublishedVersionHandler { source }),
        });
    }

    /// Register a tool
    pub fn register(&mut self, tool: Tool) {
        self.tools.insert(tool.name.clone(), tool);
    }

    /// Get all tools, sorted by name
    pub fn all(&self) -> Vec<&Tool> {
        self.tools.values().collect()
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<&Tool> {
        self.tools.get(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Execute a tool by name
    pub async fn execute(&self, name: &str, args: Value) -> Result<Value, ToolError> {
        let tool = self
            .get(name)
            .ok_or_else(|| ToolError::invalid_request(format!("Tool '{}' not found", name)))?;

        tool.handler.execute(args).await
    }

    /// Execute a tool by name, folding failures into a tagged error object
    pub async fn call(&self, name: &str, args: Value) -> Value {
        self.execute(name, args)
            .await
            .unwrap_or_else(|e| e.to_json())
    }
}
