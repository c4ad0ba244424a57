//! # manuscript-tools
//!
//! Citation tooling for academic manuscripts written in Quarto/Markdown or LaTeX.
//!
//! ## Architecture
//!
//! - [`scanner`]: finds bare author-year citations that lack citation markup
//! - [`bibtex`]: indexes, rekeys, extends and cleans `.bib` files, and turns bare
//!   citations into citation commands
//! - [`sources`]: scholarly metadata back-ends (CrossRef)
//! - [`mcp`]: MCP tool server exposing the above over stdio or HTTP
//! - [`models`]: shared data types (citations, bibliography records, works)
//! - [`config`]: layered configuration
//! - [`utils`]: HTTP client and retry helpers

pub mod bibtex;
pub mod config;
pub mod mcp;
pub mod models;
pub mod scanner;
pub mod sources;
pub mod ui;
pub mod utils;

// Re-export commonly used types
pub use models::{Citation, CitationType};
pub use scanner::{scan_bare_citations, scan_document};
pub use sources::Source;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
