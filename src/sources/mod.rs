//! Scholarly metadata sources.
//!
//! This module defines the [`Source`] trait implemented by metadata back-ends. The
//! production back-end is [`CrossRefSource`]; [`MockSource`] returns canned responses for
//! tests. Tools and the CLI hold a source as `Arc<dyn Source>`, so a new back-end only
//! needs to implement the trait.
//!
//! Sources report failures as [`SourceError`]. Rate limiting (`429`) and missing works
//! (`404`) are surfaced as distinct variants and are never retried.

mod crossref;
pub mod mock;
mod published;

pub use crossref::{CrossRefSource, CROSSREF_API_BASE, DOI_RESOLVER_BASE};
pub use mock::MockSource;
pub use published::{find_published_version, title_similarity};

use crate::models::{Work, WorkQuery};
use async_trait::async_trait;

bitflags::bitflags! {
    /// Capabilities that a source can support
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SourceCapabilities: u32 {
        const SEARCH = 1 << 0;
        const METADATA = 1 << 1;
        const BIBTEX = 1 << 2;
    }
}

/// Interface for scholarly metadata back-ends.
///
/// Every operation has a default implementation returning
/// [`SourceError::NotImplemented`], so a source only implements what it supports and
/// advertises it through [`Source::capabilities`].
#[async_trait]
pub trait Source: Send + Sync + std::fmt::Debug {
    /// Unique identifier for this source (e.g., "crossref")
    fn id(&self) -> &str;

    /// Human-readable name of this source
    fn name(&self) -> &str;

    /// Describe the capabilities of this source
    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities::SEARCH
    }

    /// Whether this source supports search
    fn supports_search(&self) -> bool {
        self.capabilities().contains(SourceCapabilities::SEARCH)
    }

    /// Whether this source supports BibTeX export
    fn supports_bibtex(&self) -> bool {
        self.capabilities().contains(SourceCapabilities::BIBTEX)
    }

    /// Search for works matching the query, best match first
    async fn search(&self, _query: &WorkQuery) -> Result<Vec<Work>, SourceError> {
        Err(SourceError::NotImplemented)
    }

    /// Full metadata record for a DOI
    async fn get_metadata(&self, _doi: &str) -> Result<serde_json::Value, SourceError> {
        Err(SourceError::NotImplemented)
    }

    /// BibTeX entry for a DOI
    async fn get_bibtex(&self, _doi: &str) -> Result<String, SourceError> {
        Err(SourceError::NotImplemented)
    }
}

/// Errors that can occur when interacting with a source
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// The requested operation is not implemented for this source
    #[error("Operation not implemented for this source")]
    NotImplemented,

    /// Network or HTTP transport error
    #[error("Network error: {0}")]
    Network(String),

    /// Response could not be parsed
    #[error("Parse error: {0}")]
    Parse(String),

    /// Invalid request parameters
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Rate limit exceeded (HTTP 429)
    #[error("Rate limited{}", retry_hint(.retry_after))]
    RateLimit {
        /// Seconds to wait, from the `Retry-After` header
        retry_after: Option<u64>,
    },

    /// Work not found (HTTP 404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Any other HTTP error status
    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    /// Neither the API nor DOI content negotiation produced BibTeX
    #[error("Could not retrieve BibTeX for {0}")]
    BibtexUnavailable(String),

    /// IO error (file system)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("Error: {0}")]
    Other(String),
}

impl SourceError {
    /// Error code used in tagged tool results
    pub fn code(&self) -> &'static str {
        match self {
            SourceError::InvalidRequest(_) => "invalid_request",
            SourceError::RateLimit { .. } => "rate_limited",
            SourceError::NotFound(_) => "not_found",
            SourceError::BibtexUnavailable(_) => "bibtex_unavailable",
            _ => "api_error",
        }
    }
}

fn retry_hint(retry_after: &Option<u64>) -> String {
    match retry_after {
        Some(seconds) => format!(" (retry after {}s)", seconds),
        None => String::new(),
    }
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        SourceError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for SourceError {
    fn from(err: serde_json::Error) -> Self {
        SourceError::Parse(format!("JSON: {}", err))
    }
}
