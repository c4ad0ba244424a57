//! Mock source for testing purposes.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use crate::models::{Work, WorkQuery};
use crate::sources::{Source, SourceCapabilities, SourceError};

/// A mock source for testing that returns predefined responses.
#[derive(Debug, Default)]
pub struct MockSource {
    works: Mutex<Vec<Work>>,
    bibtex: Mutex<HashMap<String, String>>,
    metadata: Mutex<HashMap<String, serde_json::Value>>,
    rate_limited: Mutex<Option<Option<u64>>>,
    last_query: Mutex<Option<WorkQuery>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MockSource {
    /// Create a new mock source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the works returned by every search.
    pub fn set_works(&self, works: Vec<Work>) {
        *lock(&self.works) = works;
    }

    /// Register a BibTeX entry for a DOI.
    pub fn set_bibtex(&self, doi: &str, bibtex: &str) {
        lock(&self.bibtex).insert(doi.to_string(), bibtex.to_string());
    }

    /// Register a metadata record for a DOI.
    pub fn set_metadata(&self, doi: &str, metadata: serde_json::Value) {
        lock(&self.metadata).insert(doi.to_string(), metadata);
    }

    /// Make every call fail with a rate-limit error.
    pub fn set_rate_limited(&self, retry_after: Option<u64>) {
        *lock(&self.rate_limited) = Some(retry_after);
    }

    /// The most recent search query.
    pub fn last_query(&self) -> Option<WorkQuery> {
        lock(&self.last_query).clone()
    }

    fn check_rate_limit(&self) -> Result<(), SourceError> {
        match *lock(&self.rate_limited) {
            Some(retry_after) => Err(SourceError::RateLimit { retry_after }),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Source for MockSource {
    fn id(&self) -> &str {
        "mock"
    }

    fn name(&self) -> &str {
        "Mock Source"
    }

    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities::SEARCH | SourceCapabilities::METADATA | SourceCapabilities::BIBTEX
    }

    async fn search(&self, query: &WorkQuery) -> Result<Vec<Work>, SourceError> {
        *lock(&self.last_query) = Some(query.clone());
        self.check_rate_limit()?;
        if !query.has_terms() {
            return Err(SourceError::InvalidRequest(
                "At least one of query, author, or title is required.".to_string(),
            ));
        }
        Ok(lock(&self.works).iter().take(query.rows).cloned().collect())
    }

    async fn get_metadata(&self, doi: &str) -> Result<serde_json::Value, SourceError> {
        self.check_rate_limit()?;
        lock(&self.metadata)
            .get(doi)
            .cloned()
            .ok_or_else(|| SourceError::NotFound(format!("/works/{}", doi)))
    }

    async fn get_bibtex(&self, doi: &str) -> Result<String, SourceError> {
        self.check_rate_limit()?;
        lock(&self.bibtex)
            .get(doi)
            .cloned()
            .ok_or_else(|| SourceError::BibtexUnavailable(doi.to_string()))
    }
}
