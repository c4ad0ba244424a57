//! Handlers for the CrossRef metadata tools.

use std::sync::Arc;

use serde_json::Value;

use super::tools::{optional_i64, optional_str, required_str, ToolError, ToolHandler};
use crate::models::WorkQuery;
use crate::sources::{find_published_version, Source};

fn year_arg(args: &Value, name: &str) -> Option<i32> {
    optional_i64(args, name).and_then(|y| i32::try_from(y).ok())
}

/// Handler for `search`
#[derive(Debug)]
pub struct SearchHandler {
    pub source: Arc<dyn Source>,
}

#[async_trait::async_trait]
impl ToolHandler for SearchHandler {
    async fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let mut query = WorkQuery::new(optional_str(&args, "query").unwrap_or_default());
        if let Some(author) = optional_str(&args, "author") {
            query = query.author(author);
        }
        if let Some(title) = optional_str(&args, "title") {
            query = query.title(title);
        }
        if let Some(year) = year_arg(&args, "year") {
            query = query.year(year);
        }
        if let Some(work_type) = optional_str(&args, "work_type") {
            query = query.work_type(work_type);
        }
        if let Some(rows) = optional_i64(&args, "rows").filter(|r| *r > 0) {
            query = query.rows(rows as usize);
        }

        if !query.has_terms() {
            return Err(ToolError::invalid_request(
                "At least one of query, author, or title is required.",
            ));
        }

        let works = self.source.search(&query).await?;
        Ok(serde_json::to_value(works)?)
    }
}

/// Handler for `get_metadata`
#[derive(Debug)]
pub struct GetMetadataHandler {
    pub source: Arc<dyn Source>,
}

#[async_trait::async_trait]
impl ToolHandler for GetMetadataHandler {
    async fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let doi = required_str(&args, "doi")?;
        Ok(self.source.get_metadata(doi).await?)
    }
}

/// Handler for `get_bibtex`; the result is the raw BibTeX string
#[derive(Debug)]
pub struct GetBibtexHandler {
    pub source: Arc<dyn Source>,
}

#[async_trait::async_trait]
impl ToolHandler for GetBibtexHandler {
    async fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let doi = required_str(&args, "doi")?;
        Ok(Value::String(self.source.get_bibtex(doi).await?))
    }
}

/// Handler for `find_published_version`; `null` when there is no confident match
#[derive(Debug)]
pub struct FindPublishedVersionHandler {
    pub source: Arc<dyn Source>,
}

#[async_trait::async_trait]
impl ToolHandler for FindPublishedVersionHandler {
    async fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let title = required_str(&args, "title")?;
        let author = optional_str(&args, "author");
        let year = year_arg(&args, "working_paper_year");

        let found = find_published_version(self.source.as_ref(), title, author, year).await?;
        Ok(serde_json::to_value(found)?)
    }
}
