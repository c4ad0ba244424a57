//! CrossRef metadata source.

use async_trait::async_trait;
use reqwest::header::{ACCEPT, RETRY_AFTER};
use reqwest::{Response, StatusCode};
use serde::Deserialize;
use std::time::Duration;

use super::published::title_words;
use crate::models::{Work, WorkAuthor, WorkQuery};
use crate::sources::{Source, SourceCapabilities, SourceError};
use crate::utils::{api_retry_config, with_retry, HttpClient, RetryConfig};

pub const CROSSREF_API_BASE: &str = "https://api.crossref.org";
pub const DOI_RESOLVER_BASE: &str = "https://doi.org";

const BIBTEX_MIME: &str = "application/x-bibtex";

/// CrossRef research source
///
/// Uses the CrossRef REST API for search and DOI metadata, and DOI content negotiation as
/// a BibTeX fallback. Every request carries the `mailto` contact so that it is served
/// from the polite pool.
#[derive(Debug, Clone)]
pub struct CrossRefSource {
    client: HttpClient,
    mailto: String,
    base_url: String,
    doi_base_url: String,
    retry: RetryConfig,
}

impl CrossRefSource {
    /// Create a source identified by `mailto`, with default timeout and throttling
    pub fn new(mailto: impl Into<String>) -> Result<Self, SourceError> {
        Self::with_settings(mailto, Duration::from_secs(30), 10)
    }

    /// Create a source with an explicit request timeout and request rate
    pub fn with_settings(
        mailto: impl Into<String>,
        timeout: Duration,
        requests_per_second: u32,
    ) -> Result<Self, SourceError> {
        let mailto = mailto.into();
        if mailto.trim().is_empty() {
            return Err(SourceError::InvalidRequest(
                "mailto is required for the CrossRef API. Set CROSSREF_MAILTO or \
                 [crossref] mailto in the config file."
                    .to_string(),
            ));
        }

        let user_agent = format!(
            "{}/{} (mailto:{})",
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION"),
            mailto
        );
        let client =
            HttpClient::with_user_agent(&user_agent, timeout)?.rate_limited(requests_per_second);

        Ok(Self {
            client,
            mailto,
            base_url: CROSSREF_API_BASE.to_string(),
            doi_base_url: DOI_RESOLVER_BASE.to_string(),
            retry: api_retry_config(),
        })
    }

    /// Point the source at different API and DOI resolver hosts
    pub fn with_base_urls(mut self, base_url: &str, doi_base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self.doi_base_url = doi_base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn mailto(&self) -> &str {
        &self.mailto
    }

    fn search_params(&self, query: &WorkQuery) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("mailto", self.mailto.clone()),
            ("rows", query.rows.to_string()),
        ];
        if !query.query.is_empty() {
            params.push(("query.bibliographic", query.query.clone()));
        }
        if let Some(author) = query.author.as_deref().filter(|a| !a.is_empty()) {
            params.push(("query.author", author.to_string()));
        }
        if let Some(title) = query.title.as_deref().filter(|t| !t.is_empty()) {
            params.push(("query.title", title.to_string()));
        }

        let mut filters = Vec::new();
        if let Some(year) = query.year {
            filters.push(format!("from-pub-date:{},until-pub-date:{}", year, year));
        }
        if let Some(work_type) = query.work_type.as_deref().filter(|t| !t.is_empty()) {
            filters.push(format!("type:{}", work_type));
        }
        if !filters.is_empty() {
            params.push(("filter", filters.join(",")));
        }
        params
    }

    /// Try one BibTeX endpoint; any failure just means "not here"
    async fn fetch_bibtex(&self, url: &str) -> Option<String> {
        let response = self
            .client
            .get(url)
            .await
            .header(ACCEPT, BIBTEX_MIME)
            .send()
            .await;

        match response {
            Ok(response) if response.status() == StatusCode::OK => response.text().await.ok(),
            Ok(response) => {
                tracing::debug!("BibTeX lookup at {} returned {}", url, response.status());
                None
            }
            Err(e) => {
                tracing::debug!("BibTeX lookup at {} failed: {}", url, e);
                None
            }
        }
    }
}

/// Map CrossRef error statuses onto [`SourceError`]
async fn check_status(response: Response) -> Result<Response, SourceError> {
    let status = response.status();

    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse().ok());
        return Err(SourceError::RateLimit { retry_after });
    }
    if status == StatusCode::NOT_FOUND {
        return Err(SourceError::NotFound(response.url().to_string()));
    }
    if status.is_client_error() || status.is_server_error() {
        let body = response.text().await.unwrap_or_default();
        return Err(SourceError::Api {
            status: status.as_u16(),
            body,
        });
    }

    Ok(response)
}

/// Score a result against the query that produced it
fn confidence_score(item: &CRItem, query: &WorkQuery) -> u32 {
    let mut score = 0;

    if let Some(author) = query.author.as_deref().filter(|a| !a.is_empty()) {
        let names = item
            .author
            .iter()
            .map(|a| {
                format!(
                    "{} {}",
                    a.family.as_deref().unwrap_or_default(),
                    a.given.as_deref().unwrap_or_default()
                )
                .trim()
                .to_string()
            })
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();
        if names.contains(&author.to_lowercase()) {
            score += 3;
        }
    }

    if let Some(year) = query.year {
        if item.year() == Some(year) {
            score += 2;
        }
    }

    if let (Some(query_title), Some(title)) = (query.title.as_deref(), item.title.first()) {
        let query_words = title_words(query_title);
        let result_words = title_words(title);
        if query_words.intersection(&result_words).count() >= 2 {
            score += 2;
        }
    }

    if item.doi.as_deref().is_some_and(|d| !d.is_empty()) {
        score += 1;
    }

    if item.work_type.as_deref() == Some("journal-article") {
        score += 1;
    }

    score
}

#[async_trait]
impl Source for CrossRefSource {
    fn id(&self) -> &str {
        "crossref"
    }

    fn name(&self) -> &str {
        "CrossRef"
    }

    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities::SEARCH | SourceCapabilities::METADATA | SourceCapabilities::BIBTEX
    }

    async fn search(&self, query: &WorkQuery) -> Result<Vec<Work>, SourceError> {
        if !query.has_terms() {
            return Err(SourceError::InvalidRequest(
                "At least one of query, author, or title is required.".to_string(),
            ));
        }

        let url = format!("{}/works", self.base_url);
        let params = self.search_params(query);
        let (url, params) = (url.as_str(), &params);

        let data: CRResponse<CRWorkList> = with_retry(self.retry, move || async move {
            let response = self.client.get(url).await.query(params).send().await?;
            Ok(check_status(response).await?.json().await?)
        })
        .await?;

        tracing::debug!("CrossRef returned {} works", data.message.items.len());

        Ok(data
            .message
            .items
            .into_iter()
            .map(|item| {
                let confidence_score = confidence_score(&item, query);
                item.into_work(confidence_score)
            })
            .collect())
    }

    async fn get_metadata(&self, doi: &str) -> Result<serde_json::Value, SourceError> {
        let url = format!("{}/works/{}", self.base_url, doi);
        let params = [("mailto", self.mailto.as_str())];
        let (url, params) = (url.as_str(), &params);

        let data: CRResponse<serde_json::Value> = with_retry(self.retry, move || async move {
            let response = self.client.get(url).await.query(params).send().await?;
            Ok(check_status(response).await?.json().await?)
        })
        .await?;

        Ok(data.message)
    }

    async fn get_bibtex(&self, doi: &str) -> Result<String, SourceError> {
        let transform = format!("{}/works/{}/transform/{}", self.base_url, doi, BIBTEX_MIME);
        if let Some(bibtex) = self.fetch_bibtex(&transform).await {
            return Ok(bibtex);
        }

        let resolver = format!("{}/{}", self.doi_base_url, doi);
        if let Some(bibtex) = self.fetch_bibtex(&resolver).await {
            return Ok(bibtex);
        }

        Err(SourceError::BibtexUnavailable(doi.to_string()))
    }
}

// ===== CrossRef API Types =====

#[derive(Debug, Deserialize)]
struct CRResponse<T> {
    message: T,
}

#[derive(Debug, Deserialize)]
struct CRWorkList {
    #[serde(default)]
    items: Vec<CRItem>,
}

#[derive(Debug, Deserialize)]
struct CRAuthor {
    given: Option<String>,
    family: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CRDate {
    #[serde(rename = "date-parts", default)]
    date_parts: Vec<Vec<Option<i32>>>,
}

#[derive(Debug, Deserialize)]
struct CRItem {
    #[serde(default)]
    title: Vec<String>,
    #[serde(default)]
    author: Vec<CRAuthor>,
    published: Option<CRDate>,
    #[serde(rename = "container-title", default)]
    container_title: Vec<String>,
    volume: Option<String>,
    issue: Option<String>,
    page: Option<String>,
    #[serde(rename = "DOI")]
    doi: Option<String>,
    #[serde(rename = "type")]
    work_type: Option<String>,
}

impl CRItem {
    fn year(&self) -> Option<i32> {
        self.published
            .as_ref()
            .and_then(|d| d.date_parts.first())
            .and_then(|parts| parts.first().copied().flatten())
    }

    fn into_work(self, confidence_score: u32) -> Work {
        let year = self.year();
        Work {
            title: self.title.into_iter().next().unwrap_or_default(),
            authors: self
                .author
                .into_iter()
                .map(|a| WorkAuthor::new(a.given.unwrap_or_default(), a.family.unwrap_or_default()))
                .collect(),
            year,
            journal: self.container_title.into_iter().next().unwrap_or_default(),
            volume: self.volume,
            issue: self.issue,
            pages: self.page,
            doi: self.doi,
            work_type: self.work_type,
            confidence_score,
        }
    }
}
