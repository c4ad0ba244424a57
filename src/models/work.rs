//! Scholarly work records returned by metadata sources, and the query used to find them.

use serde::{Deserialize, Serialize};

/// Query for bibliographic search
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkQuery {
    /// Free-text bibliographic query (citation string, title, ...)
    pub query: String,

    /// Author name filter
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,

    /// Title filter
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Restrict to works published in this year
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,

    /// Restrict to a work type such as `journal-article`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub work_type: Option<String>,

    /// Maximum number of results to return
    pub rows: usize,
}

impl WorkQuery {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            rows: 5,
            ..Default::default()
        }
    }

    pub fn author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    pub fn work_type(mut self, work_type: impl Into<String>) -> Self {
        self.work_type = Some(work_type.into());
        self
    }

    pub fn rows(mut self, rows: usize) -> Self {
        self.rows = rows;
        self
    }

    /// Whether at least one of query, author or title is set
    pub fn has_terms(&self) -> bool {
        let set = |s: Option<&String>| s.is_some_and(|s| !s.trim().is_empty());
        !self.query.trim().is_empty() || set(self.author.as_ref()) || set(self.title.as_ref())
    }
}

/// Author of a work as reported by the source
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkAuthor {
    pub given: String,
    pub family: String,
}

impl WorkAuthor {
    pub fn new(given: impl Into<String>, family: impl Into<String>) -> Self {
        Self {
            given: given.into(),
            family: family.into(),
        }
    }
}

/// A work found by a search, scored against the query that found it
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Work {
    pub title: String,
    pub authors: Vec<WorkAuthor>,
    pub year: Option<i32>,
    pub journal: String,
    pub volume: Option<String>,
    pub issue: Option<String>,
    pub pages: Option<String>,
    pub doi: Option<String>,
    #[serde(rename = "type")]
    pub work_type: Option<String>,
    /// Match confidence from 0 (no evidence) to 9 (every signal matched)
    pub confidence_score: u32,
}

impl Work {
    /// Family names of all authors
    pub fn family_names(&self) -> Vec<&str> {
        self.authors.iter().map(|a| a.family.as_str()).collect()
    }
}

/// A published journal version of a working paper
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishedVersion {
    #[serde(flatten)]
    pub work: Work,
    /// Jaccard similarity between the query and found titles
    pub similarity: f64,
    /// BibTeX for the published version, when the source could provide it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bibtex: Option<String>,
}
