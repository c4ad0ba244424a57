//! Core data models for citations, bibliography entries and scholarly works.

mod bib;
mod citation;
mod work;

pub use bib::{BibIndex, BibIndexEntry, BibRecord, Dialect, Replacement};
pub use citation::{Citation, CitationType};
pub use work::{PublishedVersion, Work, WorkAuthor, WorkQuery};
