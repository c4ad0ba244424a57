//! Locate the published journal version of a working paper.

use std::collections::HashSet;

use crate::models::{PublishedVersion, WorkQuery};
use crate::sources::{Source, SourceError};

const STOPWORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for",
];

/// Minimum title similarity for a candidate to count as the published version
const MIN_SIMILARITY: f64 = 0.5;

/// Lowercase whitespace tokens of a title, without stopwords
pub(crate) fn title_words(title: &str) -> HashSet<String> {
    title
        .split_whitespace()
        .map(str::to_lowercase)
        .filter(|w| !STOPWORDS.contains(&w.as_str()))
        .collect()
}

/// Jaccard similarity of the non-stopword tokens of two titles
pub fn title_similarity(a: &str, b: &str) -> f64 {
    let words_a = title_words(a);
    let words_b = title_words(b);
    if words_a.is_empty() || words_b.is_empty() {
        return 0.0;
    }
    let intersection = words_a.intersection(&words_b).count();
    let union = words_a.union(&words_b).count();
    intersection as f64 / union as f64
}

/// Search journal articles for the published version of a working paper.
///
/// Returns the candidate with the highest title similarity when it exceeds 0.5 and has a
/// DOI, with its BibTeX attached if the source can provide it. `Ok(None)` means no
/// confident match.
pub async fn find_published_version(
    source: &dyn Source,
    title: &str,
    author: Option<&str>,
    working_paper_year: Option<i32>,
) -> Result<Option<PublishedVersion>, SourceError> {
    tracing::debug!(
        "Looking for published version of {:?} (author: {:?}, working paper year: {:?})",
        title,
        author,
        working_paper_year
    );

    let mut query = WorkQuery::new("")
        .title(title)
        .work_type("journal-article")
        .rows(10);
    if let Some(author) = author.filter(|a| !a.is_empty()) {
        query = query.author(author);
    }

    let candidates = source.search(&query).await?;

    let mut best = None;
    let mut best_similarity = 0.0;
    for work in candidates {
        let similarity = title_similarity(title, &work.title);
        if similarity > best_similarity {
            best_similarity = similarity;
            best = Some(work);
        }
    }

    let Some(work) = best.filter(|w| best_similarity > MIN_SIMILARITY && w.doi.is_some()) else {
        tracing::debug!("No confident match (best similarity {:.2})", best_similarity);
        return Ok(None);
    };

    let bibtex = match work.doi.as_deref() {
        Some(doi) => match source.get_bibtex(doi).await {
            Ok(bibtex) => Some(bibtex),
            Err(e) => {
                tracing::debug!("Matched {} but BibTeX is unavailable: {}", doi, e);
                None
            }
        },
        None => None,
    };

    Ok(Some(PublishedVersion {
        work,
        similarity: best_similarity,
        bibtex,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Work;
    use crate::sources::MockSource;

    fn work(title: &str, doi: Option<&str>) -> Work {
        Work {
            title: title.to_string(),
            doi: doi.map(String::from),
            work_type: Some("journal-article".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_title_similarity() {
        assert_eq!(title_similarity("The Effect of Aid", "the effect of aid"), 1.0);
        // {effect, of, aid} vs {effect, of, trade}: 2 shared out of 4
        assert_eq!(title_similarity("Effect of Aid", "Effect of Trade"), 0.5);
        assert_eq!(title_similarity("the a an", "Effect"), 0.0);
    }

    #[tokio::test]
    async fn test_best_match_with_bibtex() {
        let source = MockSource::new();
        source.set_works(vec![
            work("Selection and Comparative Advantage", Some("10.1/weak")),
            work(
                "Selection and Comparative Advantage in Technology Adoption",
                Some("10.3982/ECTA7749"),
            ),
        ]);
        source.set_bibtex("10.3982/ECTA7749", "@article{Suri_2011}");

        let found = find_published_version(
            &source,
            "Selection and Comparative Advantage in Technology Adoption",
            Some("Suri"),
            Some(2006),
        )
        .await
        .unwrap()
        .unwrap();

        assert_eq!(found.work.doi.as_deref(), Some("10.3982/ECTA7749"));
        assert_eq!(found.similarity, 1.0);
        assert_eq!(found.bibtex.as_deref(), Some("@article{Suri_2011}"));

        let query = source.last_query().unwrap();
        assert_eq!(query.work_type.as_deref(), Some("journal-article"));
        assert_eq!(query.rows, 10);
        assert_eq!(query.author.as_deref(), Some("Suri"));
    }

    #[tokio::test]
    async fn test_low_similarity_is_rejected() {
        let source = MockSource::new();
        source.set_works(vec![work("Something Entirely Different", Some("10.1/x"))]);

        let found = find_published_version(&source, "Pineapple in Ghana", None, None)
            .await
            .unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_match_without_doi_is_rejected() {
        let source = MockSource::new();
        source.set_works(vec![work("Pineapple in Ghana", None)]);

        let found = find_published_version(&source, "Pineapple in Ghana", None, None)
            .await
            .unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_missing_bibtex_still_matches() {
        let source = MockSource::new();
        source.set_works(vec![work("Pineapple in Ghana", Some("10.1/x"))]);

        let found = find_published_version(&source, "Pineapple in Ghana", None, None)
            .await
            .unwrap()
            .unwrap();
        assert!(found.bibtex.is_none());
    }
}
