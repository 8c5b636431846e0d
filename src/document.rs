//! News documents and the source they are fetched from.
//!
//! A [`Document`] is immutable once fetched and is shared read-only by every
//! agent in a run. Acquisition (scraping, feed polling) happens elsewhere;
//! this crate only needs the [`DocumentSource`] lookup contract.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use unicode_segmentation::UnicodeSegmentation;

use crate::error::SourceError;

/// Marker inserted between sampled excerpt segments.
const ELISION: &str = "\n[…]\n";

/// A normalized news document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Headline.
    pub title: String,
    /// Plain-text article body.
    pub body: String,
    /// Image URLs attached to the article.
    #[serde(default)]
    pub images: Vec<String>,
    /// Canonical URL of the article.
    #[serde(default)]
    pub source_url: String,
}

impl Document {
    /// Creates a text-only document.
    #[must_use]
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            images: Vec::new(),
            source_url: String::new(),
        }
    }

    /// Attaches image URLs.
    #[must_use]
    pub fn with_images(mut self, images: Vec<String>) -> Self {
        self.images = images;
        self
    }

    /// Sets the source URL.
    #[must_use]
    pub fn with_source_url(mut self, url: impl Into<String>) -> Self {
        self.source_url = url.into();
        self
    }

    /// Returns `true` if the document carries at least one image.
    #[must_use]
    pub fn has_images(&self) -> bool {
        !self.images.is_empty()
    }

    /// Headline and body joined, the text protocol rules are matched against.
    #[must_use]
    pub fn full_text(&self) -> String {
        format!("{}\n\n{}", self.title, self.body)
    }

    /// Returns the body truncated to `max_chars` graphemes.
    ///
    /// Appends an elision marker when anything was cut.
    #[must_use]
    pub fn truncated_body(&self, max_chars: usize) -> String {
        let graphemes: Vec<&str> = self.body.graphemes(true).collect();
        if graphemes.len() <= max_chars {
            return self.body.clone();
        }
        let mut out = graphemes[..max_chars].concat();
        out.push_str(ELISION.trim_end());
        out
    }

    /// Samples head, middle, and tail excerpts totalling about `budget`
    /// graphemes.
    ///
    /// Bodies within budget are returned whole. The sample size is bounded
    /// independent of document length.
    #[must_use]
    pub fn sampled_body(&self, budget: usize) -> String {
        let graphemes: Vec<&str> = self.body.graphemes(true).collect();
        let total = graphemes.len();
        if total <= budget {
            return self.body.clone();
        }

        let part = budget / 3;
        let head = &graphemes[..part];
        let mid_start = (total - part) / 2;
        let middle = &graphemes[mid_start..mid_start + part];
        let tail = &graphemes[total - part..];

        let mut out = String::with_capacity(budget * 4 + ELISION.len() * 2);
        out.push_str(&head.concat());
        out.push_str(ELISION);
        out.push_str(&middle.concat());
        out.push_str(ELISION);
        out.push_str(&tail.concat());
        out
    }
}

/// Supplies documents by identifier.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Fetches the document stored under `id`.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::NotFound`] when no such document exists.
    async fn fetch(&self, id: &str) -> Result<Document, SourceError>;
}

/// Reads documents from `<dir>/<id>.json` files.
///
/// This is the hand-off point from the ingestion pipeline: scrapers write
/// normalized JSON documents, analysis runs read them back.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    dir: PathBuf,
}

impl DirectorySource {
    /// Creates a source rooted at `dir`.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, id: &str) -> Result<PathBuf, SourceError> {
        let valid = !id.is_empty()
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
            && !id.starts_with('.');
        if !valid {
            return Err(SourceError::InvalidId { id: id.to_string() });
        }
        Ok(self.dir.join(format!("{id}.json")))
    }
}

#[async_trait]
impl DocumentSource for DirectorySource {
    async fn fetch(&self, id: &str) -> Result<Document, SourceError> {
        let path = self.path_for(id)?;
        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(SourceError::NotFound { id: id.to_string() });
            }
            Err(source) => {
                return Err(SourceError::Io {
                    id: id.to_string(),
                    source,
                });
            }
        };
        serde_json::from_str(&raw).map_err(|source| SourceError::Malformed {
            id: id.to_string(),
            source,
        })
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_sampled_body_short_is_whole() {
        let doc = Document::new("t", "short body");
        assert_eq!(doc.sampled_body(100), "short body");
    }

    #[test]
    fn test_sampled_body_bounded() {
        let body = "a".repeat(1_000) + &"b".repeat(1_000) + &"c".repeat(1_000);
        let doc = Document::new("t", body);
        let sample = doc.sampled_body(300);
        assert!(sample.starts_with(&"a".repeat(100)));
        assert!(sample.ends_with(&"c".repeat(100)));
        assert!(sample.contains(&"b".repeat(100)));
        assert_eq!(sample.matches("[…]").count(), 2);
        assert!(sample.chars().count() < 320);
    }

    #[test]
    fn test_sampled_body_respects_graphemes() {
        let doc = Document::new("t", "é".repeat(50) + &"€".repeat(50));
        let sample = doc.sampled_body(30);
        assert!(sample.starts_with(&"é".repeat(10)));
        assert!(sample.ends_with(&"€".repeat(10)));
    }

    #[test]
    fn test_truncated_body() {
        let doc = Document::new("t", "abcdefghij");
        assert_eq!(doc.truncated_body(20), "abcdefghij");
        let cut = doc.truncated_body(4);
        assert!(cut.starts_with("abcd"));
        assert!(cut.ends_with("[…]"));
    }

    #[tokio::test]
    async fn test_directory_source_roundtrip() {
        let dir = TempDir::new().unwrap_or_else(|e| panic!("tempdir: {e}"));
        let doc = Document::new("Budget day", "The minister said €1bn.")
            .with_images(vec!["https://img.example/1.jpg".to_string()])
            .with_source_url("https://news.example/budget");
        let json = serde_json::to_string(&doc).unwrap_or_else(|e| panic!("json: {e}"));
        std::fs::write(dir.path().join("budget-2026.json"), json)
            .unwrap_or_else(|e| panic!("write: {e}"));

        let source = DirectorySource::new(dir.path());
        let fetched = source
            .fetch("budget-2026")
            .await
            .unwrap_or_else(|e| panic!("fetch: {e}"));
        assert_eq!(fetched, doc);
    }

    #[tokio::test]
    async fn test_directory_source_not_found() {
        let dir = TempDir::new().unwrap_or_else(|e| panic!("tempdir: {e}"));
        let source = DirectorySource::new(dir.path());
        let err = source.fetch("missing").await;
        assert!(matches!(err, Err(SourceError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_directory_source_rejects_traversal() {
        let source = DirectorySource::new("/tmp");
        assert!(matches!(
            source.fetch("../etc/passwd").await,
            Err(SourceError::InvalidId { .. })
        ));
        assert!(matches!(
            source.fetch("").await,
            Err(SourceError::InvalidId { .. })
        ));
    }

    #[tokio::test]
    async fn test_directory_source_malformed() {
        let dir = TempDir::new().unwrap_or_else(|e| panic!("tempdir: {e}"));
        std::fs::write(dir.path().join("bad.json"), "{not json")
            .unwrap_or_else(|e| panic!("write: {e}"));
        let source = DirectorySource::new(dir.path());
        assert!(matches!(
            source.fetch("bad").await,
            Err(SourceError::Malformed { .. })
        ));
    }
}
