//! Search capability used by tool-using agents.
//!
//! [`DuckDuckGoSearch`] queries the DuckDuckGo Instant Answer API, which
//! needs no API key. It returns abstracts and related topics rather than a
//! full result listing, which is enough context for a single verification
//! round. [`DisabledSearch`] reports itself unavailable so runs can be made
//! without network search.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::AgentError;

/// DuckDuckGo Instant Answer API endpoint (no API key required).
const DDG_API_URL: &str = "https://api.duckduckgo.com/";

/// Maximum snippets returned per query.
const MAX_SNIPPETS: usize = 5;

/// A ranked search result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snippet {
    /// Result title or source name.
    pub title: String,
    /// Snippet text.
    pub text: String,
    /// Result URL (may be empty).
    pub url: String,
}

/// Text search backend.
#[async_trait]
pub trait SearchCapability: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &'static str;

    /// Runs a query and returns a short ranked list of snippets.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::SearchUnavailable`] when the backend fails.
    async fn query(&self, text: &str) -> Result<Vec<Snippet>, AgentError>;
}

/// Formats snippets as the tool-response payload sent back to the model.
#[must_use]
pub fn format_snippets(query: &str, snippets: &[Snippet]) -> String {
    serde_json::json!({
        "query": query,
        "results": snippets,
    })
    .to_string()
}

/// Search backed by the DuckDuckGo Instant Answer API.
#[derive(Debug, Clone)]
pub struct DuckDuckGoSearch {
    client: reqwest::Client,
}

impl DuckDuckGoSearch {
    /// Creates a client with the given request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::SearchUnavailable`] if the HTTP client cannot
    /// be built.
    pub fn new(timeout: Duration) -> Result<Self, AgentError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("pressroom/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AgentError::SearchUnavailable {
                message: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self { client })
    }

    /// Extracts snippets from an Instant Answer response body.
    fn parse_response(data: &serde_json::Value) -> Vec<Snippet> {
        let mut snippets = Vec::new();

        if let Some(text) = data["AbstractText"].as_str()
            && !text.is_empty()
        {
            snippets.push(Snippet {
                title: data["AbstractSource"]
                    .as_str()
                    .unwrap_or("Abstract")
                    .to_string(),
                text: text.to_string(),
                url: data["AbstractURL"].as_str().unwrap_or_default().to_string(),
            });
        }

        if let Some(answer) = data["Answer"].as_str()
            && !answer.is_empty()
        {
            snippets.push(Snippet {
                title: "Instant Answer".to_string(),
                text: answer.to_string(),
                url: String::new(),
            });
        }

        if let Some(topics) = data["RelatedTopics"].as_array() {
            snippets.extend(
                topics
                    .iter()
                    .filter_map(|t| {
                        let text = t["Text"].as_str().filter(|s| !s.is_empty())?;
                        Some(Snippet {
                            title: "Related".to_string(),
                            text: text.to_string(),
                            url: t["FirstURL"].as_str().unwrap_or_default().to_string(),
                        })
                    })
                    .take(MAX_SNIPPETS),
            );
        }

        snippets.truncate(MAX_SNIPPETS);
        snippets
    }
}

#[async_trait]
impl SearchCapability for DuckDuckGoSearch {
    fn name(&self) -> &'static str {
        "duckduckgo"
    }

    async fn query(&self, text: &str) -> Result<Vec<Snippet>, AgentError> {
        let response = self
            .client
            .get(DDG_API_URL)
            .query(&[
                ("q", text),
                ("format", "json"),
                ("no_html", "1"),
                ("skip_disambig", "1"),
            ])
            .send()
            .await
            .map_err(|e| AgentError::SearchUnavailable {
                message: format!("request failed: {e}"),
            })?;

        if !response.status().is_success() {
            return Err(AgentError::SearchUnavailable {
                message: format!("search API returned {}", response.status()),
            });
        }

        let body: serde_json::Value =
            response
                .json()
                .await
                .map_err(|e| AgentError::SearchUnavailable {
                    message: format!("invalid search response: {e}"),
                })?;

        Ok(Self::parse_response(&body))
    }
}

/// Search backend that is always unavailable.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledSearch;

#[async_trait]
impl SearchCapability for DisabledSearch {
    fn name(&self) -> &'static str {
        "disabled"
    }

    async fn query(&self, _text: &str) -> Result<Vec<Snippet>, AgentError> {
        Err(AgentError::SearchUnavailable {
            message: "search is disabled".to_string(),
        })
    }
}
