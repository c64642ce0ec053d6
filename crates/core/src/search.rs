//! Web Search Collaborator
//!
//! A query goes in, a list of short result snippets comes out. The orchestrator
//! only ever reads `description`; title and url are kept for callers that
//! want to render sources.

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

const DUCKDUCKGO_ENDPOINT: &str = "https://api.duckduckgo.com/";

/// One hit returned by a search provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub description: String,
    pub url: String,
}

/// Defines the contract for any web search backend.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Runs `query` verbatim and returns the hits in provider order.
    async fn search(&self, query: &str) -> Result<Vec<SearchResult>>;
}

/// Joins result descriptions with newlines, the form fed back to the planner.
pub fn join_descriptions(results: &[SearchResult]) -> String {
    results
        .iter()
        .map(|r| r.description.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

/// A `SearchProvider` backed by the DuckDuckGo Instant Answer API.
pub struct DuckDuckGoSearch {
    client: reqwest::Client,
    endpoint: String,
    max_results: usize,
}

impl DuckDuckGoSearch {
    /// Creates a search client returning at most `max_results` hits per query.
    pub fn new(max_results: usize, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("parley/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build search HTTP client")?;
        Ok(Self {
            client,
            endpoint: DUCKDUCKGO_ENDPOINT.to_string(),
            max_results,
        })
    }

    /// Points the client at a different host, e.g. a local stub server.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct InstantAnswer {
    heading: String,
    abstract_text: String,
    #[serde(rename = "AbstractURL")]
    abstract_url: String,
    related_topics: Vec<RelatedTopic>,
}

/// Either a single topic (`Text` + `FirstURL`) or a named group of topics.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct RelatedTopic {
    text: Option<String>,
    #[serde(rename = "FirstURL")]
    first_url: Option<String>,
    topics: Vec<RelatedTopic>,
}

fn collect_topics(topics: Vec<RelatedTopic>, out: &mut Vec<SearchResult>) {
    for topic in topics {
        if let Some(text) = topic.text.filter(|t| !t.trim().is_empty()) {
            let title = text
                .split_once(" - ")
                .map(|(title, _)| title.to_string())
                .unwrap_or_else(|| text.clone());
            out.push(SearchResult {
                title,
                description: text,
                url: topic.first_url.unwrap_or_default(),
            });
        }
        collect_topics(topic.topics, out);
    }
}

fn results_from_answer(answer: InstantAnswer, max_results: usize) -> Vec<SearchResult> {
    let mut results = Vec::new();
    if !answer.abstract_text.trim().is_empty() {
        results.push(SearchResult {
            title: answer.heading,
            description: answer.abstract_text,
            url: answer.abstract_url,
        });
    }
    collect_topics(answer.related_topics, &mut results);
    results.truncate(max_results);
    results
}

#[async_trait]
impl SearchProvider for DuckDuckGoSearch {
    async fn search(&self, query: &str) -> Result<Vec<SearchResult>> {
        info!(%query, "Executing web search");
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("q", query),
                ("format", "json"),
                ("no_html", "1"),
                ("skip_disambig", "1"),
            ])
            .send()
            .await
            .context("Search request failed")?;

        let status = response.status();
        if !status.is_success() {
            bail!("Search provider returned HTTP {}", status);
        }

        // The API answers with a javascript content type, so decode by hand.
        let body = response
            .text()
            .await
            .context("Failed to read search response")?;
        let answer: InstantAnswer =
            serde_json::from_str(&body).context("Malformed search response")?;

        let results = results_from_answer(answer, self.max_results);
        debug!(count = results.len(), "Search completed");
        Ok(results)
    }
}

/// A `SearchProvider` that always returns the same results.
///
/// Handy for offline development and for tests that exercise the
/// `web_search` action without network access.
#[derive(Debug, Clone, Default)]
pub struct StaticSearch {
    results: Vec<SearchResult>,
}

impl StaticSearch {
    pub fn new(results: Vec<SearchResult>) -> Self {
        Self { results }
    }

    /// Builds results whose descriptions are the given snippets.
    pub fn from_snippets<I, S>(snippets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let results = snippets
            .into_iter()
            .enumerate()
            .map(|(i, snippet)| SearchResult {
                title: format!("Result {}", i + 1),
                description: snippet.into(),
                url: format!("https://example.com/{}", i + 1),
            })
            .collect();
        Self { results }
    }
}

#[async_trait]
impl SearchProvider for StaticSearch {
    async fn search(&self, _query: &str) -> Result<Vec<SearchResult>> {
        Ok(self.results.clone())
    }
}
