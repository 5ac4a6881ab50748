//! Retrieval context assembly.
//!
//! A [`Retriever`] runs a semantic search against a
//! [`SemanticSearchService`] and, when asked, a web search through an injected
//! [`WebSearchProvider`]. Both run concurrently. The resulting
//! [`RetrievalContext`] renders as the plain-text listing handed to a
//! downstream answer generator.

use std::fmt::{self, Debug, Write as _};
use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::service::{SearchResult, SemanticSearchService};

/// Passages shown by [`RetrievalContext::render`].
pub const RENDERED_PASSAGES: usize = 5;

/// External web search backend.
#[async_trait]
pub trait WebSearchProvider: Send + Sync + Debug {
    /// Return free text describing web results for `query`.
    async fn search_web(&self, query: &str) -> Result<String>;
}

/// Provider that always returns the same text. Used by the CLI's `--web-text`.
#[derive(Debug, Clone, Default)]
pub struct StaticWebSearchProvider {
    text: String,
}

impl StaticWebSearchProvider {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

#[async_trait]
impl WebSearchProvider for StaticWebSearchProvider {
    async fn search_web(&self, _query: &str) -> Result<String> {
        Ok(self.text.clone())
    }
}

/// Ranked passages plus optional web content for one query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalContext {
    pub query: String,
    pub passages: Vec<SearchResult>,
    pub web_content: String,
}

impl RetrievalContext {
    /// Numbered listing of the first passages followed by the web section.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (idx, passage) in self.passages.iter().take(RENDERED_PASSAGES).enumerate() {
            let _ = write!(
                out,
                "---------- [Search result {}] ----------\n\n{}\n\n",
                idx + 1,
                passage.text
            );
        }
        out.push_str("---------- [Web search] ----------\n");
        out.push_str(&self.web_content);
        out
    }
}

impl fmt::Display for RetrievalContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Combines semantic and web search for a query.
#[derive(Debug, Clone)]
pub struct Retriever {
    service: Arc<SemanticSearchService>,
    web: Option<Arc<dyn WebSearchProvider>>,
}

impl Retriever {
    pub fn new(service: Arc<SemanticSearchService>) -> Self {
        Self { service, web: None }
    }

    /// Attach a web search backend.
    pub fn with_web_provider(mut self, provider: Arc<dyn WebSearchProvider>) -> Self {
        self.web = Some(provider);
        self
    }

    pub fn service(&self) -> &Arc<SemanticSearchService> {
        &self.service
    }

    /// Search the index and, if `use_web` is set, the web.
    ///
    /// Semantic search errors propagate. With `use_web` set but no provider
    /// attached, the web section is empty.
    pub async fn retrieve(&self, query: &str, top_k: usize, use_web: bool) -> Result<RetrievalContext> {
        let web = async {
            match (&self.web, use_web) {
                (Some(provider), true) => provider.search_web(query).await,
                (None, true) => {
                    warn!("web search requested but no provider is configured");
                    Ok(String::new())
                }
                _ => Ok(String::new()),
            }
        };
        let (passages, web_content) = futures::join!(self.service.search(query, top_k), web);
        let passages = passages?;
        let web_content = web_content?;

        debug!(
            "retrieved {} passages, {} bytes of web content",
            passages.len(),
            web_content.len()
        );
        Ok(RetrievalContext {
            query: query.to_string(),
            passages,
            web_content,
        })
    }
}
