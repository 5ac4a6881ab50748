use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use semsearch::embedding::HashingTextEmbedder;
use semsearch::error::{Result, SemsearchError};
use semsearch::retrieval::{Retriever, WebSearchProvider};
use semsearch::service::SemanticSearchService;
use semsearch::vector::index::VectorIndexConfig;

#[derive(Debug, Default)]
struct CountingWebSearch {
    calls: AtomicUsize,
}

#[async_trait]
impl WebSearchProvider for CountingWebSearch {
    async fn search_web(&self, query: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(format!("web results for {query}"))
    }
}

#[derive(Debug)]
struct FailingWebSearch;

#[async_trait]
impl WebSearchProvider for FailingWebSearch {
    async fn search_web(&self, _query: &str) -> Result<String> {
        Err(SemsearchError::other("backend offline"))
    }
}

async fn service() -> Result<Arc<SemanticSearchService>> {
    let service = SemanticSearchService::new(
        Arc::new(HashingTextEmbedder::new(256)?),
        VectorIndexConfig::flat(256),
    )?;
    let passages: Vec<String> = (1..=7).map(|i| format!("passage {i} about rust")).collect();
    let passages: Vec<&str> = passages.iter().map(String::as_str).collect();
    service.add_documents(&passages).await?;
    Ok(Arc::new(service))
}

#[tokio::test]
async fn web_provider_is_only_called_when_requested() -> Result<()> {
    let web = Arc::new(CountingWebSearch::default());
    let retriever = Retriever::new(service().await?).with_web_provider(web.clone());

    let context = retriever.retrieve("rust", 3, false).await?;
    assert_eq!(context.passages.len(), 3);
    assert!(context.web_content.is_empty());
    assert_eq!(web.calls.load(Ordering::SeqCst), 0);

    let context = retriever.retrieve("rust", 3, true).await?;
    assert_eq!(context.web_content, "web results for rust");
    assert_eq!(web.calls.load(Ordering::SeqCst), 1);
    Ok(())
}

#[tokio::test]
async fn rendered_context_lists_at_most_five_passages() -> Result<()> {
    let retriever = Retriever::new(service().await?)
        .with_web_provider(Arc::new(CountingWebSearch::default()));

    let context = retriever.retrieve("passage about rust", 7, true).await?;
    assert_eq!(context.passages.len(), 7);

    let rendered = context.render();
    for n in 1..=5 {
        assert!(rendered.contains(&format!("[Search result {n}]")));
    }
    assert!(!rendered.contains("[Search result 6]"));
    assert!(rendered.contains(&context.passages[0].text));
    assert!(rendered.ends_with("---------- [Web search] ----------\nweb results for passage about rust"));
    Ok(())
}

#[tokio::test]
async fn errors_from_either_side_propagate() -> Result<()> {
    let retriever =
        Retriever::new(service().await?).with_web_provider(Arc::new(FailingWebSearch));
    assert!(matches!(
        retriever.retrieve("rust", 2, true).await,
        Err(SemsearchError::Other(_))
    ));
    assert!(retriever.retrieve("rust", 2, false).await.is_ok());
    assert!(matches!(
        retriever.retrieve("rust", 0, false).await,
        Err(SemsearchError::InvalidArgument(_))
    ));
    Ok(())
}

#[tokio::test]
async fn missing_provider_yields_empty_web_section() -> Result<()> {
    let retriever = Retriever::new(service().await?);
    let context = retriever.retrieve("rust", 1, true).await?;
    assert_eq!(context.passages.len(), 1);
    assert!(context.web_content.is_empty());
    Ok(())
}
