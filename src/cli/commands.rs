//! Command implementations for the semsearch CLI.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};
use std::time::Instant;

use log::{debug, info};
use regex::Regex;

use crate::cli::args::*;
use crate::cli::output::*;
use crate::config::SemsearchConfig;
use crate::error::{Result, SemsearchError};
use crate::persistence::{load_snapshot, save_snapshot};
use crate::retrieval::{Retriever, StaticWebSearchProvider};
use crate::service::SemanticSearchService;

// A line containing only whitespace separates passages.
static PARAGRAPH_BREAK: LazyLock<std::result::Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"\r?\n[ \t]*\r?\n"));

/// Execute a CLI command.
pub async fn execute_command(args: SemsearchArgs) -> Result<()> {
    let config = load_config(&args)?;
    let store_path = args
        .store
        .clone()
        .unwrap_or_else(|| config.store_path.clone());
    debug!("using snapshot {}", store_path.display());

    match &args.command {
        Command::Add(add_args) => add_documents(add_args, &config, &store_path, &args).await,
        Command::Search(search_args) => {
            search_index(search_args, &config, &store_path, &args).await
        }
        Command::Stats => show_stats(&config, &store_path, &args),
    }
}

/// Load the configuration file, or defaults when none is given.
pub fn load_config(args: &SemsearchArgs) -> Result<SemsearchConfig> {
    match &args.config {
        Some(path) => {
            info!("loading configuration from {}", path.display());
            SemsearchConfig::from_file(path)
        }
        None => Ok(SemsearchConfig::default()),
    }
}

/// Split text into trimmed, non-empty passages separated by blank lines.
pub fn split_passages(text: &str) -> Result<Vec<String>> {
    let pattern = PARAGRAPH_BREAK
        .as_ref()
        .map_err(|e| SemsearchError::other(format!("passage pattern: {e}")))?;
    Ok(pattern
        .split(text)
        .map(str::trim)
        .filter(|passage| !passage.is_empty())
        .map(str::to_string)
        .collect())
}

/// Open the service stored at `store_path`, or an empty one if nothing is stored yet.
pub fn open_service(config: &SemsearchConfig, store_path: &Path) -> Result<SemanticSearchService> {
    let embedder = config.build_embedder()?;
    if store_path.exists() {
        SemanticSearchService::from_snapshot(embedder, load_snapshot(store_path)?)
    } else {
        SemanticSearchService::new(embedder, config.index.clone())
    }
}

fn open_existing_service(
    config: &SemsearchConfig,
    store_path: &Path,
) -> Result<SemanticSearchService> {
    if !store_path.exists() {
        return Err(SemsearchError::invalid_argument(format!(
            "no index at {}; add documents first",
            store_path.display()
        )));
    }
    open_service(config, store_path)
}

/// Add the passages of every file and save the snapshot.
async fn add_documents(
    args: &AddArgs,
    config: &SemsearchConfig,
    store_path: &Path,
    cli_args: &SemsearchArgs,
) -> Result<()> {
    if args.batch_size == 0 {
        return Err(SemsearchError::invalid_argument("batch size must be positive"));
    }
    let start_time = Instant::now();
    let service = open_service(config, store_path)?;

    let mut passages = Vec::new();
    for file in &args.files {
        let text = fs::read_to_string(file)?;
        let found = split_passages(&text)?;
        debug!("{}: {} passages", file.display(), found.len());
        passages.extend(found);
    }

    let mut documents_added = 0;
    for batch in passages.chunks(args.batch_size) {
        let texts: Vec<&str> = batch.iter().map(String::as_str).collect();
        documents_added += service.add_documents(&texts).await?.len();
        if cli_args.verbosity() > 1 {
            info!("processed {documents_added} passages...");
        }
    }

    save_snapshot(store_path, &service.snapshot())?;

    output_result(
        "Documents added successfully",
        &DocumentAdditionResult {
            files: args.files.len(),
            documents_added,
            total_documents: service.len(),
            store_path: store_path.to_path_buf(),
            duration_ms: start_time.elapsed().as_millis() as u64,
        },
        cli_args,
    )
}

/// Search the stored index.
async fn search_index(
    args: &SearchArgs,
    config: &SemsearchConfig,
    store_path: &Path,
    cli_args: &SemsearchArgs,
) -> Result<()> {
    let start_time = Instant::now();
    let service = Arc::new(open_existing_service(config, store_path)?);

    let mut retriever = Retriever::new(service);
    let mut use_web = config.use_web;
    if let Some(text) = &args.web_text {
        retriever = retriever.with_web_provider(Arc::new(StaticWebSearchProvider::new(text.clone())));
        use_web = true;
    }

    let top_k = args.top_k.unwrap_or(config.top_k);
    let context = retriever.retrieve(&args.query, top_k, use_web).await?;

    if args.context {
        return output_result(
            "Retrieval context",
            &RenderedContext {
                query: context.query.clone(),
                context: context.render(),
            },
            cli_args,
        );
    }

    output_result(
        "Search completed",
        &SearchResults {
            query: context.query,
            hits: context.passages,
            web_content: use_web.then_some(context.web_content),
            duration_ms: start_time.elapsed().as_millis() as u64,
        },
        cli_args,
    )
}

/// Show statistics of the stored index.
fn show_stats(config: &SemsearchConfig, store_path: &Path, cli_args: &SemsearchArgs) -> Result<()> {
    let service = open_existing_service(config, store_path)?;
    let file_size_bytes = fs::metadata(store_path)?.len();

    output_result(
        "Index statistics",
        &IndexStats {
            service: service.stats(),
            store_path: PathBuf::from(store_path),
            file_size_bytes,
        },
        cli_args,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tempfile::TempDir;

    #[test]
    fn test_split_passages() {
        let text = "first line\nstill first\n\n  second  \n \t\n\n\nthird\r\n\r\nfourth\n";
        assert_eq!(
            split_passages(text).unwrap(),
            vec!["first line\nstill first", "second", "third", "fourth"]
        );
        assert!(split_passages(" \n\n ").unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_add_then_search() {
        let temp_dir = TempDir::new().unwrap();
        let doc = temp_dir.path().join("docs.txt");
        fs::write(&doc, "个人电脑\n\n医生的办公室\n\n笔记本电脑\n").unwrap();
        let store = temp_dir.path().join("store").join("index.bin");
        let store_arg = store.to_string_lossy().to_string();
        let store_arg = store_arg.as_str();
        let doc_arg = doc.to_string_lossy().to_string();
        let doc_arg = doc_arg.as_str();

        let args = SemsearchArgs::try_parse_from([
            "semsearch", "-q", "--store", store_arg, "add", doc_arg,
        ])
        .unwrap();
        execute_command(args).await.unwrap();
        assert!(store.exists());

        let config = SemsearchConfig::default();
        let service = open_existing_service(&config, &store).unwrap();
        assert_eq!(service.len(), 3);
        let results = service.search("笔记本电脑", 1).await.unwrap();
        assert_eq!(results[0].text, "笔记本电脑");

        // Adding again appends to the stored index.
        let args = SemsearchArgs::try_parse_from([
            "semsearch", "-q", "--store", store_arg, "add", doc_arg,
        ])
        .unwrap();
        execute_command(args).await.unwrap();
        assert_eq!(open_existing_service(&config, &store).unwrap().len(), 6);
    }

    #[tokio::test]
    async fn test_search_without_index() {
        let temp_dir = TempDir::new().unwrap();
        let store_arg = temp_dir.path().join("missing.bin").to_string_lossy().to_string();
        let args = SemsearchArgs::try_parse_from([
            "semsearch",
            "--store",
            store_arg.as_str(),
            "search",
            "x",
        ])
        .unwrap();
        assert!(matches!(
            execute_command(args).await,
            Err(SemsearchError::InvalidArgument(_))
        ));
    }
}
