use anyhow::Result;
use gimpa_assist::completion::OpenAICompletions;
use gimpa_assist::config::{CHUNK_SIZE_CHARS, RETRIEVAL_K};
use gimpa_assist::embeddings::OpenAIEmbedder;
use gimpa_assist::http::{self, AppState};
use gimpa_assist::qa::QaChain;
use gimpa_assist::{Config, IndexManager};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logger from environment variable or default to info level
    env_logger::Builder::from_env(env_logger::Env::default().filter_or("RUST_LOG", "info")).init();

    let config = Config::from_env()?;
    log::info!("Starting Gimpa Assist v{}", env!("CARGO_PKG_VERSION"));
    log::info!("Source document: {}", config.source_path().display());
    log::info!("Index location: {}", config.index_path().display());
    log::info!(
        "Models: embeddings={}, completions={}",
        config.embedding_model,
        config.completion_model
    );

    // Backend clients and the index manager are built once and reused by
    // every request.
    let embedder = Arc::new(OpenAIEmbedder::new(
        config.api_key.clone(),
        config.embedding_model.clone(),
    ));
    let completions = Arc::new(OpenAICompletions::new(
        config.api_key.clone(),
        config.completion_model.clone(),
    ));

    let state = AppState {
        manager: Arc::new(IndexManager::new(
            Arc::clone(&embedder),
            config.embedding_model.clone(),
            CHUNK_SIZE_CHARS,
        )),
        embedder,
        qa: Arc::new(QaChain::new(completions, RETRIEVAL_K)),
        source_path: config.source_path(),
        index_path: config.index_path(),
    };

    http::serve(state, config.port).await?;

    Ok(())
}
