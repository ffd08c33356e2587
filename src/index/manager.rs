//! Lazy build-or-load cache for document indexes.
//!
//! `obtain` returns a ready-to-query [`VectorIndex`] for a source document,
//! building it from scratch only when no persisted index exists. Loaded and
//! built indexes are kept in memory keyed by index path, so each path is
//! loaded at most once per process; concurrent first calls for the same path
//! collapse onto a single build.

use crate::chunker::split_text;
use crate::embeddings::EmbeddingBackend;
use crate::error::{GimpaError, Result};
use crate::index::VectorIndex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};

pub struct IndexManager<E> {
    embedder: Arc<E>,
    model: String,
    chunk_chars: usize,
    /// Indexes already loaded or built this process, keyed by index path.
    /// Never invalidated; cache invalidation is manual file deletion plus
    /// a process restart.
    loaded: RwLock<HashMap<PathBuf, Arc<VectorIndex>>>,
    /// Per-path build gates. Concurrent callers for the same absent path
    /// serialize here so exactly one executes the load/build.
    build_gates: Mutex<HashMap<PathBuf, Arc<tokio::sync::Mutex<()>>>>,
}

impl<E: EmbeddingBackend> IndexManager<E> {
    pub fn new(embedder: Arc<E>, model: String, chunk_chars: usize) -> Self {
        Self {
            embedder,
            model,
            chunk_chars,
            loaded: RwLock::new(HashMap::new()),
            build_gates: Mutex::new(HashMap::new()),
        }
    }

    /// Return a ready-to-query index for `source_path`, persisted at
    /// `index_path`.
    ///
    /// Resolution order: in-memory handle, then persisted file (loaded
    /// without touching `source_path`), then a full build that reads the
    /// source, chunks it, embeds every chunk, and persists the result
    /// before returning. All callers for the same path observe the same
    /// `Arc` handle.
    pub async fn obtain(&self, source_path: &Path, index_path: &Path) -> Result<Arc<VectorIndex>> {
        if let Some(index) = self.lookup(index_path) {
            return Ok(index);
        }

        let gate = self.build_gate(index_path);
        let _guard = gate.lock().await;

        // Another caller may have finished the load/build while we waited
        if let Some(index) = self.lookup(index_path) {
            return Ok(index);
        }

        let index = if index_path.exists() {
            log::info!("Loading existing index from {}", index_path.display());
            VectorIndex::load(index_path)?
        } else {
            self.build(source_path, index_path).await?
        };

        let index = Arc::new(index);
        self.loaded
            .write()
            .unwrap()
            .insert(index_path.to_path_buf(), Arc::clone(&index));
        Ok(index)
    }

    fn lookup(&self, index_path: &Path) -> Option<Arc<VectorIndex>> {
        self.loaded.read().unwrap().get(index_path).cloned()
    }

    fn build_gate(&self, index_path: &Path) -> Arc<tokio::sync::Mutex<()>> {
        let mut gates = self.build_gates.lock().unwrap();
        Arc::clone(
            gates
                .entry(index_path.to_path_buf())
                .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(()))),
        )
    }

    /// Build a fresh index: read the source, strip carriage returns, split
    /// into chunks, embed, persist. The write completes before the index is
    /// returned.
    async fn build(&self, source_path: &Path, index_path: &Path) -> Result<VectorIndex> {
        log::info!(
            "No index at {}, building from {}",
            index_path.display(),
            source_path.display()
        );

        let raw = std::fs::read_to_string(source_path).map_err(|e| {
            GimpaError::SourceUnavailable {
                path: source_path.to_path_buf(),
                source: e,
            }
        })?;
        let text = raw.replace('\r', "");

        let chunks = split_text(&text, self.chunk_chars);
        log::info!("Split source into {} chunks", chunks.len());

        let embeddings = self.embedder.embed_batch(chunks.clone()).await?;
        let index = VectorIndex::from_chunks(self.model.clone(), &text, chunks, embeddings)?;
        index.save(index_path)?;
        Ok(index)
    }
}
