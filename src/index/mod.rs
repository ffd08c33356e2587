//! Persistable vector index over document chunks.
//!
//! The index maps chunk embeddings to chunk text and supports exact
//! nearest-neighbor lookup by cosine similarity. It serializes to a single
//! JSON file; once a file exists at the index path it is authoritative and
//! is never rebuilt automatically (invalidation is manual file deletion).

pub mod manager;

pub use manager::IndexManager;

use crate::error::{GimpaError, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::Path;

/// On-disk format version, bumped on incompatible layout changes.
const INDEX_FORMAT_VERSION: u32 = 1;

/// One indexed chunk: the text and its embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexEntry {
    pub text: String,
    pub embedding: Vec<f32>,
}

/// Serializable vector index over the chunks of one source document.
#[derive(Debug, Serialize, Deserialize)]
pub struct VectorIndex {
    pub version: u32,
    /// Embedding model the vectors were produced with
    pub model: String,
    /// Embedding dimensionality (0 when the index is empty)
    pub dimensions: usize,
    /// SHA-256 of the normalized source text at build time. Recorded so
    /// operators can detect drift against the current document; never
    /// compared automatically.
    pub source_digest: String,
    pub entries: Vec<IndexEntry>,
}

/// Hex SHA-256 digest of the normalized source text.
pub fn source_digest(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

impl VectorIndex {
    /// Assemble an index from parallel chunk/embedding lists.
    pub fn from_chunks(
        model: String,
        source_text: &str,
        chunks: Vec<String>,
        embeddings: Vec<Vec<f32>>,
    ) -> Result<Self> {
        if chunks.len() != embeddings.len() {
            return Err(GimpaError::Embedding(format!(
                "Got {} embeddings for {} chunks",
                embeddings.len(),
                chunks.len()
            )));
        }

        let dimensions = embeddings.first().map(|e| e.len()).unwrap_or(0);
        let entries = chunks
            .into_iter()
            .zip(embeddings)
            .map(|(text, embedding)| IndexEntry { text, embedding })
            .collect();

        Ok(Self {
            version: INDEX_FORMAT_VERSION,
            model,
            dimensions,
            source_digest: source_digest(source_text),
            entries,
        })
    }

    /// Load a persisted index from `path`.
    ///
    /// An unreadable or undeserializable file is reported as `IndexCorrupt`;
    /// existence is the caller's concern.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            GimpaError::IndexCorrupt(format!("Cannot read {}: {}", path.display(), e))
        })?;

        let index: VectorIndex = serde_json::from_str(&raw).map_err(|e| {
            GimpaError::IndexCorrupt(format!("Cannot parse {}: {}", path.display(), e))
        })?;

        if index.version != INDEX_FORMAT_VERSION {
            return Err(GimpaError::IndexCorrupt(format!(
                "Unsupported index format version {} in {}",
                index.version,
                path.display()
            )));
        }

        Ok(index)
    }

    /// Persist the index to `path`.
    ///
    /// Writes to a temp file in the target directory and renames it into
    /// place, so a crash mid-write never leaves a truncated index behind.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string(self)
            .map_err(|e| GimpaError::IndexCorrupt(format!("Cannot serialize index: {}", e)))?;

        let tmp_path = path.with_extension("index.tmp");
        std::fs::write(&tmp_path, json)?;
        std::fs::rename(&tmp_path, path)?;

        log::info!(
            "Persisted index with {} chunks to {}",
            self.entries.len(),
            path.display()
        );
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Score the query vector against every entry; return the top `k`
    /// `(score, chunk text)` pairs sorted by score descending.
    pub fn top_k(&self, query_vec: &[f32], k: usize) -> Vec<(f32, &str)> {
        let mut scored: Vec<(f32, &str)> = self
            .entries
            .iter()
            .filter(|e| e.embedding.len() == query_vec.len())
            .map(|e| (cosine_similarity(query_vec, &e.embedding), e.text.as_str()))
            .collect();
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        scored
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let mag_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if mag_a == 0.0 || mag_b == 0.0 {
        0.0
    } else {
        dot / (mag_a * mag_b)
    }
}
