pub mod openai;

pub use openai::OpenAIEmbedder;

use crate::error::Result;
use std::future::Future;

/// Embedding backend seam.
///
/// The index manager and QA chain are generic over this trait so tests can
/// substitute a deterministic in-process backend for the OpenAI API.
pub trait EmbeddingBackend: Send + Sync {
    /// Embed a batch of texts, returning one vector per input in order.
    fn embed_batch(
        &self,
        texts: Vec<String>,
    ) -> impl Future<Output = Result<Vec<Vec<f32>>>> + Send;

    /// Embed a single query string.
    fn embed_query(&self, text: &str) -> impl Future<Output = Result<Vec<f32>>> + Send;
}
