//! Retrieval question answering: embed the question, pull the most similar
//! chunks from the index, and ask the completion model to answer from them.

use crate::completion::CompletionBackend;
use crate::embeddings::EmbeddingBackend;
use crate::error::Result;
use crate::index::VectorIndex;
use serde::Serialize;
use std::sync::Arc;

const SYSTEM_PROMPT: &str = "You are a helpful assistant. Answer the user's question using only the \
provided context. If the answer cannot be derived from the context, say you don't know.";

/// Answer payload returned to the HTTP layer.
#[derive(Debug, Serialize)]
pub struct Answer {
    /// Free-form answer text from the completion model
    pub text: String,
    /// Chunk texts that were retrieved as context, best match first
    pub sources: Vec<String>,
}

/// Retrieval QA chain over a completion backend.
pub struct QaChain<C> {
    completions: Arc<C>,
    /// Number of chunks retrieved as context per question
    k: usize,
}

impl<C: CompletionBackend> QaChain<C> {
    pub fn new(completions: Arc<C>, k: usize) -> Self {
        Self { completions, k }
    }

    /// Answer `question` from `index`.
    pub async fn answer<E: EmbeddingBackend>(
        &self,
        index: &VectorIndex,
        embedder: &E,
        question: &str,
    ) -> Result<Answer> {
        let query_vec = embedder.embed_query(question).await?;

        let hits = index.top_k(&query_vec, self.k);
        let sources: Vec<String> = hits.iter().map(|(_, text)| text.to_string()).collect();
        log::debug!("Retrieved {} chunks for question", sources.len());

        let user_message = build_user_message(&sources, question);
        let text = self.completions.complete(SYSTEM_PROMPT, &user_message).await?;

        Ok(Answer { text, sources })
    }
}

fn build_user_message(sources: &[String], question: &str) -> String {
    format!(
        "Context:\n==================\n{}\n\nQuestion:\n==================\n{}",
        sources.join("\n---\n"),
        question
    )
}
