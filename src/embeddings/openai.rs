use crate::embeddings::EmbeddingBackend;
use crate::error::{GimpaError, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const EMBEDDINGS_URL: &str = "https://api.openai.com/v1/embeddings";

/// OpenAI caps embedding requests at 2048 inputs.
const MAX_BATCH: usize = 2048;

/// Retries for single-query embedding (429/5xx with exponential backoff).
const QUERY_MAX_RETRIES: usize = 3;

/// Request structure for OpenAI embeddings API
#[derive(Serialize)]
struct EmbeddingRequest {
    model: String,
    input: Vec<String>,
}

/// Response structure from OpenAI embeddings API
#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

/// OpenAI embeddings client.
///
/// Handles batch embedding generation with rate limiting between batches and
/// retry with exponential backoff for single-query embeddings.
pub struct OpenAIEmbedder {
    client: Client,
    api_key: String,
    model: String,
}

impl OpenAIEmbedder {
    /// Create a new OpenAI embedder.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be created (should not happen in
    /// normal operation).
    pub fn new(api_key: String, model: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            api_key,
            model,
        }
    }

    /// Make a single embeddings API request.
    async fn request(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        let request = EmbeddingRequest {
            model: self.model.clone(),
            input: texts,
        };

        let response = self
            .client
            .post(EMBEDDINGS_URL)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| GimpaError::Embedding(format!("Network error: {}", e)))?;

        let status = response.status();

        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());

            return Err(GimpaError::Embedding(format!(
                "OpenAI API error {}: {}",
                status, body
            )));
        }

        let result: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| GimpaError::Embedding(format!("Failed to parse response: {}", e)))?;

        Ok(result.data.into_iter().map(|d| d.embedding).collect())
    }

    /// Embed a single text with retry on retryable upstream failures.
    async fn embed_with_retry(&self, text: &str) -> Result<Vec<f32>> {
        let mut attempt = 0;
        let mut delay = Duration::from_secs(1);

        loop {
            match self.request(vec![text.to_string()]).await {
                Ok(mut embeddings) => {
                    if embeddings.is_empty() {
                        return Err(GimpaError::Embedding(
                            "Empty response from OpenAI API".to_string(),
                        ));
                    }
                    return Ok(embeddings.remove(0));
                }
                Err(e) if attempt < QUERY_MAX_RETRIES => {
                    // Retry on rate limiting or upstream server errors
                    let msg = e.to_string();
                    let should_retry = ["429", "500", "502", "503", "504"]
                        .iter()
                        .any(|code| msg.contains(code));

                    if should_retry {
                        log::warn!("Retry {}/{} after error: {}", attempt + 1, QUERY_MAX_RETRIES, e);
                        tokio::time::sleep(delay).await;
                        delay *= 2;
                        attempt += 1;
                    } else {
                        return Err(e);
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }
}

impl EmbeddingBackend for OpenAIEmbedder {
    async fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut all_embeddings = Vec::with_capacity(texts.len());

        for batch in texts.chunks(MAX_BATCH) {
            let embeddings = self.request(batch.to_vec()).await?;

            if embeddings.len() != batch.len() {
                return Err(GimpaError::Embedding(format!(
                    "Expected {} embeddings, got {}",
                    batch.len(),
                    embeddings.len()
                )));
            }
            all_embeddings.extend(embeddings);

            // Small delay between full batches to stay under rate limits
            if batch.len() == MAX_BATCH {
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
        }

        Ok(all_embeddings)
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_with_retry(text).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedder_new() {
        let embedder = OpenAIEmbedder::new(
            "test-key".to_string(),
            "text-embedding-3-small".to_string(),
        );
        assert_eq!(embedder.model, "text-embedding-3-small");
    }

    #[tokio::test]
    async fn test_embed_batch_empty() {
        let embedder = OpenAIEmbedder::new(
            "test-key".to_string(),
            "text-embedding-3-small".to_string(),
        );
        // Empty input short-circuits without touching the network
        let result = embedder.embed_batch(Vec::new()).await.unwrap();
        assert!(result.is_empty());
    }

    // Integration tests for actual API calls would require a real API key
    // and are not run as part of the unit suite.
}
