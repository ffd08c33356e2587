use crate::error::{GimpaError, Result};
use std::path::PathBuf;

/// Base name shared by the source document and the persisted index.
/// `<DATA_DIR>/data.txt` is the document, `<DATA_DIR>/data.index` the index.
pub const DATA_BASENAME: &str = "data";

/// Default HTTP listen port when `PORT` is not set.
pub const DEFAULT_PORT: u16 = 3000;

/// Target chunk size in characters for the document splitter.
pub const CHUNK_SIZE_CHARS: usize = 1000;

/// Number of chunks retrieved as context for each question.
pub const RETRIEVAL_K: usize = 4;

/// Service configuration, resolved once at startup from environment variables
/// (and an optional `.env` file).
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP listen port (`PORT`, default 3000)
    pub port: u16,
    /// Credential for the embedding/completion backend (`OPENAI_API_KEY`)
    pub api_key: String,
    /// Embedding model name (`OPENAI_EMBEDDING_MODEL`)
    pub embedding_model: String,
    /// Chat completion model name (`OPENAI_COMPLETION_MODEL`)
    pub completion_model: String,
    /// Directory holding `data.txt` and `data.index` (`DATA_DIR`, default ".")
    pub data_dir: PathBuf,
}

impl Config {
    /// Load configuration from the environment.
    ///
    /// Reads a `.env` file first if one exists (ignored when absent).
    /// Fails fast when `OPENAI_API_KEY` is missing so a misconfigured
    /// deployment is caught at startup rather than on the first request.
    pub fn from_env() -> Result<Self> {
        let _ = dotenv::dotenv();

        let port = match std::env::var("PORT") {
            Ok(raw) => raw.parse::<u16>().map_err(|_| {
                GimpaError::Config(format!("PORT must be a number between 1 and 65535, got '{raw}'"))
            })?,
            Err(_) => DEFAULT_PORT,
        };

        let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| {
            GimpaError::Config(
                "Environment variable OPENAI_API_KEY not set. Set it in your .env file or as an environment variable."
                    .to_string(),
            )
        })?;

        let embedding_model = std::env::var("OPENAI_EMBEDDING_MODEL")
            .unwrap_or_else(|_| "text-embedding-3-small".to_string());
        let completion_model = std::env::var("OPENAI_COMPLETION_MODEL")
            .unwrap_or_else(|_| "gpt-4o-mini".to_string());
        let data_dir = std::env::var("DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("."));

        Ok(Self {
            port,
            api_key,
            embedding_model,
            completion_model,
            data_dir,
        })
    }

    /// Path of the source document (`<DATA_DIR>/data.txt`)
    pub fn source_path(&self) -> PathBuf {
        self.data_dir.join(format!("{DATA_BASENAME}.txt"))
    }

    /// Path of the persisted index (`<DATA_DIR>/data.index`)
    pub fn index_path(&self) -> PathBuf {
        self.data_dir.join(format!("{DATA_BASENAME}.index"))
    }
}
