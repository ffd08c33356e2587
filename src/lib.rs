pub mod chunker;
pub mod completion;
pub mod config;
pub mod embeddings;
pub mod error;
pub mod http;
pub mod index;
pub mod qa;

pub use config::Config;
pub use error::{GimpaError, Result};
pub use index::{IndexManager, VectorIndex};
