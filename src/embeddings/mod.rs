// Embeddings module
// Ollama-backed embedding client used at ingestion and query time

pub mod ollama;

pub use ollama::{DEFAULT_EMBEDDING_DIMENSION, OllamaClient};
