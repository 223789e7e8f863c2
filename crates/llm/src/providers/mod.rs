//! Concrete generation backends.

pub mod ollama;

pub use ollama::OllamaClient;
