//! Embedding providers.
//!
//! Maps text to fixed-length vectors. Providers are selected once, from
//! configuration, when the engine is built.

pub mod provider;
pub mod providers;

pub use provider::{create_provider, EmbeddingProvider};
pub use providers::{HashingProvider, OllamaProvider};
