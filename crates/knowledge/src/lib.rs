//! Tourism knowledge base and RAG engine.
//!
//! Answers travel questions about Indian destinations by retrieving passages
//! from a read-only vector index and grounding a local language model on
//! them.
//!
//! # Example
//! ```no_run
//! use yatri_core::AppConfig;
//! use yatri_knowledge::RagEngine;
//!
//! # async fn example() -> yatri_core::AppResult<()> {
//! let config = AppConfig::load()?;
//! let engine = RagEngine::from_config(&config).await?;
//! let result = engine.answer("What are the best adventure activities in Manali?").await;
//! println!("[{}] {}", result.status.as_str(), result.answer);
//! # Ok(())
//! # }
//! ```

pub mod embeddings;
pub mod lancedb_index;
pub mod memory_index;
pub mod rag;
pub mod types;
pub mod vector_index;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use embeddings::{create_provider, EmbeddingProvider};
pub use memory_index::MemoryIndex;
pub use rag::{
    AnswerResult, AnswerStatus, CitedSource, ContextAssembler, FailureKind, HealthReport,
    RagEngine, Retriever,
};
pub use types::{ChunkMetadata, DocumentChunk, RelevanceScores};
pub use vector_index::{open_index, IndexHit, UnavailableIndex, VectorIndex};
