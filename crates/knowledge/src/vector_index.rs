//! Vector index abstraction over the read-only tourism corpus.

use crate::types::DocumentChunk;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use yatri_core::{AppError, AppResult, IndexBackend, IndexSettings};

/// A nearest-neighbor hit returned by an index.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexHit {
    pub chunk: DocumentChunk,

    /// Similarity in [0, 1], higher is more relevant
    pub similarity: f32,
}

/// Trait for vector index backends.
///
/// The engine only reads from an index; population belongs to the ingestion
/// pipeline. Handles are shared by concurrent queries without extra locking.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Backend name for diagnostics (e.g., "memory", "lancedb")
    fn backend_name(&self) -> &str;

    /// Return up to `top_k` chunks nearest to `vector`.
    ///
    /// Hits are ordered by descending similarity; equal similarities keep
    /// the index's storage order.
    async fn query(&self, vector: &[f32], top_k: usize) -> AppResult<Vec<IndexHit>>;

    /// Number of chunks stored in the index.
    async fn populated_count(&self) -> AppResult<usize>;
}

/// Stand-in for an index that could not be opened.
///
/// Every call fails with `RetrievalUnavailable`, so queries degrade to a
/// "backend unavailable" answer instead of the engine failing to start.
#[derive(Debug, Clone)]
pub struct UnavailableIndex {
    reason: String,
}

impl UnavailableIndex {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl VectorIndex for UnavailableIndex {
    fn backend_name(&self) -> &str {
        "unavailable"
    }

    async fn query(&self, _vector: &[f32], _top_k: usize) -> AppResult<Vec<IndexHit>> {
        Err(AppError::RetrievalUnavailable(self.reason.clone()))
    }

    async fn populated_count(&self) -> AppResult<usize> {
        Err(AppError::RetrievalUnavailable(self.reason.clone()))
    }
}

/// Open the configured index backend at `path`.
pub async fn open_index(
    settings: &IndexSettings,
    path: &std::path::Path,
) -> AppResult<Arc<dyn VectorIndex>> {
    match settings.backend {
        IndexBackend::Memory => Ok(Arc::new(crate::memory_index::MemoryIndex::load(path)?)),
        IndexBackend::LanceDb => Ok(Arc::new(
            crate::lancedb_index::LanceDbIndex::open(path, &settings.table).await?,
        )),
    }
}

/// Cosine similarity between two vectors; 0.0 for mismatched or zero vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

/// Convert a cosine distance into a similarity in [0, 1].
pub fn distance_to_similarity(distance: f32) -> f32 {
    if distance.is_nan() {
        return 0.0;
    }
    (1.0 - distance).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[tokio::test]
    async fn test_unavailable_index_always_fails() {
        let index = UnavailableIndex::new("index file missing");
        assert!(matches!(
            index.query(&[1.0], 3).await,
            Err(AppError::RetrievalUnavailable(_))
        ));
        assert!(index.populated_count().await.is_err());
    }

    #[test]
    fn test_distance_to_similarity() {
        assert!((distance_to_similarity(0.19) - 0.81).abs() < 1e-6);
        assert_eq!(distance_to_similarity(1.7), 0.0);
        assert_eq!(distance_to_similarity(-0.2), 1.0);
        assert_eq!(distance_to_similarity(f32::NAN), 0.0);
    }
}
