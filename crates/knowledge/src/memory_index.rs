//! In-memory exact-search index loaded from the ingestion pipeline's export.
//!
//! The export is a JSON array of entries shaped like:
//!
//! ```json
//! {
//!   "chunk_id": "manali_adventure_003",
//!   "content": "Solang Valley offers paragliding...",
//!   "embedding": [0.012, -0.044, ...],
//!   "metadata": {
//!     "location": {"city": "Manali", "state": "Himachal Pradesh", "country": "India"},
//!     "classification": {"category": "Adventure", "subcategory": "Paragliding"},
//!     "practical_info": {"price_range": "medium", "has_contact": false},
//!     "relevance_scores": {"adventure": 9, "family": 4, "solo_traveler": 7}
//!   }
//! }
//! ```

use crate::types::{ChunkMetadata, DocumentChunk, RelevanceScores};
use crate::vector_index::{cosine_similarity, IndexHit, VectorIndex};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use yatri_core::{AppError, AppResult};

#[derive(Debug, Deserialize)]
struct ExportEntry {
    chunk_id: String,
    content: String,
    embedding: Vec<f32>,
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    metadata: ExportMetadata,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ExportMetadata {
    location: ExportLocation,
    classification: ExportClassification,
    practical_info: ExportPracticalInfo,
    relevance_scores: ExportScores,
    source: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ExportLocation {
    city: String,
    state: String,
    country: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ExportClassification {
    category: String,
    subcategory: String,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct ExportPracticalInfo {
    price_range: String,
    has_contact: bool,
}

impl Default for ExportPracticalInfo {
    fn default() -> Self {
        Self {
            price_range: "unknown".to_string(),
            has_contact: false,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ExportScores {
    adventure: f32,
    family: f32,
    solo_traveler: f32,
}

impl From<ExportEntry> for DocumentChunk {
    fn from(entry: ExportEntry) -> Self {
        let meta = entry.metadata;
        DocumentChunk {
            id: entry.chunk_id,
            text: entry.content,
            embedding: entry.embedding,
            metadata: ChunkMetadata {
                city: meta.location.city,
                state: meta.location.state,
                country: meta.location.country,
                category: meta.classification.category,
                subcategory: meta.classification.subcategory,
                price_range: meta.practical_info.price_range,
                has_contact: meta.practical_info.has_contact,
                relevance: RelevanceScores {
                    adventure: meta.relevance_scores.adventure,
                    family: meta.relevance_scores.family,
                    solo_traveler: meta.relevance_scores.solo_traveler,
                },
                source: entry.source.or(meta.source),
            },
        }
    }
}

/// Exact cosine search over chunks held in memory.
#[derive(Debug, Default)]
pub struct MemoryIndex {
    chunks: Vec<DocumentChunk>,
}

impl MemoryIndex {
    pub fn new(chunks: Vec<DocumentChunk>) -> Self {
        Self { chunks }
    }

    /// Load the JSON export at `path`.
    ///
    /// A missing file is an unavailable index, not an empty one.
    pub fn load(path: &Path) -> AppResult<Self> {
        if !path.exists() {
            return Err(AppError::RetrievalUnavailable(format!(
                "Index file not found: {:?}",
                path
            )));
        }

        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// Parse an export document.
    pub fn from_json(contents: &str) -> AppResult<Self> {
        let entries: Vec<ExportEntry> = serde_json::from_str(contents)?;
        let chunks: Vec<DocumentChunk> = entries.into_iter().map(DocumentChunk::from).collect();

        if let Some(first) = chunks.first() {
            let dims = first.embedding.len();
            if let Some(bad) = chunks.iter().find(|c| c.embedding.len() != dims) {
                return Err(AppError::Serialization(format!(
                    "Chunk '{}' has {} dimensions, expected {}",
                    bad.id,
                    bad.embedding.len(),
                    dims
                )));
            }
        }

        tracing::info!("Loaded {} chunks into memory index", chunks.len());
        Ok(Self::new(chunks))
    }
}

#[async_trait]
impl VectorIndex for MemoryIndex {
    fn backend_name(&self) -> &str {
        "memory"
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> AppResult<Vec<IndexHit>> {
        if let Some(first) = self.chunks.first() {
            if first.embedding.len() != vector.len() {
                return Err(AppError::RetrievalUnavailable(format!(
                    "Query embedding dimension mismatch: expected {}, got {}",
                    first.embedding.len(),
                    vector.len()
                )));
            }
        }

        let mut scored: Vec<(usize, f32)> = self
            .chunks
            .iter()
            .enumerate()
            .map(|(i, chunk)| (i, cosine_similarity(vector, &chunk.embedding).clamp(0.0, 1.0)))
            .collect();

        // Stable: equal scores keep storage order
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(top_k);

        Ok(scored
            .into_iter()
            .map(|(i, similarity)| IndexHit {
                chunk: self.chunks[i].clone(),
                similarity,
            })
            .collect())
    }

    async fn populated_count(&self) -> AppResult<usize> {
        Ok(self.chunks.len())
    }
}
