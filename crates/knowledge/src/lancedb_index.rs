//! Read-only LanceDB vector index.
//!
//! Expects a table written by the ingestion pipeline with an `id` and `text`
//! column, a fixed-size `vector` column, and flat metadata columns (`city`,
//! `state`, `country`, `category`, `subcategory`, `price_range`,
//! `has_contact`, `adventure_score`, `family_score`, `solo_traveler_score`,
//! `source`). Missing metadata columns read as empty.

use crate::types::{ChunkMetadata, DocumentChunk, RelevanceScores};
use crate::vector_index::{distance_to_similarity, IndexHit, VectorIndex};
use arrow_array::{
    Array, BooleanArray, FixedSizeListArray, Float32Array, Float64Array, Int32Array, Int64Array,
    RecordBatch, StringArray,
};
use async_trait::async_trait;
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{DistanceType, Table};
use std::path::Path;
use yatri_core::{AppError, AppResult};

const VECTOR_COLUMN: &str = "vector";
const DISTANCE_COLUMN: &str = "_distance";

/// Read-only LanceDB-backed vector index.
pub struct LanceDbIndex {
    table: Table,
}

impl LanceDbIndex {
    /// Open an existing table. The engine never creates or writes tables.
    pub async fn open(db_path: &Path, table_name: &str) -> AppResult<Self> {
        if !db_path.exists() {
            return Err(AppError::RetrievalUnavailable(format!(
                "LanceDB directory not found: {:?}",
                db_path
            )));
        }

        let uri = db_path.to_string_lossy().to_string();
        let conn = lancedb::connect(&uri).execute().await.map_err(|e| {
            AppError::RetrievalUnavailable(format!("Failed to connect to LanceDB: {}", e))
        })?;

        let table = conn.open_table(table_name).execute().await.map_err(|e| {
            AppError::RetrievalUnavailable(format!(
                "Failed to open table '{}': {}",
                table_name, e
            ))
        })?;

        tracing::debug!("Opened LanceDB table '{}' at {:?}", table_name, db_path);

        Ok(Self { table })
    }

    fn batch_to_hit(batch: &RecordBatch, row_idx: usize) -> AppResult<IndexHit> {
        let id = required_string(batch, "id", row_idx)?;
        let text = required_string(batch, "text", row_idx)?;

        let embedding = match batch
            .column_by_name(VECTOR_COLUMN)
            .and_then(|c| c.as_any().downcast_ref::<FixedSizeListArray>())
        {
            Some(list) => {
                let values = list.value(row_idx);
                values
                    .as_any()
                    .downcast_ref::<Float32Array>()
                    .map(|v| v.values().to_vec())
                    .unwrap_or_default()
            }
            None => Vec::new(),
        };

        let distance = batch
            .column_by_name(DISTANCE_COLUMN)
            .and_then(|c| c.as_any().downcast_ref::<Float32Array>())
            .map(|d| d.value(row_idx))
            .ok_or_else(|| {
                AppError::RetrievalUnavailable("Search result missing distance column".to_string())
            })?;

        let metadata = ChunkMetadata {
            city: optional_string(batch, "city", row_idx).unwrap_or_default(),
            state: optional_string(batch, "state", row_idx).unwrap_or_default(),
            country: optional_string(batch, "country", row_idx).unwrap_or_default(),
            category: optional_string(batch, "category", row_idx).unwrap_or_default(),
            subcategory: optional_string(batch, "subcategory", row_idx).unwrap_or_default(),
            price_range: optional_string(batch, "price_range", row_idx)
                .unwrap_or_else(|| "unknown".to_string()),
            has_contact: batch
                .column_by_name("has_contact")
                .and_then(|c| c.as_any().downcast_ref::<BooleanArray>())
                .map(|b| !b.is_null(row_idx) && b.value(row_idx))
                .unwrap_or(false),
            relevance: RelevanceScores {
                adventure: numeric(batch, "adventure_score", row_idx),
                family: numeric(batch, "family_score", row_idx),
                solo_traveler: numeric(batch, "solo_traveler_score", row_idx),
            },
            source: optional_string(batch, "source", row_idx),
        };

        Ok(IndexHit {
            chunk: DocumentChunk {
                id,
                text,
                embedding,
                metadata,
            },
            similarity: distance_to_similarity(distance),
        })
    }
}

#[async_trait]
impl VectorIndex for LanceDbIndex {
    fn backend_name(&self) -> &str {
        "lancedb"
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> AppResult<Vec<IndexHit>> {
        let batches: Vec<RecordBatch> = self
            .table
            .query()
            .nearest_to(vector.to_vec())
            .map_err(|e| AppError::RetrievalUnavailable(format!("Failed to create query: {}", e)))?
            .column(VECTOR_COLUMN)
            .distance_type(DistanceType::Cosine)
            .limit(top_k)
            .execute()
            .await
            .map_err(|e| AppError::RetrievalUnavailable(format!("Failed to execute search: {}", e)))?
            .try_collect()
            .await
            .map_err(|e| {
                AppError::RetrievalUnavailable(format!("Failed to collect results: {}", e))
            })?;

        let mut hits = Vec::new();
        for batch in &batches {
            for row_idx in 0..batch.num_rows() {
                match Self::batch_to_hit(batch, row_idx) {
                    Ok(hit) => hits.push(hit),
                    Err(e) => tracing::warn!("Skipping unreadable row {}: {}", row_idx, e),
                }
            }
        }

        // Stable: ties keep the order LanceDB returned
        hits.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        hits.truncate(top_k);

        tracing::debug!("LanceDB returned {} hits (top-{})", hits.len(), top_k);
        Ok(hits)
    }

    async fn populated_count(&self) -> AppResult<usize> {
        self.table
            .count_rows(None)
            .await
            .map_err(|e| AppError::RetrievalUnavailable(format!("Failed to count rows: {}", e)))
    }
}

fn optional_string(batch: &RecordBatch, name: &str, row_idx: usize) -> Option<String> {
    let column = batch
        .column_by_name(name)?
        .as_any()
        .downcast_ref::<StringArray>()?;
    if column.is_null(row_idx) {
        None
    } else {
        Some(column.value(row_idx).to_string())
    }
}

fn required_string(batch: &RecordBatch, name: &str, row_idx: usize) -> AppResult<String> {
    optional_string(batch, name, row_idx).ok_or_else(|| {
        AppError::RetrievalUnavailable(format!("Invalid or missing '{}' column", name))
    })
}

fn numeric(batch: &RecordBatch, name: &str, row_idx: usize) -> f32 {
    let Some(column) = batch.column_by_name(name) else {
        return 0.0;
    };
    if column.is_null(row_idx) {
        return 0.0;
    }

    let any = column.as_any();
    if let Some(v) = any.downcast_ref::<Float32Array>() {
        v.value(row_idx)
    } else if let Some(v) = any.downcast_ref::<Float64Array>() {
        v.value(row_idx) as f32
    } else if let Some(v) = any.downcast_ref::<Int64Array>() {
        v.value(row_idx) as f32
    } else if let Some(v) = any.downcast_ref::<Int32Array>() {
        v.value(row_idx) as f32
    } else {
        0.0
    }
}
