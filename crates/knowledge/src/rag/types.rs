//! RAG answer types.
//!
//! [`AnswerResult`] is the only type handed to consumers of the engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Terminal status of one `answer` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerStatus {
    /// Grounded answer with cited sources
    Ok,
    /// Nothing cleared the similarity threshold; the answer is ungrounded
    NoContext,
    /// Retrieval or generation backend failed
    BackendUnavailable,
    /// The query was rejected or the pipeline failed internally
    Error,
}

impl AnswerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::NoContext => "no_context",
            Self::BackendUnavailable => "backend_unavailable",
            Self::Error => "error",
        }
    }
}

/// Which layer ended the pipeline, for logs and telemetry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Validation,
    RetrievalUnavailable,
    NoContextFound,
    GenerationTimeout,
    GenerationBackendError,
    GenerationModelMissing,
    /// Prompt rendering or another internal step failed
    Internal,
}

/// A source cited in an answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CitedSource {
    pub chunk_id: String,

    /// "City, State (Category > Subcategory)"
    pub label: String,

    pub location: String,
    pub category: String,
    pub budget: String,

    /// Similarity rounded to three decimals
    pub score: f32,
}

/// What retrieval saw for this query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrievalDiagnostics {
    /// Hits returned by the index before thresholding
    pub candidates: usize,

    /// Results left after threshold and deduplication
    pub retained: usize,

    /// Chunks that made it into the context block
    pub included: usize,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_score: Option<f32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_score: Option<f32>,

    /// Estimated tokens used by the context block
    pub context_tokens: usize,
}

/// Wall time per stage in milliseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageTimings {
    pub retrieval_ms: u64,
    pub generation_ms: u64,
    pub total_ms: u64,
}

/// Diagnostics attached to every answer. Not needed to render it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerDiagnostics {
    pub retrieval: RetrievalDiagnostics,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureKind>,

    pub timings: StageTimings,

    /// Generation model requested
    pub model: String,

    pub timestamp: DateTime<Utc>,
}

/// The engine's answer to one query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerResult {
    pub status: AnswerStatus,

    /// Generated text, or a static user-facing message on failure
    pub answer: String,

    /// Cited sources in context order; empty unless status is `ok`
    pub sources: Vec<CitedSource>,

    pub diagnostics: AnswerDiagnostics,
}

impl AnswerResult {
    pub fn is_grounded(&self) -> bool {
        self.status == AnswerStatus::Ok
    }
}

/// Result of the engine's on-demand health check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub embedding_ok: bool,
    pub index_ok: bool,
    pub backend_ok: bool,

    /// Chunks in the index; 0 when the index is unreachable
    pub document_count: usize,

    pub embedding_model: String,
    pub generation_model: String,
    pub checked_at: DateTime<Utc>,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.embedding_ok && self.index_ok && self.backend_ok
    }
}

/// Round a similarity for display.
pub fn round_score(score: f32) -> f32 {
    (score * 1000.0).round() / 1000.0
}
