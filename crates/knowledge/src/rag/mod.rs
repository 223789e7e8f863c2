//! Retrieval-augmented answering.
//!
//! [`RagEngine::answer`] is the single public entry point; the retriever and
//! context assembler are exposed for consumers that need the pieces.

pub mod context;
pub mod engine;
pub mod retriever;
pub mod types;

pub use context::{estimate_tokens, ContextAssembler, ContextBlock, ContextEntry};
pub use engine::{EngineSettings, RagEngine};
pub use retriever::{RetrievalOutcome, RetrievalResult, Retriever};
pub use types::{
    AnswerDiagnostics, AnswerResult, AnswerStatus, CitedSource, FailureKind, HealthReport,
    RetrievalDiagnostics, StageTimings,
};
