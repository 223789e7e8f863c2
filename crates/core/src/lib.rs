//! Yatri Core Library
//!
//! Foundational utilities shared by every Yatri crate:
//! - Error handling (`AppError`, `AppResult`)
//! - Logging infrastructure
//! - Configuration management

pub mod config;
pub mod error;
pub mod logging;

// Re-export commonly used types
pub use config::{
    AppConfig, ContextSettings, DedupKey, EmbeddingSettings, GenerationSettings, HealthSettings,
    IndexBackend, IndexSettings, RetrievalSettings,
};
pub use error::{AppError, AppResult};
