//! Generation backend crate for the Yatri travel assistant.
//!
//! Provides a provider-agnostic backend trait (`probe` + `complete`) and the
//! [`GenerationClient`], which wraps a backend with a retried health probe
//! and a single-shot, time-bounded generation call.
//!
//! # Providers
//! - **Ollama**: Local LLM runtime (default)
//!
//! # Example
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use yatri_llm::{GenerationClient, GenerationParams, GenerationRequest, OllamaClient, ProbePolicy};
//!
//! # async fn example() {
//! let client = GenerationClient::new(Arc::new(OllamaClient::new()), ProbePolicy::default());
//! let params = GenerationParams {
//!     model: "qwen2.5:1.5b".to_string(),
//!     temperature: 0.7,
//!     max_tokens: 500,
//! };
//! let request = GenerationRequest::new(None, "Where is Spiti?", params, Duration::from_secs(60));
//! let response = client.generate(&request).await;
//! println!("{:?}: {}", response.status, response.text);
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod generation;
pub mod providers;
pub mod types;

// Re-export main types
pub use client::{LlmClient, LlmRequest, LlmResponse, LlmUsage, ProbeReport};
pub use factory::{create_client, create_generation_client};
pub use generation::{GenerationClient, ProbeOutcome, ProbePolicy};
pub use providers::OllamaClient;
pub use types::{
    GenerationParams, GenerationRequest, GenerationResponse, GenerationState, GenerationStatus,
};
