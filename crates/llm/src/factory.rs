//! Generation backend factory.
//!
//! Resolves a configured provider name to a concrete backend. Backends are
//! chosen once at engine construction, never by inspecting types at runtime.

use crate::client::LlmClient;
use crate::generation::{GenerationClient, ProbePolicy};
use crate::providers::OllamaClient;
use std::sync::Arc;
use yatri_core::{AppError, AppResult, GenerationSettings};

/// Create a generation backend based on the provider name.
///
/// # Arguments
/// * `provider` - Provider identifier ("ollama")
/// * `endpoint` - Optional custom endpoint URL
///
/// # Errors
/// Returns `AppError::Config` if the provider is unknown.
pub fn create_client(provider: &str, endpoint: Option<&str>) -> AppResult<Arc<dyn LlmClient>> {
    match provider.to_lowercase().as_str() {
        "ollama" => {
            let client = match endpoint {
                Some(url) => OllamaClient::with_base_url(url),
                None => OllamaClient::new(),
            };
            Ok(Arc::new(client))
        }
        _ => Err(AppError::Config(format!(
            "Unknown generation provider: {}",
            provider
        ))),
    }
}

/// Build a [`GenerationClient`] straight from configuration.
pub fn create_generation_client(settings: &GenerationSettings) -> AppResult<GenerationClient> {
    let backend = create_client(&settings.provider, Some(&settings.endpoint))?;
    Ok(GenerationClient::new(backend, ProbePolicy::from(settings)))
}
