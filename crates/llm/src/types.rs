//! Generation request/response types used by the engine.

use crate::client::LlmUsage;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use yatri_core::GenerationSettings;

/// Model identifier plus sampling parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl From<&GenerationSettings> for GenerationParams {
    fn from(settings: &GenerationSettings) -> Self {
        Self {
            model: settings.model.clone(),
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
        }
    }
}

/// Backend-bound payload. Immutable once built.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    system: Option<String>,
    prompt: String,
    params: GenerationParams,
    timeout: Duration,
}

impl GenerationRequest {
    pub fn new(
        system: Option<String>,
        prompt: impl Into<String>,
        params: GenerationParams,
        timeout: Duration,
    ) -> Self {
        Self {
            system,
            prompt: prompt.into(),
            params,
            timeout,
        }
    }

    pub fn system(&self) -> Option<&str> {
        self.system.as_deref()
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn params(&self) -> &GenerationParams {
        &self.params
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// Per-call lifecycle of a generation attempt.
///
/// `Idle -> HealthCheck -> Sending -> {Succeeded | TimedOut | BackendError}`;
/// a failed health check jumps straight to `BackendError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationState {
    Idle,
    HealthCheck,
    Sending,
    Succeeded,
    TimedOut,
    BackendError,
}

/// Terminal outcome of a generation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationStatus {
    Succeeded,
    TimedOut,
    /// Backend unreachable, failed, or returned empty text
    BackendError,
    /// Backend reachable but the requested model is not installed
    ModelMissing,
}

impl GenerationStatus {
    /// The terminal state this outcome corresponds to.
    pub fn state(&self) -> GenerationState {
        match self {
            Self::Succeeded => GenerationState::Succeeded,
            Self::TimedOut => GenerationState::TimedOut,
            Self::BackendError | Self::ModelMissing => GenerationState::BackendError,
        }
    }
}

/// Backend output plus engine-observed latency and status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResponse {
    pub status: GenerationStatus,

    /// Trimmed generated text; empty unless `status` is `Succeeded`
    pub text: String,

    /// Wall time from health check to terminal state
    pub latency: Duration,

    /// Internal failure detail; never shown to end users
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<LlmUsage>,
}

impl GenerationResponse {
    pub fn succeeded(text: String, latency: Duration, usage: LlmUsage) -> Self {
        Self {
            status: GenerationStatus::Succeeded,
            text,
            latency,
            detail: None,
            usage: Some(usage),
        }
    }

    pub fn failed(status: GenerationStatus, detail: impl Into<String>, latency: Duration) -> Self {
        Self {
            status,
            text: String::new(),
            latency,
            detail: Some(detail.into()),
            usage: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == GenerationStatus::Succeeded
    }

    /// Terminal lifecycle state reached by this attempt.
    pub fn state(&self) -> GenerationState {
        self.status.state()
    }
}
