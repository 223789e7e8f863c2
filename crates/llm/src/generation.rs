//! Generation client: health probe, timeout and retry policy around a backend.
//!
//! Only the health probe is retried. The generation call gets exactly one
//! attempt under a single timeout; a slow model is reported as timed out
//! rather than re-sent.

use crate::client::{LlmClient, LlmRequest};
use crate::types::{
    GenerationRequest, GenerationResponse, GenerationState, GenerationStatus,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};
use yatri_core::GenerationSettings;

/// Health probe policy, independent of the generation timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbePolicy {
    /// Timeout for each probe attempt
    pub timeout: Duration,

    /// Extra attempts after the first failure
    pub retries: u32,

    /// Pause between attempts
    pub backoff: Duration,
}

impl Default for ProbePolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            retries: 1,
            backoff: Duration::from_millis(250),
        }
    }
}

impl From<&GenerationSettings> for ProbePolicy {
    fn from(settings: &GenerationSettings) -> Self {
        Self {
            timeout: settings.probe_timeout(),
            retries: settings.probe_retries,
            backoff: settings.probe_backoff(),
        }
    }
}

/// What the health probe concluded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// Backend reachable and model installed
    Ready,
    /// Backend reachable, model not installed
    ModelMissing { model: String, installed: Vec<String> },
    /// Every probe attempt failed or timed out
    Unreachable { reason: String },
}

impl ProbeOutcome {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }
}

/// Sends prompts to a generation backend under probe/timeout discipline.
///
/// Cheap to clone; clones share the same backend handle.
#[derive(Clone)]
pub struct GenerationClient {
    backend: Arc<dyn LlmClient>,
    probe_policy: ProbePolicy,
}

impl GenerationClient {
    pub fn new(backend: Arc<dyn LlmClient>, probe_policy: ProbePolicy) -> Self {
        Self {
            backend,
            probe_policy,
        }
    }

    pub fn provider_name(&self) -> &str {
        self.backend.provider_name()
    }

    /// Probe the backend, retrying transport failures per the probe policy.
    ///
    /// A missing model is not retried: the answer will not change.
    #[instrument(skip(self), fields(provider = %self.backend.provider_name()))]
    pub async fn probe(&self, model: &str) -> ProbeOutcome {
        let attempts = self.probe_policy.retries + 1;
        let mut last_reason = String::from("backend not probed");

        for attempt in 1..=attempts {
            match tokio::time::timeout(self.probe_policy.timeout, self.backend.probe(model)).await {
                Ok(Ok(report)) if !report.available => {
                    last_reason = "backend reported itself unavailable".to_string();
                }
                Ok(Ok(report)) if !report.model_present => {
                    warn!("Model '{}' is not installed on the backend", model);
                    return ProbeOutcome::ModelMissing {
                        model: model.to_string(),
                        installed: report.models,
                    };
                }
                Ok(Ok(_)) => return ProbeOutcome::Ready,
                Ok(Err(e)) => last_reason = e.to_string(),
                Err(_) => {
                    last_reason = format!(
                        "health probe timed out after {}ms",
                        self.probe_policy.timeout.as_millis()
                    );
                }
            }

            if attempt < attempts {
                warn!(
                    "Health probe failed (attempt {}/{}): {}; retrying in {}ms",
                    attempt,
                    attempts,
                    last_reason,
                    self.probe_policy.backoff.as_millis()
                );
                tokio::time::sleep(self.probe_policy.backoff).await;
            }
        }

        warn!("Generation backend unreachable: {}", last_reason);
        ProbeOutcome::Unreachable {
            reason: last_reason,
        }
    }

    /// Run one generation attempt.
    ///
    /// Never returns an error: every failure is folded into the response
    /// status so the caller can build a terminal answer.
    #[instrument(skip(self, request), fields(model = %request.params().model))]
    pub async fn generate(&self, request: &GenerationRequest) -> GenerationResponse {
        let started = Instant::now();

        debug!("generation state {:?}", GenerationState::HealthCheck);
        match self.probe(&request.params().model).await {
            ProbeOutcome::Ready => {}
            ProbeOutcome::ModelMissing { model, installed } => {
                return GenerationResponse::failed(
                    GenerationStatus::ModelMissing,
                    format!("model '{}' not installed (available: {:?})", model, installed),
                    started.elapsed(),
                );
            }
            ProbeOutcome::Unreachable { reason } => {
                return GenerationResponse::failed(
                    GenerationStatus::BackendError,
                    reason,
                    started.elapsed(),
                );
            }
        }

        debug!("generation state {:?}", GenerationState::Sending);
        let params = request.params();
        let mut llm_request = LlmRequest::new(request.prompt(), &params.model)
            .with_temperature(params.temperature)
            .with_max_tokens(params.max_tokens);
        if let Some(system) = request.system() {
            llm_request = llm_request.with_system(system);
        }

        let response = match tokio::time::timeout(
            request.timeout(),
            self.backend.complete(&llm_request),
        )
        .await
        {
            Err(_) => GenerationResponse::failed(
                GenerationStatus::TimedOut,
                format!("no response within {}s", request.timeout().as_secs_f64()),
                started.elapsed(),
            ),
            Ok(Err(e)) => GenerationResponse::failed(
                GenerationStatus::BackendError,
                e.to_string(),
                started.elapsed(),
            ),
            Ok(Ok(raw)) => {
                let text = raw.content.trim();
                if text.is_empty() {
                    GenerationResponse::failed(
                        GenerationStatus::BackendError,
                        "backend returned empty text",
                        started.elapsed(),
                    )
                } else {
                    GenerationResponse::succeeded(text.to_string(), started.elapsed(), raw.usage)
                }
            }
        };

        info!(
            "Generation finished: {:?} ({:?}) in {}ms",
            response.state(),
            response.status,
            response.latency.as_millis()
        );

        response
    }
}
