//! RAG engine: the single `answer(query)` entry point.
//!
//! Runs embed -> retrieve -> assemble -> prompt -> generate as one linear
//! pipeline and folds every failure into a terminal [`AnswerResult`].

use crate::embeddings::{create_provider, EmbeddingProvider};
use crate::rag::context::{ContextAssembler, ContextBlock};
use crate::rag::retriever::{RetrievalOutcome, Retriever};
use crate::rag::types::{
    AnswerDiagnostics, AnswerResult, AnswerStatus, FailureKind, HealthReport,
    RetrievalDiagnostics, StageTimings,
};
use crate::vector_index::{open_index, UnavailableIndex, VectorIndex};
use chrono::Utc;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};
use yatri_core::{AppConfig, AppError, AppResult};
use yatri_llm::{
    create_generation_client, GenerationClient, GenerationParams, GenerationRequest,
    GenerationStatus,
};
use yatri_prompt::{resolve_persona, PersonaDefinition, PromptBuilder};

const EMPTY_QUERY_MESSAGE: &str = "Please enter a travel question.";

const RETRIEVAL_UNAVAILABLE_MESSAGE: &str = "Sorry, the travel knowledge base is unavailable \
right now, so I can't give a reliable answer. Please try again in a moment.";

const TIMEOUT_MESSAGE: &str = "Sorry, the language model took too long to respond. \
It may still be loading or the machine may be busy. Please try again.";

const BACKEND_ERROR_MESSAGE: &str = "Sorry, I couldn't reach the language model. \
Please check that Ollama is running (`ollama serve`) and try again.";

const INTERNAL_ERROR_MESSAGE: &str = "Sorry, something went wrong while preparing your answer. \
Please try again.";

const HEALTH_PROBE_TEXT: &str = "health check";

/// Immutable per-engine query settings.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub top_k: usize,
    pub similarity_threshold: f32,
    pub budget_tokens: usize,
    pub generation: GenerationParams,
    pub generation_timeout: Duration,
    pub health_cache_ttl: Option<Duration>,
}

impl From<&AppConfig> for EngineSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            top_k: config.retrieval.top_k,
            similarity_threshold: config.retrieval.similarity_threshold,
            budget_tokens: config.context.budget_tokens,
            generation: GenerationParams::from(&config.generation),
            generation_timeout: config.generation.timeout(),
            health_cache_ttl: config.health.cache_ttl(),
        }
    }
}

/// Retrieval-augmented answering engine.
///
/// Holds only read-only handles and configuration, so one engine can serve
/// concurrent queries. The health cache is the only mutable state.
pub struct RagEngine {
    retriever: Retriever,
    assembler: ContextAssembler,
    prompts: PromptBuilder,
    persona: PersonaDefinition,
    generator: GenerationClient,
    settings: EngineSettings,
    health_cache: Mutex<Option<(Instant, HealthReport)>>,
}

impl RagEngine {
    pub fn new(
        retriever: Retriever,
        assembler: ContextAssembler,
        prompts: PromptBuilder,
        persona: PersonaDefinition,
        generator: GenerationClient,
        settings: EngineSettings,
    ) -> Self {
        Self {
            retriever,
            assembler,
            prompts,
            persona,
            generator,
            settings,
            health_cache: Mutex::new(None),
        }
    }

    /// Build an engine from validated configuration.
    ///
    /// An index that cannot be opened does not fail construction: queries
    /// report `backend_unavailable` and `health()` shows `index_ok = false`.
    pub async fn from_config(config: &AppConfig) -> AppResult<Self> {
        config.validate()?;

        let embedder: Arc<dyn EmbeddingProvider> = create_provider(&config.embedding)?;

        let index_path = config.index_path();
        let index: Arc<dyn VectorIndex> = match open_index(&config.index, &index_path).await {
            Ok(index) => index,
            Err(e) => {
                warn!("Vector index unavailable at {:?}: {}", index_path, e);
                Arc::new(UnavailableIndex::new(e.to_string()))
            }
        };

        let retriever = Retriever::new(
            embedder,
            index,
            config.retrieval.dedup_key,
            config.embedding.timeout(),
            config.index.timeout(),
        );

        let persona = resolve_persona(&config.workspace, config.persona.as_deref())?;
        let generator = create_generation_client(&config.generation)?;

        info!(
            "RAG engine ready: index={}, embedding={}/{}, generation={}/{}, persona={}",
            retriever.index().backend_name(),
            retriever.embedder().provider_name(),
            retriever.embedder().model_name(),
            generator.provider_name(),
            config.generation.model,
            persona.id
        );

        Ok(Self::new(
            retriever,
            ContextAssembler::new(config.context.max_chunks),
            PromptBuilder::new()?,
            persona,
            generator,
            EngineSettings::from(config),
        ))
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Answer one travel question.
    ///
    /// Never fails: every outcome, including errors, is a terminal result.
    #[instrument(skip(self, query_text))]
    pub async fn answer(&self, query_text: &str) -> AnswerResult {
        let started = Instant::now();
        let mut run = Run::new(&self.settings.generation.model);

        let query = query_text.trim();
        if query.is_empty() {
            info!("Rejected empty query");
            return run.finish(
                AnswerStatus::Error,
                EMPTY_QUERY_MESSAGE.to_string(),
                Some(FailureKind::Validation),
                None,
                started,
            );
        }

        info!("Answering query ({} chars)", query.chars().count());

        let retrieval_started = Instant::now();
        let retrieved = self
            .retriever
            .retrieve(query, self.settings.top_k, self.settings.similarity_threshold)
            .await;
        run.timings.retrieval_ms = elapsed_ms(retrieval_started);

        let outcome = match retrieved {
            Ok(outcome) => outcome,
            Err(AppError::Validation(msg)) => {
                warn!("Retrieval rejected parameters: {}", msg);
                return run.finish(
                    AnswerStatus::Error,
                    INTERNAL_ERROR_MESSAGE.to_string(),
                    Some(FailureKind::Validation),
                    None,
                    started,
                );
            }
            Err(e) => {
                warn!("Retrieval unavailable, skipping generation: {}", e);
                return run.finish(
                    AnswerStatus::BackendUnavailable,
                    RETRIEVAL_UNAVAILABLE_MESSAGE.to_string(),
                    Some(FailureKind::RetrievalUnavailable),
                    None,
                    started,
                );
            }
        };

        let context = self
            .assembler
            .assemble(&outcome.results, self.settings.budget_tokens);
        run.record_retrieval(&outcome, &context);

        let prompt = match self.prompts.build(&context.evidence(), query, &self.persona) {
            Ok(prompt) => prompt,
            Err(e) => {
                warn!("Prompt rendering failed: {}", e);
                return run.finish(
                    AnswerStatus::Error,
                    INTERNAL_ERROR_MESSAGE.to_string(),
                    Some(FailureKind::Internal),
                    None,
                    started,
                );
            }
        };
        tracing::debug!(
            "Built prompt: {} chars, {} evidence passages",
            prompt.text.len(),
            prompt.metadata.evidence_count
        );

        let request = GenerationRequest::new(
            None,
            prompt.text,
            self.settings.generation.clone(),
            self.settings.generation_timeout,
        );
        let response = self.generator.generate(&request).await;
        run.timings.generation_ms = response.latency.as_millis() as u64;

        match response.status {
            GenerationStatus::Succeeded if context.is_empty() => run.finish(
                AnswerStatus::NoContext,
                response.text,
                Some(FailureKind::NoContextFound),
                None,
                started,
            ),
            GenerationStatus::Succeeded => run.finish(
                AnswerStatus::Ok,
                response.text,
                None,
                Some(&context),
                started,
            ),
            status => {
                warn!(
                    "Generation failed ({:?}): {}",
                    status,
                    response.detail.as_deref().unwrap_or("no detail")
                );
                let (message, failure) = self.generation_failure(status);
                run.finish(
                    AnswerStatus::BackendUnavailable,
                    message,
                    Some(failure),
                    None,
                    started,
                )
            }
        }
    }

    fn generation_failure(&self, status: GenerationStatus) -> (String, FailureKind) {
        match status {
            GenerationStatus::TimedOut => {
                (TIMEOUT_MESSAGE.to_string(), FailureKind::GenerationTimeout)
            }
            GenerationStatus::ModelMissing => {
                let model = &self.settings.generation.model;
                (
                    format!(
                        "Sorry, the language model '{}' is not installed. \
Run `ollama pull {}` and try again.",
                        model, model
                    ),
                    FailureKind::GenerationModelMissing,
                )
            }
            _ => (
                BACKEND_ERROR_MESSAGE.to_string(),
                FailureKind::GenerationBackendError,
            ),
        }
    }

    /// Check every provider on demand.
    ///
    /// With `health.cacheTtlSecs > 0`, a report younger than the TTL is
    /// reused instead of probing again.
    pub async fn health(&self) -> HealthReport {
        let Some(ttl) = self.settings.health_cache_ttl else {
            return self.compute_health().await;
        };

        if let Some((at, report)) = self.health_cache.lock().await.as_ref() {
            if at.elapsed() < ttl {
                tracing::debug!("Serving cached health report");
                return report.clone();
            }
        }

        // Probe without holding the lock; concurrent misses may both probe
        let report = self.compute_health().await;
        *self.health_cache.lock().await = Some((Instant::now(), report.clone()));
        report
    }

    async fn compute_health(&self) -> HealthReport {
        let embedder = self.retriever.embedder();
        let index = self.retriever.index();
        let model = &self.settings.generation.model;

        let (embedding, count, probe) = tokio::join!(
            tokio::time::timeout(self.retriever.embed_timeout(), embedder.embed(HEALTH_PROBE_TEXT)),
            tokio::time::timeout(self.retriever.index_timeout(), index.populated_count()),
            self.generator.probe(model),
        );

        let embedding_ok = matches!(embedding, Ok(Ok(ref v)) if !v.is_empty());
        let (index_ok, document_count) = match count {
            Ok(Ok(n)) => (true, n),
            _ => (false, 0),
        };

        let report = HealthReport {
            embedding_ok,
            index_ok,
            backend_ok: probe.is_ready(),
            document_count,
            embedding_model: embedder.model_name().to_string(),
            generation_model: model.clone(),
            checked_at: Utc::now(),
        };

        info!(
            "Health: embedding={}, index={} ({} chunks), backend={}",
            report.embedding_ok, report.index_ok, report.document_count, report.backend_ok
        );

        report
    }
}

/// Diagnostics collected while one query runs.
struct Run {
    retrieval: RetrievalDiagnostics,
    timings: StageTimings,
    model: String,
}

impl Run {
    fn new(model: &str) -> Self {
        Self {
            retrieval: RetrievalDiagnostics::default(),
            timings: StageTimings::default(),
            model: model.to_string(),
        }
    }

    fn record_retrieval(&mut self, outcome: &RetrievalOutcome, context: &ContextBlock) {
        self.retrieval.candidates = outcome.candidates;
        self.retrieval.retained = outcome.results.len();
        self.retrieval.included = context.len();
        self.retrieval.context_tokens = context.total_tokens;
        if let Some((low, high)) = outcome.score_range() {
            self.retrieval.min_score = Some(low);
            self.retrieval.max_score = Some(high);
        }
    }

    fn finish(
        mut self,
        status: AnswerStatus,
        answer: String,
        failure: Option<FailureKind>,
        context: Option<&ContextBlock>,
        started: Instant,
    ) -> AnswerResult {
        self.timings.total_ms = elapsed_ms(started);

        info!(
            status = status.as_str(),
            sources = context.map(|c| c.len()).unwrap_or(0),
            total_ms = self.timings.total_ms,
            "Query finished"
        );

        AnswerResult {
            status,
            answer,
            sources: context.map(|c| c.citations()).unwrap_or_default(),
            diagnostics: AnswerDiagnostics {
                retrieval: self.retrieval,
                failure,
                timings: self.timings,
                model: self.model,
                timestamp: Utc::now(),
            },
        }
    }
}

fn elapsed_ms(since: Instant) -> u64 {
    since.elapsed().as_millis() as u64
}
