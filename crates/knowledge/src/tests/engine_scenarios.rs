//! End-to-end engine scenarios with in-process fakes (no network).

use crate::embeddings::EmbeddingProvider;
use crate::rag::{
    AnswerStatus, ContextAssembler, EngineSettings, FailureKind, RagEngine, Retriever,
};
use crate::types::{ChunkMetadata, DocumentChunk};
use crate::vector_index::{IndexHit, UnavailableIndex, VectorIndex};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use yatri_core::{AppResult, DedupKey};
use yatri_llm::{
    GenerationClient, GenerationParams, LlmClient, LlmRequest, LlmResponse, LlmUsage,
    ProbePolicy, ProbeReport,
};
use yatri_prompt::{PersonaDefinition, PromptBuilder, NO_CONTEXT_MARKER};

const MODEL: &str = "qwen2.5:1.5b";
const MANALI_QUERY: &str = "What are the best adventure activities in Manali?";

#[derive(Debug, Default)]
struct CountingEmbedder {
    calls: AtomicUsize,
}

#[async_trait]
impl EmbeddingProvider for CountingEmbedder {
    fn provider_name(&self) -> &str {
        "counting"
    }

    fn model_name(&self) -> &str {
        "counting-v1"
    }

    fn dimensions(&self) -> usize {
        2
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        self.calls.fetch_add(texts.len(), Ordering::SeqCst);
        Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
    }
}

#[derive(Default)]
struct ScriptedIndex {
    hits: Vec<IndexHit>,
    calls: AtomicUsize,
}

#[async_trait]
impl VectorIndex for ScriptedIndex {
    fn backend_name(&self) -> &str {
        "scripted"
    }

    async fn query(&self, _vector: &[f32], top_k: usize) -> AppResult<Vec<IndexHit>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.hits.iter().take(top_k).cloned().collect())
    }

    async fn populated_count(&self) -> AppResult<usize> {
        Ok(self.hits.len())
    }
}

/// Index whose queries outlast the retriever's index timeout.
struct HungIndex;

#[async_trait]
impl VectorIndex for HungIndex {
    fn backend_name(&self) -> &str {
        "hung"
    }

    async fn query(&self, _vector: &[f32], _top_k: usize) -> AppResult<Vec<IndexHit>> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(Vec::new())
    }

    async fn populated_count(&self) -> AppResult<usize> {
        Ok(0)
    }
}

struct FakeBackend {
    model_present: bool,
    completion: String,
    delay: Duration,
    probe_delay: Duration,
    probe_calls: AtomicUsize,
    complete_calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl FakeBackend {
    fn answering(text: &str) -> Self {
        Self {
            model_present: true,
            completion: text.to_string(),
            delay: Duration::ZERO,
            probe_delay: Duration::ZERO,
            probe_calls: AtomicUsize::new(0),
            complete_calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    fn last_prompt(&self) -> String {
        self.prompts.lock().unwrap().last().cloned().unwrap_or_default()
    }
}

#[async_trait]
impl LlmClient for FakeBackend {
    fn provider_name(&self) -> &str {
        "fake"
    }

    async fn probe(&self, _model: &str) -> AppResult<ProbeReport> {
        self.probe_calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.probe_delay).await;
        Ok(ProbeReport {
            available: true,
            model_present: self.model_present,
            models: vec!["llama3:latest".to_string()],
        })
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        self.complete_calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(request.prompt.clone());
        tokio::time::sleep(self.delay).await;
        Ok(LlmResponse {
            content: self.completion.clone(),
            model: request.model.clone(),
            usage: LlmUsage::new(120, 40),
            done: true,
        })
    }
}

struct Harness {
    embedder: Arc<CountingEmbedder>,
    index: Arc<ScriptedIndex>,
    backend: Arc<FakeBackend>,
    engine: RagEngine,
}

fn hit(id: &str, city: &str, category: &str, text: &str, similarity: f32) -> IndexHit {
    IndexHit {
        chunk: DocumentChunk {
            id: id.to_string(),
            text: text.to_string(),
            embedding: Vec::new(),
            metadata: ChunkMetadata {
                city: city.to_string(),
                state: "Himachal Pradesh".to_string(),
                country: "India".to_string(),
                category: category.to_string(),
                price_range: "medium".to_string(),
                ..Default::default()
            },
        },
        similarity,
    }
}

fn manali_hits() -> Vec<IndexHit> {
    vec![
        hit(
            "manali_adv_001",
            "Manali",
            "Adventure",
            "Solang Valley offers paragliding, zorbing and skiing in winter.",
            0.81,
        ),
        hit(
            "manali_trek_004",
            "Manali",
            "Trekking",
            "The Hampta Pass trek crosses from Kullu into Lahaul over four days.",
            0.76,
        ),
    ]
}

fn settings(generation_timeout: Duration, health_cache_ttl: Option<Duration>) -> EngineSettings {
    EngineSettings {
        top_k: 5,
        similarity_threshold: 0.3,
        budget_tokens: 1000,
        generation: GenerationParams {
            model: MODEL.to_string(),
            temperature: 0.7,
            max_tokens: 1000,
        },
        generation_timeout,
        health_cache_ttl,
    }
}

fn build(index: Arc<dyn VectorIndex>, backend: Arc<FakeBackend>, settings: EngineSettings) -> RagEngine {
    build_with(Arc::new(CountingEmbedder::default()), index, backend, settings)
}

fn build_with(
    embedder: Arc<CountingEmbedder>,
    index: Arc<dyn VectorIndex>,
    backend: Arc<FakeBackend>,
    settings: EngineSettings,
) -> RagEngine {
    let retriever = Retriever::new(
        embedder,
        index,
        DedupKey::LocationCategory,
        Duration::from_secs(1),
        Duration::from_secs(1),
    );
    let generator = GenerationClient::new(
        backend,
        ProbePolicy {
            timeout: Duration::from_secs(1),
            retries: 0,
            backoff: Duration::ZERO,
        },
    );

    RagEngine::new(
        retriever,
        ContextAssembler::new(5),
        PromptBuilder::new().unwrap(),
        PersonaDefinition::yatri(),
        generator,
        settings,
    )
}

fn harness(hits: Vec<IndexHit>, backend: FakeBackend) -> Harness {
    let embedder = Arc::new(CountingEmbedder::default());
    let index = Arc::new(ScriptedIndex {
        hits,
        calls: AtomicUsize::new(0),
    });
    let backend = Arc::new(backend);
    let engine = build_with(
        embedder.clone(),
        index.clone(),
        backend.clone(),
        settings(Duration::from_secs(5), None),
    );

    Harness {
        embedder,
        index,
        backend,
        engine,
    }
}

#[tokio::test]
async fn manali_question_is_grounded_with_two_sources() {
    let h = harness(
        manali_hits(),
        FakeBackend::answering("  Try paragliding at Solang Valley or the Hampta Pass trek.  "),
    );

    let result = h.engine.answer(MANALI_QUERY).await;

    assert_eq!(result.status, AnswerStatus::Ok);
    assert_eq!(
        result.answer,
        "Try paragliding at Solang Valley or the Hampta Pass trek."
    );
    assert_eq!(result.sources.len(), 2);
    assert_eq!(result.sources[0].chunk_id, "manali_adv_001");
    assert_eq!(result.sources[0].score, 0.81);
    assert_eq!(result.sources[1].score, 0.76);
    assert_eq!(result.sources[0].location, "Manali, Himachal Pradesh");
    assert_eq!(result.diagnostics.failure, None);
    assert_eq!(result.diagnostics.retrieval.candidates, 2);
    assert_eq!(result.diagnostics.retrieval.included, 2);
    assert_eq!(result.diagnostics.retrieval.max_score, Some(0.81));
    assert_eq!(result.diagnostics.retrieval.min_score, Some(0.76));

    let prompt = h.backend.last_prompt();
    assert!(prompt.contains("Solang Valley"));
    assert!(prompt.contains("Hampta Pass"));
    assert!(prompt.contains(MANALI_QUERY));
    assert!(!prompt.contains(NO_CONTEXT_MARKER));
}

#[tokio::test]
async fn nonsense_query_generates_without_context() {
    let h = harness(
        vec![hit("goa_001", "Panaji", "Beaches", "Baga beach.", 0.12)],
        FakeBackend::answering("I don't have specific information about that."),
    );

    let result = h.engine.answer("asdkjasdkj random nonsense").await;

    assert_eq!(result.status, AnswerStatus::NoContext);
    assert!(result.sources.is_empty());
    assert_eq!(result.diagnostics.failure, Some(FailureKind::NoContextFound));
    assert_eq!(result.diagnostics.retrieval.candidates, 1);
    assert_eq!(result.diagnostics.retrieval.retained, 0);
    assert_eq!(h.backend.complete_calls.load(Ordering::SeqCst), 1);
    assert!(h.backend.last_prompt().contains(NO_CONTEXT_MARKER));
    assert!(!result.is_grounded());
}

#[tokio::test]
async fn missing_model_is_reported_without_generation() {
    let mut backend = FakeBackend::answering("unused");
    backend.model_present = false;
    let h = harness(manali_hits(), backend);

    let result = h.engine.answer(MANALI_QUERY).await;

    assert_eq!(result.status, AnswerStatus::BackendUnavailable);
    assert_eq!(
        result.diagnostics.failure,
        Some(FailureKind::GenerationModelMissing)
    );
    assert!(result.answer.contains("ollama pull qwen2.5:1.5b"));
    assert!(result.sources.is_empty());
    assert_eq!(h.backend.complete_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn slow_generation_times_out_once() {
    let mut backend = FakeBackend::answering("too late");
    backend.delay = Duration::from_millis(500);
    let backend = Arc::new(backend);
    let index = Arc::new(ScriptedIndex {
        hits: manali_hits(),
        calls: AtomicUsize::new(0),
    });
    let engine = build(
        index,
        backend.clone(),
        settings(Duration::from_millis(50), None),
    );

    let result = engine.answer(MANALI_QUERY).await;

    assert_eq!(result.status, AnswerStatus::BackendUnavailable);
    assert_eq!(result.diagnostics.failure, Some(FailureKind::GenerationTimeout));
    assert!(!result.answer.contains("too late"));
    assert_eq!(backend.complete_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn empty_generation_is_backend_error() {
    let h = harness(manali_hits(), FakeBackend::answering("   \n  "));

    let result = h.engine.answer(MANALI_QUERY).await;

    assert_eq!(result.status, AnswerStatus::BackendUnavailable);
    assert_eq!(
        result.diagnostics.failure,
        Some(FailureKind::GenerationBackendError)
    );
    assert!(result.answer.contains("Ollama is running"));
}

#[tokio::test]
async fn unreachable_index_skips_generation() {
    let backend = Arc::new(FakeBackend::answering("unused"));
    let engine = build(
        Arc::new(UnavailableIndex::new("connection refused")),
        backend.clone(),
        settings(Duration::from_secs(5), None),
    );

    let result = engine.answer(MANALI_QUERY).await;

    assert_eq!(result.status, AnswerStatus::BackendUnavailable);
    assert_eq!(
        result.diagnostics.failure,
        Some(FailureKind::RetrievalUnavailable)
    );
    assert!(!result.answer.contains("connection refused"));
    assert_eq!(backend.probe_calls.load(Ordering::SeqCst), 0);
    assert_eq!(backend.complete_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn hung_index_times_out_before_generation() {
    let backend = Arc::new(FakeBackend::answering("unused"));
    let engine = build(
        Arc::new(HungIndex),
        backend.clone(),
        settings(Duration::from_secs(5), None),
    );

    let started = std::time::Instant::now();
    let result = engine.answer(MANALI_QUERY).await;

    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(result.status, AnswerStatus::BackendUnavailable);
    assert_eq!(
        result.diagnostics.failure,
        Some(FailureKind::RetrievalUnavailable)
    );
    assert_eq!(backend.probe_calls.load(Ordering::SeqCst), 0);
    assert_eq!(backend.complete_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn whitespace_query_makes_no_calls() {
    let h = harness(manali_hits(), FakeBackend::answering("unused"));

    for query in ["", "   ", "\n\t "] {
        let result = h.engine.answer(query).await;
        assert_eq!(result.status, AnswerStatus::Error);
        assert_eq!(result.diagnostics.failure, Some(FailureKind::Validation));
        assert!(result.sources.is_empty());
    }

    assert_eq!(h.embedder.calls.load(Ordering::SeqCst), 0);
    assert_eq!(h.index.calls.load(Ordering::SeqCst), 0);
    assert_eq!(h.backend.probe_calls.load(Ordering::SeqCst), 0);
    assert_eq!(h.backend.complete_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn concurrent_answers_are_independent() {
    let h = harness(manali_hits(), FakeBackend::answering("Paragliding."));

    let (a, b) = tokio::join!(
        h.engine.answer(MANALI_QUERY),
        h.engine.answer("Where can I trek near Manali?")
    );

    assert_eq!(a.status, AnswerStatus::Ok);
    assert_eq!(b.status, AnswerStatus::Ok);
    assert_eq!(a.sources, b.sources);
    assert_eq!(h.backend.complete_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn health_reports_each_provider() {
    let h = harness(manali_hits(), FakeBackend::answering("unused"));

    let report = h.engine.health().await;

    assert!(report.embedding_ok);
    assert!(report.index_ok);
    assert!(report.backend_ok);
    assert!(report.is_healthy());
    assert_eq!(report.document_count, 2);
    assert_eq!(report.generation_model, MODEL);
}

#[tokio::test]
async fn health_with_unreachable_index() {
    let engine = build(
        Arc::new(UnavailableIndex::new("missing")),
        Arc::new(FakeBackend::answering("unused")),
        settings(Duration::from_secs(5), None),
    );

    let report = engine.health().await;

    assert!(!report.index_ok);
    assert_eq!(report.document_count, 0);
    assert!(report.backend_ok);
    assert!(!report.is_healthy());
}

#[tokio::test]
async fn health_cache_reuses_recent_report() {
    let backend = Arc::new(FakeBackend::answering("unused"));
    let index = Arc::new(ScriptedIndex {
        hits: manali_hits(),
        calls: AtomicUsize::new(0),
    });

    let cached = build(
        index.clone(),
        backend.clone(),
        settings(Duration::from_secs(5), Some(Duration::from_secs(60))),
    );
    let first = cached.health().await;
    let second = cached.health().await;
    assert_eq!(first, second);
    assert_eq!(backend.probe_calls.load(Ordering::SeqCst), 1);

    let uncached = build(index, backend.clone(), settings(Duration::from_secs(5), None));
    uncached.health().await;
    uncached.health().await;
    assert_eq!(backend.probe_calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn uncached_health_checks_run_concurrently() {
    let mut backend = FakeBackend::answering("unused");
    backend.probe_delay = Duration::from_millis(300);
    let backend = Arc::new(backend);
    let index = Arc::new(ScriptedIndex {
        hits: manali_hits(),
        calls: AtomicUsize::new(0),
    });
    let engine = build(index, backend.clone(), settings(Duration::from_secs(5), None));

    let started = std::time::Instant::now();
    let (a, b) = tokio::join!(engine.health(), engine.health());

    assert!(a.backend_ok && b.backend_ok);
    assert_eq!(backend.probe_calls.load(Ordering::SeqCst), 2);
    assert!(started.elapsed() < Duration::from_millis(550));
}

#[tokio::test]
async fn answer_result_serializes_for_consumers() {
    let h = harness(manali_hits(), FakeBackend::answering("Paragliding."));

    let result = h.engine.answer(MANALI_QUERY).await;
    let json = serde_json::to_value(&result).unwrap();

    assert_eq!(json["status"], "ok");
    assert_eq!(json["sources"][0]["chunkId"], "manali_adv_001");
    assert!(json["diagnostics"]["timestamp"].is_string());
    assert!(json["diagnostics"].get("failure").is_none());
}
