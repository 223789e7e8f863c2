//! Retriever: embed, search, threshold, deduplicate, rank.

use crate::embeddings::EmbeddingProvider;
use crate::types::DocumentChunk;
use crate::vector_index::VectorIndex;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument};
use yatri_core::{AppError, AppResult, DedupKey};

/// A chunk that cleared the threshold, with its similarity and 1-based rank.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalResult {
    pub chunk: DocumentChunk,
    pub similarity: f32,
    pub rank: usize,
}

/// Ranked results plus how many raw hits the index returned.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RetrievalOutcome {
    pub results: Vec<RetrievalResult>,

    /// Hits returned by the index before thresholding and deduplication
    pub candidates: usize,
}

impl RetrievalOutcome {
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// (lowest, highest) similarity among retained results.
    pub fn score_range(&self) -> Option<(f32, f32)> {
        let first = self.results.first()?.similarity;
        let last = self.results.last()?.similarity;
        Some((last, first))
    }
}

/// Issues queries against a vector index.
#[derive(Clone)]
pub struct Retriever {
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
    dedup_key: DedupKey,
    embed_timeout: Duration,
    index_timeout: Duration,
}

impl Retriever {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndex>,
        dedup_key: DedupKey,
        embed_timeout: Duration,
        index_timeout: Duration,
    ) -> Self {
        Self {
            embedder,
            index,
            dedup_key,
            embed_timeout,
            index_timeout,
        }
    }

    pub fn embedder(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedder
    }

    pub fn index(&self) -> &Arc<dyn VectorIndex> {
        &self.index
    }

    pub fn embed_timeout(&self) -> Duration {
        self.embed_timeout
    }

    pub fn index_timeout(&self) -> Duration {
        self.index_timeout
    }

    /// Retrieve up to `top_k` results at or above `similarity_threshold`.
    ///
    /// An empty outcome is a valid "no relevant context" signal. Failures of
    /// the embedding provider or index surface as `RetrievalUnavailable`.
    #[instrument(skip(self, query_text), fields(index = %self.index.backend_name()))]
    pub async fn retrieve(
        &self,
        query_text: &str,
        top_k: usize,
        similarity_threshold: f32,
    ) -> AppResult<RetrievalOutcome> {
        if top_k == 0 {
            return Err(AppError::Validation("top_k must be at least 1".to_string()));
        }
        if !(0.0..=1.0).contains(&similarity_threshold) {
            return Err(AppError::Validation(format!(
                "similarity threshold {} is outside [0, 1]",
                similarity_threshold
            )));
        }

        let vector = match tokio::time::timeout(self.embed_timeout, self.embedder.embed(query_text))
            .await
        {
            Ok(Ok(vector)) => vector,
            Ok(Err(e)) => return Err(unavailable("embedding", e)),
            Err(_) => {
                return Err(AppError::RetrievalUnavailable(format!(
                    "embedding timed out after {}ms",
                    self.embed_timeout.as_millis()
                )))
            }
        };

        let hits = match tokio::time::timeout(self.index_timeout, self.index.query(&vector, top_k))
            .await
        {
            Ok(Ok(hits)) => hits,
            Ok(Err(e)) => return Err(unavailable("vector index", e)),
            Err(_) => {
                return Err(AppError::RetrievalUnavailable(format!(
                    "vector index query timed out after {}ms",
                    self.index_timeout.as_millis()
                )))
            }
        };

        let candidates = hits.len();
        debug!(
            "Index returned {} hits - scores: {:?}",
            candidates,
            hits.iter().map(|h| h.similarity).collect::<Vec<_>>()
        );

        let mut kept: Vec<(DocumentChunk, f32)> = hits
            .into_iter()
            .take(top_k)
            .filter(|hit| hit.similarity >= similarity_threshold)
            .map(|hit| (hit.chunk, hit.similarity))
            .collect();

        // Stable: ties keep the index's order
        kept.sort_by(|a, b| b.1.total_cmp(&a.1));

        let results: Vec<RetrievalResult> = deduplicate(kept, self.dedup_key)
            .into_iter()
            .enumerate()
            .map(|(i, (chunk, similarity))| RetrievalResult {
                chunk,
                similarity,
                rank: i + 1,
            })
            .collect();

        let outcome = RetrievalOutcome {
            results,
            candidates,
        };

        match outcome.score_range() {
            Some((low, high)) => info!(
                "Retrieved {} relevant chunks of {} candidates (scores {:.3}..{:.3})",
                outcome.results.len(),
                candidates,
                low,
                high
            ),
            None => info!(
                "No chunks cleared the {:.2} threshold ({} candidates)",
                similarity_threshold, candidates
            ),
        }

        Ok(outcome)
    }
}

fn unavailable(layer: &str, err: AppError) -> AppError {
    match err {
        AppError::RetrievalUnavailable(msg) => {
            AppError::RetrievalUnavailable(format!("{}: {}", layer, msg))
        }
        other => AppError::RetrievalUnavailable(format!("{}: {}", layer, other)),
    }
}

/// Collapse results sharing a dedup key, keeping the first (highest-scoring).
///
/// Input must already be sorted by descending similarity.
fn deduplicate(sorted: Vec<(DocumentChunk, f32)>, key: DedupKey) -> Vec<(DocumentChunk, f32)> {
    if key == DedupKey::None {
        return sorted;
    }

    let mut seen = HashSet::new();
    sorted
        .into_iter()
        .filter(|(chunk, _)| seen.insert(dedup_key(chunk, key)))
        .collect()
}

fn dedup_key(chunk: &DocumentChunk, key: DedupKey) -> String {
    let meta = &chunk.metadata;
    match key {
        DedupKey::LocationCategory => format!(
            "{}|{}|{}",
            meta.city.trim().to_lowercase(),
            meta.state.trim().to_lowercase(),
            meta.category.trim().to_lowercase()
        ),
        DedupKey::Source => meta.source.clone().unwrap_or_else(|| chunk.id.clone()),
        DedupKey::None => chunk.id.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChunkMetadata;
    use crate::vector_index::{IndexHit, UnavailableIndex};
    use async_trait::async_trait;

    #[derive(Debug)]
    struct FixedEmbedder;

    #[async_trait]
    impl EmbeddingProvider for FixedEmbedder {
        fn provider_name(&self) -> &str {
            "fixed"
        }

        fn model_name(&self) -> &str {
            "fixed"
        }

        fn dimensions(&self) -> usize {
            2
        }

        async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
        }
    }

    struct ScriptedIndex {
        hits: Vec<IndexHit>,
    }

    #[async_trait]
    impl VectorIndex for ScriptedIndex {
        fn backend_name(&self) -> &str {
            "scripted"
        }

        async fn query(&self, _vector: &[f32], top_k: usize) -> AppResult<Vec<IndexHit>> {
            Ok(self.hits.iter().take(top_k).cloned().collect())
        }

        async fn populated_count(&self) -> AppResult<usize> {
            Ok(self.hits.len())
        }
    }

    /// Embedder that never answers within any reasonable timeout.
    #[derive(Debug)]
    struct StalledEmbedder;

    #[async_trait]
    impl EmbeddingProvider for StalledEmbedder {
        fn provider_name(&self) -> &str {
            "stalled"
        }

        fn model_name(&self) -> &str {
            "stalled"
        }

        fn dimensions(&self) -> usize {
            2
        }

        async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
        }
    }

    struct StalledIndex;

    #[async_trait]
    impl VectorIndex for StalledIndex {
        fn backend_name(&self) -> &str {
            "stalled"
        }

        async fn query(&self, _vector: &[f32], _top_k: usize) -> AppResult<Vec<IndexHit>> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(Vec::new())
        }

        async fn populated_count(&self) -> AppResult<usize> {
            Ok(0)
        }
    }

    fn hit(id: &str, city: &str, category: &str, similarity: f32) -> IndexHit {
        IndexHit {
            chunk: DocumentChunk {
                id: id.to_string(),
                text: format!("text of {}", id),
                embedding: Vec::new(),
                metadata: ChunkMetadata {
                    city: city.to_string(),
                    state: "Himachal Pradesh".to_string(),
                    category: category.to_string(),
                    ..Default::default()
                },
            },
            similarity,
        }
    }

    fn retriever(hits: Vec<IndexHit>, dedup: DedupKey) -> Retriever {
        Retriever::new(
            Arc::new(FixedEmbedder),
            Arc::new(ScriptedIndex { hits }),
            dedup,
            Duration::from_secs(1),
            Duration::from_secs(1),
        )
    }

    #[tokio::test]
    async fn test_threshold_and_ranking() {
        let r = retriever(
            vec![
                hit("a", "Manali", "Adventure", 0.81),
                hit("b", "Manali", "Trekking", 0.76),
                hit("c", "Shimla", "Heritage", 0.12),
            ],
            DedupKey::LocationCategory,
        );

        let outcome = r
            .retrieve("What are the best adventure activities in Manali?", 5, 0.3)
            .await
            .unwrap();

        let scores: Vec<f32> = outcome.results.iter().map(|r| r.similarity).collect();
        assert_eq!(scores, vec![0.81, 0.76]);
        assert_eq!(outcome.results[0].rank, 1);
        assert_eq!(outcome.results[1].rank, 2);
        assert_eq!(outcome.candidates, 3);
    }

    #[tokio::test]
    async fn test_dedup_keeps_highest_scoring() {
        let r = retriever(
            vec![
                hit("low", "Manali", "Adventure", 0.55),
                hit("high", "manali", "adventure", 0.9),
            ],
            DedupKey::LocationCategory,
        );

        let outcome = r.retrieve("Manali adventure", 5, 0.3).await.unwrap();
        assert_eq!(outcome.results.len(), 1);
        assert_eq!(outcome.results[0].chunk.id, "high");
    }

    #[tokio::test]
    async fn test_dedup_none_keeps_all() {
        let r = retriever(
            vec![
                hit("a", "Manali", "Adventure", 0.9),
                hit("b", "Manali", "Adventure", 0.8),
            ],
            DedupKey::None,
        );

        let outcome = r.retrieve("Manali", 5, 0.3).await.unwrap();
        assert_eq!(outcome.results.len(), 2);
    }

    #[tokio::test]
    async fn test_dedup_by_source_falls_back_to_id() {
        let mut a = hit("a", "Manali", "Adventure", 0.9);
        a.chunk.metadata.source = Some("page-12".to_string());
        let mut b = hit("b", "Manali", "Adventure", 0.8);
        b.chunk.metadata.source = Some("page-12".to_string());
        let c = hit("c", "Manali", "Adventure", 0.7);

        let r = retriever(vec![a, b, c], DedupKey::Source);
        let outcome = r.retrieve("Manali", 5, 0.3).await.unwrap();

        let ids: Vec<&str> = outcome.results.iter().map(|r| r.chunk.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[tokio::test]
    async fn test_ties_keep_index_order_and_repeat() {
        let hits = vec![
            hit("first", "Leh", "Nature", 0.5),
            hit("second", "Kaza", "Nature", 0.5),
            hit("third", "Manali", "Nature", 0.5),
        ];
        let r = retriever(hits, DedupKey::LocationCategory);

        let a = r.retrieve("lakes", 5, 0.3).await.unwrap();
        let b = r.retrieve("lakes", 5, 0.3).await.unwrap();

        let ids: Vec<&str> = a.results.iter().map(|r| r.chunk.id.as_str()).collect();
        assert_eq!(ids, vec!["first", "second", "third"]);
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_nothing_clears_threshold() {
        let r = retriever(
            vec![hit("a", "Goa", "Beaches", 0.1)],
            DedupKey::LocationCategory,
        );

        let outcome = r.retrieve("asdkjasdkj random nonsense", 5, 0.3).await.unwrap();
        assert!(outcome.is_empty());
        assert_eq!(outcome.score_range(), None);
    }

    #[tokio::test]
    async fn test_unreachable_index() {
        let r = Retriever::new(
            Arc::new(FixedEmbedder),
            Arc::new(UnavailableIndex::new("connection refused")),
            DedupKey::LocationCategory,
            Duration::from_secs(1),
            Duration::from_secs(1),
        );

        let err = r.retrieve("Manali", 5, 0.3).await.unwrap_err();
        assert!(matches!(err, AppError::RetrievalUnavailable(_)));
    }

    #[tokio::test]
    async fn test_slow_index_times_out() {
        let r = Retriever::new(
            Arc::new(FixedEmbedder),
            Arc::new(StalledIndex),
            DedupKey::LocationCategory,
            Duration::from_secs(1),
            Duration::from_millis(50),
        );

        let started = std::time::Instant::now();
        let err = r.retrieve("Manali", 5, 0.3).await.unwrap_err();
        assert!(started.elapsed() < Duration::from_secs(2));
        match err {
            AppError::RetrievalUnavailable(msg) => assert!(msg.contains("timed out")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_slow_embedder_times_out() {
        let r = Retriever::new(
            Arc::new(StalledEmbedder),
            Arc::new(ScriptedIndex {
                hits: vec![hit("a", "Manali", "Adventure", 0.9)],
            }),
            DedupKey::LocationCategory,
            Duration::from_millis(50),
            Duration::from_secs(1),
        );

        let started = std::time::Instant::now();
        let err = r.retrieve("Manali", 5, 0.3).await.unwrap_err();
        assert!(started.elapsed() < Duration::from_secs(2));
        match err {
            AppError::RetrievalUnavailable(msg) => assert!(msg.contains("embedding timed out")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_rejects_bad_parameters() {
        let r = retriever(Vec::new(), DedupKey::LocationCategory);
        assert!(matches!(
            r.retrieve("Manali", 0, 0.3).await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            r.retrieve("Manali", 5, 1.5).await,
            Err(AppError::Validation(_))
        ));
    }
}
