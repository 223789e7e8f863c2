//! Context assembly: fit ranked results into a bounded context block.
//!
//! Size is an estimate of tokens: one token per four grapheme clusters,
//! rounded up, over the passage text.

use crate::rag::retriever::RetrievalResult;
use crate::rag::types::{round_score, CitedSource};
use unicode_segmentation::UnicodeSegmentation;
use yatri_prompt::PromptEvidence;

const GRAPHEMES_PER_TOKEN: usize = 4;
const TRUNCATION_MARK: &str = "…";

/// Estimated token count of `text`.
pub fn estimate_tokens(text: &str) -> usize {
    text.graphemes(true).count().div_ceil(GRAPHEMES_PER_TOKEN)
}

/// One passage selected into the context.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextEntry {
    pub chunk_id: String,

    /// "City, State | Category > Subcategory | budget: tier"
    pub heading: String,

    pub text: String,
    pub tokens: usize,
    pub similarity: f32,

    /// Only the first entry can be truncated, and only to fit the budget
    pub truncated: bool,

    pub citation: CitedSource,
}

/// Selected passages plus their total estimated size.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContextBlock {
    pub entries: Vec<ContextEntry>,
    pub total_tokens: usize,
}

impl ContextBlock {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Citations in inclusion order.
    pub fn citations(&self) -> Vec<CitedSource> {
        self.entries.iter().map(|e| e.citation.clone()).collect()
    }

    /// Passages in the shape the prompt builder consumes.
    pub fn evidence(&self) -> Vec<PromptEvidence> {
        self.entries
            .iter()
            .map(|e| PromptEvidence {
                heading: e.heading.clone(),
                text: e.text.clone(),
            })
            .collect()
    }
}

/// Greedy, order-preserving context assembler.
#[derive(Debug, Clone, Copy)]
pub struct ContextAssembler {
    max_chunks: usize,
}

impl ContextAssembler {
    pub fn new(max_chunks: usize) -> Self {
        Self {
            max_chunks: max_chunks.max(1),
        }
    }

    /// Accumulate `results` in order until the next passage would exceed
    /// `token_budget` or `max_chunks` is reached.
    ///
    /// Passages are included whole, except that a first passage larger than
    /// the whole budget is cut at a word boundary so that any evidence at all
    /// yields a non-empty block.
    pub fn assemble(&self, results: &[RetrievalResult], token_budget: usize) -> ContextBlock {
        let token_budget = token_budget.max(1);
        let mut block = ContextBlock::default();

        for result in results.iter().take(self.max_chunks) {
            let tokens = estimate_tokens(&result.chunk.text);

            if block.total_tokens + tokens <= token_budget {
                block.total_tokens += tokens;
                block.entries.push(entry(result, result.chunk.text.clone(), tokens, false));
                continue;
            }

            if block.entries.is_empty() {
                let text = truncate_to_tokens(&result.chunk.text, token_budget);
                let tokens = estimate_tokens(&text);
                block.total_tokens += tokens;
                block.entries.push(entry(result, text, tokens, true));
            }
            break;
        }

        tracing::debug!(
            "Assembled context: {} of {} results, {}/{} tokens",
            block.len(),
            results.len(),
            block.total_tokens,
            token_budget
        );

        block
    }
}

fn entry(result: &RetrievalResult, text: String, tokens: usize, truncated: bool) -> ContextEntry {
    let meta = &result.chunk.metadata;
    ContextEntry {
        chunk_id: result.chunk.id.clone(),
        heading: format!(
            "{} | {} | budget: {}",
            meta.location_label(),
            meta.category_label(),
            meta.budget_label()
        ),
        text,
        tokens,
        similarity: result.similarity,
        truncated,
        citation: CitedSource {
            chunk_id: result.chunk.id.clone(),
            label: meta.citation_label(),
            location: meta.location_label(),
            category: meta.category_label(),
            budget: meta.budget_label().to_string(),
            score: round_score(result.similarity),
        },
    }
}

/// Cut `text` so its estimate fits `max_tokens`, preferring a word boundary.
fn truncate_to_tokens(text: &str, max_tokens: usize) -> String {
    // Leading whitespace would otherwise be the only word boundary in reach
    let text = text.trim_start();
    let max_graphemes = max_tokens * GRAPHEMES_PER_TOKEN;
    let graphemes: Vec<&str> = text.graphemes(true).collect();
    if graphemes.len() <= max_graphemes {
        return text.to_string();
    }

    // Leave room for the mark
    let limit = max_graphemes - 1;
    let cut = graphemes[..limit]
        .iter()
        .rposition(|g| g.chars().all(char::is_whitespace))
        .filter(|&pos| pos > 0)
        .unwrap_or(limit);

    let mut truncated: String = graphemes[..cut].concat().trim_end().to_string();
    truncated.push_str(TRUNCATION_MARK);
    truncated
}
