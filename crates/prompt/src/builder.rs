//! Prompt builder for grounded travel answers.
//!
//! Every prompt contains, in order: persona instructions, the retrieved
//! context (or the no-context marker), the grounding instruction, and the
//! traveler's question verbatim.

use crate::types::{BuiltPrompt, BuiltPromptMetadata, PersonaDefinition, PromptEvidence};
use handlebars::Handlebars;
use serde::Serialize;
use yatri_core::{AppError, AppResult};

/// Marker substituted for the context section when retrieval found nothing.
pub const NO_CONTEXT_MARKER: &str = "[NO MATCHING CONTEXT FOUND]";

const TEMPLATE_NAME: &str = "grounded_answer";

const GROUNDED_ANSWER_TEMPLATE: &str = "{{instructions}}
Tone: {{tone}}. Style: {{style}}.

=== TRAVEL CONTEXT ===
{{#if evidence}}{{#each evidence}}[Source {{number}}] {{heading}}
{{text}}
---
{{/each}}{{else}}{{no_context_marker}}
No passages in the tourism knowledge base matched this question.
{{/if}}=== END CONTEXT ===

Answer the traveler's question using the context above. \
If the context is missing or does not contain the answer, say so plainly, \
then offer general guidance about travel in India without inventing specific \
places, prices or contact details.

Traveler's question: {{query}}
";

#[derive(Serialize)]
struct TemplateData<'a> {
    instructions: &'a str,
    tone: &'a str,
    style: &'a str,
    evidence: Vec<NumberedEvidence<'a>>,
    no_context_marker: &'static str,
    query: &'a str,
}

#[derive(Serialize)]
struct NumberedEvidence<'a> {
    number: usize,
    heading: &'a str,
    text: &'a str,
}

/// Renders grounded-answer prompts.
///
/// The template is registered once; `build` takes `&self` and is safe to
/// call from concurrent queries.
#[derive(Debug)]
pub struct PromptBuilder {
    handlebars: Handlebars<'static>,
}

impl PromptBuilder {
    pub fn new() -> AppResult<Self> {
        let mut handlebars = Handlebars::new();

        // Plain text output: no HTML escaping
        handlebars.register_escape_fn(handlebars::no_escape);
        handlebars.set_strict_mode(true);

        handlebars
            .register_template_string(TEMPLATE_NAME, GROUNDED_ANSWER_TEMPLATE)
            .map_err(|e| AppError::Prompt(format!("Failed to register template: {}", e)))?;

        Ok(Self { handlebars })
    }

    /// Build a prompt from retrieved evidence, the user query and a persona.
    ///
    /// Pure: identical inputs always render identical text.
    pub fn build(
        &self,
        evidence: &[PromptEvidence],
        query: &str,
        persona: &PersonaDefinition,
    ) -> AppResult<BuiltPrompt> {
        tracing::debug!(
            "Building prompt with persona '{}' and {} evidence passages",
            persona.id,
            evidence.len()
        );

        let data = TemplateData {
            instructions: persona.instructions.trim_end(),
            tone: &persona.behavior.tone,
            style: &persona.behavior.style,
            evidence: evidence
                .iter()
                .enumerate()
                .map(|(i, e)| NumberedEvidence {
                    number: i + 1,
                    heading: &e.heading,
                    text: &e.text,
                })
                .collect(),
            no_context_marker: NO_CONTEXT_MARKER,
            query,
        };

        let text = self
            .handlebars
            .render(TEMPLATE_NAME, &data)
            .map_err(|e| AppError::Prompt(format!("Failed to render template: {}", e)))?;

        Ok(BuiltPrompt {
            text,
            metadata: BuiltPromptMetadata {
                persona_id: persona.id.clone(),
                evidence_count: evidence.len(),
                no_context: evidence.is_empty(),
            },
        })
    }
}
