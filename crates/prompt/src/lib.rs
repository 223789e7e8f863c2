//! Prompt system for the Yatri travel assistant.
//!
//! - Persona definitions (built-in and YAML-loaded)
//! - Handlebars rendering of the grounded-answer prompt

pub mod builder;
pub mod loader;
pub mod types;

// Re-export main types
pub use builder::{PromptBuilder, NO_CONTEXT_MARKER};
pub use loader::{list_personas, load_persona, resolve_persona};
pub use types::{BuiltPrompt, BuiltPromptMetadata, PersonaBehavior, PersonaDefinition, PromptEvidence};
