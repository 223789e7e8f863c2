//! Prompt types for the Yatri travel assistant.

use serde::{Deserialize, Serialize};

/// A persona definition: who the assistant is and how it speaks.
///
/// The built-in persona is [`PersonaDefinition::yatri`]; alternatives can be
/// loaded from `.yatri/prompts/<id>.yml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonaDefinition {
    /// Unique persona identifier
    pub id: String,

    /// Human-readable title
    pub title: String,

    /// API version for schema evolution
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Creator identifier
    #[serde(rename = "createdBy", default)]
    pub created_by: String,

    /// Behavioral settings
    pub behavior: PersonaBehavior,

    /// Role and guardrail instructions placed first in every prompt
    pub instructions: String,
}

/// Behavioral settings for a persona.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonaBehavior {
    /// Tone (e.g., "warm", "professional")
    pub tone: String,

    /// Style (e.g., "detailed", "concise")
    pub style: String,
}

impl PersonaDefinition {
    /// The default Indian-tourism assistant persona.
    pub fn yatri() -> Self {
        Self {
            id: "yatri.default".to_string(),
            title: "Yatri travel assistant".to_string(),
            api_version: "1.0".to_string(),
            created_by: "yatri".to_string(),
            behavior: PersonaBehavior {
                tone: "warm and enthusiastic, honest about challenges".to_string(),
                style: "practical and detailed, with budget, activities and traveler suitability"
                    .to_string(),
            },
            instructions: "You are Yatri, an expert tourism assistant specializing in Indian travel destinations. \
You help travelers discover places, plan trips and understand destinations across India, \
including Himachal Pradesh, Uttarakhand, Jammu & Kashmir and Ladakh.\n\
Guidelines:\n\
- Give helpful, accurate and engaging travel advice about India only\n\
- Include practical information such as budget, activities and who a place suits\n\
- If you do not have specific information, say so and give general guidance instead\n\
- Always prioritize traveler safety and responsible tourism"
                .to_string(),
        }
    }
}

/// One piece of retrieved evidence, ready to be placed in a prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptEvidence {
    /// Attribution line (location, category, budget)
    pub heading: String,

    /// Passage text, inserted verbatim
    pub text: String,
}

/// A fully built prompt ready for generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuiltPrompt {
    /// Complete instruction text
    pub text: String,

    /// Metadata about the built prompt
    pub metadata: BuiltPromptMetadata,
}

/// Metadata about a built prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuiltPromptMetadata {
    /// Persona the prompt was built with
    #[serde(rename = "personaId")]
    pub persona_id: String,

    /// Number of evidence passages included
    #[serde(rename = "evidenceCount")]
    pub evidence_count: usize,

    /// True when the no-context marker was substituted
    #[serde(rename = "noContext")]
    pub no_context: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_persona_deserialization() {
        let yaml = r#"
id: yatri.concise
title: Concise Yatri
apiVersion: "1.0"
createdBy: ops
behavior:
  tone: friendly
  style: concise
instructions: "You are Yatri. Keep answers under five sentences."
"#;

        let persona: PersonaDefinition = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(persona.id, "yatri.concise");
        assert_eq!(persona.behavior.style, "concise");
        assert!(persona.instructions.contains("five sentences"));
    }

    #[test]
    fn test_default_persona_is_indian_tourism() {
        let persona = PersonaDefinition::yatri();
        assert!(persona.instructions.contains("Indian travel"));
        assert!(persona.instructions.contains("safety"));
    }
}
