//! Tourism corpus type definitions.

use serde::{Deserialize, Serialize};

/// An immutable unit of corpus text, produced by the ingestion pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentChunk {
    /// Unique chunk identifier
    pub id: String,

    /// Passage text
    pub text: String,

    /// Embedding vector; empty when the backend does not return vectors
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub embedding: Vec<f32>,

    pub metadata: ChunkMetadata,
}

/// Descriptive metadata attached to every chunk.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ChunkMetadata {
    pub city: String,
    pub state: String,
    pub country: String,
    pub category: String,
    pub subcategory: String,

    /// Budget tier (e.g. "budget", "medium", "luxury", "unknown")
    pub price_range: String,

    /// Whether the passage carries contact details
    pub has_contact: bool,

    pub relevance: RelevanceScores,

    /// Upstream source reference (page, dataset row), when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// Traveler-suitability scores assigned during ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RelevanceScores {
    pub adventure: f32,
    pub family: f32,
    pub solo_traveler: f32,
}

impl ChunkMetadata {
    /// "City, State", skipping empty parts; "Unknown location" when both are empty.
    pub fn location_label(&self) -> String {
        let parts: Vec<&str> = [self.city.as_str(), self.state.as_str()]
            .into_iter()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();

        if parts.is_empty() {
            "Unknown location".to_string()
        } else {
            parts.join(", ")
        }
    }

    /// "Category > Subcategory", or just the category.
    pub fn category_label(&self) -> String {
        let category = self.category.trim();
        let subcategory = self.subcategory.trim();
        match (category.is_empty(), subcategory.is_empty()) {
            (true, _) => "General".to_string(),
            (false, true) => category.to_string(),
            (false, false) => format!("{} > {}", category, subcategory),
        }
    }

    /// Short citation label combining location and category.
    pub fn citation_label(&self) -> String {
        format!("{} ({})", self.location_label(), self.category_label())
    }

    /// Budget tier, defaulting to "unknown".
    pub fn budget_label(&self) -> &str {
        match self.price_range.trim() {
            "" => "unknown",
            tier => tier,
        }
    }
}
