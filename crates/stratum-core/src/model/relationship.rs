//! MemoryRelationship (spec §3).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelationshipType {
    Temporal,
    Semantic,
    References,
    Causal,
    Context,
    Supersedes,
    /// User-defined equivalents (§3).
    Custom(String),
}

impl std::fmt::Display for RelationshipType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RelationshipType::Temporal => write!(f, "TEMPORAL"),
            RelationshipType::Semantic => write!(f, "SEMANTIC"),
            RelationshipType::References => write!(f, "REFERENCES"),
            RelationshipType::Causal => write!(f, "CAUSAL"),
            RelationshipType::Context => write!(f, "CONTEXT"),
            RelationshipType::Supersedes => write!(f, "SUPERSEDES"),
            RelationshipType::Custom(name) => write!(f, "{name}"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipMetadata {
    pub detecting_algorithm: String,
    pub created_at: DateTime<Utc>,
    pub validator: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryRelationship {
    pub id: String,
    pub source_id: String,
    pub target_id: String,
    pub relationship_type: RelationshipType,
    /// [0,1]
    pub strength: f32,
    /// [0,1]
    pub confidence: f32,
    pub metadata: RelationshipMetadata,
}

impl MemoryRelationship {
    pub fn new(
        source_id: impl Into<String>,
        target_id: impl Into<String>,
        relationship_type: RelationshipType,
        strength: f32,
        confidence: f32,
        detecting_algorithm: impl Into<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            source_id: source_id.into(),
            target_id: target_id.into(),
            relationship_type,
            strength: strength.clamp(0.0, 1.0),
            confidence: confidence.clamp(0.0, 1.0),
            metadata: RelationshipMetadata {
                detecting_algorithm: detecting_algorithm.into(),
                created_at: Utc::now(),
                validator: None,
            },
        }
    }

    pub fn touches(&self, id: &str) -> bool {
        self.source_id == id || self.target_id == id
    }
}
