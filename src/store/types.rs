use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A full documentation page, looked up by exact title.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub title: String,
    pub body: String,
    /// Remaining fields of the source record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl Page {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            metadata: None,
        }
    }
}

/// An embedded chunk of a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Passage {
    pub passage_id: String,
    pub body: String,
    pub embedding: Vec<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl Passage {
    pub fn new(body: impl Into<String>, embedding: Vec<f32>) -> Self {
        Self {
            passage_id: uuid::Uuid::new_v4().to_string(),
            body: body.into(),
            embedding,
            metadata: None,
        }
    }
}

/// Result row of a vector search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredPassage {
    pub body: String,
    /// Normalized similarity in `[0, 1]`, higher is closer.
    pub score: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Similarity {
    Cosine,
    Euclidean,
    DotProduct,
}

impl Similarity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Similarity::Cosine => "cosine",
            Similarity::Euclidean => "euclidean",
            Similarity::DotProduct => "dotProduct",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "cosine" => Some(Similarity::Cosine),
            "euclidean" => Some(Similarity::Euclidean),
            "dotProduct" => Some(Similarity::DotProduct),
            _ => None,
        }
    }
}

/// Definition of a vector index over the passage collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorIndexDefinition {
    pub name: String,
    /// Field holding the vectors.
    pub path: String,
    pub num_dimensions: usize,
    pub similarity: Similarity,
}

impl VectorIndexDefinition {
    pub fn cosine(name: impl Into<String>, num_dimensions: usize) -> Self {
        Self {
            name: name.into(),
            path: "embedding".to_string(),
            num_dimensions,
            similarity: Similarity::Cosine,
        }
    }
}

/// Parameters of one similarity search.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorQuery {
    pub index: String,
    pub query_vector: Vec<f32>,
    /// Candidate pool size; must be at least `limit`.
    pub num_candidates: usize,
    pub limit: usize,
}
