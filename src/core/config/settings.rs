//! Typed view over the merged YAML configuration.
//!
//! Every field has a default so an empty `config.yml` yields a runnable setup
//! (apart from API keys, which must come from `secrets.yaml` or the environment).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub app: AppSettings,
    pub database: DatabaseSettings,
    pub embedding: EmbeddingSettings,
    pub llm: LlmSettings,
    pub retrieval: RetrievalSettings,
    pub server: ServerSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Ceiling on node executions per run.
    pub max_steps: usize,
    /// Per-node timeout (model call or tool batch).
    pub step_timeout_secs: u64,
    pub max_input_length: usize,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            max_steps: 25,
            step_timeout_secs: 120,
            max_input_length: 10_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    pub path: String,
    pub full_collection: String,
    pub vs_collection: String,
    pub vector_index: String,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            path: "docs_agent.db".to_string(),
            full_collection: "full_docs".to_string(),
            vs_collection: "chunked_docs".to_string(),
            vector_index: "vector_index".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub base_url: String,
    pub model: String,
    pub dimensions: usize,
    pub batch_size: usize,
    pub timeout_secs: u64,
    pub api_key: Option<String>,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.voyageai.com".to_string(),
            model: "voyage-3-lite".to_string(),
            dimensions: 512,
            batch_size: 128,
            timeout_secs: 60,
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub base_url: String,
    pub model: String,
    pub temperature: f64,
    pub timeout_secs: u64,
    pub api_key: Option<String>,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com".to_string(),
            model: "gpt-4o".to_string(),
            temperature: 0.0,
            timeout_secs: 120,
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    /// Candidate pool considered by the vector search.
    pub num_candidates: usize,
    /// Passages returned to the agent.
    pub limit: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            num_candidates: 150,
            limit: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub request_timeout_secs: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 0,
            request_timeout_secs: 300,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_object_yields_defaults() {
        let settings: Settings = serde_json::from_value(json!({})).unwrap();
        assert_eq!(settings.app.max_steps, 25);
        assert_eq!(settings.database.vs_collection, "chunked_docs");
        assert_eq!(settings.embedding.model, "voyage-3-lite");
        assert_eq!(settings.embedding.dimensions, 512);
        assert_eq!(settings.llm.model, "gpt-4o");
        assert_eq!(settings.retrieval.num_candidates, 150);
        assert_eq!(settings.retrieval.limit, 5);
        assert!(settings.llm.api_key.is_none());
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let settings: Settings = serde_json::from_value(json!({
            "retrieval": { "limit": 3 },
            "llm": { "model": "gpt-4o-mini", "api_key": "sk-test" }
        }))
        .unwrap();

        assert_eq!(settings.retrieval.limit, 3);
        assert_eq!(settings.retrieval.num_candidates, 150);
        assert_eq!(settings.llm.model, "gpt-4o-mini");
        assert_eq!(settings.llm.api_key.as_deref(), Some("sk-test"));
        assert_eq!(settings.llm.base_url, "https://api.openai.com");
    }
}
