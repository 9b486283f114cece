//! Test doubles shared by unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::core::errors::ApiError;
use crate::embedding::{EmbeddingProvider, InputType};
use crate::llm::{ChatModel, Message, ToolSpec};

/// Embeds known texts to fixed vectors, everything else to `fallback`.
pub struct FixedEmbedder {
    vectors: HashMap<String, Vec<f32>>,
    fallback: Vec<f32>,
    pub calls: Mutex<Vec<(Vec<String>, InputType)>>,
}

impl FixedEmbedder {
    pub fn new(fallback: Vec<f32>) -> Self {
        Self {
            vectors: HashMap::new(),
            fallback,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with(mut self, text: &str, vector: Vec<f32>) -> Self {
        self.vectors.insert(text.to_string(), vector);
        self
    }

    pub fn input_types(&self) -> Vec<InputType> {
        self.calls.lock().unwrap().iter().map(|(_, t)| *t).collect()
    }
}

#[async_trait]
impl EmbeddingProvider for FixedEmbedder {
    fn model(&self) -> &str {
        "fixed"
    }

    fn dimensions(&self) -> usize {
        self.fallback.len()
    }

    async fn embed(&self, inputs: &[String], input_type: InputType) -> Result<Vec<Vec<f32>>, ApiError> {
        self.calls
            .lock()
            .unwrap()
            .push((inputs.to_vec(), input_type));
        Ok(inputs
            .iter()
            .map(|text| {
                self.vectors
                    .get(text)
                    .cloned()
                    .unwrap_or_else(|| self.fallback.clone())
            })
            .collect())
    }
}

/// Replays canned assistant messages and records every request.
pub struct ScriptedModel {
    replies: Mutex<VecDeque<Result<Message, ApiError>>>,
    pub requests: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedModel {
    pub fn new(replies: Vec<Message>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().map(Ok).collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(err: ApiError) -> Self {
        Self {
            replies: Mutex::new(VecDeque::from([Err(err)])),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    fn name(&self) -> &str {
        "scripted"
    }

    fn model_id(&self) -> &str {
        "scripted-model"
    }

    async fn complete(&self, messages: &[Message], _tools: &[ToolSpec]) -> Result<Message, ApiError> {
        self.requests.lock().unwrap().push(messages.to_vec());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ApiError::Internal("script exhausted".to_string())))
    }
}
