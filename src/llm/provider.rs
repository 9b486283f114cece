use async_trait::async_trait;

use crate::core::errors::ApiError;
use super::types::{Message, ToolSpec};

/// Language model used by the agent node.
///
/// The model is the only decision maker in the loop: it either answers or
/// requests tool calls, and callers never second-guess that choice.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// return the provider name (e.g. "openai")
    fn name(&self) -> &str;

    /// model identifier sent with each request
    fn model_id(&self) -> &str;

    /// one assistant turn over the full history, with the tool catalog bound
    async fn complete(&self, messages: &[Message], tools: &[ToolSpec]) -> Result<Message, ApiError>;
}
