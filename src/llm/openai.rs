use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::core::config::LlmSettings;
use crate::core::errors::ApiError;
use super::provider::ChatModel;
use super::types::{Message, Role, ToolCall, ToolSpec};

/// Chat-completions client for OpenAI and API-compatible servers.
#[derive(Clone)]
pub struct OpenAiChatModel {
    base_url: String,
    model: String,
    temperature: f64,
    api_key: Option<String>,
    client: Client,
}

impl OpenAiChatModel {
    pub fn new(settings: &LlmSettings) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(ApiError::internal)?;

        Ok(Self {
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
            temperature: settings.temperature,
            api_key: settings.api_key.clone(),
            client,
        })
    }

    fn build_body(&self, messages: &[Message], tools: &[ToolSpec]) -> Value {
        let mut body = json!({
            "model": self.model,
            "temperature": self.temperature,
            "messages": messages.iter().map(wire_message).collect::<Vec<_>>(),
        });

        if !tools.is_empty() {
            if let Some(obj) = body.as_object_mut() {
                obj.insert(
                    "tools".to_string(),
                    Value::Array(tools.iter().map(wire_tool).collect()),
                );
            }
        }

        body
    }
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Deserialize)]
struct CompletionMessage {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<WireToolCall>,
}

#[derive(Deserialize)]
struct WireToolCall {
    id: String,
    function: WireFunction,
}

#[derive(Deserialize)]
struct WireFunction {
    name: String,
    arguments: String,
}

#[async_trait]
impl ChatModel for OpenAiChatModel {
    fn name(&self) -> &str {
        "openai"
    }

    fn model_id(&self) -> &str {
        &self.model
    }

    async fn complete(&self, messages: &[Message], tools: &[ToolSpec]) -> Result<Message, ApiError> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let body = self.build_body(messages, tools);

        let mut request = self.client.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let res = request.send().await.map_err(ApiError::internal)?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::Internal(format!(
                "Chat completion failed ({}): {}",
                status, text
            )));
        }

        let payload: CompletionResponse = res.json().await.map_err(ApiError::internal)?;
        parse_completion(payload)
    }
}

fn parse_completion(payload: CompletionResponse) -> Result<Message, ApiError> {
    let choice = payload
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::Internal("Chat completion returned no choices".to_string()))?;

    let mut tool_calls = Vec::with_capacity(choice.message.tool_calls.len());
    for call in choice.message.tool_calls {
        let arguments = parse_arguments(&call.function.name, &call.function.arguments)?;
        tool_calls.push(ToolCall::new(call.id, call.function.name, arguments));
    }

    Ok(Message::assistant_with_tool_calls(
        choice.message.content.unwrap_or_default(),
        tool_calls,
    ))
}

fn parse_arguments(tool_name: &str, raw: &str) -> Result<Value, ApiError> {
    if raw.trim().is_empty() {
        return Ok(Value::Object(serde_json::Map::new()));
    }
    serde_json::from_str::<Value>(raw).map_err(|e| {
        ApiError::Internal(format!(
            "Model sent malformed arguments for `{}`: {}",
            tool_name, e
        ))
    })
}

fn wire_message(message: &Message) -> Value {
    match message.role {
        Role::Assistant if message.has_tool_calls() => {
            let calls: Vec<Value> = message
                .tool_calls
                .iter()
                .map(|call| {
                    json!({
                        "id": call.id,
                        "type": "function",
                        "function": {
                            "name": call.name,
                            "arguments": call.arguments.to_string(),
                        }
                    })
                })
                .collect();
            let content = if message.content.is_empty() {
                Value::Null
            } else {
                Value::String(message.content.clone())
            };
            json!({ "role": "assistant", "content": content, "tool_calls": calls })
        }
        Role::Tool => json!({
            "role": "tool",
            "content": message.content,
            "tool_call_id": message.tool_call_id.clone().unwrap_or_default(),
        }),
        role => json!({ "role": role.as_str(), "content": message.content }),
    }
}

fn wire_tool(spec: &ToolSpec) -> Value {
    json!({
        "type": "function",
        "function": {
            "name": spec.name,
            "description": spec.description,
            "parameters": spec.parameters,
        }
    })
}
