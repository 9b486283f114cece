// Graph State
// Conversation history threaded through the agent loop

use serde::Serialize;
use thiserror::Error;

use crate::llm::{Message, Role, ToolCall};

/// Violations of the conversation ordering rules.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    #[error("conversation history is empty")]
    EmptyHistory,
    #[error("tool call(s) {0:?} must be answered before the next turn")]
    PendingToolCalls(Vec<String>),
    #[error("tool result for '{0}' does not answer a pending tool call")]
    UnexpectedToolResult(String),
    #[error("tool call id '{0}' is requested more than once in one turn")]
    DuplicateCallId(String),
    #[error("tool result message has no call identifier")]
    MissingCallId,
    #[error("system messages are not stored in the conversation")]
    SystemMessage,
}

/// Ordered, append-only message history of one agent run.
///
/// Once an assistant message requests tool calls, every call must get a
/// tool-result message with the matching identifier before any other
/// message is accepted.
#[derive(Debug, Clone, Serialize)]
pub struct ConversationState {
    pub run_id: String,
    messages: Vec<Message>,
}

impl ConversationState {
    pub fn new() -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            messages: Vec::new(),
        }
    }

    pub fn with_user_message(input: impl Into<String>) -> Self {
        let mut state = Self::new();
        state.messages.push(Message::user(input));
        state
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn into_messages(self) -> Vec<Message> {
        self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Tool calls of the latest assistant message that have no result yet,
    /// in request order.
    pub fn pending_tool_calls(&self) -> Vec<&ToolCall> {
        let Some(position) = self
            .messages
            .iter()
            .rposition(|m| m.role == Role::Assistant)
        else {
            return Vec::new();
        };

        let answered: Vec<&str> = self.messages[position + 1..]
            .iter()
            .filter_map(|m| m.tool_call_id.as_deref())
            .collect();

        self.messages[position]
            .tool_calls
            .iter()
            .filter(|call| !answered.contains(&call.id.as_str()))
            .collect()
    }

    pub fn push(&mut self, message: Message) -> Result<(), StateError> {
        match message.role {
            Role::System => return Err(StateError::SystemMessage),
            Role::Tool => {
                let Some(call_id) = message.tool_call_id.as_deref() else {
                    return Err(StateError::MissingCallId);
                };
                let pending = self.pending_tool_calls();
                if !pending.iter().any(|call| call.id == call_id) {
                    return Err(StateError::UnexpectedToolResult(call_id.to_string()));
                }
            }
            Role::User | Role::Assistant => {
                let pending = self.pending_tool_calls();
                if !pending.is_empty() {
                    return Err(StateError::PendingToolCalls(
                        pending.iter().map(|call| call.id.clone()).collect(),
                    ));
                }
                for (i, call) in message.tool_calls.iter().enumerate() {
                    if message.tool_calls[..i].iter().any(|prev| prev.id == call.id) {
                        return Err(StateError::DuplicateCallId(call.id.clone()));
                    }
                }
            }
        }

        self.messages.push(message);
        Ok(())
    }
}

impl Default for ConversationState {
    fn default() -> Self {
        Self::new()
    }
}

/// Where the loop goes after a model turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Tools,
    End,
}

/// Decide the next state from the latest message only.
pub fn route_tools(state: &ConversationState) -> Result<Route, StateError> {
    let last = state.last().ok_or(StateError::EmptyHistory)?;
    if last.role == Role::Assistant && last.has_tool_calls() {
        Ok(Route::Tools)
    } else {
        Ok(Route::End)
    }
}
