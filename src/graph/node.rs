// Node trait and types
// Base abstraction for graph nodes

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;

use crate::core::errors::ApiError;
use crate::llm::{build_system_prompt, ChatModel, Message, ToolSpec};
use crate::tools::ToolRegistry;

use super::state::{ConversationState, StateError};

/// Collaborators shared by every node of a run.
pub struct AgentServices {
    pub model: Arc<dyn ChatModel>,
    pub tools: Arc<ToolRegistry>,
    /// Catalog advertised to the model on every turn.
    pub catalog: Vec<ToolSpec>,
    pub system_prompt: String,
}

impl AgentServices {
    pub fn new(model: Arc<dyn ChatModel>, tools: Arc<ToolRegistry>) -> Result<Self, ApiError> {
        let catalog = tools.catalog();
        tools.validate_catalog(&catalog)?;
        let system_prompt = build_system_prompt(&tools.names());

        Ok(Self {
            model,
            tools,
            catalog,
            system_prompt,
        })
    }
}

/// Messages a node appended, reported after it finishes.
#[derive(Debug, Clone, Serialize)]
pub struct NodeEvent {
    pub node: String,
    /// Zero-based index of the node execution within the run.
    pub step: usize,
    pub messages: Vec<Message>,
}

/// Context passed to nodes during execution
pub struct NodeContext<'a> {
    pub services: &'a AgentServices,
    /// Receives a `NodeEvent` after every node, when set
    pub events: Option<UnboundedSender<NodeEvent>>,
}

impl<'a> NodeContext<'a> {
    pub fn new(services: &'a AgentServices) -> Self {
        Self {
            services,
            events: None,
        }
    }

    pub fn with_events(mut self, events: UnboundedSender<NodeEvent>) -> Self {
        self.events = Some(events);
        self
    }
}

/// Output from a node execution
#[derive(Debug, Clone)]
pub enum NodeOutput {
    /// Follow the unconditional edge
    Continue,
    /// Follow the edge registered for this condition
    Branch(String),
    /// Graph execution complete
    Final,
}

/// Graph execution error
///
/// Includes an `execution_trace` recording the node IDs visited before the
/// error occurred.
#[derive(Debug, Clone)]
pub struct GraphError {
    pub node_id: String,
    pub message: String,
    /// Ordered list of node IDs executed before this error, most-recent last.
    pub execution_trace: Vec<String>,
    pub timed_out: bool,
}

impl GraphError {
    pub fn new(node_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            message: message.into(),
            execution_trace: Vec::new(),
            timed_out: false,
        }
    }

    pub fn timeout(node_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            timed_out: true,
            ..Self::new(node_id, message)
        }
    }

    pub fn from_state(node_id: impl Into<String>, err: StateError) -> Self {
        Self::new(node_id, err.to_string())
    }

    pub fn with_trace(mut self, trace: &[String]) -> Self {
        self.execution_trace = trace.to_vec();
        self
    }
}

impl From<GraphError> for ApiError {
    fn from(err: GraphError) -> Self {
        if err.timed_out {
            ApiError::Timeout(err.to_string())
        } else {
            ApiError::Internal(err.to_string())
        }
    }
}

impl std::fmt::Display for GraphError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.execution_trace.is_empty() {
            write!(f, "Graph error in {}: {}", self.node_id, self.message)
        } else {
            write!(
                f,
                "Graph error in {} (trace: {}): {}",
                self.node_id,
                self.execution_trace.join(" -> "),
                self.message
            )
        }
    }
}

impl std::error::Error for GraphError {}

/// Node trait - all graph nodes implement this
#[async_trait]
pub trait Node: Send + Sync {
    /// Unique identifier for this node
    fn id(&self) -> &'static str;

    /// Human-readable name for logs
    fn name(&self) -> &'static str {
        self.id()
    }

    /// Execute the node logic
    async fn execute(
        &self,
        state: &mut ConversationState,
        ctx: &mut NodeContext<'_>,
    ) -> Result<NodeOutput, GraphError>;
}
