// Agent Node
// One model turn over the conversation so far

use async_trait::async_trait;

use crate::graph::node::{GraphError, Node, NodeContext, NodeOutput};
use crate::graph::state::{route_tools, ConversationState, Route};
use crate::llm::{Message, Role};

pub struct AgentNode;

impl AgentNode {
    pub fn new() -> Self {
        Self
    }
}

impl Default for AgentNode {
    fn default() -> Self {
        Self::new()
    }
}

/// System prompt followed by the stored history.
pub fn request_messages(system_prompt: &str, history: &[Message]) -> Vec<Message> {
    let mut messages = Vec::with_capacity(history.len() + 1);
    messages.push(Message::system(system_prompt));
    messages.extend_from_slice(history);
    messages
}

#[async_trait]
impl Node for AgentNode {
    fn id(&self) -> &'static str {
        "agent"
    }

    fn name(&self) -> &'static str {
        "Agent Node"
    }

    async fn execute(
        &self,
        state: &mut ConversationState,
        ctx: &mut NodeContext<'_>,
    ) -> Result<NodeOutput, GraphError> {
        if state.is_empty() {
            return Err(GraphError::new(self.id(), "conversation history is empty"));
        }

        let services = ctx.services;
        let messages = request_messages(&services.system_prompt, state.messages());

        let reply = services
            .model
            .complete(&messages, &services.catalog)
            .await
            .map_err(|e| GraphError::new(self.id(), e.to_string()))?;

        if reply.role != Role::Assistant {
            return Err(GraphError::new(
                self.id(),
                format!("Model replied with role '{}'", reply.role.as_str()),
            ));
        }

        if reply.has_tool_calls() {
            let names: Vec<&str> = reply.tool_calls.iter().map(|c| c.name.as_str()).collect();
            tracing::info!("Model requested tool call(s): {}", names.join(", "));
        } else {
            tracing::debug!("Model produced a final answer ({} chars)", reply.content.len());
        }

        state
            .push(reply)
            .map_err(|err| GraphError::from_state(self.id(), err))?;

        match route_tools(state).map_err(|err| GraphError::from_state(self.id(), err))? {
            Route::Tools => Ok(NodeOutput::Branch("tools".to_string())),
            Route::End => Ok(NodeOutput::Final),
        }
    }
}
