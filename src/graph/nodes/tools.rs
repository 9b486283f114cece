// Tools Node
// Executes the pending tool calls of the latest assistant turn

use async_trait::async_trait;

use crate::graph::node::{GraphError, Node, NodeContext, NodeOutput};
use crate::graph::state::ConversationState;
use crate::llm::{Message, ToolCall};

pub struct ToolsNode;

impl ToolsNode {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ToolsNode {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Node for ToolsNode {
    fn id(&self) -> &'static str {
        "tools"
    }

    fn name(&self) -> &'static str {
        "Tools Node"
    }

    async fn execute(
        &self,
        state: &mut ConversationState,
        ctx: &mut NodeContext<'_>,
    ) -> Result<NodeOutput, GraphError> {
        let calls: Vec<ToolCall> = state.pending_tool_calls().into_iter().cloned().collect();
        if calls.is_empty() {
            return Err(GraphError::new(self.id(), "No pending tool calls"));
        }

        // One at a time, in request order.
        for call in calls {
            let output = ctx
                .services
                .tools
                .invoke(&call)
                .await
                .map_err(|e| GraphError::new(self.id(), format!("Tool `{}` failed: {}", call.name, e)))?;

            tracing::info!(
                "Tool `{}` returned {} chars for call {}",
                call.name,
                output.len(),
                call.id
            );

            state
                .push(Message::tool(output, call.id))
                .map_err(|err| GraphError::from_state(self.id(), err))?;
        }

        Ok(NodeOutput::Continue)
    }
}
