// Graph Builder
// Constructs the agent/tools loop using petgraph

use std::time::Duration;

use super::node::GraphError;
use super::nodes::{AgentNode, ToolsNode};
use super::runtime::{GraphBuilder, GraphRuntime};

/// Build the agent loop: `agent` branches to `tools` when the model asked
/// for tools and finishes otherwise; `tools` always returns to `agent`.
pub fn build_agent_graph(max_steps: usize, step_timeout: Duration) -> Result<GraphRuntime, GraphError> {
    GraphBuilder::new()
        .entry("agent")
        .max_steps(max_steps)
        .step_timeout(step_timeout)
        .node(Box::new(AgentNode::new()))
        .node(Box::new(ToolsNode::new()))
        .conditional_edge("agent", "tools", "tools")
        .edge("tools", "agent")
        .build()
}
