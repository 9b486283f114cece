// Graph Module
// StateGraph runtime driving the agent/tools loop

pub mod builder;
pub mod node;
pub mod runtime;
pub mod state;

pub mod nodes;

pub use builder::build_agent_graph;
pub use node::{AgentServices, GraphError, Node, NodeContext, NodeEvent, NodeOutput};
pub use runtime::{GraphRuntime, RunStatus};
pub use state::{route_tools, ConversationState, Route, StateError};
