// Graph Nodes Module
// Individual node implementations

pub mod agent;
pub mod tools;

pub use agent::{request_messages, AgentNode};
pub use tools::ToolsNode;
