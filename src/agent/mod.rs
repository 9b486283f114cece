//! Agent runner driving the agent/tools graph for one question at a time.

mod runner;

pub use crate::graph::NodeEvent;
pub use runner::{AgentRun, DocsAgent, STEP_LIMIT_ANSWER};
