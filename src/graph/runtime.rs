// Graph Runtime - petgraph based
// Type-safe StateGraph execution engine

use std::collections::HashMap;
use std::time::Duration;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;

use super::node::{GraphError, Node, NodeContext, NodeEvent, NodeOutput};
use super::state::ConversationState;

/// Edge condition for graph routing
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EdgeCondition {
    /// Always follow this edge (default edge)
    Always,
    /// Follow this edge when the node returns this condition
    OnCondition(String),
}

impl EdgeCondition {
    pub fn on(condition: impl Into<String>) -> Self {
        Self::OnCondition(condition.into())
    }

    pub fn matches(&self, condition: Option<&str>) -> bool {
        match (self, condition) {
            (EdgeCondition::Always, None) => true,
            (EdgeCondition::OnCondition(expected), Some(actual)) => expected == actual,
            _ => false,
        }
    }
}

/// How a run stopped without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// A node returned `Final`.
    Completed { steps: usize },
    /// The step ceiling was reached first.
    StepLimit { steps: usize },
}

impl RunStatus {
    pub fn steps(&self) -> usize {
        match self {
            RunStatus::Completed { steps } | RunStatus::StepLimit { steps } => *steps,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, RunStatus::Completed { .. })
    }
}

/// petgraph-based StateGraph runtime
pub struct GraphRuntime {
    /// The underlying directed graph
    graph: DiGraph<Box<dyn Node>, EdgeCondition>,
    /// Map from node ID to NodeIndex for lookup
    node_indices: HashMap<String, NodeIndex>,
    /// Entry point node ID
    entry_node_id: String,
    /// Maximum node executions per run
    max_steps: usize,
    /// Upper bound on a single node execution
    step_timeout: Option<Duration>,
}

impl GraphRuntime {
    /// Create a new graph runtime
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            node_indices: HashMap::new(),
            entry_node_id: String::new(),
            max_steps: 25,
            step_timeout: None,
        }
    }

    pub fn max_steps(&self) -> usize {
        self.max_steps
    }

    /// Add a node to the graph
    pub fn add_node(&mut self, node: Box<dyn Node>) -> Result<NodeIndex, GraphError> {
        let id = node.id().to_string();
        if self.node_indices.contains_key(&id) {
            return Err(GraphError::new(&id, format!("Duplicate node id: {}", id)));
        }
        let index = self.graph.add_node(node);
        self.node_indices.insert(id, index);
        Ok(index)
    }

    /// Add a conditional edge between two nodes
    pub fn add_conditional_edge(
        &mut self,
        from: &str,
        to: &str,
        condition: EdgeCondition,
    ) -> Result<(), GraphError> {
        let from_idx = self
            .node_indices
            .get(from)
            .ok_or_else(|| GraphError::new(from, format!("Source node not found: {}", from)))?;
        let to_idx = self
            .node_indices
            .get(to)
            .ok_or_else(|| GraphError::new(to, format!("Target node not found: {}", to)))?;

        self.graph.add_edge(*from_idx, *to_idx, condition);
        Ok(())
    }

    /// Get all node IDs
    pub fn node_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.node_indices.keys().map(|s| s.as_str()).collect();
        ids.sort_unstable();
        ids
    }

    /// Check for cycles in the graph
    pub fn has_cycle(&self) -> bool {
        petgraph::algo::is_cyclic_directed(&self.graph)
    }

    /// Execute the graph until a node returns `Final` or the step ceiling
    /// is reached.
    pub async fn run(
        &self,
        state: &mut ConversationState,
        ctx: &mut NodeContext<'_>,
    ) -> Result<RunStatus, GraphError> {
        let mut current_idx = *self.node_indices.get(&self.entry_node_id).ok_or_else(|| {
            GraphError::new(
                "runtime",
                format!("Entry node not found: {}", self.entry_node_id),
            )
        })?;

        let mut trace: Vec<String> = Vec::new();
        let mut step = 0;

        loop {
            if step >= self.max_steps {
                tracing::warn!(
                    "Run {} stopped after {} steps without a final answer",
                    state.run_id,
                    step
                );
                return Ok(RunStatus::StepLimit { steps: step });
            }

            let node = self
                .graph
                .node_weight(current_idx)
                .ok_or_else(|| GraphError::new("runtime", "Node not found in graph"))?;

            let node_id = node.id();
            trace.push(node_id.to_string());
            tracing::debug!("Executing {} (step {})", node.name(), step);

            let before = state.len();
            let result = match self.step_timeout {
                Some(limit) => match tokio::time::timeout(limit, node.execute(state, ctx)).await {
                    Ok(result) => result,
                    Err(_) => Err(GraphError::timeout(
                        node_id,
                        format!("Node timed out after {}s", limit.as_secs()),
                    )),
                },
                None => node.execute(state, ctx).await,
            };
            let output = result.map_err(|err| err.with_trace(&trace))?;

            if let Some(events) = &ctx.events {
                let _ = events.send(NodeEvent {
                    node: node_id.to_string(),
                    step,
                    messages: state.messages()[before..].to_vec(),
                });
            }

            step += 1;

            match output {
                NodeOutput::Final => {
                    tracing::debug!("Graph execution complete at node: {}", node_id);
                    return Ok(RunStatus::Completed { steps: step });
                }
                NodeOutput::Continue => {
                    current_idx = self
                        .resolve_next_node(current_idx, None)
                        .map_err(|err| err.with_trace(&trace))?;
                }
                NodeOutput::Branch(condition) => {
                    current_idx = self
                        .resolve_next_node(current_idx, Some(&condition))
                        .map_err(|err| err.with_trace(&trace))?;
                }
            }
        }
    }

    /// Resolve the next node based on edges
    fn resolve_next_node(
        &self,
        current_idx: NodeIndex,
        condition: Option<&str>,
    ) -> Result<NodeIndex, GraphError> {
        let current_id = self
            .graph
            .node_weight(current_idx)
            .map(|n| n.id())
            .unwrap_or("unknown");

        let edges: Vec<(NodeIndex, &EdgeCondition)> = self
            .graph
            .edges_directed(current_idx, Direction::Outgoing)
            .map(|edge_ref| (edge_ref.target(), edge_ref.weight()))
            .collect();

        if edges.is_empty() {
            return Err(GraphError::new(
                current_id,
                format!("No outgoing edges from node: {}", current_id),
            ));
        }

        edges
            .iter()
            .find(|(_, weight)| weight.matches(condition))
            .map(|(target_idx, _)| *target_idx)
            .ok_or_else(|| {
                GraphError::new(
                    current_id,
                    format!(
                        "No matching edge for condition: {:?}",
                        condition.unwrap_or("(none)")
                    ),
                )
            })
    }
}

impl Default for GraphRuntime {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for constructing graphs fluently
pub struct GraphBuilder {
    runtime: GraphRuntime,
    nodes: Vec<Box<dyn Node>>,
    pending_edges: Vec<(String, String, EdgeCondition)>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self {
            runtime: GraphRuntime::new(),
            nodes: Vec::new(),
            pending_edges: Vec::new(),
        }
    }

    pub fn entry(mut self, node_id: impl Into<String>) -> Self {
        self.runtime.entry_node_id = node_id.into();
        self
    }

    pub fn max_steps(mut self, max_steps: usize) -> Self {
        self.runtime.max_steps = max_steps;
        self
    }

    pub fn step_timeout(mut self, timeout: Duration) -> Self {
        self.runtime.step_timeout = Some(timeout);
        self
    }

    pub fn node(mut self, node: Box<dyn Node>) -> Self {
        self.nodes.push(node);
        self
    }

    pub fn edge(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.pending_edges
            .push((from.into(), to.into(), EdgeCondition::Always));
        self
    }

    pub fn conditional_edge(
        mut self,
        from: impl Into<String>,
        to: impl Into<String>,
        condition: impl Into<String>,
    ) -> Self {
        self.pending_edges
            .push((from.into(), to.into(), EdgeCondition::on(condition)));
        self
    }

    pub fn build(mut self) -> Result<GraphRuntime, GraphError> {
        for node in self.nodes {
            self.runtime.add_node(node)?;
        }
        for (from, to, condition) in self.pending_edges {
            self.runtime.add_conditional_edge(&from, &to, condition)?;
        }
        if !self
            .runtime
            .node_indices
            .contains_key(&self.runtime.entry_node_id)
        {
            return Err(GraphError::new(
                "runtime",
                format!("Entry node not found: {}", self.runtime.entry_node_id),
            ));
        }
        if self.runtime.max_steps == 0 {
            return Err(GraphError::new("runtime", "max_steps must be at least 1"));
        }
        Ok(self.runtime)
    }
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::node::AgentServices;
    use crate::llm::Message;
    use crate::test_support::ScriptedModel;
    use crate::tools::ToolRegistry;
    use async_trait::async_trait;
    use std::sync::Arc;

    /// Appends one assistant message per visit and loops until it has
    /// produced `stop_after` of them.
    struct CountingNode {
        id: &'static str,
        stop_after: usize,
    }

    #[async_trait]
    impl Node for CountingNode {
        fn id(&self) -> &'static str {
            self.id
        }

        async fn execute(
            &self,
            state: &mut ConversationState,
            _ctx: &mut NodeContext<'_>,
        ) -> Result<NodeOutput, GraphError> {
            state
                .push(Message::assistant(format!("visit {}", state.len())))
                .map_err(|err| GraphError::from_state(self.id, err))?;
            if state.len() > self.stop_after {
                Ok(NodeOutput::Final)
            } else {
                Ok(NodeOutput::Branch("again".to_string()))
            }
        }
    }

    struct FixedNode {
        id: &'static str,
        output: NodeOutput,
    }

    #[async_trait]
    impl Node for FixedNode {
        fn id(&self) -> &'static str {
            self.id
        }

        async fn execute(
            &self,
            _state: &mut ConversationState,
            _ctx: &mut NodeContext<'_>,
        ) -> Result<NodeOutput, GraphError> {
            Ok(self.output.clone())
        }
    }

    struct SlowNode;

    #[async_trait]
    impl Node for SlowNode {
        fn id(&self) -> &'static str {
            "slow"
        }

        async fn execute(
            &self,
            _state: &mut ConversationState,
            _ctx: &mut NodeContext<'_>,
        ) -> Result<NodeOutput, GraphError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(NodeOutput::Final)
        }
    }

    fn services() -> AgentServices {
        AgentServices::new(
            Arc::new(ScriptedModel::new(Vec::new())),
            Arc::new(ToolRegistry::new()),
        )
        .unwrap()
    }

    #[test]
    fn test_edge_condition_matching() {
        assert!(EdgeCondition::Always.matches(None));
        assert!(!EdgeCondition::Always.matches(Some("tools")));

        assert!(EdgeCondition::on("tools").matches(Some("tools")));
        assert!(!EdgeCondition::on("tools").matches(Some("end")));
        assert!(!EdgeCondition::on("tools").matches(None));
    }

    #[test]
    fn build_rejects_unknown_entry_and_edges() {
        let missing_entry = GraphBuilder::new()
            .entry("nowhere")
            .node(Box::new(SlowNode))
            .build();
        assert!(missing_entry.is_err());

        let dangling_edge = GraphBuilder::new()
            .entry("slow")
            .node(Box::new(SlowNode))
            .edge("slow", "ghost")
            .build();
        assert!(dangling_edge.is_err());
    }

    #[tokio::test]
    async fn completes_and_reports_each_node() {
        let graph = GraphBuilder::new()
            .entry("loop")
            .node(Box::new(CountingNode {
                id: "loop",
                stop_after: 3,
            }))
            .conditional_edge("loop", "loop", "again")
            .build()
            .unwrap();
        assert!(graph.has_cycle());

        let services = services();
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let mut ctx = NodeContext::new(&services).with_events(tx);
        let mut state = ConversationState::with_user_message("start");

        let status = graph.run(&mut state, &mut ctx).await.unwrap();
        assert_eq!(status, RunStatus::Completed { steps: 3 });
        drop(ctx);

        let mut steps = Vec::new();
        while let Some(event) = rx.recv().await {
            assert_eq!(event.node, "loop");
            assert_eq!(event.messages.len(), 1);
            steps.push(event.step);
        }
        assert_eq!(steps, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn continue_takes_the_unconditional_edge() {
        let graph = GraphBuilder::new()
            .entry("start")
            .node(Box::new(FixedNode {
                id: "start",
                output: NodeOutput::Continue,
            }))
            .node(Box::new(FixedNode {
                id: "branch",
                output: NodeOutput::Final,
            }))
            .node(Box::new(FixedNode {
                id: "next",
                output: NodeOutput::Final,
            }))
            .conditional_edge("start", "branch", "tools")
            .edge("start", "next")
            .build()
            .unwrap();

        let services = services();
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let mut ctx = NodeContext::new(&services).with_events(tx);
        let mut state = ConversationState::with_user_message("start");

        let status = graph.run(&mut state, &mut ctx).await.unwrap();
        assert_eq!(status, RunStatus::Completed { steps: 2 });
        drop(ctx);

        let mut visited = Vec::new();
        while let Some(event) = rx.recv().await {
            visited.push(event.node);
        }
        assert_eq!(visited, vec!["start", "next"]);
    }

    #[tokio::test]
    async fn step_ceiling_stops_the_run() {
        let graph = GraphBuilder::new()
            .entry("loop")
            .max_steps(2)
            .node(Box::new(CountingNode {
                id: "loop",
                stop_after: 100,
            }))
            .conditional_edge("loop", "loop", "again")
            .build()
            .unwrap();

        let services = services();
        let mut ctx = NodeContext::new(&services);
        let mut state = ConversationState::with_user_message("start");

        let status = graph.run(&mut state, &mut ctx).await.unwrap();
        assert_eq!(status, RunStatus::StepLimit { steps: 2 });
        assert!(!status.is_completed());
        assert_eq!(state.len(), 3);
    }

    #[tokio::test]
    async fn unmatched_branch_is_an_error_with_trace() {
        let graph = GraphBuilder::new()
            .entry("loop")
            .node(Box::new(CountingNode {
                id: "loop",
                stop_after: 100,
            }))
            .build()
            .unwrap();

        let services = services();
        let mut ctx = NodeContext::new(&services);
        let mut state = ConversationState::with_user_message("start");

        let err = graph.run(&mut state, &mut ctx).await.unwrap_err();
        assert_eq!(err.node_id, "loop");
        assert_eq!(err.execution_trace, vec!["loop".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_nodes_time_out() {
        let graph = GraphBuilder::new()
            .entry("slow")
            .step_timeout(Duration::from_secs(1))
            .node(Box::new(SlowNode))
            .build()
            .unwrap();

        let services = services();
        let mut ctx = NodeContext::new(&services);
        let mut state = ConversationState::with_user_message("start");

        let err = graph.run(&mut state, &mut ctx).await.unwrap_err();
        assert!(err.timed_out);
        assert_eq!(err.node_id, "slow");
    }
}
