use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;

use crate::core::config::AppSettings;
use crate::core::errors::ApiError;
use crate::graph::nodes::request_messages;
use crate::graph::{
    build_agent_graph, AgentServices, ConversationState, GraphRuntime, NodeContext, NodeEvent,
    RunStatus,
};
use crate::llm::{ChatModel, Message, Role, ToolCall, ToolSpec};
use crate::tools::ToolRegistry;

/// Answer reported when the step ceiling stops a run.
pub const STEP_LIMIT_ANSWER: &str =
    "Agent reached the maximum number of steps without a final answer.";

/// Outcome of one agent run.
#[derive(Debug, Clone, Serialize)]
pub struct AgentRun {
    pub run_id: String,
    pub answer: String,
    /// False when the step ceiling ended the run.
    pub finished: bool,
    pub steps: usize,
    pub messages: Vec<Message>,
}

/// The documentation agent: a compiled agent/tools graph plus the
/// services its nodes call.
pub struct DocsAgent {
    graph: GraphRuntime,
    services: AgentServices,
    max_input_length: usize,
}

impl DocsAgent {
    pub fn new(
        model: Arc<dyn ChatModel>,
        tools: Arc<ToolRegistry>,
        settings: &AppSettings,
    ) -> Result<Self, ApiError> {
        let services = AgentServices::new(model, tools)?;
        let graph = build_agent_graph(
            settings.max_steps,
            Duration::from_secs(settings.step_timeout_secs),
        )?;

        tracing::info!(
            "Agent ready with {} tool(s) on {} ({}), max {} steps",
            services.catalog.len(),
            services.model.name(),
            services.model.model_id(),
            graph.max_steps()
        );

        Ok(Self {
            graph,
            services,
            max_input_length: settings.max_input_length,
        })
    }

    pub fn tools(&self) -> &Arc<ToolRegistry> {
        &self.services.tools
    }

    pub fn catalog(&self) -> &[ToolSpec] {
        &self.services.catalog
    }

    pub fn model_id(&self) -> &str {
        self.services.model.model_id()
    }

    pub async fn run(&self, input: &str) -> Result<AgentRun, ApiError> {
        self.execute(input, None).await
    }

    /// Like `run`, also sending a `NodeEvent` after every node.
    pub async fn run_streaming(
        &self,
        input: &str,
        events: UnboundedSender<NodeEvent>,
    ) -> Result<AgentRun, ApiError> {
        self.execute(input, Some(events)).await
    }

    /// One model turn: the tool calls the model would make for `input`,
    /// without executing them.
    pub async fn plan(&self, input: &str) -> Result<Vec<ToolCall>, ApiError> {
        self.check_input(input)?;

        let history = [Message::user(input)];
        let messages = request_messages(&self.services.system_prompt, &history);
        let reply = self
            .services
            .model
            .complete(&messages, &self.services.catalog)
            .await?;

        Ok(reply.tool_calls)
    }

    async fn execute(
        &self,
        input: &str,
        events: Option<UnboundedSender<NodeEvent>>,
    ) -> Result<AgentRun, ApiError> {
        self.check_input(input)?;

        let mut state = ConversationState::with_user_message(input);
        let mut ctx = NodeContext::new(&self.services);
        if let Some(events) = events {
            ctx = ctx.with_events(events);
        }

        tracing::info!("Run {} started", state.run_id);
        let status = self.graph.run(&mut state, &mut ctx).await.map_err(|err| {
            tracing::error!("Run {} failed: {}", state.run_id, err);
            ApiError::from(err)
        })?;

        let (answer, finished) = match status {
            RunStatus::Completed { .. } => {
                let answer = state
                    .last()
                    .filter(|m| m.role == Role::Assistant)
                    .map(|m| m.content.clone())
                    .ok_or_else(|| {
                        ApiError::Internal("Run finished without an assistant message".to_string())
                    })?;
                (answer, true)
            }
            RunStatus::StepLimit { .. } => (STEP_LIMIT_ANSWER.to_string(), false),
        };

        tracing::info!(
            "Run {} ended after {} step(s), finished={}",
            state.run_id,
            status.steps(),
            finished
        );

        Ok(AgentRun {
            run_id: state.run_id.clone(),
            answer,
            finished,
            steps: status.steps(),
            messages: state.into_messages(),
        })
    }

    fn check_input(&self, input: &str) -> Result<(), ApiError> {
        if input.trim().is_empty() {
            return Err(ApiError::BadRequest("Query must not be empty".to_string()));
        }
        let length = input.chars().count();
        if length > self.max_input_length {
            return Err(ApiError::BadRequest(format!(
                "Query is {} characters, the limit is {}",
                length, self.max_input_length
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::{DatabaseSettings, RetrievalSettings};
    use crate::store::{DocumentStore, MemoryDocumentStore, Page};
    use crate::test_support::{FixedEmbedder, ScriptedModel};
    use crate::tools::{
        build_registry, DOCUMENT_NOT_FOUND, LOOKUP_TOOL_NAME, RETRIEVAL_TOOL_NAME,
    };
    use serde_json::json;

    const TITLE: &str = "Create a MongoDB Deployment";
    const BODY: &str = "Use the Atlas UI to deploy a free cluster.";

    async fn registry() -> Arc<ToolRegistry> {
        let store = Arc::new(MemoryDocumentStore::new());
        store.insert_pages(vec![Page::new(TITLE, BODY)]).await.unwrap();
        Arc::new(
            build_registry(
                store,
                Arc::new(FixedEmbedder::new(vec![1.0, 0.0])),
                &DatabaseSettings::default(),
                &RetrievalSettings::default(),
            )
            .unwrap(),
        )
    }

    fn lookup(id: &str, title: &str) -> ToolCall {
        ToolCall::new(id, LOOKUP_TOOL_NAME, json!({ "user_query": title }))
    }

    async fn agent(model: Arc<ScriptedModel>, settings: AppSettings) -> DocsAgent {
        DocsAgent::new(model, registry().await, &settings).unwrap()
    }

    #[tokio::test]
    async fn direct_answer_ends_after_one_turn() {
        let model = Arc::new(ScriptedModel::new(vec![Message::assistant("Hello there.")]));
        let agent = agent(model.clone(), AppSettings::default()).await;

        let run = agent.run("Hi").await.unwrap();
        assert_eq!(run.answer, "Hello there.");
        assert!(run.finished);
        assert_eq!(run.steps, 1);
        assert_eq!(run.messages.len(), 2);
        assert_eq!(model.request_count(), 1);
    }

    #[tokio::test]
    async fn every_tool_call_is_answered_before_the_next_turn() {
        let model = Arc::new(ScriptedModel::new(vec![
            Message::assistant_with_tool_calls(
                "",
                vec![lookup("call_1", TITLE), lookup("call_2", "Nonexistent Page")],
            ),
            Message::assistant("Summary."),
        ]));
        let agent = agent(model.clone(), AppSettings::default()).await;

        let run = agent.run("Summarize two pages").await.unwrap();
        assert_eq!(run.answer, "Summary.");
        assert_eq!(run.steps, 3);

        let tool_results: Vec<(&str, &str)> = run
            .messages
            .iter()
            .filter(|m| m.role == Role::Tool)
            .map(|m| (m.tool_call_id.as_deref().unwrap(), m.content.as_str()))
            .collect();
        assert_eq!(
            tool_results,
            vec![("call_1", BODY), ("call_2", DOCUMENT_NOT_FOUND)]
        );

        let requests = model.requests.lock().unwrap();
        let second = &requests[1];
        assert_eq!(second[0].role, Role::System);
        assert_eq!(second.len(), 5);
        assert_eq!(second[3].tool_call_id.as_deref(), Some("call_1"));
        assert_eq!(second[4].tool_call_id.as_deref(), Some("call_2"));
    }

    #[tokio::test]
    async fn retrieval_before_ingestion_feeds_back_empty_context() {
        let model = Arc::new(ScriptedModel::new(vec![
            Message::assistant_with_tool_calls(
                "",
                vec![ToolCall::new(
                    "call_1",
                    RETRIEVAL_TOOL_NAME,
                    json!({ "user_query": "backups?" }),
                )],
            ),
            Message::assistant("I DON'T KNOW"),
        ]));
        let agent = agent(model, AppSettings::default()).await;

        let run = agent.run("What about backups?").await.unwrap();
        assert!(run.finished);
        assert_eq!(run.answer, "I DON'T KNOW");
        assert_eq!(run.messages[2].role, Role::Tool);
        assert_eq!(run.messages[2].content, "");
    }

    #[tokio::test]
    async fn system_prompt_lists_tools_but_is_not_stored() {
        let model = Arc::new(ScriptedModel::new(vec![Message::assistant("ok")]));
        let agent = agent(model.clone(), AppSettings::default()).await;

        let run = agent.run("Hi").await.unwrap();
        assert!(run.messages.iter().all(|m| m.role != Role::System));

        let requests = model.requests.lock().unwrap();
        assert!(requests[0][0]
            .content
            .ends_with("get_information_for_question_answering, get_page_content_for_summarization."));
    }

    #[tokio::test]
    async fn unknown_tool_is_fatal() {
        let model = Arc::new(ScriptedModel::new(vec![Message::assistant_with_tool_calls(
            "",
            vec![ToolCall::new("call_1", "drop_database", json!({}))],
        )]));
        let agent = agent(model, AppSettings::default()).await;

        let err = agent.run("Do something odd").await.unwrap_err();
        assert!(err.to_string().contains("drop_database"));
    }

    #[tokio::test]
    async fn repeated_call_ids_fail_before_any_tool_runs() {
        let model = Arc::new(ScriptedModel::new(vec![Message::assistant_with_tool_calls(
            "",
            vec![lookup("call_1", TITLE), lookup("call_1", "Nonexistent Page")],
        )]));
        let agent = agent(model, AppSettings::default()).await;

        let err = agent.run("Summarize two pages").await.unwrap_err();
        assert!(matches!(err, ApiError::Internal(_)));
        assert!(err.to_string().contains("more than once"));
    }

    #[tokio::test]
    async fn model_failure_propagates() {
        let model = Arc::new(ScriptedModel::failing(ApiError::ServiceUnavailable));
        let agent = agent(model, AppSettings::default()).await;
        assert!(agent.run("Hi").await.is_err());
    }

    #[tokio::test]
    async fn step_ceiling_returns_fallback_answer() {
        let replies = (0..10)
            .map(|i| {
                Message::assistant_with_tool_calls("", vec![lookup(&format!("call_{}", i), TITLE)])
            })
            .collect();
        let model = Arc::new(ScriptedModel::new(replies));
        let settings = AppSettings {
            max_steps: 3,
            ..AppSettings::default()
        };
        let agent = agent(model, settings).await;

        let run = agent.run("Loop forever").await.unwrap();
        assert!(!run.finished);
        assert_eq!(run.answer, STEP_LIMIT_ANSWER);
        assert_eq!(run.steps, 3);
        assert_ne!(run.messages.last().unwrap().content, STEP_LIMIT_ANSWER);
    }

    #[tokio::test]
    async fn streaming_reports_each_node() {
        let model = Arc::new(ScriptedModel::new(vec![
            Message::assistant_with_tool_calls("", vec![lookup("call_1", TITLE)]),
            Message::assistant("Summary."),
        ]));
        let agent = agent(model, AppSettings::default()).await;

        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let run = agent.run_streaming("Summarize", tx).await.unwrap();
        assert_eq!(run.answer, "Summary.");

        let mut nodes = Vec::new();
        while let Some(event) = rx.recv().await {
            nodes.push(event.node);
        }
        assert_eq!(nodes, vec!["agent", "tools", "agent"]);
    }

    #[tokio::test]
    async fn plan_returns_calls_without_running_them() {
        let model = Arc::new(ScriptedModel::new(vec![Message::assistant_with_tool_calls(
            "",
            vec![lookup("call_1", TITLE)],
        )]));
        let agent = agent(model.clone(), AppSettings::default()).await;

        let calls = agent.plan("Give me a summary of the page titled Create a MongoDB Deployment").await.unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].name, LOOKUP_TOOL_NAME);
        assert_eq!(calls[0].arguments["user_query"], TITLE);
        assert_eq!(model.request_count(), 1);
    }

    #[tokio::test]
    async fn empty_or_oversized_input_is_rejected() {
        let model = Arc::new(ScriptedModel::new(Vec::new()));
        let settings = AppSettings {
            max_input_length: 10,
            ..AppSettings::default()
        };
        let agent = agent(model.clone(), settings).await;

        assert!(matches!(agent.run("   ").await, Err(ApiError::BadRequest(_))));
        assert!(matches!(
            agent.run("this is far too long").await,
            Err(ApiError::BadRequest(_))
        ));
        assert_eq!(model.request_count(), 0);
    }
}
