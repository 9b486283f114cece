use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde_json::json;
use tokio::sync::mpsc::UnboundedReceiver;

use docs_agent::agent::NodeEvent;
use docs_agent::core::config::{AppPaths, ConfigService};
use docs_agent::core::logging;
use docs_agent::ingest::{load_pages, load_passages, Ingestor};
use docs_agent::llm::{Message, Role};
use docs_agent::server;
use docs_agent::state::AppState;

const DEMO_QUERIES: [&str; 2] = [
    "What are some best practices for data backups in MongoDB?",
    "Give me a summary of the page titled Create a MongoDB Deployment",
];

#[derive(Parser, Debug)]
#[command(name = "docs-agent")]
#[command(about = "Documentation Q&A agent with vector search and page lookup tools")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Answer one question, printing each node's output
    Ask {
        query: String,
    },
    /// Run the two reference questions
    Demo,
    /// Show the tool calls the model would make, without running them
    Plan {
        query: String,
    },
    /// Invoke a single tool with `{"user_query": INPUT}`
    Tool {
        name: String,
        input: String,
    },
    /// Load a JSON Lines corpus, embed passages and create the vector index
    Ingest {
        /// Full pages (`title`, `body`)
        #[arg(long)]
        pages: PathBuf,
        /// Chunked passages (`body`)
        #[arg(long)]
        passages: PathBuf,
    },
    /// Start the HTTP server
    Serve,
    /// Print the effective configuration with secrets redacted
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let paths = Arc::new(AppPaths::new());
    logging::init(&paths, !matches!(cli.command, Command::Serve));

    if let Command::Config = cli.command {
        let config = ConfigService::new(paths.clone());
        let value = config.load_config().context("Failed to load configuration")?;
        print!("{}", serde_yaml::to_string(&config.redact_sensitive_values(&value))?);
        return Ok(());
    }

    let state = AppState::initialize(paths)
        .await
        .context("Failed to initialize application state")?;

    let result = run_command(&state, cli.command).await;
    if !matches!(result, Ok(true)) {
        state.shutdown().await;
    }
    result.map(|_| ())
}

/// Returns `true` when the command already closed the store.
async fn run_command(state: &Arc<AppState>, command: Command) -> anyhow::Result<bool> {
    match command {
        Command::Ask { query } => ask(state, &query).await?,
        Command::Demo => {
            for query in DEMO_QUERIES {
                println!("Query: {}", query);
                ask(state, query).await?;
                println!();
            }
        }
        Command::Plan { query } => {
            let calls = state.agent.plan(&query).await?;
            if calls.is_empty() {
                println!("No tool calls");
            }
            for call in calls {
                println!("{}({})", call.name, call.arguments);
            }
        }
        Command::Tool { name, input } => {
            let output = state
                .tools
                .invoke_direct(&name, &json!({ "user_query": input }))
                .await?;
            println!("{}", output);
        }
        Command::Ingest { pages, passages } => {
            let pages = load_pages(&pages)?;
            let passages = load_passages(&passages)?;
            let report = Ingestor::new(state.store.clone(), state.embedder.clone(), &state.settings)
                .run(pages, passages)
                .await
                .context("Ingestion failed")?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Serve => {
            server::serve(state.clone()).await?;
            return Ok(true);
        }
        Command::Config => {}
    }
    Ok(false)
}

async fn ask(state: &AppState, query: &str) -> anyhow::Result<()> {
    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
    let (run, ()) = tokio::join!(state.agent.run_streaming(query, tx), print_events(rx));
    let run = run?;

    println!("---FINAL ANSWER---");
    println!("{}", run.answer);
    Ok(())
}

async fn print_events(mut rx: UnboundedReceiver<NodeEvent>) {
    while let Some(event) = rx.recv().await {
        println!("Node {}:", event.node);
        for message in &event.messages {
            print_message(message);
        }
        println!();
    }
}

fn print_message(message: &Message) {
    match message.role {
        Role::Tool => println!(
            "  [tool result {}] {}",
            message.tool_call_id.as_deref().unwrap_or("?"),
            message.content
        ),
        _ => {
            if !message.content.is_empty() {
                println!("  [{}] {}", message.role.as_str(), message.content);
            }
            for call in &message.tool_calls {
                println!("  [tool call {}] {}({})", call.id, call.name, call.arguments);
            }
        }
    }
}
