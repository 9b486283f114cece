//! Retrieval-augmented documentation agent.
//!
//! A language model answers questions about a documentation corpus by
//! calling two tools in a loop: semantic passage search and full-page
//! lookup by title.

pub mod agent;
pub mod core;
pub mod embedding;
pub mod graph;
pub mod ingest;
pub mod llm;
pub mod server;
pub mod state;
pub mod store;
pub mod tools;

#[cfg(test)]
mod test_support;
