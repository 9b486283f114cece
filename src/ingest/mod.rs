//! Corpus ingestion: JSON Lines loaders and the embedding job.

mod corpus;
mod ingestor;

pub use corpus::{load_pages, load_passages, PassageRecord};
pub use ingestor::{IngestReport, Ingestor};
