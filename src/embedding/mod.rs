//! Embedding providers.
//!
//! `EmbeddingProvider` is the capability the retrieval tool and the ingestion
//! job depend on; `VoyageEmbeddingProvider` is the hosted implementation.

mod provider;
mod voyage;

pub use provider::{EmbeddingProvider, InputType};
pub use voyage::VoyageEmbeddingProvider;
