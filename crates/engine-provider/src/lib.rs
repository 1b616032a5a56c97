//! Provider abstraction (spec §4.9): a chat surface and a batch surface,
//! each with a registry of concrete adapters selected by config string.
//! Generalizes the teacher's `aigent-llm::LlmClient`/`Provider` pair.

pub mod adapters;
mod registry;
mod traits;
mod types;

pub use registry::ProviderRegistry;
pub use traits::{BatchProvider, ChatProvider};
pub use types::{
    BatchJob, BatchRequest, BatchResult, BatchStatus, ChatRequest, ChatResponse, chunk_requests,
};
