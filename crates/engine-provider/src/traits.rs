use anyhow::Result;
use async_trait::async_trait;

use crate::types::{BatchJob, BatchRequest, BatchResult, ChatRequest, ChatResponse};

/// Chat-completion surface (spec §4.9). One implementation per hosted
/// provider shape, plus a local HTTP backend — grounded on the teacher's
/// `aigent-llm::LlmClient` trait, generalized with temperature/max_tokens/
/// json_mode instead of a bare `prompt: &str`.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    async fn generate(&self, request: ChatRequest) -> Result<ChatResponse>;

    /// Human-readable adapter name, used in logs and error messages.
    fn name(&self) -> &str;
}

/// Batch surface (spec §4.9). Each adapter owns provider-specific status
/// mapping into [`crate::types::BatchStatus`]'s canonical set.
#[async_trait]
pub trait BatchProvider: Send + Sync {
    async fn create_batch(
        &self,
        requests: Vec<BatchRequest>,
        metadata: std::collections::HashMap<String, String>,
    ) -> Result<BatchJob>;

    async fn get_status(&self, batch_id: &str) -> Result<BatchJob>;

    async fn get_results(&self, batch_id: &str) -> Result<Vec<BatchResult>>;

    async fn cancel(&self, batch_id: &str) -> Result<()>;

    fn name(&self) -> &str;
}
