use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One chat-completion call (spec §4.9 chat surface). The caller never
/// branches on provider; the adapter owns auth, retries, and JSON-mode
/// hinting.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Ask the adapter to hint the provider toward strict JSON output, when
    /// the provider supports it (OpenAI-shaped `response_format`, etc).
    pub json_mode: bool,
}

impl ChatRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            temperature: 0.2,
            max_tokens: 2048,
            json_mode: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChatResponse {
    pub text: String,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub cached_tokens: u32,
}

/// One request inside a batch submission. `custom_id` is an opaque string at
/// this layer — callers render a `engine_core::CustomId` to a string before
/// constructing this, and parse it back from `BatchResult::custom_id` at
/// ingestion time (spec §9 redesign note: one structured id, parsed once).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchRequest {
    pub custom_id: String,
    pub prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchJob {
    pub batch_id: String,
    pub status: BatchStatus,
    pub metadata: HashMap<String, String>,
}

/// Canonical status set every adapter normalizes into (spec §4.9 "Status
/// normalization") — provider-specific states never leak past the adapter
/// boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    Pending,
    Validating,
    InProgress,
    Finalizing,
    Completed,
    Failed,
    Expired,
    Cancelled,
}

impl BatchStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            BatchStatus::Completed
                | BatchStatus::Failed
                | BatchStatus::Expired
                | BatchStatus::Cancelled
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResult {
    pub custom_id: String,
    pub text: Option<String>,
    pub error: Option<String>,
    pub tokens_input: Option<u32>,
    pub tokens_output: Option<u32>,
    pub tokens_cached: Option<u32>,
}

/// Split `requests` into chunks no larger than `max_per_batch`, preserving
/// order (spec §5 "custom_id ordering is preserved end-to-end").
pub fn chunk_requests(requests: Vec<BatchRequest>, max_per_batch: usize) -> Vec<Vec<BatchRequest>> {
    if max_per_batch == 0 {
        return vec![requests];
    }
    requests
        .chunks(max_per_batch)
        .map(|chunk| chunk.to_vec())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(id: &str) -> BatchRequest {
        BatchRequest {
            custom_id: id.to_string(),
            prompt: "p".into(),
            temperature: 0.2,
            max_tokens: 100,
        }
    }

    #[test]
    fn chunking_preserves_order_and_bounds_size() {
        let requests = (0..5).map(|i| req(&i.to_string())).collect::<Vec<_>>();
        let chunks = chunk_requests(requests, 2);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].len(), 2);
        assert_eq!(chunks[2].len(), 1);
        let flattened: Vec<_> = chunks.into_iter().flatten().map(|r| r.custom_id).collect();
        assert_eq!(flattened, vec!["0", "1", "2", "3", "4"]);
    }
}
