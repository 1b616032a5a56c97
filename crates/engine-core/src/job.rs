use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{JobId, LlmRequestId, RunId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    Mine,
    Evaluate,
    Remine,
    MapQuestions,
    FeedbackProcess,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub job_id: JobId,
    pub job_type: JobType,
    /// Episode `source_id` or batch id this job operates over.
    pub input_id: String,
    pub config_json: serde_json::Value,
    /// When true, a successor job is enqueued automatically on success
    /// (e.g. `mine` -> `evaluate`, or the final stage -> `map_questions`).
    pub auto_process: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Queued,
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

impl RunStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RunStatus::Succeeded | RunStatus::Failed | RunStatus::Cancelled
        )
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunMetrics {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub cached_tokens: u64,
    pub latency_ms: u64,
    pub estimated_cost_usd: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRun {
    pub run_id: RunId,
    pub job_id: JobId,
    /// Monotonic, dense per job — 1, 2, 3, ... with no gaps (spec §3
    /// invariant).
    pub attempt_number: u32,
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Opaque resumption cursor — interpreted only by the component that
    /// wrote it (e.g. "segment index 7 of 20").
    pub checkpoint_json: serde_json::Value,
    pub metrics: RunMetrics,
    pub error: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl JobRun {
    pub fn new_queued(job_id: JobId, attempt_number: u32) -> Self {
        let now = Utc::now();
        Self {
            run_id: RunId::new(),
            job_id,
            attempt_number,
            status: RunStatus::Queued,
            started_at: now,
            completed_at: None,
            checkpoint_json: serde_json::Value::Null,
            metrics: RunMetrics::default(),
            error: None,
            updated_at: now,
        }
    }
}

/// Persisted request/response pair for every provider call, tied to the
/// [`JobRun`] that issued it (spec §3 LLMRequest/LLMResponse).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmRequestRecord {
    pub request_id: LlmRequestId,
    pub run_id: RunId,
    pub provider: String,
    pub model: String,
    pub prompt: String,
    pub custom_id: Option<String>,
    pub sent_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponseRecord {
    pub request_id: LlmRequestId,
    pub raw_text: String,
    pub latency_ms: u64,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub cached_tokens: u64,
    pub received_at: DateTime<Utc>,
}
