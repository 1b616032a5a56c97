use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::FeedbackId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Claim,
    Person,
    Jargon,
    Concept,
}

impl EntityType {
    pub fn as_str(self) -> &'static str {
        match self {
            EntityType::Claim => "claim",
            EntityType::Person => "person",
            EntityType::Jargon => "jargon",
            EntityType::Concept => "concept",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Accept,
    Reject,
}

/// A single feedback example supplied by a human reviewer (spec §3). The
/// Taste Engine owns the vector store this feeds into; the Feedback Worker
/// only ever appends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackExample {
    pub id: FeedbackId,
    pub entity_type: EntityType,
    pub entity_text: String,
    pub verdict: Verdict,
    pub reason_category: String,
    #[serde(default)]
    pub user_notes: String,
    pub source_id: String,
    /// True for curated seed examples bundled with the Engine; these bypass
    /// reason-category validation (spec §4.6 cold start).
    pub is_golden: bool,
    pub created_at: DateTime<Utc>,
}

/// A `FeedbackExample` waiting to be embedded and written into the Taste
/// Engine's vector store (spec §4.7 Feedback Worker). Queued FIFO by
/// `received_at`; `retry_count` caps reprocessing of examples whose
/// embedding call keeps failing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingFeedback {
    pub id: FeedbackId,
    pub example: FeedbackExample,
    pub received_at: DateTime<Utc>,
    #[serde(default)]
    pub retry_count: u32,
    pub last_error: Option<String>,
    /// Set once `retry_count` exceeds the worker's `max_retries`. The row is
    /// never deleted after this — it stays for operator inspection — but the
    /// worker skips it on every subsequent sweep.
    #[serde(default)]
    pub failed_at: Option<DateTime<Utc>>,
}

impl PendingFeedback {
    pub fn new(example: FeedbackExample) -> Self {
        Self {
            id: FeedbackId::new(),
            received_at: Utc::now(),
            retry_count: 0,
            last_error: None,
            failed_at: None,
            example,
        }
    }
}
