use std::time::Duration;

/// Thresholds and batch sizes for the three-stage pipeline (spec §4.8).
#[derive(Debug, Clone)]
pub struct QuestionMapperConfig {
    pub min_discovery_confidence: f64,
    pub min_merge_confidence: f64,
    pub min_relevance: f64,
    pub discovery_batch_size: usize,
    pub assignment_batch_size: usize,
    /// If true, newly finalized questions are created with `reviewed: true`;
    /// otherwise they're surfaced for human triage (spec §4.8 persistence
    /// policy).
    pub auto_approve: bool,
    pub max_provider_retries: u32,
    pub initial_backoff: Duration,
}

impl Default for QuestionMapperConfig {
    fn default() -> Self {
        Self {
            min_discovery_confidence: 0.6,
            min_merge_confidence: 0.7,
            min_relevance: 0.5,
            discovery_batch_size: 50,
            assignment_batch_size: 30,
            auto_approve: false,
            max_provider_retries: 3,
            initial_backoff: Duration::from_millis(500),
        }
    }
}
