use chrono::{DateTime, Utc};
use thiserror::Error;

/// Error kinds recognized across the Engine (spec §7).
///
/// Transient provider errors and schema-invalid outputs are usually recovered
/// locally (retry, repair) and never reach a caller as this type — it exists
/// for the cases that must propagate: concurrent-modification, fatal
/// configuration problems, and whatever finally aborts a run after local
/// recovery is exhausted.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("transient provider error: {0}")]
    TransientProvider(String),

    #[error("schema invalid after repair ({schema_name}): {errors:?}")]
    SchemaInvalid {
        schema_name: String,
        errors: Vec<String>,
    },

    #[error("concurrent modification: expected updated_at {expected}, found {found}")]
    ConcurrentModification {
        expected: DateTime<Utc>,
        found: DateTime<Utc>,
    },

    #[error("batch expired: {0}")]
    BatchExpired(String),

    #[error("cancellation requested")]
    Cancelled,

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("feedback processing error: {0}")]
    FeedbackProcessing(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type EngineResult<T> = Result<T, EngineError>;
