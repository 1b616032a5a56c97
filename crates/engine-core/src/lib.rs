//! Shared types for the knowledge-extraction engine: ids, the episode/segment
//! input model, miner and evaluator output, the job/run bookkeeping model,
//! feedback examples, and questions. No component-specific logic lives here —
//! this crate is the vocabulary every other crate shares.

pub mod custom_id;
pub mod episode;
pub mod error;
pub mod evaluated;
pub mod feedback;
pub mod ids;
pub mod job;
pub mod miner;
pub mod question;
pub mod timecode;

pub use custom_id::CustomId;
pub use episode::{Episode, Segment};
pub use error::{EngineError, EngineResult};
pub use evaluated::{AverageScores, Decision, EvaluatedClaim, SummaryAssessment, Tier};
pub use feedback::{EntityType, FeedbackExample, PendingFeedback, Verdict};
pub use ids::{ClaimId, FeedbackId, JobId, LlmRequestId, QuestionId, RunId, SegmentId, SourceId};
pub use job::{Job, JobRun, JobType, LlmRequestRecord, LlmResponseRecord, RunMetrics, RunStatus};
pub use miner::{
    ClaimType, EvidenceSpan, MinedClaim, MinedJargon, MinedMentalModel, MinedPerson, MinerOutput,
    Stance,
};
pub use question::{ClaimQuestionMapping, Question, QuestionType, RelationType};
