//! Flagship Evaluator (spec §4.4): episode claim candidates → tiered
//! `EvaluatedClaim`s plus a deterministic `summary_assessment`.

mod candidate;
mod evaluate;
mod prompt;
mod scoring;

pub use candidate::{ClaimCandidate, collect_candidates};
pub use evaluate::{EvaluateOutcome, EvaluatorConfig, evaluate_episode, ingest_evaluator_response};
pub use prompt::build_evaluator_prompt;
pub use scoring::{apply_rejection_floor, rank_accepted, summarize};
