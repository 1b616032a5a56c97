//! Batch Orchestrator (spec §4.5, component C5): a three-stage
//! mine/evaluate/remine pipeline over provider batch APIs, sequential
//! submission for prompt-cache locality, and task+channel polling.

mod ingest;
mod metrics;
mod poll;
mod progress;
mod remine;
mod request;
mod submit;

pub use ingest::{EvaluatedEpisode, MinedSegment, ingest_evaluate_results, ingest_mine_results};
pub use metrics::CacheMetrics;
pub use poll::{PollConfig, poll_until_terminal};
pub use progress::{Progress, ProgressCallback};
pub use remine::{RemineConfig, select_segments_for_remine};
pub use request::{EpisodeClaimIndex, build_evaluate_requests, build_mine_requests, build_remine_requests, index_episode_claims};
pub use submit::{SubmitConfig, submit_sequentially};
