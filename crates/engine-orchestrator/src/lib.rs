//! Engine Orchestrator (spec §4.10): composes the Miner, Evaluator, Batch
//! re-mine selection, Taste Engine, and Question Mapper into the
//! per-episode pipeline driven by the CLI and the Job/Run substrate.

mod config;
mod context;
mod few_shot;
mod filter_pass;
mod run;

pub use config::EngineConfig;
pub use context::EngineContext;
pub use few_shot::TasteFewShotSource;
pub use filter_pass::{BoostMap, filter_miner_output};
pub use run::{EpisodeRunOutcome, run_episode};
