//! Miner (spec §4.3): one segment → `MinerOutput`. Prompt assembly follows
//! the teacher's static-prefix/dynamic-suffix `prompt_builder` pattern,
//! generalized so the reserved few-shot block is populated from the Taste
//! Engine via the [`FewShotSource`] trait boundary.

mod dedup;
mod few_shot;
mod mine;
mod prompt;

pub use few_shot::{FewShotBundle, FewShotExample, FewShotSource, NoFewShot};
pub use mine::{MineOutcome, MinerConfig, build_segment_prompt, ingest_miner_response, mine_segment};
pub use prompt::{PromptInputs, build_miner_prompt};
