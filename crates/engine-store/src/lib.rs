//! Durable relational store for Jobs, JobRuns, LLM audit records, mined and
//! evaluated claims, questions, and the pending-feedback queue. Backed by
//! `redb`, grounded on `memory::index`'s single-file embedded-store
//! pattern and extended to the Engine's wider table set.

mod claims;
mod feedback_queue;
mod job;
mod llm;
mod questions;
mod store;
mod tables;

pub use claims::EvaluatedClaimRow;
pub use store::Store;
