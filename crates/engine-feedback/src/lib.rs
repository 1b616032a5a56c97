//! Feedback Intake Worker (spec §4.7, component C7): drains the durable
//! `PendingFeedback` queue into the Taste Engine's vector store.

mod worker;

pub use worker::{FeedbackWorker, WorkerConfig};
