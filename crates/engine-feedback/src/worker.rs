use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use engine_store::Store;
use engine_taste::FeedbackStore;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// How long to sleep after draining the queue before checking again.
    pub poll_interval: Duration,
    /// Attempts allowed (beyond the first) before a row is marked `failed_at`
    /// and skipped (spec §4.7).
    pub max_retries: u32,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            max_retries: 3,
        }
    }
}

/// Drains `PendingFeedback` rows into the Taste Engine's vector store, one at
/// a time, FIFO by `received_at` (spec §4.7). Grounded in the teacher's
/// `aigent-telegram` long-poll shape: fetch a batch, process each item,
/// sleep, repeat — generalized here from an HTTP long-poll to a redb queue
/// drain.
pub struct FeedbackWorker {
    store: Arc<Store>,
    feedback_store: Arc<FeedbackStore>,
    config: WorkerConfig,
}

impl FeedbackWorker {
    pub fn new(store: Arc<Store>, feedback_store: Arc<FeedbackStore>, config: WorkerConfig) -> Self {
        Self { store, feedback_store, config }
    }

    /// Run forever, draining the queue on every tick. Intended to be spawned
    /// as a `tokio::task` by the composition root; does not return under
    /// normal operation.
    pub async fn run(&self) -> ! {
        loop {
            match self.drain_once() {
                Ok(processed) if processed > 0 => {
                    info!(processed, "feedback worker drained queue");
                }
                Ok(_) => {}
                Err(err) => {
                    warn!(error = %err, "feedback worker drain pass failed");
                }
            }
            tokio::time::sleep(self.config.poll_interval).await;
        }
    }

    /// Process every currently-queued row once. Returns the number of rows
    /// successfully ingested. A single bad row never blocks the rest of the
    /// queue — its failure is recorded via `retry_or_drop_pending_feedback`
    /// and draining continues with the next row.
    pub fn drain_once(&self) -> Result<usize> {
        let mut processed = 0;
        for pending in self.store.list_pending_feedback()? {
            match self.ingest_one(&pending.example) {
                Ok(()) => {
                    self.store.remove_pending_feedback(pending.id)?;
                    processed += 1;
                }
                Err(err) => {
                    let still_queued =
                        self.store
                            .retry_or_drop_pending_feedback(pending.id, err.to_string(), self.config.max_retries)?;
                    if !still_queued {
                        warn!(
                            feedback_id = %pending.id,
                            error = %err,
                            "feedback example exhausted retry budget, marked failed"
                        );
                    }
                }
            }
        }
        Ok(processed)
    }

    /// Idempotent: an example already present under the same
    /// `(entity_text, entity_type, verdict)` triple is skipped rather than
    /// re-embedded (spec §4.7 "idempotent ingestion").
    fn ingest_one(&self, example: &engine_core::FeedbackExample) -> Result<()> {
        if self
            .feedback_store
            .has_example(&example.entity_text, example.entity_type, example.verdict)?
        {
            return Ok(());
        }
        self.feedback_store.add_feedback(example.clone())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;
    use engine_core::{EntityType, FeedbackExample, FeedbackId, Verdict};
    use engine_taste::{FeedbackStore, HashingEmbedder};

    use super::*;

    fn sample(text: &str) -> FeedbackExample {
        FeedbackExample {
            id: FeedbackId::new(),
            entity_type: EntityType::Claim,
            entity_text: text.into(),
            verdict: Verdict::Accept,
            reason_category: "well_sourced".into(),
            user_notes: String::new(),
            source_id: "ep1".into(),
            is_golden: false,
            created_at: Utc::now(),
        }
    }

    fn worker(dir: &tempfile::TempDir) -> FeedbackWorker {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let feedback_store = Arc::new(
            FeedbackStore::open(dir.path().join("taste.redb"), Arc::new(HashingEmbedder::default()), 1).unwrap(),
        );
        FeedbackWorker::new(store, feedback_store, WorkerConfig::default())
    }

    #[test]
    fn drains_queued_examples_into_the_taste_store() {
        let dir = tempfile::tempdir().unwrap();
        let worker = worker(&dir);
        worker.store.enqueue_feedback(sample("rates will rise")).unwrap();
        worker.store.enqueue_feedback(sample("markets will fall")).unwrap();

        let processed = worker.drain_once().unwrap();

        assert_eq!(processed, 2);
        assert!(worker.store.list_pending_feedback().unwrap().is_empty());
        assert!(worker
            .feedback_store
            .has_example("rates will rise", EntityType::Claim, Verdict::Accept)
            .unwrap());
    }

    #[test]
    fn reprocessing_the_same_example_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let worker = worker(&dir);
        let example = sample("rates will rise");
        worker.feedback_store.add_feedback(example.clone()).unwrap();
        let before = worker.feedback_store.len().unwrap();

        worker.store.enqueue_feedback(example).unwrap();
        worker.drain_once().unwrap();

        assert_eq!(worker.feedback_store.len().unwrap(), before);
    }
}
