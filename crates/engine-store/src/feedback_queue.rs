use anyhow::Result;
use engine_core::{FeedbackExample, FeedbackId, PendingFeedback};

use crate::store::Store;
use crate::tables;

impl Store {
    /// Enqueue a freshly-submitted feedback example for the worker to embed
    /// into the Taste Engine (spec §4.7). Never blocks on the embedding call.
    pub fn enqueue_feedback(&self, example: FeedbackExample) -> Result<PendingFeedback> {
        let pending = PendingFeedback::new(example);
        self.put_json(tables::PENDING_FEEDBACK, &pending.id.to_string(), &pending)?;
        Ok(pending)
    }

    /// Entries still awaiting processing, oldest first — the worker always
    /// drains FIFO by `received_at` (spec §4.7). Rows that have exhausted
    /// their retry budget (`failed_at` set) are excluded; see
    /// [`Store::list_failed_feedback`] for those.
    pub fn list_pending_feedback(&self) -> Result<Vec<PendingFeedback>> {
        let mut all: Vec<PendingFeedback> = self.scan_all(tables::PENDING_FEEDBACK)?;
        all.retain(|p| p.failed_at.is_none());
        all.sort_by_key(|p| p.received_at);
        Ok(all)
    }

    /// Rows abandoned after exhausting their retry budget, kept for operator
    /// inspection rather than deleted (spec §4.7 failure handling).
    pub fn list_failed_feedback(&self) -> Result<Vec<PendingFeedback>> {
        let mut all: Vec<PendingFeedback> = self.scan_all(tables::PENDING_FEEDBACK)?;
        all.retain(|p| p.failed_at.is_some());
        all.sort_by_key(|p| p.received_at);
        Ok(all)
    }

    pub fn get_pending_feedback(&self, id: FeedbackId) -> Result<Option<PendingFeedback>> {
        self.get_json(tables::PENDING_FEEDBACK, &id.to_string())
    }

    /// Remove an entry once it has been written into the Taste Engine.
    pub fn remove_pending_feedback(&self, id: FeedbackId) -> Result<()> {
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(tables::PENDING_FEEDBACK)?;
            table.remove(id.to_string().as_str())?;
        }
        txn.commit()?;
        Ok(())
    }

    /// Record a failed processing attempt. Returns `true` if the entry is
    /// still under `max_retries` and remains queued, `false` if it has
    /// exhausted its retry budget — the row is marked `failed_at` and
    /// skipped on future sweeps, but never deleted (spec §4.7 failure
    /// handling — a bad example never blocks the rest of the queue, and
    /// stays operator-inspectable).
    pub fn retry_or_drop_pending_feedback(
        &self,
        id: FeedbackId,
        error: impl Into<String>,
        max_retries: u32,
    ) -> Result<bool> {
        let Some(mut pending) = self.get_pending_feedback(id)? else {
            return Ok(false);
        };
        pending.retry_count += 1;
        pending.last_error = Some(error.into());

        if pending.retry_count > max_retries {
            pending.failed_at = Some(chrono::Utc::now());
            self.put_json(tables::PENDING_FEEDBACK, &id.to_string(), &pending)?;
            return Ok(false);
        }

        self.put_json(tables::PENDING_FEEDBACK, &id.to_string(), &pending)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use engine_core::{EntityType, Verdict};

    fn sample_example() -> FeedbackExample {
        FeedbackExample {
            id: FeedbackId::new(),
            entity_type: EntityType::Claim,
            entity_text: "rates will rise".into(),
            verdict: Verdict::Accept,
            reason_category: "well_sourced".into(),
            user_notes: String::new(),
            source_id: "ep1".into(),
            is_golden: false,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn queue_drains_fifo() {
        let store = Store::open_in_memory().unwrap();
        let first = store.enqueue_feedback(sample_example()).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let second = store.enqueue_feedback(sample_example()).unwrap();

        let queued = store.list_pending_feedback().unwrap();
        assert_eq!(queued.len(), 2);
        assert_eq!(queued[0].id, first.id);
        assert_eq!(queued[1].id, second.id);
    }

    #[test]
    fn exhausting_retries_marks_failed_but_keeps_the_row() {
        let store = Store::open_in_memory().unwrap();
        let pending = store.enqueue_feedback(sample_example()).unwrap();

        assert!(store
            .retry_or_drop_pending_feedback(pending.id, "embedding timeout", 2)
            .unwrap());
        assert!(store
            .retry_or_drop_pending_feedback(pending.id, "embedding timeout", 2)
            .unwrap());
        assert!(!store
            .retry_or_drop_pending_feedback(pending.id, "embedding timeout", 2)
            .unwrap());

        let row = store.get_pending_feedback(pending.id).unwrap().unwrap();
        assert!(row.failed_at.is_some());
        assert_eq!(row.retry_count, 3);
        assert!(store.list_pending_feedback().unwrap().is_empty());
        assert_eq!(store.list_failed_feedback().unwrap().len(), 1);
    }
}
