use std::sync::Arc;

use engine_core::{EntityType, Verdict};
use engine_miner::{FewShotBundle, FewShotExample, FewShotSource};
use engine_taste::FeedbackStore;
use tracing::warn;

/// Concrete [`FewShotSource`] backing the Miner's reserved few-shot block
/// with the Taste Engine's vector store. Lives here rather than in
/// `engine-taste` so that crate never has to depend on `engine-miner` for a
/// single trait impl (spec §9 "no cycles" redesign point) — the composition
/// root is the one place both crates are already in scope.
pub struct TasteFewShotSource {
    store: Arc<FeedbackStore>,
}

impl TasteFewShotSource {
    pub fn new(store: Arc<FeedbackStore>) -> Self {
        Self { store }
    }
}

impl FewShotSource for TasteFewShotSource {
    fn query_similar(&self, segment_text: &str, k: usize) -> FewShotBundle {
        let accept = self.query_side(segment_text, Verdict::Accept, k);
        let reject = self.query_side(segment_text, Verdict::Reject, k);
        FewShotBundle { accept, reject }
    }
}

impl TasteFewShotSource {
    fn query_side(&self, segment_text: &str, verdict: Verdict, k: usize) -> Vec<FewShotExample> {
        match self.store.query_similar(segment_text, EntityType::Claim, Some(verdict), k) {
            Ok(hits) => hits
                .into_iter()
                .map(|hit| FewShotExample {
                    entity_text: hit.entity_text,
                    reason_category: hit.reason_category,
                    similarity: hit.similarity as f32,
                })
                .collect(),
            Err(err) => {
                warn!(error = %err, ?verdict, "taste-engine few-shot query failed, using empty block");
                Vec::new()
            }
        }
    }
}
