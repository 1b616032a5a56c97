use std::collections::HashMap;

use engine_core::{MinerOutput, SegmentId};
use engine_taste::{FeedbackStore, FilterStats, FilterVerdict, TasteFilter};
use tracing::{debug, info};

/// `(segment_id, claim_text) -> boost delta` recommended by the filter pass.
/// Claims carry no importance score until the Evaluator assigns one, so the
/// boost itself is applied later, once `EvaluatedClaim.importance` exists
/// (spec §4.6, §9 "single boost point").
pub type BoostMap = HashMap<(SegmentId, String), u8>;

/// Run every claim/jargon/person/mental-model item in `output` through the
/// Taste Filter (spec §4.10 step 2). Discarded items are dropped from
/// `output` in place; flagged items are kept but logged; boosted claims are
/// recorded into `boosts` for later application at evaluation time.
pub fn filter_miner_output(
    output: &mut MinerOutput,
    taste_store: &FeedbackStore,
    filter: &TasteFilter,
    stats: &mut FilterStats,
    boosts: &mut BoostMap,
) -> anyhow::Result<()> {
    use engine_core::EntityType;

    let segment_id = output.segment_id.clone();

    let mut kept_claims = Vec::with_capacity(output.claims.len());
    for claim in std::mem::take(&mut output.claims) {
        match filter.evaluate(taste_store, &claim.claim_text, EntityType::Claim, stats)? {
            FilterVerdict::Discard { reason, .. } => {
                info!(%segment_id, reason, "taste filter discarded claim");
            }
            FilterVerdict::Flag { warning, .. } => {
                debug!(%segment_id, warning, "taste filter flagged claim");
                kept_claims.push(claim);
            }
            FilterVerdict::Boost { delta, .. } => {
                boosts.insert((segment_id.clone(), claim.claim_text.clone()), delta);
                kept_claims.push(claim);
            }
            FilterVerdict::Keep => kept_claims.push(claim),
        }
    }
    output.claims = kept_claims;

    let mut kept_jargon = Vec::with_capacity(output.jargon.len());
    for jargon in std::mem::take(&mut output.jargon) {
        match filter.evaluate(taste_store, &jargon.term, EntityType::Jargon, stats)? {
            FilterVerdict::Discard { reason, .. } => {
                info!(%segment_id, reason, "taste filter discarded jargon");
            }
            _ => kept_jargon.push(jargon),
        }
    }
    output.jargon = kept_jargon;

    let mut kept_people = Vec::with_capacity(output.people.len());
    for person in std::mem::take(&mut output.people) {
        match filter.evaluate(taste_store, &person.name, EntityType::Person, stats)? {
            FilterVerdict::Discard { reason, .. } => {
                info!(%segment_id, reason, "taste filter discarded person mention");
            }
            _ => kept_people.push(person),
        }
    }
    output.people = kept_people;

    let mut kept_models = Vec::with_capacity(output.mental_models.len());
    for model in std::mem::take(&mut output.mental_models) {
        match filter.evaluate(taste_store, &model.name, EntityType::Concept, stats)? {
            FilterVerdict::Discard { reason, .. } => {
                info!(%segment_id, reason, "taste filter discarded mental model");
            }
            _ => kept_models.push(model),
        }
    }
    output.mental_models = kept_models;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine_core::MinedClaim;
    use engine_taste::{HashingEmbedder, TasteFilterConfig};
    use std::sync::Arc;

    fn output_with_claim(segment_id: &str, text: &str) -> MinerOutput {
        MinerOutput {
            segment_id: segment_id.into(),
            claims: vec![MinedClaim {
                claim_text: text.into(),
                claim_type: Default::default(),
                stance: Default::default(),
                context_quote: text.into(),
                timestamp: 0.0,
                evidence_spans: vec![],
            }],
            ..Default::default()
        }
    }

    #[test]
    fn discarded_claims_are_removed_and_kept_claims_survive() {
        let dir = tempfile::tempdir().unwrap();
        let store = FeedbackStore::open(dir.path().join("taste.redb"), Arc::new(HashingEmbedder::default()), 5).unwrap();
        store
            .add_feedback(engine_core::FeedbackExample {
                id: engine_core::FeedbackId::new(),
                entity_type: engine_core::EntityType::Claim,
                entity_text: "water boils at 100 degrees celsius".into(),
                verdict: engine_core::Verdict::Reject,
                reason_category: "too_trivial".into(),
                user_notes: String::new(),
                source_id: "ep1".into(),
                is_golden: false,
                created_at: chrono::Utc::now(),
            })
            .unwrap();

        let mut output = output_with_claim("s1", "water boils at 100 degrees celsius");
        let filter = TasteFilter::new(TasteFilterConfig::default());
        let mut stats = FilterStats::default();
        let mut boosts = BoostMap::new();

        filter_miner_output(&mut output, &store, &filter, &mut stats, &mut boosts).unwrap();

        assert!(output.claims.is_empty());
    }
}
