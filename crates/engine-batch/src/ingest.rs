use std::collections::HashMap;
use std::str::FromStr;

use engine_core::{CustomId, EvaluatedClaim, MinerOutput, SegmentId, SourceId, SummaryAssessment};
use engine_evaluator::{ClaimCandidate, ingest_evaluator_response};
use engine_miner::ingest_miner_response;
use engine_provider::BatchResult;
use engine_schema::SchemaRegistry;
use tracing::warn;

/// One ingested Stage 1 / Stage 3 result, keyed back to its episode.
pub struct MinedSegment {
    pub source_id: SourceId,
    pub segment_id: SegmentId,
    pub output: MinerOutput,
    /// True for Stage 3 results — the caller replaces rather than
    /// merge-appends the episode's existing `MinerOutput` for this segment.
    pub is_remine: bool,
}

/// Parse every Stage 1/3 `BatchResult` back into a `MinerOutput`, resolving
/// `custom_id` exactly once (spec §9 redesign note). A result carrying a
/// provider-reported `error`, an unparseable `custom_id`, or text that fails
/// schema repair becomes `MinerOutput::empty_with_error` rather than being
/// dropped — downstream re-mining can retry (spec §4.5 "Failure semantics").
pub fn ingest_mine_results(results: Vec<BatchResult>, schema_registry: &SchemaRegistry) -> Vec<MinedSegment> {
    results
        .into_iter()
        .filter_map(|result| {
            let custom_id = match CustomId::from_str(&result.custom_id) {
                Ok(id) => id,
                Err(err) => {
                    warn!(custom_id = %result.custom_id, error = %err, "dropping batch result with unparseable custom_id");
                    return None;
                }
            };
            let (source_id, segment_id, is_remine) = match custom_id {
                CustomId::Mine { source_id, segment_id } => (source_id, segment_id, false),
                CustomId::Remine { source_id, segment_id } => (source_id, segment_id, true),
                CustomId::Evaluate { .. } => {
                    warn!(custom_id = %result.custom_id, "evaluate custom_id in mine-stage results");
                    return None;
                }
            };

            let output = match &result.error {
                Some(err) => MinerOutput::empty_with_error(segment_id.clone(), err.clone()),
                None => {
                    let text = result.text.unwrap_or_default();
                    match ingest_miner_response(&segment_id, &text, schema_registry) {
                        Ok(output) => output,
                        Err(reason) => MinerOutput::empty_with_error(segment_id.clone(), reason),
                    }
                }
            };

            Some(MinedSegment {
                source_id,
                segment_id,
                output,
                is_remine,
            })
        })
        .collect()
}

fn fallback_rejected(candidates: &[ClaimCandidate], reason: String) -> (Vec<EvaluatedClaim>, SummaryAssessment) {
    let claims: Vec<EvaluatedClaim> = candidates
        .iter()
        .map(|c| EvaluatedClaim {
            claim_id: c.claim_id,
            canonical: c.claim.claim_text.clone(),
            decision: engine_core::Decision::Reject,
            importance: 0,
            novelty: 0,
            confidence_final: 0,
            tier: None,
            rank: None,
            reasoning: reason.clone(),
            timestamp: c.claim.timestamp,
            pre_boost_importance: None,
        })
        .collect();
    let summary = engine_evaluator::summarize(&claims, vec![]);
    (claims, summary)
}

/// Ingested Stage 2 result for one episode.
pub struct EvaluatedEpisode {
    pub source_id: SourceId,
    pub claims: Vec<EvaluatedClaim>,
    pub summary: SummaryAssessment,
}

/// Parse every Stage 2 `BatchResult` back into the episode's final claim
/// list, using the candidate set built at request time to recover
/// `claim_id`/timestamp (the evaluator prompt only echoes `claim_index`).
pub fn ingest_evaluate_results(
    results: Vec<BatchResult>,
    candidates_by_episode: &HashMap<SourceId, Vec<ClaimCandidate>>,
    schema_registry: &SchemaRegistry,
) -> Vec<EvaluatedEpisode> {
    results
        .into_iter()
        .filter_map(|result| {
            let custom_id = match CustomId::from_str(&result.custom_id) {
                Ok(id) => id,
                Err(err) => {
                    warn!(custom_id = %result.custom_id, error = %err, "dropping batch result with unparseable custom_id");
                    return None;
                }
            };
            let CustomId::Evaluate { source_id } = custom_id else {
                warn!(custom_id = %result.custom_id, "non-evaluate custom_id in evaluate-stage results");
                return None;
            };
            let Some(candidates) = candidates_by_episode.get(&source_id) else {
                warn!(source_id = %source_id, "evaluate result for an episode with no known candidates");
                return None;
            };

            let (claims, summary) = match &result.error {
                Some(err) => fallback_rejected(candidates, err.clone()),
                None => {
                    let text = result.text.unwrap_or_default();
                    match ingest_evaluator_response(candidates, &text, schema_registry) {
                        Ok(pair) => pair,
                        Err(reason) => fallback_rejected(candidates, reason),
                    }
                }
            };

            Some(EvaluatedEpisode { source_id, claims, summary })
        })
        .collect()
}
