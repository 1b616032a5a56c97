use std::cmp::Reverse;

use engine_core::{AverageScores, Decision, EvaluatedClaim, SummaryAssessment, Tier};

/// Sort accepted claims by the spec §4.4 tie-break order — higher
/// importance first, then higher confidence, then higher novelty, then
/// earlier timestamp — and assign a dense `rank` (1..N). Rejected claims
/// are left untouched (`rank = None`). Mirrors the teacher's
/// `retrieval::score_entry_ref` style of building an explicit sort key
/// tuple rather than implementing `Ord` on the domain struct.
pub fn rank_accepted(claims: &mut [EvaluatedClaim]) {
    let mut indices: Vec<usize> = (0..claims.len())
        .filter(|&i| claims[i].decision == Decision::Accept)
        .collect();

    indices.sort_by_key(|&i| {
        let c = &claims[i];
        (
            Reverse(c.importance),
            Reverse(c.confidence_final),
            Reverse(c.novelty),
            (c.timestamp * 1000.0) as i64,
        )
    });

    for (rank, index) in indices.into_iter().enumerate() {
        claims[index].rank = Some(rank as u32 + 1);
    }
    for claim in claims.iter_mut() {
        if claim.decision == Decision::Reject {
            claim.rank = None;
        }
    }
}

/// Deterministically computed from the final claim list rather than trusted
/// from the LLM's own counts — `claims_accepted`/`claims_rejected` are
/// correctness-critical invariants (spec §4.4), not prose.
pub fn summarize(claims: &[EvaluatedClaim], key_themes: Vec<String>) -> SummaryAssessment {
    let total = claims.len() as u32;
    let accepted = claims.iter().filter(|c| c.decision == Decision::Accept).count() as u32;
    let rejected = total - accepted;

    let average_scores = if claims.is_empty() {
        AverageScores::default()
    } else {
        let n = claims.len() as f64;
        AverageScores {
            importance: claims.iter().map(|c| c.importance as f64).sum::<f64>() / n,
            novelty: claims.iter().map(|c| c.novelty as f64).sum::<f64>() / n,
            confidence: claims.iter().map(|c| c.confidence_final as f64).sum::<f64>() / n,
        }
    };

    SummaryAssessment {
        total_claims_processed: total,
        claims_accepted: accepted,
        claims_rejected: rejected,
        key_themes,
        average_scores,
    }
}

/// A claim is rejected if `importance < 4` regardless of what the evaluator
/// decided, or if the evaluator itself decided `reject` (spec §4.4).
pub fn apply_rejection_floor(importance: u8, llm_decision: Decision) -> (Decision, Option<Tier>) {
    if importance < 4 {
        return (Decision::Reject, None);
    }
    match llm_decision {
        Decision::Reject => (Decision::Reject, None),
        Decision::Accept => (Decision::Accept, Tier::from_importance(importance)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine_core::ClaimId;

    fn claim(importance: u8, confidence: u8, novelty: u8, timestamp: f64) -> EvaluatedClaim {
        EvaluatedClaim {
            claim_id: ClaimId::new(),
            canonical: "c".into(),
            decision: Decision::Accept,
            importance,
            novelty,
            confidence_final: confidence,
            tier: Tier::from_importance(importance),
            rank: None,
            reasoning: "r".into(),
            timestamp,
            pre_boost_importance: None,
        }
    }

    #[test]
    fn ties_break_by_confidence_then_novelty_then_earlier_timestamp() {
        let mut claims = vec![
            claim(8, 5, 5, 10.0),
            claim(8, 7, 5, 20.0),
            claim(8, 7, 9, 5.0),
        ];
        rank_accepted(&mut claims);
        assert_eq!(claims[2].rank, Some(1)); // confidence 7, novelty 9
        assert_eq!(claims[1].rank, Some(2)); // confidence 7, novelty 5
        assert_eq!(claims[0].rank, Some(3)); // confidence 5
    }

    #[test]
    fn rejection_floor_overrides_llm_accept_below_four() {
        let (decision, tier) = apply_rejection_floor(3, Decision::Accept);
        assert_eq!(decision, Decision::Reject);
        assert_eq!(tier, None);
    }

    #[test]
    fn summary_counts_match_final_decisions_not_llm_claims() {
        let claims = vec![claim(8, 5, 5, 1.0), {
            let mut c = claim(2, 5, 5, 2.0);
            c.decision = Decision::Reject;
            c.tier = None;
            c
        }];
        let summary = summarize(&claims, vec!["inflation".into()]);
        assert_eq!(summary.total_claims_processed, 2);
        assert_eq!(summary.claims_accepted, 1);
        assert_eq!(summary.claims_rejected, 1);
    }
}
