use std::collections::HashMap;

use engine_core::{ClaimId, EvaluatedClaim, MinerOutput, SegmentId};

#[derive(Debug, Clone)]
pub struct RemineConfig {
    /// Claims with `confidence_final` below this make their originating
    /// segment eligible for re-mining (spec §4.5 Stage 3 default: 4).
    pub confidence_threshold: u8,
    /// Cap on the fraction of an episode's segments re-mined in one pass
    /// (spec §4.5 Stage 3 default: 0.15).
    pub max_percent: f32,
}

impl Default for RemineConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 4,
            max_percent: 0.15,
        }
    }
}

/// Select segments eligible for Stage 3 re-mining: those with at least one
/// low-confidence accepted claim, or segments mined empty/empty-with-error
/// (spec §4.5). Capped at `config.max_percent` of the episode's segment
/// count, preferring segments in their original order so the cap is
/// deterministic rather than depending on hash-map iteration order.
pub fn select_segments_for_remine(
    outputs: &[MinerOutput],
    evaluated: &[EvaluatedClaim],
    segment_of: &HashMap<ClaimId, SegmentId>,
    config: &RemineConfig,
) -> Vec<SegmentId> {
    let mut min_confidence: HashMap<SegmentId, u8> = HashMap::new();
    for claim in evaluated {
        if claim.decision != engine_core::Decision::Accept {
            continue;
        }
        if let Some(segment_id) = segment_of.get(&claim.claim_id) {
            min_confidence
                .entry(segment_id.clone())
                .and_modify(|c| *c = (*c).min(claim.confidence_final))
                .or_insert(claim.confidence_final);
        }
    }

    let mut selected = Vec::new();
    for output in outputs {
        let is_empty = output.is_empty() || output.is_empty_with_error();
        let is_low_confidence = min_confidence
            .get(&output.segment_id)
            .is_some_and(|c| *c < config.confidence_threshold);
        if is_empty || is_low_confidence {
            selected.push(output.segment_id.clone());
        }
    }

    let cap = ((outputs.len() as f32) * config.max_percent).ceil() as usize;
    selected.truncate(cap);
    selected
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine_core::{ClaimId, Decision, MinedClaim};

    fn output(segment_id: &str, claims: Vec<MinedClaim>) -> MinerOutput {
        MinerOutput {
            segment_id: segment_id.into(),
            claims,
            ..Default::default()
        }
    }

    fn claim(text: &str) -> MinedClaim {
        MinedClaim {
            claim_text: text.into(),
            claim_type: Default::default(),
            stance: Default::default(),
            context_quote: text.into(),
            timestamp: 0.0,
            evidence_spans: vec![],
        }
    }

    fn evaluated(claim_id: ClaimId, confidence: u8) -> EvaluatedClaim {
        EvaluatedClaim {
            claim_id,
            canonical: "c".into(),
            decision: Decision::Accept,
            importance: 8,
            novelty: 5,
            confidence_final: confidence,
            tier: None,
            rank: None,
            reasoning: "r".into(),
            timestamp: 0.0,
            pre_boost_importance: None,
        }
    }

    #[test]
    fn low_confidence_and_empty_segments_are_selected_and_capped() {
        let low_conf_id = ClaimId::new();
        let outputs = vec![
            output("s1", vec![claim("a")]),
            output("s2", vec![]), // empty
            output("s3", vec![claim("b")]),
        ];
        let mut segment_of = HashMap::new();
        segment_of.insert(low_conf_id, SegmentId::from("s1"));
        let evaluated_claims = vec![evaluated(low_conf_id, 2)];

        let config = RemineConfig {
            confidence_threshold: 4,
            max_percent: 1.0,
        };
        let selected = select_segments_for_remine(&outputs, &evaluated_claims, &segment_of, &config);
        assert_eq!(selected, vec![SegmentId::from("s1"), SegmentId::from("s2")]);
    }

    #[test]
    fn cap_limits_selection_to_configured_percent() {
        let outputs = vec![output("s1", vec![]), output("s2", vec![]), output("s3", vec![])];
        let config = RemineConfig {
            confidence_threshold: 4,
            max_percent: 0.34,
        };
        let selected = select_segments_for_remine(&outputs, &[], &HashMap::new(), &config);
        assert_eq!(selected.len(), 1);
    }
}
