use std::collections::HashMap;

use engine_core::{ClaimId, CustomId, Episode, MinerOutput, SegmentId, SourceId};
use engine_evaluator::ClaimCandidate;
use engine_miner::{FewShotSource, build_segment_prompt};
use engine_provider::BatchRequest;
use engine_schema::SchemaRegistry;

/// Per-episode claim candidates plus the segment each one was mined from —
/// `engine_evaluator::ClaimCandidate` alone drops that provenance, and the
/// Batch Orchestrator needs it back for Stage 3 re-mine selection.
pub struct EpisodeClaimIndex {
    pub candidates: Vec<ClaimCandidate>,
    pub segment_of: HashMap<ClaimId, SegmentId>,
}

pub fn index_episode_claims(outputs: &[MinerOutput]) -> EpisodeClaimIndex {
    let mut candidates = Vec::new();
    let mut segment_of = HashMap::new();
    for output in outputs {
        for claim in &output.claims {
            let candidate = ClaimCandidate {
                claim_id: ClaimId::new(),
                claim: claim.clone(),
            };
            segment_of.insert(candidate.claim_id, output.segment_id.clone());
            candidates.push(candidate);
        }
    }
    EpisodeClaimIndex { candidates, segment_of }
}

/// Stage 1 request set (spec §4.5): one request per `(episode, segment)`,
/// sorted by `source_id` so adjacent requests in the submitted batch share
/// the same static prompt prefix and maximize provider cache hits.
pub fn build_mine_requests(
    episodes: &[Episode],
    few_shot_source: &dyn FewShotSource,
    schema_registry: &SchemaRegistry,
    few_shot_k: usize,
) -> Vec<BatchRequest> {
    let mut episodes: Vec<&Episode> = episodes.iter().collect();
    episodes.sort_by(|a, b| a.source_id.0.cmp(&b.source_id.0));

    let mut requests = Vec::new();
    for episode in episodes {
        for segment in &episode.segments {
            let prompt = build_segment_prompt(segment, few_shot_source, schema_registry, few_shot_k);
            let custom_id = CustomId::Mine {
                source_id: episode.source_id.clone(),
                segment_id: segment.segment_id.clone(),
            }
            .to_string();
            requests.push(BatchRequest {
                custom_id,
                prompt,
                temperature: 0.2,
                max_tokens: 2048,
            });
        }
    }
    requests
}

/// Stage 2 request set: one request per episode, carrying that episode's
/// full candidate set.
pub fn build_evaluate_requests(
    episodes: &[(SourceId, String, Vec<ClaimCandidate>)],
) -> Vec<BatchRequest> {
    episodes
        .iter()
        .map(|(source_id, content_summary, candidates)| {
            let prompt = engine_evaluator::build_evaluator_prompt(content_summary, candidates);
            BatchRequest {
                custom_id: CustomId::Evaluate { source_id: source_id.clone() }.to_string(),
                prompt,
                temperature: 0.2,
                max_tokens: 4096,
            }
        })
        .collect()
}

/// Stage 3 request set: like Stage 1, but tagged `CustomId::Remine` so
/// ingestion knows to replace rather than merge-append the segment's
/// `MinerOutput`.
pub fn build_remine_requests(
    selections: &[(SourceId, SegmentId)],
    episodes: &[Episode],
    few_shot_source: &dyn FewShotSource,
    schema_registry: &SchemaRegistry,
    few_shot_k: usize,
) -> Vec<BatchRequest> {
    let mut requests = Vec::new();
    for (source_id, segment_id) in selections {
        let Some(episode) = episodes.iter().find(|e| &e.source_id == source_id) else {
            continue;
        };
        let Some(segment) = episode.segments.iter().find(|s| &s.segment_id == segment_id) else {
            continue;
        };
        let prompt = build_segment_prompt(segment, few_shot_source, schema_registry, few_shot_k);
        requests.push(BatchRequest {
            custom_id: CustomId::Remine {
                source_id: source_id.clone(),
                segment_id: segment_id.clone(),
            }
            .to_string(),
            prompt,
            temperature: 0.2,
            max_tokens: 2048,
        });
    }
    requests
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use engine_core::Segment;
    use engine_miner::NoFewShot;
    use engine_schema::SchemaRegistry;

    use super::*;

    fn episode(source_id: &str, segment_ids: &[&str]) -> Episode {
        Episode {
            source_id: source_id.into(),
            title: format!("episode {source_id}"),
            duration_seconds: 300.0,
            speakers: vec!["host".into()],
            segments: segment_ids
                .iter()
                .map(|id| Segment {
                    segment_id: (*id).into(),
                    speaker: "host".into(),
                    t0: 0.0,
                    t1: 5.0,
                    text: "inflation will ease next year".into(),
                })
                .collect(),
        }
    }

    #[test]
    fn mine_requests_are_sorted_by_source_id_for_cache_locality() {
        let episodes = vec![episode("ep-b", &["s1"]), episode("ep-a", &["s1"])];
        let schema_registry = SchemaRegistry::new().unwrap();

        let requests = build_mine_requests(&episodes, &NoFewShot, &schema_registry, 0);

        let custom_ids: Vec<CustomId> = requests
            .iter()
            .map(|r| CustomId::from_str(&r.custom_id).unwrap())
            .collect();
        match (&custom_ids[0], &custom_ids[1]) {
            (CustomId::Mine { source_id: a, .. }, CustomId::Mine { source_id: b, .. }) => {
                assert_eq!(a.0, "ep-a");
                assert_eq!(b.0, "ep-b");
            }
            _ => panic!("expected Mine custom ids"),
        }
    }

    #[test]
    fn mine_requests_cover_every_segment_in_every_episode() {
        let episodes = vec![episode("ep-a", &["s1", "s2"])];
        let schema_registry = SchemaRegistry::new().unwrap();

        let requests = build_mine_requests(&episodes, &NoFewShot, &schema_registry, 0);

        assert_eq!(requests.len(), 2);
    }

    #[test]
    fn evaluate_requests_carry_one_custom_id_per_episode() {
        let episodes = vec![
            ("ep-a".into(), "summary a".to_string(), Vec::new()),
            ("ep-b".into(), "summary b".to_string(), Vec::new()),
        ];

        let requests = build_evaluate_requests(&episodes);

        assert_eq!(requests.len(), 2);
        let CustomId::Evaluate { source_id } = CustomId::from_str(&requests[0].custom_id).unwrap() else {
            panic!("expected Evaluate custom id");
        };
        assert_eq!(source_id.0, "ep-a");
    }

    #[test]
    fn remine_requests_skip_selections_for_unknown_episodes_or_segments() {
        let episodes = vec![episode("ep-a", &["s1"])];
        let schema_registry = SchemaRegistry::new().unwrap();
        let selections = vec![
            ("ep-a".into(), "s1".into()),
            ("ep-a".into(), "missing-segment".into()),
            ("missing-episode".into(), "s1".into()),
        ];

        let requests = build_remine_requests(&selections, &episodes, &NoFewShot, &schema_registry, 0);

        assert_eq!(requests.len(), 1);
        let CustomId::Remine { source_id, segment_id } = CustomId::from_str(&requests[0].custom_id).unwrap() else {
            panic!("expected Remine custom id");
        };
        assert_eq!(source_id.0, "ep-a");
        assert_eq!(segment_id.0, "s1");
    }

    #[test]
    fn indexing_episode_claims_tracks_segment_provenance() {
        let output = MinerOutput {
            segment_id: "s1".into(),
            claims: vec![engine_core::MinedClaim {
                claim_text: "x".into(),
                claim_type: Default::default(),
                stance: Default::default(),
                context_quote: "x".into(),
                timestamp: 0.0,
                evidence_spans: vec![],
            }],
            ..Default::default()
        };

        let index = index_episode_claims(std::slice::from_ref(&output));

        assert_eq!(index.candidates.len(), 1);
        let claim_id = index.candidates[0].claim_id;
        assert_eq!(index.segment_of.get(&claim_id), Some(&SegmentId::from("s1")));
    }
}
