use std::time::Duration;

use engine_core::{Decision, EvaluatedClaim};
use engine_provider::{ChatProvider, ChatRequest};
use engine_schema::SchemaRegistry;
use serde::Deserialize;
use tracing::warn;

use crate::candidate::ClaimCandidate;
use crate::prompt::build_evaluator_prompt;
use crate::scoring::{apply_rejection_floor, rank_accepted, summarize};

#[derive(Debug, Clone)]
pub struct EvaluatorConfig {
    pub max_provider_retries: u32,
    pub initial_backoff: Duration,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            max_provider_retries: 3,
            initial_backoff: Duration::from_millis(500),
        }
    }
}

pub struct EvaluateOutcome {
    pub claims: Vec<EvaluatedClaim>,
    pub summary: engine_core::SummaryAssessment,
    pub prompt: String,
    pub raw_response: Option<String>,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub cached_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct RawEvaluatedClaim {
    #[serde(default)]
    claim_index: Option<usize>,
    canonical: String,
    decision: Decision,
    importance: u8,
    novelty: u8,
    confidence_final: u8,
    #[serde(default)]
    reasoning: String,
}

#[derive(Debug, Deserialize)]
struct RawFlagshipOutput {
    evaluated_claims: Vec<RawEvaluatedClaim>,
    #[serde(default)]
    summary_assessment: RawSummary,
}

#[derive(Debug, Default, Deserialize)]
struct RawSummary {
    #[serde(default)]
    key_themes: Vec<String>,
}

/// Turn one raw flagship-evaluator response into the final claim list plus
/// summary. Shared by the interactive retry loop and batch-result
/// ingestion.
pub fn ingest_evaluator_response(
    candidates: &[ClaimCandidate],
    raw_text: &str,
    schema_registry: &SchemaRegistry,
) -> Result<(Vec<EvaluatedClaim>, engine_core::SummaryAssessment), String> {
    let parsed: serde_json::Value = serde_json::from_str(raw_text)
        .map_err(|err| format!("non-JSON evaluator response: {err}"))?;

    let (repaired, is_valid, errors) = schema_registry
        .repair_and_validate(parsed, "flagship_output")
        .map_err(|err| err.to_string())?;

    if !is_valid {
        return Err(format!("schema invalid after repair: {errors:?}"));
    }

    let raw: RawFlagshipOutput = serde_json::from_value(repaired)
        .map_err(|err| format!("repaired document did not map to flagship output: {err}"))?;

    let mut claims = build_claims(candidates, raw.evaluated_claims);
    rank_accepted(&mut claims);
    let summary = summarize(&claims, raw.summary_assessment.key_themes);
    Ok((claims, summary))
}

/// Evaluate every candidate claim in an episode in one flagship call (spec
/// §4.4). Provider failures and unrepairable schema output fall back to
/// rejecting every candidate with an audit-visible reason rather than
/// failing the run outright — re-running the `evaluate` Job retries.
pub async fn evaluate_episode(
    content_summary: &str,
    candidates: &[ClaimCandidate],
    provider: &dyn ChatProvider,
    schema_registry: &SchemaRegistry,
    config: &EvaluatorConfig,
) -> EvaluateOutcome {
    let prompt = build_evaluator_prompt(content_summary, candidates);

    let mut last_error = None;
    let mut backoff = config.initial_backoff;

    for attempt in 0..=config.max_provider_retries {
        if attempt > 0 {
            tokio::time::sleep(backoff).await;
            backoff *= 2;
        }

        let response = match provider.generate(ChatRequest::new(prompt.clone())).await {
            Ok(response) => response,
            Err(err) => {
                warn!(attempt, error = %err, "evaluator provider call failed");
                last_error = Some(err.to_string());
                continue;
            }
        };

        match ingest_evaluator_response(candidates, &response.text, schema_registry) {
            Ok((claims, summary)) => {
                return EvaluateOutcome {
                    claims,
                    summary,
                    prompt,
                    raw_response: Some(response.text),
                    prompt_tokens: response.prompt_tokens,
                    completion_tokens: response.completion_tokens,
                    cached_tokens: response.cached_tokens,
                };
            }
            Err(reason) => {
                last_error = Some(reason);
                continue;
            }
        }
    }

    let claims = fallback_rejected(candidates, last_error.clone());
    let summary = summarize(&claims, vec![]);
    EvaluateOutcome {
        claims,
        summary,
        prompt,
        raw_response: None,
        prompt_tokens: 0,
        completion_tokens: 0,
        cached_tokens: 0,
    }
}

fn build_claims(
    candidates: &[ClaimCandidate],
    raw_claims: Vec<RawEvaluatedClaim>,
) -> Vec<EvaluatedClaim> {
    let mut by_index: std::collections::HashMap<usize, RawEvaluatedClaim> =
        std::collections::HashMap::new();
    for (position, raw) in raw_claims.into_iter().enumerate() {
        let index = raw.claim_index.unwrap_or(position);
        by_index.insert(index, raw);
    }

    candidates
        .iter()
        .enumerate()
        .map(|(index, candidate)| match by_index.remove(&index) {
            Some(raw) => {
                let (decision, tier) = apply_rejection_floor(raw.importance, raw.decision);
                EvaluatedClaim {
                    claim_id: candidate.claim_id,
                    canonical: raw.canonical,
                    decision,
                    importance: raw.importance,
                    novelty: raw.novelty,
                    confidence_final: raw.confidence_final,
                    tier,
                    rank: None,
                    reasoning: raw.reasoning,
                    timestamp: candidate.claim.timestamp,
                    pre_boost_importance: None,
                }
            }
            None => missing_claim(candidate, "evaluator returned no entry for this claim"),
        })
        .collect()
}

fn fallback_rejected(candidates: &[ClaimCandidate], reason: Option<String>) -> Vec<EvaluatedClaim> {
    let reason = reason.unwrap_or_else(|| "evaluator unavailable".to_string());
    candidates
        .iter()
        .map(|candidate| missing_claim(candidate, &reason))
        .collect()
}

fn missing_claim(candidate: &ClaimCandidate, reason: &str) -> EvaluatedClaim {
    EvaluatedClaim {
        claim_id: candidate.claim_id,
        canonical: candidate.claim.claim_text.clone(),
        decision: Decision::Reject,
        importance: 0,
        novelty: 0,
        confidence_final: 0,
        tier: None,
        rank: None,
        reasoning: reason.to_string(),
        timestamp: candidate.claim.timestamp,
        pre_boost_importance: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use async_trait::async_trait;
    use engine_core::{ClaimId, MinedClaim};
    use engine_provider::ChatResponse;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedProvider {
        responses: Vec<String>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ChatProvider for FixedProvider {
        async fn generate(&self, _request: ChatRequest) -> Result<ChatResponse> {
            let idx = self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(ChatResponse {
                text: self.responses[idx.min(self.responses.len() - 1)].clone(),
                prompt_tokens: 20,
                completion_tokens: 10,
                cached_tokens: 0,
            })
        }
        fn name(&self) -> &str {
            "fixed"
        }
    }

    fn candidate(text: &str, timestamp: f64) -> ClaimCandidate {
        ClaimCandidate {
            claim_id: ClaimId::new(),
            claim: MinedClaim {
                claim_text: text.into(),
                claim_type: Default::default(),
                stance: Default::default(),
                context_quote: text.into(),
                timestamp,
                evidence_spans: vec![],
            },
        }
    }

    #[tokio::test]
    async fn importance_below_four_is_rejected_even_if_llm_says_accept() {
        let candidates = vec![candidate("minor claim", 1.0)];
        let provider = FixedProvider {
            responses: vec![serde_json::json!({
                "evaluated_claims": [
                    {"claim_index": 0, "canonical": "minor claim", "decision": "accept", "importance": 2, "novelty": 1, "confidence_final": 3, "reasoning": "weak"}
                ],
                "summary_assessment": {"total_claims_processed": 1, "claims_accepted": 1, "claims_rejected": 0}
            }).to_string()],
            calls: AtomicUsize::new(0),
        };
        let schema_registry = SchemaRegistry::new().unwrap();

        let outcome = evaluate_episode(
            "a short episode",
            &candidates,
            &provider,
            &schema_registry,
            &EvaluatorConfig::default(),
        )
        .await;

        assert_eq!(outcome.claims[0].decision, Decision::Reject);
        assert_eq!(outcome.summary.claims_accepted, 0);
    }

    #[tokio::test]
    async fn accepted_claims_are_densely_ranked() {
        let candidates = vec![candidate("a", 1.0), candidate("b", 2.0)];
        let provider = FixedProvider {
            responses: vec![serde_json::json!({
                "evaluated_claims": [
                    {"claim_index": 0, "canonical": "a", "decision": "accept", "importance": 9, "novelty": 5, "confidence_final": 8, "reasoning": "strong"},
                    {"claim_index": 1, "canonical": "b", "decision": "accept", "importance": 6, "novelty": 5, "confidence_final": 6, "reasoning": "ok"}
                ],
                "summary_assessment": {"total_claims_processed": 2, "claims_accepted": 2, "claims_rejected": 0, "key_themes": ["economy"]}
            }).to_string()],
            calls: AtomicUsize::new(0),
        };
        let schema_registry = SchemaRegistry::new().unwrap();

        let outcome = evaluate_episode(
            "a short episode",
            &candidates,
            &provider,
            &schema_registry,
            &EvaluatorConfig::default(),
        )
        .await;

        assert_eq!(outcome.claims[0].rank, Some(1));
        assert_eq!(outcome.claims[1].rank, Some(2));
        assert_eq!(outcome.summary.key_themes, vec!["economy".to_string()]);
    }
}
