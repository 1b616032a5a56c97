use engine_core::{ClaimId, ClaimQuestionMapping, QuestionId, RelationType};
use engine_provider::ChatProvider;
use engine_schema::SchemaRegistry;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::config::QuestionMapperConfig;
use crate::discovery::ClaimInput;
use crate::retry::generate_with_retries;

const STATIC_INSTRUCTIONS: &str = "You determine how each claim relates to each question: \
answers, partial_answer, supports_answer, contradicts, prerequisite, follow_up, or context. A \
claim may relate to multiple questions. Respond with JSON: {\"mappings\": [{\"claim_id\", \
\"question_id\", \"relation_type\", \"relevance_score\" (0.0-1.0), \"rationale\"}]}.";

#[derive(Debug)]
pub struct FinalizedQuestion {
    pub question_id: QuestionId,
    pub question_text: String,
}

#[derive(Debug, Deserialize)]
struct RawAssignmentOutput {
    #[serde(default)]
    mappings: Vec<RawClaimMapping>,
}

#[derive(Debug, Deserialize)]
struct RawClaimMapping {
    claim_id: String,
    question_id: String,
    relation_type: RelationType,
    relevance_score: f64,
}

fn build_assignment_prompt(claims: &[ClaimInput], questions: &[FinalizedQuestion]) -> String {
    let claims_json: Vec<_> = claims
        .iter()
        .map(|c| json!({"claim_id": c.claim_id.to_string(), "claim_text": c.claim_text}))
        .collect();
    let questions_json: Vec<_> = questions
        .iter()
        .map(|q| json!({"question_id": q.question_id.to_string(), "question_text": q.question_text}))
        .collect();

    format!(
        "{STATIC_INSTRUCTIONS}\n\nCLAIMS:\n{}\n\nQUESTIONS:\n{}",
        serde_json::to_string_pretty(&claims_json).unwrap_or_default(),
        serde_json::to_string_pretty(&questions_json).unwrap_or_default(),
    )
}

pub(crate) fn ingest_assignment_response(
    raw_text: &str,
    schema_registry: &SchemaRegistry,
    min_relevance: f64,
) -> Result<Vec<ClaimQuestionMapping>, String> {
    let parsed: serde_json::Value =
        serde_json::from_str(raw_text).map_err(|err| format!("non-JSON assignment response: {err}"))?;
    let (repaired, is_valid, errors) = schema_registry
        .repair_and_validate(parsed, "question_assignment_output")
        .map_err(|err| err.to_string())?;
    if !is_valid {
        return Err(format!("schema invalid after repair: {errors:?}"));
    }

    let raw: RawAssignmentOutput = serde_json::from_value(repaired)
        .map_err(|err| format!("repaired document did not map to assignment output: {err}"))?;

    Ok(raw
        .mappings
        .into_iter()
        .filter(|m| m.relevance_score >= min_relevance)
        .filter_map(|m| {
            let claim_id = uuid::Uuid::parse_str(&m.claim_id).ok().map(ClaimId::from)?;
            let question_id = uuid::Uuid::parse_str(&m.question_id).ok().map(QuestionId::from)?;
            Some(ClaimQuestionMapping {
                claim_id,
                question_id,
                relation_type: m.relation_type,
                relevance_score: m.relevance_score,
            })
        })
        .collect())
}

/// Stage C: assign claims to the finalized question set, batched to
/// `config.assignment_batch_size` claims per call — every call carries the
/// full question set (spec §4.8; the original pipeline batches claims only).
pub async fn assign_claims(
    claims: &[ClaimInput],
    questions: &[FinalizedQuestion],
    provider: &dyn ChatProvider,
    schema_registry: &SchemaRegistry,
    config: &QuestionMapperConfig,
) -> Vec<ClaimQuestionMapping> {
    if questions.is_empty() {
        info!("no finalized questions, skipping claim assignment");
        return Vec::new();
    }

    let mut mappings = Vec::new();
    for batch in claims.chunks(config.assignment_batch_size.max(1)) {
        let prompt = build_assignment_prompt(batch, questions);
        let Some(raw_text) =
            generate_with_retries(provider, &prompt, config.max_provider_retries, config.initial_backoff).await
        else {
            continue;
        };
        match ingest_assignment_response(&raw_text, schema_registry, config.min_relevance) {
            Ok(mut batch_mappings) => mappings.append(&mut batch_mappings),
            Err(reason) => info!(reason, "assignment batch produced no usable mappings"),
        }
    }
    mappings
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mappings_below_min_relevance_are_dropped() {
        let schema_registry = SchemaRegistry::new().unwrap();
        let claim_id = ClaimId::new();
        let question_id = QuestionId::new();
        let raw = json!({
            "mappings": [
                {"claim_id": claim_id.to_string(), "question_id": question_id.to_string(), "relation_type": "answers", "relevance_score": 0.9},
                {"claim_id": claim_id.to_string(), "question_id": question_id.to_string(), "relation_type": "context", "relevance_score": 0.1}
            ]
        })
        .to_string();

        let mappings = ingest_assignment_response(&raw, &schema_registry, 0.5).unwrap();
        assert_eq!(mappings.len(), 1);
        assert_eq!(mappings[0].relation_type, RelationType::Answers);
    }

    #[test]
    fn malformed_ids_are_dropped_not_fatal() {
        let schema_registry = SchemaRegistry::new().unwrap();
        let raw = json!({
            "mappings": [
                {"claim_id": "not-a-uuid", "question_id": "also-not", "relation_type": "answers", "relevance_score": 0.9}
            ]
        })
        .to_string();

        let mappings = ingest_assignment_response(&raw, &schema_registry, 0.5).unwrap();
        assert!(mappings.is_empty());
    }
}
