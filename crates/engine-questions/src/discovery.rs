use engine_core::{ClaimId, QuestionType};
use engine_provider::ChatProvider;
use engine_schema::SchemaRegistry;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::config::QuestionMapperConfig;
use crate::retry::generate_with_retries;

const STATIC_INSTRUCTIONS: &str = "You analyze a batch of claims and identify the key questions \
they answer. Discover questions organically from the content — do not bias toward any existing \
question structure. Respond with JSON: {\"questions\": [{\"question_text\", \"question_type\" \
(one of factual/causal/normative/comparative/procedural/forecasting), \"domain\", \"claim_ids\", \
\"confidence\" (0.0-1.0), \"rationale\"}]}.";

/// A claim as seen by the Question Mapper — just enough to discover and
/// assign against; the mapper never needs the claim's scoring detail.
#[derive(Debug, Clone)]
pub struct ClaimInput {
    pub claim_id: ClaimId,
    pub claim_text: String,
}

#[derive(Debug, Clone)]
pub struct DiscoveredQuestion {
    pub question_text: String,
    pub question_type: QuestionType,
    pub domain: Option<String>,
    pub claim_ids: Vec<ClaimId>,
    pub confidence: f64,
    pub rationale: String,
}

#[derive(Debug, Deserialize)]
struct RawDiscoveryOutput {
    #[serde(default)]
    questions: Vec<RawDiscoveredQuestion>,
}

#[derive(Debug, Deserialize)]
struct RawDiscoveredQuestion {
    question_text: String,
    question_type: QuestionType,
    #[serde(default)]
    domain: Option<String>,
    #[serde(default)]
    claim_ids: Vec<String>,
    confidence: f64,
    #[serde(default)]
    rationale: String,
}

fn build_discovery_prompt(claims: &[ClaimInput]) -> String {
    let claims_json: Vec<_> = claims
        .iter()
        .map(|c| json!({"claim_id": c.claim_id.to_string(), "claim_text": c.claim_text}))
        .collect();
    format!(
        "{STATIC_INSTRUCTIONS}\n\nCLAIMS:\n{}",
        serde_json::to_string_pretty(&json!({"claims": claims_json})).unwrap_or_default()
    )
}

/// Parse one discovery response, dropping entries below `min_confidence`
/// (spec §4.8 Stage A) and any `claim_id` that doesn't parse as a UUID
/// (malformed references are dropped rather than failing the whole batch).
pub(crate) fn ingest_discovery_response(
    raw_text: &str,
    schema_registry: &SchemaRegistry,
    min_confidence: f64,
) -> Result<Vec<DiscoveredQuestion>, String> {
    let parsed: serde_json::Value =
        serde_json::from_str(raw_text).map_err(|err| format!("non-JSON discovery response: {err}"))?;
    let (repaired, is_valid, errors) = schema_registry
        .repair_and_validate(parsed, "question_discovery_output")
        .map_err(|err| err.to_string())?;
    if !is_valid {
        return Err(format!("schema invalid after repair: {errors:?}"));
    }

    let raw: RawDiscoveryOutput = serde_json::from_value(repaired)
        .map_err(|err| format!("repaired document did not map to discovery output: {err}"))?;

    Ok(raw
        .questions
        .into_iter()
        .filter(|q| q.confidence >= min_confidence)
        .map(|q| DiscoveredQuestion {
            question_text: q.question_text,
            question_type: q.question_type,
            domain: q.domain.filter(|d| !d.is_empty()),
            claim_ids: q
                .claim_ids
                .iter()
                .filter_map(|s| uuid::Uuid::parse_str(s).ok().map(ClaimId::from))
                .collect(),
            confidence: q.confidence,
            rationale: q.rationale,
        })
        .collect())
}

/// Stage A: discover questions from `claims`, batched to
/// `config.discovery_batch_size` claims per call (spec §4.8).
pub async fn discover_questions(
    claims: &[ClaimInput],
    provider: &dyn ChatProvider,
    schema_registry: &SchemaRegistry,
    config: &QuestionMapperConfig,
) -> Vec<DiscoveredQuestion> {
    let mut discovered = Vec::new();
    for batch in claims.chunks(config.discovery_batch_size.max(1)) {
        let prompt = build_discovery_prompt(batch);
        let Some(raw_text) =
            generate_with_retries(provider, &prompt, config.max_provider_retries, config.initial_backoff).await
        else {
            continue;
        };
        match ingest_discovery_response(&raw_text, schema_registry, config.min_discovery_confidence) {
            Ok(mut batch_questions) => discovered.append(&mut batch_questions),
            Err(reason) => info!(reason, "discovery batch produced no usable questions"),
        }
    }
    discovered
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn low_confidence_questions_are_filtered() {
        let schema_registry = SchemaRegistry::new().unwrap();
        let raw = json!({
            "questions": [
                {"question_text": "will rates rise?", "question_type": "forecasting", "domain": "economics", "claim_ids": [], "confidence": 0.9, "rationale": "r"},
                {"question_text": "weak one", "question_type": "factual", "domain": null, "claim_ids": [], "confidence": 0.2, "rationale": "r"}
            ]
        })
        .to_string();

        let questions = ingest_discovery_response(&raw, &schema_registry, 0.6).unwrap();
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].question_text, "will rates rise?");
    }

    #[test]
    fn malformed_claim_ids_are_dropped_not_fatal() {
        let schema_registry = SchemaRegistry::new().unwrap();
        let raw = json!({
            "questions": [
                {"question_text": "q", "question_type": "factual", "claim_ids": ["not-a-uuid"], "confidence": 0.9, "rationale": "r"}
            ]
        })
        .to_string();

        let questions = ingest_discovery_response(&raw, &schema_registry, 0.6).unwrap();
        assert_eq!(questions.len(), 1);
        assert!(questions[0].claim_ids.is_empty());
    }
}
