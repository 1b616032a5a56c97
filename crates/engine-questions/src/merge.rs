use engine_core::{Question, QuestionId};
use engine_provider::ChatProvider;
use engine_schema::SchemaRegistry;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::config::QuestionMapperConfig;
use crate::discovery::DiscoveredQuestion;
use crate::retry::generate_with_retries;

const STATIC_INSTRUCTIONS: &str = "You compare newly discovered questions against a set of \
existing questions and recommend, for each new question, one of: merge_into_existing (the new \
question duplicates or is a subset of an existing one — set target_question_id), \
merge_existing_into_new (the existing question is a subset of the new one — set \
target_question_id to the existing question being absorbed), link_as_related (keep both, they're \
related), or keep_distinct (no relationship). Respond with JSON: {\"recommendations\": \
[{\"new_question_text\", \"action\", \"target_question_id\", \"confidence\" (0.0-1.0), \
\"rationale\"}]}.";

/// Makes the domain-overlap fallback explicit: callers and logs can see
/// whether a merge pass compared against a domain-filtered subset or fell
/// back to every existing question, rather than inferring it from an empty
/// domain list (spec §9).
#[derive(Debug, Clone, PartialEq)]
pub enum DomainScope {
    Matched(Vec<String>),
    AllDomainsFallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeAction {
    MergeIntoExisting,
    MergeExistingIntoNew,
    LinkAsRelated,
    KeepDistinct,
}

#[derive(Debug, Clone)]
pub struct MergeRecommendation {
    pub new_question_text: String,
    pub action: MergeAction,
    pub target_question_id: Option<QuestionId>,
    pub confidence: f64,
    pub rationale: String,
}

#[derive(Debug, Deserialize)]
struct RawMergeOutput {
    #[serde(default)]
    recommendations: Vec<RawMergeRecommendation>,
}

#[derive(Debug, Deserialize)]
struct RawMergeRecommendation {
    new_question_text: String,
    action: MergeAction,
    #[serde(default)]
    target_question_id: Option<String>,
    confidence: f64,
    #[serde(default)]
    rationale: String,
}

/// Select which existing questions a merge pass should compare `new`
/// against (spec §4.8 Stage B, spec §9 explicit-fallback redesign). Domain
/// matching is case-insensitive. Falls back to every existing question when
/// no new question names a domain, or when none of the named domains match
/// any existing question — "conservative": comparing against too much is
/// safer than silently comparing against nothing.
pub fn select_existing_for_merge(new: &[DiscoveredQuestion], existing: &[Question]) -> (DomainScope, Vec<Question>) {
    let domains: Vec<String> = new
        .iter()
        .filter_map(|q| q.domain.as_ref())
        .map(|d| d.to_lowercase())
        .collect();

    if domains.is_empty() {
        return (DomainScope::AllDomainsFallback, existing.to_vec());
    }

    let filtered: Vec<Question> = existing
        .iter()
        .filter(|q| domains.contains(&q.domain.to_lowercase()))
        .cloned()
        .collect();

    if filtered.is_empty() {
        (DomainScope::AllDomainsFallback, existing.to_vec())
    } else {
        (DomainScope::Matched(domains), filtered)
    }
}

fn build_merge_prompt(new: &[DiscoveredQuestion], existing: &[Question]) -> String {
    let new_json: Vec<_> = new
        .iter()
        .map(|q| json!({"question_text": q.question_text, "question_type": q.question_type, "domain": q.domain}))
        .collect();
    let existing_json: Vec<_> = existing
        .iter()
        .map(|q| json!({"question_id": q.question_id.to_string(), "question_text": q.question_text, "question_type": q.question_type}))
        .collect();

    format!(
        "{STATIC_INSTRUCTIONS}\n\nNEW QUESTIONS:\n{}\n\nEXISTING QUESTIONS:\n{}",
        serde_json::to_string_pretty(&new_json).unwrap_or_default(),
        serde_json::to_string_pretty(&existing_json).unwrap_or_default(),
    )
}

pub(crate) fn ingest_merge_response(
    raw_text: &str,
    schema_registry: &SchemaRegistry,
    min_confidence: f64,
) -> Result<Vec<MergeRecommendation>, String> {
    let parsed: serde_json::Value =
        serde_json::from_str(raw_text).map_err(|err| format!("non-JSON merge response: {err}"))?;
    let (repaired, is_valid, errors) = schema_registry
        .repair_and_validate(parsed, "question_merge_output")
        .map_err(|err| err.to_string())?;
    if !is_valid {
        return Err(format!("schema invalid after repair: {errors:?}"));
    }

    let raw: RawMergeOutput = serde_json::from_value(repaired)
        .map_err(|err| format!("repaired document did not map to merge output: {err}"))?;

    Ok(raw
        .recommendations
        .into_iter()
        .filter(|r| r.confidence >= min_confidence)
        .map(|r| MergeRecommendation {
            new_question_text: r.new_question_text,
            action: r.action,
            target_question_id: r
                .target_question_id
                .and_then(|s| uuid::Uuid::parse_str(&s).ok())
                .map(QuestionId::from),
            confidence: r.confidence,
            rationale: r.rationale,
        })
        .collect())
}

/// Stage B: recommend a merge action for every discovered question (spec
/// §4.8). When `existing` is empty outright, every question is
/// `keep_distinct` without an LLM call — there is nothing to compare
/// against.
pub async fn analyze_merges(
    new: &[DiscoveredQuestion],
    existing: &[Question],
    provider: &dyn ChatProvider,
    schema_registry: &SchemaRegistry,
    config: &QuestionMapperConfig,
) -> Vec<MergeRecommendation> {
    if new.is_empty() {
        return Vec::new();
    }
    if existing.is_empty() {
        return new
            .iter()
            .map(|q| MergeRecommendation {
                new_question_text: q.question_text.clone(),
                action: MergeAction::KeepDistinct,
                target_question_id: None,
                confidence: 1.0,
                rationale: "no existing questions to compare against".into(),
            })
            .collect();
    }

    let (scope, candidates) = select_existing_for_merge(new, existing);
    info!(?scope, candidates = candidates.len(), "merge analysis scope selected");

    let prompt = build_merge_prompt(new, &candidates);
    let Some(raw_text) =
        generate_with_retries(provider, &prompt, config.max_provider_retries, config.initial_backoff).await
    else {
        return Vec::new();
    };

    match ingest_merge_response(&raw_text, schema_registry, config.min_merge_confidence) {
        Ok(recs) => recs,
        Err(reason) => {
            info!(reason, "merge pass produced no usable recommendations");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn question(domain: &str) -> Question {
        Question {
            question_id: QuestionId::new(),
            question_text: "existing?".into(),
            question_type: engine_core::QuestionType::Factual,
            domain: domain.into(),
            importance_score: 0.5,
            reviewed: true,
            created_at: Utc::now(),
            deprecated_into: None,
        }
    }

    fn discovered(domain: Option<&str>) -> DiscoveredQuestion {
        DiscoveredQuestion {
            question_text: "new?".into(),
            question_type: engine_core::QuestionType::Factual,
            domain: domain.map(String::from),
            claim_ids: vec![],
            confidence: 0.9,
            rationale: "r".into(),
        }
    }

    #[test]
    fn no_domain_on_any_new_question_falls_back_to_all() {
        let existing = vec![question("economics"), question("politics")];
        let (scope, candidates) = select_existing_for_merge(&[discovered(None)], &existing);
        assert_eq!(scope, DomainScope::AllDomainsFallback);
        assert_eq!(candidates.len(), 2);
    }

    #[test]
    fn matching_domain_filters_to_overlap() {
        let existing = vec![question("economics"), question("politics")];
        let (scope, candidates) = select_existing_for_merge(&[discovered(Some("Economics"))], &existing);
        assert_eq!(scope, DomainScope::Matched(vec!["economics".to_string()]));
        assert_eq!(candidates.len(), 1);
    }

    #[test]
    fn non_overlapping_domain_falls_back_to_all_conservatively() {
        let existing = vec![question("economics")];
        let (scope, candidates) = select_existing_for_merge(&[discovered(Some("sports"))], &existing);
        assert_eq!(scope, DomainScope::AllDomainsFallback);
        assert_eq!(candidates.len(), 1);
    }
}
