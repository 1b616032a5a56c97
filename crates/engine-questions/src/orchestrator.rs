use std::collections::HashMap;

use engine_core::{Question, QuestionId};
use engine_provider::ChatProvider;
use engine_schema::SchemaRegistry;
use engine_store::Store;
use tracing::info;

use crate::assignment::{FinalizedQuestion, assign_claims};
use crate::config::QuestionMapperConfig;
use crate::discovery::{ClaimInput, discover_questions};
use crate::merge::{MergeAction, MergeRecommendation, analyze_merges};

/// Outcome of one Question Mapper pass (spec §4.8), surfaced for the
/// composition root's job-completion record.
#[derive(Debug, Default)]
pub struct QuestionMapperOutcome {
    pub questions_discovered: usize,
    pub questions_created: usize,
    pub questions_merged: usize,
    pub mappings_persisted: usize,
}

/// Run the complete Discover → Merge → Assign pipeline over `claims` and
/// persist the result to `store` (spec §4.8). Grounded in
/// `original_source/src/knowledge_system/processors/question_mapper/orchestrator.py`'s
/// five-stage shape (discover, load existing, merge, finalize, assign-and-store),
/// collapsed here into four since schema validation replaces the original's
/// ad hoc Pydantic re-validation step.
pub async fn map_questions(
    store: &Store,
    claims: &[ClaimInput],
    provider: &dyn ChatProvider,
    schema_registry: &SchemaRegistry,
    config: &QuestionMapperConfig,
) -> anyhow::Result<QuestionMapperOutcome> {
    let mut outcome = QuestionMapperOutcome::default();

    let discovered = discover_questions(claims, provider, schema_registry, config).await;
    outcome.questions_discovered = discovered.len();
    if discovered.is_empty() {
        info!("no questions discovered, question mapper pass complete");
        return Ok(outcome);
    }

    let domains: Vec<String> = discovered.iter().filter_map(|q| q.domain.clone()).collect();
    let existing = if domains.is_empty() {
        store.list_questions()?
    } else {
        store.get_questions_by_domain(&domains)?
    };

    let recommendations = analyze_merges(&discovered, &existing, provider, schema_registry, config).await;

    let finalized = finalize_questions(store, &discovered, &recommendations, config.auto_approve, &mut outcome)?;
    if finalized.is_empty() {
        info!("no questions finalized, skipping claim assignment");
        return Ok(outcome);
    }

    let mappings = assign_claims(claims, &finalized, provider, schema_registry, config).await;
    for mapping in mappings {
        if store.put_mapping(mapping)? {
            outcome.mappings_persisted += 1;
        }
    }

    Ok(outcome)
}

/// Turn merge recommendations into a finalized question set, persisting new
/// questions and applying merges as it goes (spec §4.8 persistence policy).
fn finalize_questions(
    store: &Store,
    discovered: &[crate::discovery::DiscoveredQuestion],
    recommendations: &[MergeRecommendation],
    auto_approve: bool,
    outcome: &mut QuestionMapperOutcome,
) -> anyhow::Result<Vec<FinalizedQuestion>> {
    let by_text: HashMap<&str, &MergeRecommendation> =
        recommendations.iter().map(|r| (r.new_question_text.as_str(), r)).collect();

    let mut finalized = Vec::new();

    for question in discovered {
        let rec = by_text.get(question.question_text.as_str());

        match rec.map(|r| r.action) {
            None | Some(MergeAction::KeepDistinct) => {
                let created = create_question(store, question, auto_approve)?;
                outcome.questions_created += 1;
                finalized.push(created);
            }
            Some(MergeAction::MergeIntoExisting) => {
                let Some(target_id) = rec.and_then(|r| r.target_question_id) else {
                    let created = create_question(store, question, auto_approve)?;
                    outcome.questions_created += 1;
                    finalized.push(created);
                    continue;
                };
                if let Some(target) = store.get_question(target_id)? {
                    finalized.push(FinalizedQuestion { question_id: target.question_id, question_text: target.question_text });
                }
            }
            Some(MergeAction::MergeExistingIntoNew) => {
                let created = create_question(store, question, auto_approve)?;
                outcome.questions_created += 1;
                if let Some(old_id) = rec.and_then(|r| r.target_question_id) {
                    store.merge_question(old_id, created.question_id)?;
                    outcome.questions_merged += 1;
                }
                finalized.push(created);
            }
            Some(MergeAction::LinkAsRelated) => {
                let created = create_question(store, question, auto_approve)?;
                outcome.questions_created += 1;
                finalized.push(created);
            }
        }
    }

    Ok(finalized)
}

fn create_question(
    store: &Store,
    question: &crate::discovery::DiscoveredQuestion,
    auto_approve: bool,
) -> anyhow::Result<FinalizedQuestion> {
    let persisted = Question {
        question_id: QuestionId::new(),
        question_text: question.question_text.clone(),
        question_type: question.question_type,
        domain: question.domain.clone().unwrap_or_default(),
        importance_score: question.confidence,
        reviewed: auto_approve,
        created_at: chrono::Utc::now(),
        deprecated_into: None,
    };
    store.create_question(persisted.clone())?;
    Ok(FinalizedQuestion { question_id: persisted.question_id, question_text: persisted.question_text })
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use anyhow::Result;
    use async_trait::async_trait;
    use engine_core::ClaimId;
    use engine_provider::{ChatRequest, ChatResponse};

    use super::*;

    struct ScriptedProvider {
        responses: Vec<String>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ChatProvider for ScriptedProvider {
        async fn generate(&self, _request: ChatRequest) -> Result<ChatResponse> {
            let idx = self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(ChatResponse {
                text: self.responses[idx.min(self.responses.len() - 1)].clone(),
                prompt_tokens: 10,
                completion_tokens: 5,
                cached_tokens: 0,
            })
        }
        fn name(&self) -> &str {
            "scripted"
        }
    }

    #[tokio::test]
    async fn no_existing_questions_creates_all_as_keep_distinct() {
        let store = Store::open_in_memory().unwrap();
        let claim_id = ClaimId::new();
        let claims = vec![ClaimInput { claim_id, claim_text: "rates will rise".into() }];

        let discovery_response = serde_json::json!({
            "questions": [
                {"question_text": "will rates rise?", "question_type": "forecasting", "domain": "economics", "claim_ids": [claim_id.to_string()], "confidence": 0.9, "rationale": "r"}
            ]
        })
        .to_string();
        let assignment_response_placeholder = serde_json::json!({"mappings": []}).to_string();

        let provider = ScriptedProvider {
            responses: vec![discovery_response, assignment_response_placeholder],
            calls: AtomicUsize::new(0),
        };
        let schema_registry = SchemaRegistry::new().unwrap();
        let config = QuestionMapperConfig::default();

        let outcome = map_questions(&store, &claims, &provider, &schema_registry, &config).await.unwrap();

        assert_eq!(outcome.questions_discovered, 1);
        assert_eq!(outcome.questions_created, 1);
        let questions = store.list_questions().unwrap();
        assert_eq!(questions.len(), 1);
        assert!(!questions[0].reviewed, "auto_approve defaults to false");
    }

    #[tokio::test]
    async fn auto_approve_marks_created_questions_reviewed() {
        let store = Store::open_in_memory().unwrap();
        let claim_id = ClaimId::new();
        let claims = vec![ClaimInput { claim_id, claim_text: "rates will rise".into() }];

        let discovery_response = serde_json::json!({
            "questions": [
                {"question_text": "will rates rise?", "question_type": "forecasting", "domain": "economics", "claim_ids": [], "confidence": 0.9, "rationale": "r"}
            ]
        })
        .to_string();
        let assignment_response = serde_json::json!({"mappings": []}).to_string();

        let provider = ScriptedProvider {
            responses: vec![discovery_response, assignment_response],
            calls: AtomicUsize::new(0),
        };
        let schema_registry = SchemaRegistry::new().unwrap();
        let mut config = QuestionMapperConfig::default();
        config.auto_approve = true;

        map_questions(&store, &claims, &provider, &schema_registry, &config).await.unwrap();

        let questions = store.list_questions().unwrap();
        assert!(questions[0].reviewed);
    }

    #[tokio::test]
    async fn merge_existing_into_new_deprecates_old_question_regardless_of_auto_approve() {
        let store = Store::open_in_memory().unwrap();

        let old_question = Question {
            question_id: QuestionId::new(),
            question_text: "will rates rise this year?".into(),
            question_type: engine_core::QuestionType::Forecasting,
            domain: "economics".into(),
            importance_score: 0.5,
            reviewed: true,
            created_at: chrono::Utc::now(),
            deprecated_into: None,
        };
        store.create_question(old_question.clone()).unwrap();
        let old_claim_id = ClaimId::new();
        store
            .put_mapping(engine_core::ClaimQuestionMapping {
                claim_id: old_claim_id,
                question_id: old_question.question_id,
                relation_type: engine_core::RelationType::Answers,
                relevance_score: 0.9,
            })
            .unwrap();

        let claim_id = ClaimId::new();
        let claims = vec![ClaimInput { claim_id, claim_text: "rates will rise substantially".into() }];

        let discovery_response = serde_json::json!({
            "questions": [
                {"question_text": "how much will rates rise?", "question_type": "forecasting", "domain": "economics", "claim_ids": [claim_id.to_string()], "confidence": 0.9, "rationale": "r"}
            ]
        })
        .to_string();
        let merge_response = serde_json::json!({
            "recommendations": [
                {"new_question_text": "how much will rates rise?", "action": "merge_existing_into_new", "target_question_id": old_question.question_id.to_string(), "confidence": 0.9, "rationale": "subset"}
            ]
        })
        .to_string();
        let assignment_response = serde_json::json!({"mappings": []}).to_string();

        let provider = ScriptedProvider {
            responses: vec![discovery_response, merge_response, assignment_response],
            calls: AtomicUsize::new(0),
        };
        let schema_registry = SchemaRegistry::new().unwrap();
        // auto_approve left false: merging must still happen.
        let config = QuestionMapperConfig::default();

        let outcome = map_questions(&store, &claims, &provider, &schema_registry, &config).await.unwrap();

        assert_eq!(outcome.questions_merged, 1);
        let refreshed_old = store.get_question(old_question.question_id).unwrap().unwrap();
        assert!(refreshed_old.deprecated_into.is_some());
        let mappings = store.list_mappings_for_question(old_question.question_id).unwrap();
        assert!(mappings.is_empty(), "old question's mappings should have been rewritten to the new question");
    }
}
