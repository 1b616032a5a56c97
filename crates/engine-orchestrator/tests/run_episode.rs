use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use engine_core::{Decision, Episode, Segment};
use engine_orchestrator::{EngineConfig, EngineContext, run_episode};
use engine_provider::{ChatProvider, ChatRequest, ChatResponse, ProviderRegistry};
use engine_schema::SchemaRegistry;
use engine_store::Store;
use engine_taste::{FeedbackStore, HashingEmbedder};

/// Returns one canned response per call, in order; the last response
/// repeats once exhausted.
struct ScriptedProvider {
    responses: Vec<String>,
    calls: AtomicUsize,
}

#[async_trait]
impl ChatProvider for ScriptedProvider {
    async fn generate(&self, _request: ChatRequest) -> anyhow::Result<ChatResponse> {
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

fn sample_episode() -> Episode {
    Episode {
        source_id: "ep1".into(),
        title: "inflation outlook".into(),
        duration_seconds: 30.0,
        speakers: vec!["host".into()],
        segments: vec![Segment {
            segment_id: "s1".into(),
            speaker: "host".into(),
            t0: 0.0,
            t1: 5.0,
            text: "inflation will ease next year".into(),
        }],
    }
}

fn build_context(responses: Vec<String>) -> (EngineContext, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(Store::open_in_memory().unwrap());
    let schema_registry = Arc::new(SchemaRegistry::new().unwrap());
    let taste_store = Arc::new(
        FeedbackStore::open(dir.path().join("taste.redb"), Arc::new(HashingEmbedder::default()), 5).unwrap(),
    );

    let mut providers = ProviderRegistry::new();
    providers.register_chat(
        "test",
        Box::new(ScriptedProvider { responses, calls: AtomicUsize::new(0) }),
    );

    let ctx = EngineContext::new(store, schema_registry, Arc::new(providers), taste_store, EngineConfig::new("test"));
    (ctx, dir)
}

#[tokio::test]
async fn run_episode_mines_evaluates_and_persists_without_remine() {
    let miner_response = serde_json::json!({
        "segment_id": "s1",
        "claims": [
            {"claim_text": "inflation will ease", "context_quote": "inflation will ease next year", "timestamp": 1.0}
        ],
        "jargon": [],
        "people": [],
        "mental_models": []
    })
    .to_string();

    let evaluator_response = serde_json::json!({
        "evaluated_claims": [
            {"claim_index": 0, "canonical": "inflation will ease", "decision": "accept", "importance": 8, "novelty": 6, "confidence_final": 7, "reasoning": "clear causal claim"}
        ],
        "summary_assessment": {"total_claims_processed": 1, "claims_accepted": 1, "claims_rejected": 0, "key_themes": ["inflation"]}
    })
    .to_string();

    let (ctx, _dir) = build_context(vec![miner_response, evaluator_response]);
    let episode = sample_episode();

    let outcome = run_episode(&ctx, &episode, false).await.unwrap();

    assert!(outcome.remine_job_id.is_none());
    assert!(outcome.map_questions_job_id.is_none());
    assert_eq!(outcome.evaluated_claims.len(), 1);
    assert_eq!(outcome.evaluated_claims[0].decision, Decision::Accept);
    assert_eq!(outcome.evaluated_claims[0].rank, Some(1));

    let persisted = ctx.store.list_evaluated_claims(&episode.source_id).unwrap();
    assert_eq!(persisted.len(), 1);
    assert_eq!(persisted[0].claim.canonical, "inflation will ease");

    let outputs = ctx.store.list_miner_outputs(&episode.source_id).unwrap();
    assert_eq!(outputs.len(), 1);
    assert_eq!(outputs[0].claims.len(), 1);
}

#[tokio::test]
async fn run_episode_remines_low_confidence_segment_and_replaces_its_output() {
    let first_miner_response = serde_json::json!({
        "segment_id": "s1",
        "claims": [
            {"claim_text": "inflation will ease", "context_quote": "inflation will ease next year", "timestamp": 1.0}
        ],
        "jargon": [], "people": [], "mental_models": []
    })
    .to_string();

    let low_confidence_eval = serde_json::json!({
        "evaluated_claims": [
            {"claim_index": 0, "canonical": "inflation will ease", "decision": "accept", "importance": 8, "novelty": 6, "confidence_final": 2, "reasoning": "uncertain"}
        ],
        "summary_assessment": {"total_claims_processed": 1, "claims_accepted": 1, "claims_rejected": 0}
    })
    .to_string();

    let remined_miner_response = serde_json::json!({
        "segment_id": "s1",
        "claims": [
            {"claim_text": "inflation will ease substantially", "context_quote": "inflation will ease next year", "timestamp": 1.0}
        ],
        "jargon": [], "people": [], "mental_models": []
    })
    .to_string();

    let final_eval = serde_json::json!({
        "evaluated_claims": [
            {"claim_index": 0, "canonical": "inflation will ease substantially", "decision": "accept", "importance": 9, "novelty": 7, "confidence_final": 8, "reasoning": "clear"}
        ],
        "summary_assessment": {"total_claims_processed": 1, "claims_accepted": 1, "claims_rejected": 0}
    })
    .to_string();

    let (ctx, _dir) = build_context(vec![
        first_miner_response,
        low_confidence_eval,
        remined_miner_response,
        final_eval,
    ]);
    let episode = sample_episode();

    let outcome = run_episode(&ctx, &episode, false).await.unwrap();

    assert!(outcome.remine_job_id.is_some());
    assert_eq!(outcome.evaluated_claims.len(), 1);
    assert_eq!(outcome.evaluated_claims[0].canonical, "inflation will ease substantially");
    assert_eq!(outcome.evaluated_claims[0].confidence_final, 8);
}
