use std::time::Duration;

use engine_core::{MinerOutput, Segment, SourceId};
use engine_provider::{ChatProvider, ChatRequest};
use engine_schema::SchemaRegistry;
use tracing::{debug, warn};

use crate::dedup::{dedup_claims, dedup_jargon, dedup_mental_models, dedup_people};
use crate::few_shot::FewShotSource;
use crate::prompt::{PromptInputs, build_miner_prompt};

#[derive(Debug, Clone)]
pub struct MinerConfig {
    pub max_provider_retries: u32,
    pub initial_backoff: Duration,
    pub few_shot_k: usize,
}

impl Default for MinerConfig {
    fn default() -> Self {
        Self {
            max_provider_retries: 3,
            initial_backoff: Duration::from_millis(500),
            few_shot_k: 3,
        }
    }
}

/// Everything the caller needs to persist an LLM audit record alongside the
/// extraction result (spec §3 `LLMRequest`/`LLMResponse`).
pub struct MineOutcome {
    pub output: MinerOutput,
    pub prompt: String,
    pub raw_response: Option<String>,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub cached_tokens: u32,
}

/// Build the prompt a Miner call should send for `segment`, including the
/// Taste-Engine-sourced few-shot block. Shared by the interactive path
/// ([`mine_segment`]) and the Batch Orchestrator, which builds prompts ahead
/// of submission without calling a `ChatProvider` directly.
pub fn build_segment_prompt(
    segment: &Segment,
    few_shot_source: &dyn FewShotSource,
    schema_registry: &SchemaRegistry,
    few_shot_k: usize,
) -> String {
    let few_shot = few_shot_source.query_similar(&segment.text, few_shot_k);
    let schema_json = schema_registry
        .raw_schema_text("miner_output")
        .unwrap_or_default();
    build_miner_prompt(&PromptInputs {
        segment,
        few_shot: &few_shot,
        schema_json: &schema_json,
    })
}

/// Turn one raw LLM response into a `MinerOutput`, applying the schema
/// repair pass, the context-quote requirement, and the four dedup passes
/// (spec §4.3). Shared by the interactive retry loop and batch-result
/// ingestion so both paths apply identical policy.
pub fn ingest_miner_response(
    segment_id: &engine_core::SegmentId,
    raw_text: &str,
    schema_registry: &SchemaRegistry,
) -> Result<MinerOutput, String> {
    let parsed: serde_json::Value =
        serde_json::from_str(raw_text).map_err(|err| format!("non-JSON miner response: {err}"))?;

    let (repaired, is_valid, errors) = schema_registry
        .repair_and_validate(parsed, "miner_output")
        .map_err(|err| err.to_string())?;

    if !is_valid {
        return Err(format!("schema invalid after repair: {errors:?}"));
    }

    let mut output: MinerOutput = serde_json::from_value(repaired)
        .map_err(|err| format!("repaired document did not map to MinerOutput: {err}"))?;

    output.segment_id = segment_id.clone();
    output.claims.retain(|c| !c.context_quote.trim().is_empty());
    output.jargon.retain(|j| !j.context_quote.trim().is_empty());
    output.people.retain(|p| !p.context_quote.trim().is_empty());
    output
        .mental_models
        .retain(|m| !m.context_quote.trim().is_empty());

    output.claims = dedup_claims(output.claims);
    output.jargon = dedup_jargon(output.jargon);
    output.people = dedup_people(output.people);
    output.mental_models = dedup_mental_models(output.mental_models);
    output.produced_at = Some(chrono::Utc::now());

    Ok(output)
}

/// Mine a single segment into a `MinerOutput` (spec §4.3).
///
/// Provider errors retry with exponential backoff up to
/// `config.max_provider_retries`. A still-invalid document after one schema
/// repair attempt — or a provider call that never succeeds — produces
/// `MinerOutput::empty_with_error` rather than propagating: the caller's run
/// does not fail outright, and re-mining can retry the segment later.
pub async fn mine_segment(
    source_id: &SourceId,
    segment: &Segment,
    provider: &dyn ChatProvider,
    schema_registry: &SchemaRegistry,
    few_shot_source: &dyn FewShotSource,
    config: &MinerConfig,
) -> MineOutcome {
    let prompt = build_segment_prompt(segment, few_shot_source, schema_registry, config.few_shot_k);

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
                warn!(source_id = %source_id, segment_id = %segment.segment_id, attempt, error = %err, "miner provider call failed");
                last_error = Some(err.to_string());
                continue;
            }
        };

        match ingest_miner_response(&segment.segment_id, &response.text, schema_registry) {
            Ok(output) => {
                debug!(source_id = %source_id, segment_id = %segment.segment_id, claims = output.claims.len(), "segment mined");
                return MineOutcome {
                    output,
                    prompt,
                    raw_response: Some(response.text),
                    prompt_tokens: response.prompt_tokens,
                    completion_tokens: response.completion_tokens,
                    cached_tokens: response.cached_tokens,
                };
            }
            Err(reason) if reason.starts_with("schema invalid after repair") => {
                return MineOutcome {
                    output: MinerOutput::empty_with_error(segment.segment_id.clone(), reason),
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

    MineOutcome {
        output: MinerOutput::empty_with_error(
            segment.segment_id.clone(),
            last_error.unwrap_or_else(|| "miner exhausted retries".to_string()),
        ),
        prompt,
        raw_response: None,
        prompt_tokens: 0,
        completion_tokens: 0,
        cached_tokens: 0,
    }
}
