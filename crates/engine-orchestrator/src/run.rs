use std::collections::HashMap;

use engine_batch::{index_episode_claims, select_segments_for_remine};
use engine_core::{
    ClaimId, Episode, EvaluatedClaim, JobId, JobType, LlmRequestRecord, LlmResponseRecord,
    MinerOutput, RunId, RunMetrics, SegmentId, SourceId, Tier,
};
use engine_evaluator::{evaluate_episode, rank_accepted};
use engine_miner::mine_segment;
use engine_provider::ChatProvider;
use engine_questions::{ClaimInput, QuestionMapperOutcome, map_questions};
use engine_taste::{FilterStats, TasteFilter};
use tracing::info;

use crate::context::EngineContext;
use crate::few_shot::TasteFewShotSource;
use crate::filter_pass::{BoostMap, filter_miner_output};

/// Outcome of one full `run_episode` pass (spec §4.10), surfaced to the
/// caller for logging or a job-completion notification.
pub struct EpisodeRunOutcome {
    pub mine_job_id: JobId,
    pub evaluate_job_id: JobId,
    pub remine_job_id: Option<JobId>,
    pub map_questions_job_id: Option<JobId>,
    pub evaluated_claims: Vec<EvaluatedClaim>,
    pub filter_stats: FilterStats,
    pub question_mapper_outcome: Option<QuestionMapperOutcome>,
}

/// Run the complete per-episode pipeline: Mine -> Taste-Filter -> Evaluate
/// -> (optional) Re-mine -> Persist -> (optional) Map Questions (spec
/// §4.10). Each stage's `Job`/`JobRun` is checkpointed immediately before
/// that run completes, so a crash recovers at the next unfinished stage
/// rather than re-running completed work — there is no separate
/// orchestrator-level `Job`, since `JobType` has no "run episode" variant;
/// resumption means inspecting each stage's own `Job` before re-entering
/// this function (see `DESIGN.md`).
pub async fn run_episode(
    ctx: &EngineContext,
    episode: &Episode,
    auto_process: bool,
) -> anyhow::Result<EpisodeRunOutcome> {
    let chat = ctx.providers.chat(&ctx.config.chat_provider_key)?;
    let few_shot_source = TasteFewShotSource::new(ctx.taste_store.clone());

    let (mine_job_id, mut outputs, filter_stats, mut boosts) =
        mine_and_filter(ctx, episode, chat, &few_shot_source, auto_process).await?;

    let (mut evaluate_job_id, mut claims, segment_of) =
        evaluate(ctx, episode, &outputs, &boosts, chat, auto_process).await?;

    let remine_job_id = remine_if_needed(
        ctx,
        episode,
        &outputs,
        &claims,
        &segment_of,
        chat,
        &few_shot_source,
        &ctx.taste_store,
        &mut boosts,
    )
    .await?;
    if remine_job_id.is_some() {
        outputs = ctx.store.list_miner_outputs(&episode.source_id)?;
        let (job_id, reevaluated, _) = evaluate(ctx, episode, &outputs, &boosts, chat, false).await?;
        evaluate_job_id = job_id;
        claims = reevaluated;
    }

    persist_final_state(ctx, &episode.source_id, &outputs, &claims)?;

    let (map_questions_job_id, question_mapper_outcome) = if auto_process {
        let (job_id, outcome) = run_question_mapper(ctx, &episode.source_id, &claims).await?;
        (Some(job_id), Some(outcome))
    } else {
        (None, None)
    };

    Ok(EpisodeRunOutcome {
        mine_job_id,
        evaluate_job_id,
        remine_job_id,
        map_questions_job_id,
        evaluated_claims: claims,
        filter_stats,
        question_mapper_outcome,
    })
}

async fn mine_and_filter(
    ctx: &EngineContext,
    episode: &Episode,
    chat: &dyn ChatProvider,
    few_shot_source: &TasteFewShotSource,
    auto_process: bool,
) -> anyhow::Result<(JobId, Vec<MinerOutput>, FilterStats, BoostMap)> {
    let job = ctx.store.create_job(
        JobType::Mine,
        episode.source_id.to_string(),
        serde_json::json!({"segment_count": episode.segments.len()}),
        auto_process,
    )?;
    let run = ctx.store.start_run(job.job_id)?;

    let mut outputs = Vec::with_capacity(episode.segments.len());
    let mut metrics = RunMetrics::default();
    let mut filter_stats = FilterStats::default();
    let mut boosts = BoostMap::new();
    let taste_filter = TasteFilter::new(ctx.config.taste_filter.clone());

    for segment in &episode.segments {
        let started_at = std::time::Instant::now();
        let outcome = mine_segment(
            &episode.source_id,
            segment,
            chat,
            &ctx.schema_registry,
            few_shot_source,
            &ctx.config.miner,
        )
        .await;
        let latency_ms = started_at.elapsed().as_millis() as u64;

        record_llm_call(
            ctx,
            run.run_id,
            chat.name(),
            &outcome.prompt,
            outcome.raw_response.as_deref(),
            None,
            outcome.prompt_tokens,
            outcome.completion_tokens,
            outcome.cached_tokens,
            latency_ms,
        )?;
        metrics.prompt_tokens += outcome.prompt_tokens as u64;
        metrics.completion_tokens += outcome.completion_tokens as u64;
        metrics.cached_tokens += outcome.cached_tokens as u64;

        let mut output = outcome.output;
        filter_miner_output(&mut output, &ctx.taste_store, &taste_filter, &mut filter_stats, &mut boosts)?;
        outputs.push(output);
    }

    ctx.store.checkpoint(run.run_id, serde_json::json!({"stage": "mined", "segments_mined": outputs.len()}))?;
    ctx.store.complete_run(run.run_id, metrics)?;
    info!(source_id = %episode.source_id, segments = outputs.len(), "mine stage complete");

    Ok((job.job_id, outputs, filter_stats, boosts))
}

/// Evaluate every mined candidate in one flagship call and apply any
/// pending Taste Filter boosts. Returns the `ClaimId -> SegmentId` mapping
/// alongside the claims themselves, since re-mine selection needs the same
/// mapping `evaluate_episode`'s candidates were built from — rebuilding a
/// fresh one would mint different `ClaimId`s that wouldn't match.
async fn evaluate(
    ctx: &EngineContext,
    episode: &Episode,
    outputs: &[MinerOutput],
    boosts: &BoostMap,
    chat: &dyn ChatProvider,
    auto_process: bool,
) -> anyhow::Result<(JobId, Vec<EvaluatedClaim>, HashMap<ClaimId, SegmentId>)> {
    let index = index_episode_claims(outputs);
    let content_summary = format!("episode {} ({} segments)", episode.title, episode.segments.len());

    let job = ctx.store.create_job(
        JobType::Evaluate,
        episode.source_id.to_string(),
        serde_json::json!({"candidate_count": index.candidates.len()}),
        auto_process,
    )?;
    let run = ctx.store.start_run(job.job_id)?;

    let started_at = std::time::Instant::now();
    let outcome = evaluate_episode(&content_summary, &index.candidates, chat, &ctx.schema_registry, &ctx.config.evaluator).await;
    let latency_ms = started_at.elapsed().as_millis() as u64;
    record_llm_call(
        ctx,
        run.run_id,
        chat.name(),
        &outcome.prompt,
        outcome.raw_response.as_deref(),
        None,
        outcome.prompt_tokens,
        outcome.completion_tokens,
        outcome.cached_tokens,
        latency_ms,
    )?;

    let mut claims = outcome.claims;
    apply_boosts(boosts, &index.segment_of, &mut claims);

    let metrics = RunMetrics {
        prompt_tokens: outcome.prompt_tokens as u64,
        completion_tokens: outcome.completion_tokens as u64,
        cached_tokens: outcome.cached_tokens as u64,
        ..Default::default()
    };
    ctx.store.checkpoint(run.run_id, serde_json::json!({"stage": "evaluated", "claims": claims.len()}))?;
    ctx.store.complete_run(run.run_id, metrics)?;
    info!(source_id = %episode.source_id, accepted = outcome.summary.claims_accepted, "evaluate stage complete");

    Ok((job.job_id, claims, index.segment_of))
}

/// Apply the boosts the Taste Filter recommended at mine time, now that
/// every claim has an `EvaluatedClaim.importance` to adjust (spec §4.6,
/// §9's single-boost-point redesign). Re-ranks afterward since importance
/// may have changed the tie-break order.
fn apply_boosts(boosts: &BoostMap, segment_of: &HashMap<ClaimId, SegmentId>, claims: &mut [EvaluatedClaim]) {
    if boosts.is_empty() {
        return;
    }

    let mut boosted_any = false;
    for claim in claims.iter_mut() {
        if claim.decision != engine_core::Decision::Accept {
            continue;
        }
        let Some(segment_id) = segment_of.get(&claim.claim_id) else {
            continue;
        };
        let Some(&delta) = boosts.get(&(segment_id.clone(), claim.canonical.clone())) else {
            continue;
        };
        let (new_importance, pre_boost) = engine_taste::apply_boost(claim.importance, delta);
        claim.pre_boost_importance = Some(pre_boost);
        claim.importance = new_importance;
        claim.tier = Tier::from_importance(new_importance);
        boosted_any = true;
    }

    if boosted_any {
        rank_accepted(claims);
    }
}

/// Re-mine the segments [`engine_batch::select_segments_for_remine`] flags
/// as low-confidence or empty (spec §4.5 Stage 3). Remined output passes
/// back through the Taste Filter exactly like the first pass; since a
/// remined segment's claim text is fresh, any boost entries the first pass
/// recorded for that segment are stale and are dropped before the new ones
/// are inserted.
#[allow(clippy::too_many_arguments)]
async fn remine_if_needed(
    ctx: &EngineContext,
    episode: &Episode,
    outputs: &[MinerOutput],
    claims: &[EvaluatedClaim],
    segment_of: &HashMap<ClaimId, SegmentId>,
    chat: &dyn ChatProvider,
    few_shot_source: &TasteFewShotSource,
    taste_store: &engine_taste::FeedbackStore,
    boosts: &mut BoostMap,
) -> anyhow::Result<Option<JobId>> {
    let selected = select_segments_for_remine(outputs, claims, segment_of, &ctx.config.remine);
    if selected.is_empty() {
        return Ok(None);
    }

    let job = ctx.store.create_job(
        JobType::Remine,
        episode.source_id.to_string(),
        serde_json::json!({"segments": selected.iter().map(|s| s.to_string()).collect::<Vec<_>>()}),
        false,
    )?;
    let run = ctx.store.start_run(job.job_id)?;

    let taste_filter = TasteFilter::new(ctx.config.taste_filter.clone());
    let mut stats = FilterStats::default();
    let mut metrics = RunMetrics::default();
    for segment_id in &selected {
        let Some(segment) = episode.segments.iter().find(|s| &s.segment_id == segment_id) else {
            continue;
        };
        boosts.retain(|(sid, _), _| sid != segment_id);

        let started_at = std::time::Instant::now();
        let outcome = mine_segment(&episode.source_id, segment, chat, &ctx.schema_registry, few_shot_source, &ctx.config.miner).await;
        let latency_ms = started_at.elapsed().as_millis() as u64;
        record_llm_call(
            ctx,
            run.run_id,
            chat.name(),
            &outcome.prompt,
            outcome.raw_response.as_deref(),
            None,
            outcome.prompt_tokens,
            outcome.completion_tokens,
            outcome.cached_tokens,
            latency_ms,
        )?;
        metrics.prompt_tokens += outcome.prompt_tokens as u64;
        metrics.completion_tokens += outcome.completion_tokens as u64;
        metrics.cached_tokens += outcome.cached_tokens as u64;

        let mut output = outcome.output;
        filter_miner_output(&mut output, taste_store, &taste_filter, &mut stats, boosts)?;
        ctx.store.put_miner_output(&episode.source_id, output)?;
    }

    ctx.store.checkpoint(run.run_id, serde_json::json!({"stage": "remined", "segments_remined": selected.len()}))?;
    ctx.store.complete_run(run.run_id, metrics)?;
    info!(source_id = %episode.source_id, segments = selected.len(), "remine stage complete");

    Ok(Some(job.job_id))
}

fn persist_final_state(
    ctx: &EngineContext,
    source_id: &SourceId,
    outputs: &[MinerOutput],
    claims: &[EvaluatedClaim],
) -> anyhow::Result<()> {
    for output in outputs {
        ctx.store.put_miner_output(source_id, output.clone())?;
    }
    ctx.store.put_evaluated_claims(source_id, claims.to_vec())?;
    Ok(())
}

async fn run_question_mapper(
    ctx: &EngineContext,
    source_id: &SourceId,
    claims: &[EvaluatedClaim],
) -> anyhow::Result<(JobId, QuestionMapperOutcome)> {
    let chat = ctx.providers.chat(&ctx.config.chat_provider_key)?;

    let job = ctx.store.create_job(
        JobType::MapQuestions,
        source_id.to_string(),
        serde_json::json!({"claim_count": claims.len()}),
        false,
    )?;
    let run = ctx.store.start_run(job.job_id)?;

    let inputs: Vec<ClaimInput> = claims
        .iter()
        .filter(|c| c.decision == engine_core::Decision::Accept)
        .map(|c| ClaimInput { claim_id: c.claim_id, claim_text: c.canonical.clone() })
        .collect();

    let outcome = map_questions(&ctx.store, &inputs, chat, &ctx.schema_registry, &ctx.config.question_mapper).await?;

    ctx.store.checkpoint(
        run.run_id,
        serde_json::json!({
            "stage": "questions_mapped",
            "questions_created": outcome.questions_created,
            "mappings_persisted": outcome.mappings_persisted,
        }),
    )?;
    ctx.store.complete_run(run.run_id, RunMetrics::default())?;
    info!(%source_id, created = outcome.questions_created, mapped = outcome.mappings_persisted, "question-mapper stage complete");

    Ok((job.job_id, outcome))
}

#[allow(clippy::too_many_arguments)]
fn record_llm_call(
    ctx: &EngineContext,
    run_id: RunId,
    provider_name: &str,
    prompt: &str,
    raw_response: Option<&str>,
    custom_id: Option<String>,
    prompt_tokens: u32,
    completion_tokens: u32,
    cached_tokens: u32,
    latency_ms: u64,
) -> anyhow::Result<()> {
    let request_id = engine_core::LlmRequestId::new();
    let request = LlmRequestRecord {
        request_id,
        run_id,
        provider: provider_name.to_string(),
        model: ctx.config.chat_provider_key.clone(),
        prompt: prompt.to_string(),
        custom_id,
        sent_at: chrono::Utc::now(),
    };
    let response = LlmResponseRecord {
        request_id,
        raw_text: raw_response.unwrap_or_default().to_string(),
        latency_ms,
        prompt_tokens: prompt_tokens as u64,
        completion_tokens: completion_tokens as u64,
        cached_tokens: cached_tokens as u64,
        received_at: chrono::Utc::now(),
    };
    ctx.store.record_llm_call(request, response)
}
