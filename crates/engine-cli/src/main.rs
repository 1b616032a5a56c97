mod config;

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use engine_core::{Decision, Episode, SourceId};
use engine_feedback::{FeedbackWorker, WorkerConfig};
use engine_orchestrator::{EngineConfig, EngineContext, run_episode};
use engine_provider::adapters::{HostedChatProvider, LocalHttpChatProvider};
use engine_provider::ProviderRegistry;
use engine_questions::{ClaimInput, map_questions};
use engine_schema::SchemaRegistry;
use engine_store::Store;
use engine_taste::{FeedbackStore, HashingEmbedder};
use tracing_subscriber::EnvFilter;

use crate::config::EngineToml;

const DEFAULT_CONFIG_PATH: &str = "engine.toml";
const CHAT_PROVIDER_KEY: &str = "primary";
const REMINE_PROVIDER_KEY: &str = "remine";

#[derive(Debug, Parser)]
#[command(name = "engine", version, about = "Knowledge-extraction engine")]
struct Cli {
    /// Path to the TOML config file; absent is not an error, all defaults apply.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run the full mine → filter → evaluate → (remine) → persist → (map-questions)
    /// pipeline over one episode.
    Run {
        /// Path to a JSON file holding one `Episode` (source_id, title,
        /// duration_seconds, speakers, segments).
        #[arg(long)]
        episode: PathBuf,
        /// Also enqueue a Question Mapper pass once claims are persisted.
        #[arg(long)]
        auto_process: bool,
    },
    /// Run the Question Mapper over a source's already-evaluated accepted claims.
    MapQuestions {
        #[arg(long)]
        source_id: String,
    },
    /// Run the Feedback Intake Worker in the foreground (drains forever).
    Feedback {
        #[command(subcommand)]
        command: FeedbackCommands,
    },
    /// Create (or open, idempotently) the relational store and the Taste
    /// Engine's vector store at the configured paths.
    Migrate,
}

#[derive(Debug, Subcommand)]
enum FeedbackCommands {
    Worker,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let toml_config = EngineToml::load_from(&cli.config)?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&toml_config.telemetry.log_level)),
        )
        .init();

    match cli.command {
        Commands::Run { episode, auto_process } => run_command(&toml_config, &episode, auto_process).await,
        Commands::MapQuestions { source_id } => map_questions_command(&toml_config, &source_id).await,
        Commands::Feedback { command: FeedbackCommands::Worker } => feedback_worker_command(&toml_config).await,
        Commands::Migrate => migrate_command(&toml_config),
    }
}

fn build_chat_provider(
    name: &str,
    provider_kind: &str,
    model: &str,
    toml_config: &EngineToml,
) -> Result<Box<dyn engine_provider::ChatProvider>> {
    match provider_kind {
        "hosted" => {
            if toml_config.provider.hosted_api_key.is_empty() {
                bail!(
                    "provider '{name}' is configured as hosted but no API key is set \
                     (config `provider.hosted_api_key` or `ENGINE_PROVIDER_API_KEY`)"
                );
            }
            Ok(Box::new(HostedChatProvider::new(
                name,
                &toml_config.provider.hosted_base_url,
                &toml_config.provider.hosted_api_key,
                model,
            )?))
        }
        "local" => Ok(Box::new(LocalHttpChatProvider::new(&toml_config.provider.local_base_url, model)?)),
        other => bail!("unknown provider kind '{other}' (expected 'hosted' or 'local')"),
    }
}

fn build_context(toml_config: &EngineToml) -> Result<EngineContext> {
    let store = Arc::new(
        Store::open(&toml_config.store.path)
            .with_context(|| format!("opening relational store at {}", toml_config.store.path))?,
    );
    let schema_registry = Arc::new(SchemaRegistry::new()?);

    let embedder: Arc<dyn engine_taste::Embedder> = Arc::new(HashingEmbedder::default());
    let taste_store = Arc::new(
        FeedbackStore::open(&toml_config.taste_engine.path, embedder, toml_config.taste_engine.backup_count)
            .with_context(|| format!("opening taste store at {}", toml_config.taste_engine.path))?,
    );

    let mut providers = ProviderRegistry::new();
    providers.register_chat(
        CHAT_PROVIDER_KEY,
        build_chat_provider(
            CHAT_PROVIDER_KEY,
            &toml_config.provider.batch_provider,
            &toml_config.provider.batch_mining_model,
            toml_config,
        )?,
    );
    providers.register_chat(
        REMINE_PROVIDER_KEY,
        build_chat_provider(
            REMINE_PROVIDER_KEY,
            &toml_config.provider.batch_remine_provider,
            &toml_config.provider.batch_remine_model,
            toml_config,
        )?,
    );

    let mut engine_config = EngineConfig::new(CHAT_PROVIDER_KEY);
    engine_config.taste_filter = toml_config.taste_filter.to_taste_filter_config();
    engine_config.remine = toml_config.remine.to_remine_config();
    engine_config.question_mapper = toml_config.question_mapper.to_question_mapper_config();

    Ok(EngineContext::new(store, schema_registry, Arc::new(providers), taste_store, engine_config))
}

async fn run_command(toml_config: &EngineToml, episode_path: &PathBuf, auto_process: bool) -> Result<()> {
    let ctx = build_context(toml_config)?;
    let raw = fs::read_to_string(episode_path)
        .with_context(|| format!("reading episode file {}", episode_path.display()))?;
    let episode: Episode = serde_json::from_str(&raw)
        .with_context(|| format!("parsing episode JSON in {}", episode_path.display()))?;

    if !episode.segments_are_well_ordered() {
        bail!("episode '{}' has overlapping or out-of-order segments", episode.source_id);
    }

    let outcome = run_episode(&ctx, &episode, auto_process).await?;

    let accepted = outcome.evaluated_claims.iter().filter(|c| c.decision == Decision::Accept).count();
    println!("mine job:          {}", outcome.mine_job_id);
    println!("evaluate job:      {}", outcome.evaluate_job_id);
    match outcome.remine_job_id {
        Some(id) => println!("remine job:        {id}"),
        None => println!("remine job:        (skipped)"),
    }
    match outcome.map_questions_job_id {
        Some(id) => println!("map-questions job: {id}"),
        None => println!("map-questions job: (skipped)"),
    }
    println!("claims evaluated:  {}", outcome.evaluated_claims.len());
    println!("claims accepted:   {accepted}");
    let sum = |counts: &std::collections::HashMap<engine_core::EntityType, u32>| -> u32 {
        counts.values().sum()
    };
    println!(
        "taste filter:      {} discarded, {} flagged, {} boosted",
        sum(&outcome.filter_stats.discarded),
        sum(&outcome.filter_stats.flagged),
        sum(&outcome.filter_stats.boosted)
    );
    if let Some(qm) = &outcome.question_mapper_outcome {
        println!(
            "questions:         {} discovered, {} created, {} merged, {} mappings persisted",
            qm.questions_discovered, qm.questions_created, qm.questions_merged, qm.mappings_persisted
        );
    }

    Ok(())
}

async fn map_questions_command(toml_config: &EngineToml, source_id: &str) -> Result<()> {
    let ctx = build_context(toml_config)?;
    let source_id = SourceId(source_id.to_string());

    let claims: Vec<ClaimInput> = ctx
        .store
        .list_evaluated_claims(&source_id)?
        .into_iter()
        .filter(|row| row.claim.decision == Decision::Accept)
        .map(|row| ClaimInput { claim_id: row.claim.claim_id, claim_text: row.claim.canonical })
        .collect();

    if claims.is_empty() {
        println!("no accepted claims found for source '{source_id}'");
        return Ok(());
    }

    let provider = ctx.providers.chat(&ctx.config.chat_provider_key)?;
    let outcome = map_questions(&ctx.store, &claims, provider, &ctx.schema_registry, &ctx.config.question_mapper).await?;

    println!(
        "questions discovered: {}, created: {}, merged: {}, mappings persisted: {}",
        outcome.questions_discovered, outcome.questions_created, outcome.questions_merged, outcome.mappings_persisted
    );
    Ok(())
}

async fn feedback_worker_command(toml_config: &EngineToml) -> Result<()> {
    let ctx = build_context(toml_config)?;
    let worker_config = WorkerConfig {
        poll_interval: std::time::Duration::from_secs(toml_config.feedback_worker.poll_interval_seconds),
        max_retries: toml_config.feedback_worker.max_retries,
    };
    let worker = FeedbackWorker::new(ctx.store, ctx.taste_store, worker_config);
    tracing::info!("feedback worker starting");
    worker.run().await
}

fn migrate_command(toml_config: &EngineToml) -> Result<()> {
    let store = Store::open(&toml_config.store.path)?;
    drop(store);
    let embedder: Arc<dyn engine_taste::Embedder> = Arc::new(HashingEmbedder::default());
    let taste_store = FeedbackStore::open(&toml_config.taste_engine.path, embedder, toml_config.taste_engine.backup_count)?;
    drop(taste_store);
    println!("store ready at {}", toml_config.store.path);
    println!("taste store ready at {}", toml_config.taste_engine.path);
    Ok(())
}
