use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use engine_batch::RemineConfig;
use engine_questions::QuestionMapperConfig;
use engine_taste::TasteFilterConfig;
use serde::{Deserialize, Serialize};

/// On-disk configuration, one enumerated struct per component (spec §6
/// "every recognized option"). Mirrors the teacher's `AppConfig`: nested
/// sections, `#[serde(default)]` throughout so a partial or absent file still
/// loads, TOML on disk.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct EngineToml {
    pub store: StoreSection,
    pub provider: ProviderSection,
    pub batch: BatchSection,
    pub remine: RemineSection,
    pub taste_filter: TasteFilterSection,
    pub feedback_worker: FeedbackWorkerSection,
    pub question_mapper: QuestionMapperSection,
    pub taste_engine: TasteEngineSection,
    pub telemetry: TelemetrySection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSection {
    /// Path to the redb relational store file.
    pub path: String,
}

impl Default for StoreSection {
    fn default() -> Self {
        Self { path: "engine.redb".to_string() }
    }
}

/// Which chat/batch adapter (engine-provider) and model ids back each stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSection {
    /// `"hosted"` (OpenAI-Chat-Completions-shaped) or `"local"` (Ollama-
    /// compatible `/api/generate`).
    pub batch_provider: String,
    pub batch_mining_model: String,
    pub batch_flagship_model: String,
    pub batch_remine_provider: String,
    pub batch_remine_model: String,
    /// Base URL for the hosted adapter; ignored by the local adapter.
    pub hosted_base_url: String,
    /// Read from `<PROVIDER>_API_KEY` env var if empty; see [`EngineToml::load_from`].
    pub hosted_api_key: String,
    /// Base URL for the local adapter; ignored by the hosted adapter.
    pub local_base_url: String,
    pub max_requests_per_batch: usize,
}

impl Default for ProviderSection {
    fn default() -> Self {
        Self {
            batch_provider: "local".to_string(),
            batch_mining_model: "llama3.1:8b".to_string(),
            batch_flagship_model: "llama3.1:8b".to_string(),
            batch_remine_provider: "local".to_string(),
            batch_remine_model: "llama3.1:8b".to_string(),
            hosted_base_url: "https://openrouter.ai/api/v1".to_string(),
            hosted_api_key: String::new(),
            local_base_url: "http://localhost:11434".to_string(),
            max_requests_per_batch: 50_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchSection {
    pub enable_cache_optimization: bool,
    pub sequential_batch_submission: bool,
    pub batch_delay_seconds: u64,
    pub poll_interval_seconds: u64,
}

impl Default for BatchSection {
    fn default() -> Self {
        Self {
            enable_cache_optimization: true,
            sequential_batch_submission: false,
            batch_delay_seconds: 30,
            poll_interval_seconds: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemineSection {
    pub remine_enabled: bool,
    pub remine_confidence_threshold: u8,
    pub remine_empty_segments: bool,
    pub remine_max_percent: f32,
}

impl Default for RemineSection {
    fn default() -> Self {
        Self {
            remine_enabled: true,
            remine_confidence_threshold: 4,
            remine_empty_segments: true,
            remine_max_percent: 0.15,
        }
    }
}

impl RemineSection {
    pub fn to_remine_config(&self) -> RemineConfig {
        RemineConfig {
            confidence_threshold: self.remine_confidence_threshold,
            max_percent: self.remine_max_percent,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TasteFilterSection {
    pub discard_threshold: f64,
    pub flag_threshold: f64,
    pub boost_threshold: f64,
    pub positive_echo_boost: u8,
}

impl Default for TasteFilterSection {
    fn default() -> Self {
        let d = TasteFilterConfig::default();
        Self {
            discard_threshold: d.discard_threshold,
            flag_threshold: d.flag_threshold,
            boost_threshold: d.boost_threshold,
            positive_echo_boost: d.positive_echo_boost,
        }
    }
}

impl TasteFilterSection {
    pub fn to_taste_filter_config(&self) -> TasteFilterConfig {
        TasteFilterConfig {
            discard_threshold: self.discard_threshold,
            flag_threshold: self.flag_threshold,
            boost_threshold: self.boost_threshold,
            positive_echo_boost: self.positive_echo_boost,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedbackWorkerSection {
    pub poll_interval_seconds: u64,
    pub max_retries: u32,
}

impl Default for FeedbackWorkerSection {
    fn default() -> Self {
        Self { poll_interval_seconds: 5, max_retries: 3 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QuestionMapperSection {
    pub batch_size: usize,
    pub min_discovery_confidence: f64,
    pub min_merge_confidence: f64,
    pub min_relevance: f64,
    pub auto_approve: bool,
}

impl Default for QuestionMapperSection {
    fn default() -> Self {
        Self {
            batch_size: 50,
            min_discovery_confidence: 0.6,
            min_merge_confidence: 0.7,
            min_relevance: 0.5,
            auto_approve: false,
        }
    }
}

impl QuestionMapperSection {
    pub fn to_question_mapper_config(&self) -> QuestionMapperConfig {
        let defaults = QuestionMapperConfig::default();
        QuestionMapperConfig {
            min_discovery_confidence: self.min_discovery_confidence,
            min_merge_confidence: self.min_merge_confidence,
            min_relevance: self.min_relevance,
            discovery_batch_size: self.batch_size,
            assignment_batch_size: self.batch_size,
            auto_approve: self.auto_approve,
            ..defaults
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TasteEngineSection {
    pub backup_count: usize,
    pub embedding_model: String,
    /// Path to the Taste Engine's own redb file, kept separate from the
    /// relational store per spec §6 "the vector store lives in a separate
    /// process-owned directory".
    pub path: String,
}

impl Default for TasteEngineSection {
    fn default() -> Self {
        Self {
            backup_count: 5,
            embedding_model: "hashing".to_string(),
            path: "taste.redb".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetrySection {
    pub log_level: String,
}

impl Default for TelemetrySection {
    fn default() -> Self {
        Self { log_level: "info".to_string() }
    }
}

impl EngineToml {
    /// Loads `path` if present, otherwise falls back to all defaults — a
    /// missing config file is not an error (teacher's `AppConfig::load_from`
    /// behavior), only an unparsable one is.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let mut config = Self::default();
        if let Ok(raw) = fs::read_to_string(path.as_ref()) {
            config = toml::from_str(&raw)
                .with_context(|| format!("parsing {}", path.as_ref().display()))?;
        }

        if config.provider.hosted_api_key.is_empty() {
            if let Ok(key) = std::env::var("ENGINE_PROVIDER_API_KEY") {
                config.provider.hosted_api_key = key;
            }
        }

        Ok(config)
    }

    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }
}
