use engine_batch::RemineConfig;
use engine_evaluator::EvaluatorConfig;
use engine_miner::MinerConfig;
use engine_questions::QuestionMapperConfig;
use engine_taste::TasteFilterConfig;

/// Everything a per-episode run needs beyond the shared [`crate::EngineContext`]
/// state — one struct per component, mirroring each crate's own `*Config`
/// (spec §6 "every option named has a corresponding field with the
/// documented default").
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Key into [`engine_provider::ProviderRegistry`] selecting which chat
    /// adapter mine/evaluate/remine calls use.
    pub chat_provider_key: String,
    pub miner: MinerConfig,
    pub evaluator: EvaluatorConfig,
    pub taste_filter: TasteFilterConfig,
    pub remine: RemineConfig,
    pub question_mapper: QuestionMapperConfig,
}

impl EngineConfig {
    pub fn new(chat_provider_key: impl Into<String>) -> Self {
        Self {
            chat_provider_key: chat_provider_key.into(),
            miner: MinerConfig::default(),
            evaluator: EvaluatorConfig::default(),
            taste_filter: TasteFilterConfig::default(),
            remine: RemineConfig::default(),
            question_mapper: QuestionMapperConfig::default(),
        }
    }
}
