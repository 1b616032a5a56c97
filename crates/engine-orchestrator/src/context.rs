use std::sync::Arc;

use engine_provider::ProviderRegistry;
use engine_schema::SchemaRegistry;
use engine_store::Store;
use engine_taste::FeedbackStore;

use crate::config::EngineConfig;

/// Global state bundle (spec §9 "global state → `EngineContext`" redesign
/// point): constructed once by the binary entrypoint and threaded
/// explicitly into every orchestrator call. No component reaches for a
/// module-level static anywhere in this workspace.
pub struct EngineContext {
    pub store: Arc<Store>,
    pub schema_registry: Arc<SchemaRegistry>,
    pub providers: Arc<ProviderRegistry>,
    pub taste_store: Arc<FeedbackStore>,
    pub config: EngineConfig,
}

impl EngineContext {
    pub fn new(
        store: Arc<Store>,
        schema_registry: Arc<SchemaRegistry>,
        providers: Arc<ProviderRegistry>,
        taste_store: Arc<FeedbackStore>,
        config: EngineConfig,
    ) -> Self {
        Self {
            store,
            schema_registry,
            providers,
            taste_store,
            config,
        }
    }
}
