use std::collections::HashMap;

use anyhow::{Context, Result};

use crate::traits::{BatchProvider, ChatProvider};

/// Holds every configured adapter keyed by the config string the caller
/// picked (spec §4.9 "a registry of concrete adapters selected by config
/// string", replacing the source's provider class hierarchy). The caller
/// never branches on provider identity past this lookup.
#[derive(Default)]
pub struct ProviderRegistry {
    chat: HashMap<String, Box<dyn ChatProvider>>,
    batch: HashMap<String, Box<dyn BatchProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_chat(&mut self, key: impl Into<String>, provider: Box<dyn ChatProvider>) {
        self.chat.insert(key.into(), provider);
    }

    pub fn register_batch(&mut self, key: impl Into<String>, provider: Box<dyn BatchProvider>) {
        self.batch.insert(key.into(), provider);
    }

    pub fn chat(&self, key: &str) -> Result<&dyn ChatProvider> {
        self.chat
            .get(key)
            .map(|b| b.as_ref())
            .with_context(|| format!("no chat provider registered for '{key}'"))
    }

    pub fn batch(&self, key: &str) -> Result<&dyn BatchProvider> {
        self.batch
            .get(key)
            .map(|b| b.as_ref())
            .with_context(|| format!("no batch provider registered for '{key}'"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ChatRequest, ChatResponse};
    use async_trait::async_trait;

    struct Stub;

    #[async_trait]
    impl ChatProvider for Stub {
        async fn generate(&self, request: ChatRequest) -> Result<ChatResponse> {
            Ok(ChatResponse {
                text: request.prompt,
                prompt_tokens: 1,
                completion_tokens: 1,
                cached_tokens: 0,
            })
        }
        fn name(&self) -> &str {
            "stub"
        }
    }

    #[test]
    fn unregistered_key_is_a_clear_error() {
        let registry = ProviderRegistry::new();
        assert!(registry.chat("missing").is_err());
    }

    #[tokio::test]
    async fn registered_provider_is_retrievable() {
        let mut registry = ProviderRegistry::new();
        registry.register_chat("stub", Box::new(Stub));
        let provider = registry.chat("stub").unwrap();
        let response = provider.generate(ChatRequest::new("hi")).await.unwrap();
        assert_eq!(response.text, "hi");
    }
}
