use std::time::Duration;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use serde_json::json;

use crate::traits::ChatProvider;
use crate::types::{ChatRequest, ChatResponse};

/// Chat adapter for a local HTTP backend (e.g. an Ollama-compatible
/// `/api/generate` endpoint). Generalizes the teacher's `OllamaClient`: base
/// URL and model are configured rather than read from an env var and a
/// hardcoded literal.
#[derive(Debug)]
pub struct LocalHttpChatProvider {
    base_url: String,
    model: String,
    client: reqwest::Client,
}

impl LocalHttpChatProvider {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .context("building local chat http client")?;
        Ok(Self {
            base_url: base_url.into(),
            model: model.into(),
            client,
        })
    }
}

#[async_trait]
impl ChatProvider for LocalHttpChatProvider {
    async fn generate(&self, request: ChatRequest) -> Result<ChatResponse> {
        let payload = json!({
            "model": self.model,
            "prompt": request.prompt,
            "stream": false,
            "options": {"temperature": request.temperature, "num_predict": request.max_tokens},
            "format": if request.json_mode { "json" } else { "" },
        });

        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url.trim_end_matches('/')))
            .json(&payload)
            .send()
            .await
            .with_context(|| format!("local provider unreachable at {}", self.base_url))?;

        let status = response.status();
        let body: serde_json::Value = response.json().await?;
        if !status.is_success() {
            bail!("local provider error ({status}): {body}");
        }

        let text = body
            .get("response")
            .and_then(|v| v.as_str())
            .context("local provider response missing 'response' field")?
            .to_string();

        let prompt_tokens = body
            .get("prompt_eval_count")
            .and_then(|v| v.as_u64())
            .unwrap_or(0) as u32;
        let completion_tokens = body.get("eval_count").and_then(|v| v.as_u64()).unwrap_or(0) as u32;

        Ok(ChatResponse {
            text,
            prompt_tokens,
            completion_tokens,
            // Local backends rarely report cache hits; caching is a hosted-
            // provider-only cost signal per spec §9.
            cached_tokens: 0,
        })
    }

    fn name(&self) -> &str {
        "local-http"
    }
}
