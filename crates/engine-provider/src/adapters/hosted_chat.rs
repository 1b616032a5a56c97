use std::time::Duration;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use serde_json::json;
use tracing::warn;

use crate::traits::ChatProvider;
use crate::types::{ChatRequest, ChatResponse};

/// Chat adapter for any OpenAI-Chat-Completions-shaped hosted endpoint
/// (OpenAI, Anthropic-via-compat-shim, OpenRouter). Generalizes the
/// teacher's `OpenRouterClient`: same bearer-auth + JSON body shape, with
/// the endpoint and default model made configurable instead of hardcoded.
#[derive(Debug)]
pub struct HostedChatProvider {
    name: String,
    base_url: String,
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl HostedChatProvider {
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .context("building hosted chat http client")?;
        Ok(Self {
            name: name.into(),
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
            client,
        })
    }
}

#[async_trait]
impl ChatProvider for HostedChatProvider {
    async fn generate(&self, request: ChatRequest) -> Result<ChatResponse> {
        let mut payload = json!({
            "model": self.model,
            "messages": [{"role": "user", "content": request.prompt}],
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
        });
        if request.json_mode {
            payload["response_format"] = json!({"type": "json_object"});
        }

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url.trim_end_matches('/')))
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .with_context(|| format!("{} request failed", self.name))?;

        let status = response.status();
        let body: serde_json::Value = response.json().await?;
        if !status.is_success() {
            warn!(provider = %self.name, %status, "hosted chat call failed");
            bail!("{} error ({status}): {body}", self.name);
        }

        let text = body
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .with_context(|| format!("{} response missing choices[0].message.content", self.name))?
            .to_string();

        let usage = body.get("usage");
        let prompt_tokens = usage
            .and_then(|u| u.get("prompt_tokens"))
            .and_then(|v| v.as_u64())
            .unwrap_or(0) as u32;
        let completion_tokens = usage
            .and_then(|u| u.get("completion_tokens"))
            .and_then(|v| v.as_u64())
            .unwrap_or(0) as u32;
        let cached_tokens = usage
            .and_then(|u| u.get("prompt_tokens_details"))
            .and_then(|d| d.get("cached_tokens"))
            .and_then(|v| v.as_u64())
            .unwrap_or(0) as u32;

        Ok(ChatResponse {
            text,
            prompt_tokens,
            completion_tokens,
            cached_tokens,
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}
