use std::collections::HashMap;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use serde_json::json;

use crate::traits::BatchProvider;
use crate::types::{BatchJob, BatchRequest, BatchResult, BatchStatus};

/// Batch adapter for an OpenAI-Batch-API-shaped hosted endpoint. Generalizes
/// the teacher's hosted-chat bearer-auth pattern (`HostedChatProvider`) to
/// the batch surface: `create_batch`/`get_status`/`get_results`/`cancel`.
#[derive(Debug)]
pub struct HostedBatchProvider {
    name: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl HostedBatchProvider {
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("building hosted batch http client")?;
        Ok(Self {
            name: name.into(),
            base_url: base_url.into(),
            api_key: api_key.into(),
            client,
        })
    }

    fn normalize_status(raw: &str) -> BatchStatus {
        match raw {
            "validating" => BatchStatus::Validating,
            "in_progress" => BatchStatus::InProgress,
            "finalizing" => BatchStatus::Finalizing,
            "completed" => BatchStatus::Completed,
            "failed" => BatchStatus::Failed,
            "expired" => BatchStatus::Expired,
            "cancelled" | "cancelling" => BatchStatus::Cancelled,
            _ => BatchStatus::Pending,
        }
    }
}

#[async_trait]
impl BatchProvider for HostedBatchProvider {
    async fn create_batch(
        &self,
        requests: Vec<BatchRequest>,
        metadata: HashMap<String, String>,
    ) -> Result<BatchJob> {
        let body = json!({
            "requests": requests,
            "metadata": metadata,
        });

        let response = self
            .client
            .post(format!("{}/batches", self.base_url.trim_end_matches('/')))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("{} create_batch failed", self.name))?;

        let status = response.status();
        let payload: serde_json::Value = response.json().await?;
        if !status.is_success() {
            bail!("{} create_batch error ({status}): {payload}", self.name);
        }

        let batch_id = payload
            .get("id")
            .and_then(|v| v.as_str())
            .context("batch response missing id")?
            .to_string();
        let raw_status = payload.get("status").and_then(|v| v.as_str()).unwrap_or("validating");

        Ok(BatchJob {
            batch_id,
            status: Self::normalize_status(raw_status),
            metadata,
        })
    }

    async fn get_status(&self, batch_id: &str) -> Result<BatchJob> {
        let response = self
            .client
            .get(format!("{}/batches/{batch_id}", self.base_url.trim_end_matches('/')))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .with_context(|| format!("{} get_status failed for {batch_id}", self.name))?;

        let status = response.status();
        let payload: serde_json::Value = response.json().await?;
        if !status.is_success() {
            bail!("{} get_status error ({status}): {payload}", self.name);
        }

        let raw_status = payload.get("status").and_then(|v| v.as_str()).unwrap_or("pending");
        Ok(BatchJob {
            batch_id: batch_id.to_string(),
            status: Self::normalize_status(raw_status),
            metadata: HashMap::new(),
        })
    }

    async fn get_results(&self, batch_id: &str) -> Result<Vec<BatchResult>> {
        let response = self
            .client
            .get(format!(
                "{}/batches/{batch_id}/results",
                self.base_url.trim_end_matches('/')
            ))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .with_context(|| format!("{} get_results failed for {batch_id}", self.name))?;

        let status = response.status();
        let payload: serde_json::Value = response.json().await?;
        if !status.is_success() {
            bail!("{} get_results error ({status}): {payload}", self.name);
        }

        let items = payload
            .get("results")
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default();

        let mut results = Vec::with_capacity(items.len());
        for item in items {
            let custom_id = item
                .get("custom_id")
                .and_then(|v| v.as_str())
                .context("batch result missing custom_id")?
                .to_string();
            let text = item
                .get("response")
                .and_then(|r| r.get("body"))
                .and_then(|b| b.get("choices"))
                .and_then(|c| c.get(0))
                .and_then(|c| c.get("message"))
                .and_then(|m| m.get("content"))
                .and_then(|v| v.as_str())
                .map(str::to_string);
            let error = item
                .get("error")
                .and_then(|e| e.get("message"))
                .and_then(|v| v.as_str())
                .map(str::to_string);
            let usage = item.get("response").and_then(|r| r.get("body")).and_then(|b| b.get("usage"));
            let tokens_input = usage.and_then(|u| u.get("prompt_tokens")).and_then(|v| v.as_u64()).map(|v| v as u32);
            let tokens_output = usage
                .and_then(|u| u.get("completion_tokens"))
                .and_then(|v| v.as_u64())
                .map(|v| v as u32);
            let tokens_cached = usage
                .and_then(|u| u.get("prompt_tokens_details"))
                .and_then(|d| d.get("cached_tokens"))
                .and_then(|v| v.as_u64())
                .map(|v| v as u32);

            results.push(BatchResult {
                custom_id,
                text,
                error,
                tokens_input,
                tokens_output,
                tokens_cached,
            });
        }
        Ok(results)
    }

    async fn cancel(&self, batch_id: &str) -> Result<()> {
        let response = self
            .client
            .post(format!(
                "{}/batches/{batch_id}/cancel",
                self.base_url.trim_end_matches('/')
            ))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .with_context(|| format!("{} cancel failed for {batch_id}", self.name))?;

        if !response.status().is_success() {
            bail!("{} cancel error ({})", self.name, response.status());
        }
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}
