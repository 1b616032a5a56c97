use std::collections::HashMap;
use std::time::Duration;

use anyhow::Result;
use engine_provider::{BatchJob, BatchProvider, BatchRequest, chunk_requests};
use tracing::info;

#[derive(Debug, Clone)]
pub struct SubmitConfig {
    pub max_per_batch: usize,
    /// Delay between sequential submissions so the provider has time to
    /// populate its prefix cache before the next chunk arrives (spec §4.5
    /// Stage 1 default: 30s).
    pub inter_batch_delay: Duration,
}

impl Default for SubmitConfig {
    fn default() -> Self {
        Self {
            max_per_batch: 50_000,
            inter_batch_delay: Duration::from_secs(30),
        }
    }
}

/// Submit `requests` to `provider` as one or more batches, chunked to
/// `config.max_per_batch` and submitted **sequentially** with
/// `config.inter_batch_delay` between submissions (spec §4.5: "so the
/// provider has time to populate its prefix cache before the next
/// submission arrives"). Requests must already be ordered for caching —
/// this function does not reorder them.
pub async fn submit_sequentially(
    provider: &dyn BatchProvider,
    requests: Vec<BatchRequest>,
    metadata: HashMap<String, String>,
    config: &SubmitConfig,
) -> Result<Vec<BatchJob>> {
    let chunks = chunk_requests(requests, config.max_per_batch);
    let mut jobs = Vec::with_capacity(chunks.len());

    for (index, chunk) in chunks.into_iter().enumerate() {
        if index > 0 {
            tokio::time::sleep(config.inter_batch_delay).await;
        }
        let job = provider.create_batch(chunk, metadata.clone()).await?;
        info!(batch_id = %job.batch_id, chunk = index, "submitted batch");
        jobs.push(job);
    }

    Ok(jobs)
}
