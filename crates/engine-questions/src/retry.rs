use std::time::Duration;

use engine_provider::{ChatProvider, ChatRequest};
use tracing::warn;

/// Shared provider-call retry shape for the three mapper stages (exponential
/// backoff, same as `engine-miner`/`engine-evaluator`). Unlike those crates,
/// a persistently-failing call here degrades to "nothing produced" rather
/// than a rejection record — there is no per-item fallback to preserve, only
/// a stage that contributes no new questions/recommendations/mappings this
/// pass (mirrors the original Python pipeline's catch-and-return-empty
/// behavior).
pub(crate) async fn generate_with_retries(
    provider: &dyn ChatProvider,
    prompt: &str,
    max_retries: u32,
    initial_backoff: Duration,
) -> Option<String> {
    let mut backoff = initial_backoff;

    for attempt in 0..=max_retries {
        if attempt > 0 {
            tokio::time::sleep(backoff).await;
            backoff *= 2;
        }

        match provider.generate(ChatRequest::new(prompt.to_string())).await {
            Ok(response) => return Some(response.text),
            Err(err) => {
                warn!(attempt, error = %err, "question mapper provider call failed");
            }
        }
    }
    None
}
