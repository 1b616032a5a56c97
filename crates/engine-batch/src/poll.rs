use std::sync::Arc;
use std::time::Duration;

use engine_provider::{BatchProvider, BatchStatus};
use tokio::sync::mpsc;
use tracing::warn;

use crate::progress::{ProgressCallback, report};

#[derive(Debug, Clone)]
pub struct PollConfig {
    pub interval: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self { interval: Duration::from_secs(10) }
    }
}

/// Poll every submitted batch until it reaches a terminal state (spec §4.5
/// "Polling"). One `tokio::spawn`ed task per in-flight batch feeds
/// `(batch_id, status)` transitions into a single `mpsc` channel, mirroring
/// the teacher's `crates::exec` approval-gate shape — a channel carrying
/// cross-task signals into one receiving loop — generalized from a
/// request/response gate to a fan-in status stream. Bounded by the number of
/// submitted batches, never an unbounded spawn per poll tick.
///
/// Returns the final `BatchStatus` for each `batch_id`, in the order the
/// batches were given.
pub async fn poll_until_terminal(
    provider: Arc<dyn BatchProvider>,
    batch_ids: Vec<String>,
    config: PollConfig,
    stage: &str,
    on_progress: Option<ProgressCallback<'_>>,
) -> Vec<(String, BatchStatus)> {
    let total = batch_ids.len();
    if total == 0 {
        return Vec::new();
    }

    let (tx, mut rx) = mpsc::channel::<(String, BatchStatus)>(total.max(1));

    for batch_id in &batch_ids {
        let provider = Arc::clone(&provider);
        let batch_id = batch_id.clone();
        let tx = tx.clone();
        let interval = config.interval;
        tokio::spawn(async move {
            loop {
                match provider.get_status(&batch_id).await {
                    Ok(job) => {
                        let terminal = job.status.is_terminal();
                        if tx.send((batch_id.clone(), job.status)).await.is_err() {
                            return;
                        }
                        if terminal {
                            return;
                        }
                    }
                    Err(err) => {
                        warn!(batch_id = %batch_id, error = %err, "batch status poll failed, retrying");
                    }
                }
                tokio::time::sleep(interval).await;
            }
        });
    }
    drop(tx);

    let mut final_status = std::collections::HashMap::new();
    let mut terminal_count = 0usize;
    while terminal_count < total {
        match rx.recv().await {
            Some((batch_id, status)) => {
                let is_terminal = status.is_terminal();
                final_status.insert(batch_id.clone(), status);
                if is_terminal {
                    terminal_count += 1;
                }
                let percent = (terminal_count as f32 / total as f32) * 100.0;
                report(
                    on_progress,
                    stage,
                    percent,
                    format!("batch {batch_id}: {status:?}{}", if is_terminal { " (terminal)" } else { "" }),
                );
            }
            // All senders dropped before every batch reached a terminal
            // status; a spawned poll task must have exited early.
            None => break,
        }
    }

    batch_ids
        .into_iter()
        .filter_map(|id| final_status.get(&id).map(|status| (id, *status)))
        .collect()
}
