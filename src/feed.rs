use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use containers::BlockInfo;
use fast_sync::SyncStatusList;
use metrics::Metrics;
use rand::{rngs::StdRng, Rng, SeedableRng};
use tracing::{debug, info};

use crate::simulation::SimulatedChain;

const IDLE_BACKOFF: Duration = Duration::from_millis(5);

#[derive(Debug, Clone, Copy)]
pub struct FeedSettings {
    pub batch_size: usize,
    pub failure_rate: f64,
    pub request_latency: Duration,
}

/// One dispatch loop: pull a batch, "request" it, report each block back.
///
/// Runs until the list reports the whole range folded into its watermark.
pub async fn run_feed(
    id: usize,
    list: Arc<SyncStatusList<SimulatedChain>>,
    chain: Arc<SimulatedChain>,
    metrics: Arc<Metrics>,
    settings: FeedSettings,
) -> Result<()> {
    let pipeline = list.pipeline();
    let label = pipeline.as_str();
    let skip_empty = matches!(pipeline, fast_sync::Pipeline::Receipts);
    let mut rng = StdRng::from_entropy();

    info!(feed = id, %pipeline, "Feed started");

    while !list.is_finished() {
        let batch = list.try_get_infos_for_batch(settings.batch_size, |info: &BlockInfo| {
            skip_empty && chain.has_no_transactions(info)
        })?;
        metrics.observe_batch_fill(label, batch.len(), settings.batch_size);

        if batch.is_empty() {
            publish_progress(&list, &metrics);
            tokio::time::sleep(IDLE_BACKOFF).await;
            continue;
        }

        metrics.inc_items_requested(label, batch.len() as u64);
        debug!(feed = id, %pipeline, size = batch.len(), "Dispatching batch");
        tokio::time::sleep(settings.request_latency).await;

        for info in batch {
            if rng.gen_bool(settings.failure_rate) {
                debug!(
                    feed = id,
                    number = info.block_number,
                    hash = %info.block_hash,
                    "Request failed, returning block"
                );
                list.mark_pending(info)?;
                metrics.inc_items_returned(label);
            } else {
                list.mark_inserted(info.block_number)?;
                metrics.inc_items_inserted(label);
            }
        }

        publish_progress(&list, &metrics);
    }

    info!(feed = id, %pipeline, "Feed finished");
    Ok(())
}

fn publish_progress(list: &SyncStatusList<SimulatedChain>, metrics: &Metrics) {
    let progress = list.progress();
    metrics.set_progress(
        progress.pipeline.as_str(),
        progress.pivot_number,
        progress.lowest_insert_without_gaps,
        progress.queue_size,
    );
}
