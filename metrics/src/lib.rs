pub mod server;

use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGaugeVec, Opts, Registry, TextEncoder};
use std::sync::Arc;

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    // Progress
    pivot_number: IntGaugeVec,
    lowest_insert_without_gaps: IntGaugeVec,
    queue_size: IntGaugeVec,
    // Feeds
    items_requested: IntCounterVec,
    items_inserted: IntCounterVec,
    items_returned: IntCounterVec,
    batch_fill_ratio: HistogramVec,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let pivot_number = IntGaugeVec::new(
            Opts::new("fast_sync_pivot_number", "Block number the pipeline counts down from"),
            &["pipeline"],
        ).unwrap();
        registry.register(Box::new(pivot_number.clone())).unwrap();

        let lowest_insert_without_gaps = IntGaugeVec::new(
            Opts::new("fast_sync_lowest_insert_without_gaps", "Gap-free watermark of the pipeline"),
            &["pipeline"],
        ).unwrap();
        registry.register(Box::new(lowest_insert_without_gaps.clone())).unwrap();

        let queue_size = IntGaugeVec::new(
            Opts::new("fast_sync_queue_size", "Blocks inserted but not yet folded into the watermark"),
            &["pipeline"],
        ).unwrap();
        registry.register(Box::new(queue_size.clone())).unwrap();

        let items_requested = IntCounterVec::new(
            Opts::new("fast_sync_items_requested_total", "Total number of blocks handed out for request"),
            &["pipeline"],
        ).unwrap();
        registry.register(Box::new(items_requested.clone())).unwrap();

        let items_inserted = IntCounterVec::new(
            Opts::new("fast_sync_items_inserted_total", "Total number of blocks reported stored"),
            &["pipeline"],
        ).unwrap();
        registry.register(Box::new(items_inserted.clone())).unwrap();

        let items_returned = IntCounterVec::new(
            Opts::new("fast_sync_items_returned_total", "Total number of requests abandoned back to pending"),
            &["pipeline"],
        ).unwrap();
        registry.register(Box::new(items_returned.clone())).unwrap();

        let batch_fill_ratio = HistogramVec::new(
            HistogramOpts::new("fast_sync_batch_fill_ratio", "Fraction of batch slots filled per pull")
                .buckets(vec![0.0, 0.1, 0.25, 0.5, 0.75, 0.9, 1.0]),
            &["pipeline"],
        ).unwrap();
        registry.register(Box::new(batch_fill_ratio.clone())).unwrap();

        Self {
            registry,
            pivot_number,
            lowest_insert_without_gaps,
            queue_size,
            items_requested,
            items_inserted,
            items_returned,
            batch_fill_ratio,
        }
    }

    pub fn gather(&self) -> String {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::<u8>::new();
        let encoder = TextEncoder::new();
        encoder.encode(&metric_families, &mut buffer).expect("failed to encode metrics");
        String::from_utf8(buffer).expect("metrics not utf8")
    }

    // Progress
    pub fn set_progress(&self, pipeline: &str, pivot: u64, lowest_insert_without_gaps: u64, queue_size: u64) {
        self.pivot_number.with_label_values(&[pipeline]).set(pivot as i64);
        self.lowest_insert_without_gaps.with_label_values(&[pipeline]).set(lowest_insert_without_gaps as i64);
        self.queue_size.with_label_values(&[pipeline]).set(queue_size as i64);
    }

    // Feeds
    pub fn inc_items_requested(&self, pipeline: &str, count: u64) {
        self.items_requested.with_label_values(&[pipeline]).inc_by(count);
    }

    pub fn inc_items_inserted(&self, pipeline: &str) {
        self.items_inserted.with_label_values(&[pipeline]).inc();
    }

    pub fn inc_items_returned(&self, pipeline: &str) {
        self.items_returned.with_label_values(&[pipeline]).inc();
    }

    pub fn observe_batch_fill(&self, pipeline: &str, filled: usize, capacity: usize) {
        if capacity == 0 {
            return;
        }
        self.batch_fill_ratio
            .with_label_values(&[pipeline])
            .observe(filled as f64 / capacity as f64);
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

pub type SharedMetrics = Arc<Metrics>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_is_exported_per_pipeline() {
        let metrics = Metrics::new();
        metrics.set_progress("bodies", 1000, 950, 3);
        metrics.inc_items_requested("bodies", 10);
        metrics.inc_items_inserted("receipts");
        metrics.observe_batch_fill("bodies", 5, 10);

        let text = metrics.gather();
        assert!(text.contains("fast_sync_lowest_insert_without_gaps{pipeline=\"bodies\"} 950"));
        assert!(text.contains("fast_sync_queue_size{pipeline=\"bodies\"} 3"));
        assert!(text.contains("fast_sync_items_requested_total{pipeline=\"bodies\"} 10"));
        assert!(text.contains("fast_sync_items_inserted_total{pipeline=\"receipts\"} 1"));
    }

    #[test]
    fn empty_batch_capacity_is_ignored() {
        let metrics = Metrics::new();
        metrics.observe_batch_fill("bodies", 0, 0);
        assert!(!metrics.gather().contains("fast_sync_batch_fill_ratio_count"));
    }
}
