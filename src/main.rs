use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{ensure, Context, Result};
use chain::SyncConfig;
use clap::Parser;
use fast_sync::SyncStatusList;
use metrics::server::{run_metrics_server, MetricsServerConfig};
use metrics::Metrics;
use tokio::task::JoinSet;
use tracing::{error, info};

mod feed;
mod simulation;

use feed::{run_feed, FeedSettings};
use simulation::SimulatedChain;

#[derive(Parser, Debug)]
struct Args {
    /// YAML sync config; flags below override its fields
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(long)]
    pivot: Option<u64>,

    #[arg(long)]
    bodies_barrier: Option<u64>,

    #[arg(long)]
    receipts_barrier: Option<u64>,

    /// Resume as if bodies down to this number were already stored
    #[arg(long)]
    lowest_body: Option<u64>,

    /// Resume as if receipts down to this number were already stored
    #[arg(long)]
    lowest_receipt: Option<u64>,

    #[arg(long, default_value_t = 4)]
    feeds: usize,

    #[arg(long, default_value_t = 128)]
    batch_size: usize,

    #[arg(long, default_value_t = 0.05)]
    failure_rate: f64,

    #[arg(long, default_value_t = 1)]
    latency_ms: u64,

    #[arg(long, default_value_t = 16)]
    empty_block_interval: u64,

    #[arg(long)]
    metrics: bool,

    #[arg(long, default_value = "127.0.0.1")]
    metrics_address: IpAddr,

    #[arg(long, default_value_t = 5054)]
    metrics_port: u16,
}

impl Args {
    fn sync_config(&self) -> Result<SyncConfig> {
        let mut config = match &self.config {
            Some(path) => SyncConfig::load_from_file(path)?,
            None => SyncConfig {
                pivot_number: 100_000,
                ..SyncConfig::default()
            },
        };

        if let Some(pivot) = self.pivot {
            config.pivot_number = pivot;
        }
        if let Some(barrier) = self.bodies_barrier {
            config.ancient_bodies_barrier = barrier;
        }
        if let Some(barrier) = self.receipts_barrier {
            config.ancient_receipts_barrier = barrier;
        }

        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    ensure!(
        (0.0..1.0).contains(&args.failure_rate),
        "failure rate must be in [0, 1), got {}",
        args.failure_rate
    );
    ensure!(args.feeds > 0, "at least one feed is required");
    ensure!(args.batch_size > 0, "batch size must be positive");

    let config = args.sync_config().context("failed to build sync config")?;

    let chain = Arc::new(SimulatedChain {
        pivot_number: config.pivot_number,
        lowest_body: args.lowest_body,
        lowest_receipt: args.lowest_receipt,
        empty_block_interval: args.empty_block_interval,
    });

    let bodies = Arc::new(SyncStatusList::bodies(&config, chain.clone()));
    let receipts = Arc::new(SyncStatusList::receipts(&config, chain.clone(), chain.clone()));

    let metrics = Arc::new(Metrics::new());
    if args.metrics {
        let server_config = MetricsServerConfig {
            metrics_address: args.metrics_address,
            metrics_port: args.metrics_port,
        };
        let server_metrics = metrics.clone();
        tokio::spawn(async move {
            if let Err(err) = run_metrics_server(server_config, server_metrics).await {
                error!(%err, "Metrics server exited");
            }
        });
    }

    let settings = FeedSettings {
        batch_size: args.batch_size,
        failure_rate: args.failure_rate,
        request_latency: Duration::from_millis(args.latency_ms),
    };

    let started = Instant::now();
    let mut feeds = JoinSet::new();
    for list in [&bodies, &receipts] {
        for id in 0..args.feeds {
            feeds.spawn(run_feed(id, list.clone(), chain.clone(), metrics.clone(), settings));
        }
    }

    while let Some(joined) = feeds.join_next().await {
        joined.context("feed task panicked")??;
    }

    for list in [&bodies, &receipts] {
        let progress = list.progress();
        info!(
            pipeline = %progress.pipeline,
            pivot = progress.pivot_number,
            lower_bound = progress.lower_bound,
            lowest_insert_without_gaps = progress.lowest_insert_without_gaps,
            queue_size = progress.queue_size,
            finished = progress.finished,
            "Pipeline complete"
        );
    }
    info!(elapsed = ?started.elapsed(), "Simulation finished");

    Ok(())
}
