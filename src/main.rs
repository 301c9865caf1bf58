use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use clap::Parser;
use futures::future::join_all;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use saltlimit::config::SaltlimitConfig;
use saltlimit::ratelimit::{Limiter, MemoryCache};

/// Throttle identifiers through a salted in-memory limiter and report the
/// delays applied.
#[derive(Debug, Parser)]
#[command(name = "saltlimit", version, about)]
struct Args {
    /// YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Minimum spacing between admissions of one identifier (overrides config)
    #[arg(long)]
    threshold_ms: Option<u64>,

    /// Longest acceptable wait before rejecting (overrides config)
    #[arg(long)]
    deadline_ms: Option<u64>,

    /// How many concurrent requests to issue per identifier
    #[arg(short, long, default_value_t = 1)]
    repeat: usize,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,

    /// Identifiers to throttle
    #[arg(required = true)]
    identifiers: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if args.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_thread_ids(true)
            .init();
    }

    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let mut config = match &args.config {
        Some(path) => SaltlimitConfig::from_file(path)?,
        None => SaltlimitConfig::default(),
    };
    if let Some(threshold_ms) = args.threshold_ms {
        config.limiter.threshold_ms = threshold_ms;
    }
    if let Some(deadline_ms) = args.deadline_ms {
        config.limiter.deadline_ms = deadline_ms;
    }
    info!(
        threshold_ms = config.limiter.threshold_ms,
        deadline_ms = config.limiter.deadline_ms,
        "Configuration loaded"
    );

    let cache = Arc::new(MemoryCache::new());
    let sweeper = cache.spawn_sweeper(config.cache.sweep_interval());
    let limiter = Limiter::from_config(&config.limiter, cache.clone())?;

    let start = Instant::now();
    let requests: Vec<_> = args
        .identifiers
        .iter()
        .flat_map(|id| std::iter::repeat(id).take(args.repeat))
        .map(|id| {
            let key = limiter.anonymize(id);
            let handle = limiter.throttle(id);
            async move { (key, handle.await) }
        })
        .collect();

    let outcomes = join_all(requests).await;

    let mut rejected = 0usize;
    for (key, outcome) in outcomes {
        match outcome {
            Ok(delay) => info!(key = %key, delay_ms = delay.as_millis() as u64, "Admitted"),
            Err(e) => {
                rejected += 1;
                warn!(key = %key, error = %e, "Rejected");
            }
        }
    }

    info!(
        total = args.identifiers.len() * args.repeat,
        rejected,
        elapsed_ms = start.elapsed().as_millis() as u64,
        cached_entries = cache.len(),
        "All requests resolved"
    );

    sweeper.abort();
    Ok(())
}
