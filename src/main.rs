//! Snapcache - interactive demo
//!
//! Reads cache commands from stdin, one per line, against a cache configured
//! from environment variables. Persists to a snapshot file when
//! `CACHE_SNAPSHOT_DIR` is set.

use std::sync::Arc;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use snapcache::cache::{ManualMemoryLevelNotifier, MemoryLevel};
use snapcache::{
    Cache, CacheEntry, Config, JsonSerializer, MemoryCacheManager, MemoryCacheManagerBuilder,
    MemoryLevelCacheDecorator, SnapshotFileCache,
};

const HELP: &str = "commands: put <key> <value> | get <key> | remove <key> | clear | trim | low | critical | stats | len | quit";

type Entries = Vec<CacheEntry<String, String>>;

/// Entry point for the demo.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Open the snapshot file, if configured
/// 4. Build the manager and wrap it for memory pressure
/// 5. Serve commands until `quit`, end of input or Ctrl+C
/// 6. Cancel the shutdown token and wait for the final snapshot save
#[tokio::main]
async fn main() -> Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "snapcache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Snapcache demo");

    let config = Config::from_env()?;
    info!(
        "Configuration loaded: max_size={:?}, ttl={:?}s, tti={:?}s, save_frequency={}ms, snapshot_dir={:?}",
        config.max_size,
        config.entry_ttl_secs,
        config.entry_tti_secs,
        config.save_frequency_ms,
        config.snapshot_dir
    );

    let shutdown = CancellationToken::new();
    let mut builder = MemoryCacheManagerBuilder::<String, String>::new()
        .cache_policy(config.cache_policy()?)
        .save_frequency(config.save_frequency())
        .shutdown_token(shutdown.clone());

    if let Some(dir) = &config.snapshot_dir {
        let file: SnapshotFileCache<Entries, _> =
            SnapshotFileCache::create(dir, &config.snapshot_file, JsonSerializer::pretty()).await?;
        builder = builder.snapshot_persistent_cache(Arc::new(file));
    }

    let manager = builder.build_manager()?;
    let notifier = Arc::new(ManualMemoryLevelNotifier::new());
    let cache = MemoryLevelCacheDecorator::new(manager.clone(), notifier.clone());

    println!("{HELP}");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let ctrl_c = signal::ctrl_c();
    tokio::pin!(ctrl_c);
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = &mut ctrl_c => {
                info!("Received Ctrl+C, initiating shutdown...");
                break;
            }
        };

        // end of input
        let Some(line) = line else {
            break;
        };
        if !run_command(&cache, &notifier, &line).await? {
            break;
        }
    }

    shutdown.cancel();
    manager.closed().await;
    info!("Shutdown complete");
    Ok(())
}

/// Executes one command line. Returns false when the demo should stop.
async fn run_command(
    cache: &MemoryLevelCacheDecorator<String, String>,
    notifier: &ManualMemoryLevelNotifier,
    line: &str,
) -> Result<bool> {
    let mut words = line.split_whitespace();
    let Some(command) = words.next() else {
        return Ok(true);
    };
    let manager: &MemoryCacheManager<String, String> = cache.manager();

    match (command, words.next()) {
        ("put", Some(key)) => {
            let value = words.collect::<Vec<_>>().join(" ");
            cache.put(key.to_string(), value).await;
            println!("ok");
        }
        ("get", Some(key)) => match cache.get(&key.to_string()).await {
            Some(value) => println!("{value}"),
            None => println!("(none)"),
        },
        ("remove", Some(key)) => {
            cache.remove(&key.to_string()).await;
            println!("ok");
        }
        ("clear", None) => {
            cache.clear().await;
            println!("ok");
        }
        ("trim", None) => {
            manager.trim_memory().await;
            println!("ok");
        }
        ("low", None) => {
            notifier.signal(MemoryLevel::Low);
            println!("ok");
        }
        ("critical", None) => {
            notifier.signal(MemoryLevel::Critical);
            println!("ok");
        }
        ("stats", None) => {
            println!("{}", serde_json::to_string_pretty(&manager.stats().await)?);
        }
        ("len", None) => println!("{}", manager.len().await),
        ("quit", None) => return Ok(false),
        _ => println!("{HELP}"),
    }
    Ok(true)
}
