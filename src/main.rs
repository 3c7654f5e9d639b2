mod api;
mod config;
mod models;
mod services;
mod sources;

use std::sync::Arc;
use tokio::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api::{create_rest_router, AppState};
use config::Config;
use models::chain::{format_pct, format_usd};
use services::{LocalStorage, SnapshotCache, SnapshotCollector, SnapshotStore};
use sources::llama::LlamaFeeds;
use sources::narrative::{ClaudeNarrative, NarrativeGenerator};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,stableflow=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load()?;
    tracing::info!("✓ Configuration loaded");

    let storage = Arc::new(LocalStorage::new(&config.storage.data_dir)?);
    let store = Arc::new(SnapshotStore::new(storage));
    let feeds = Arc::new(LlamaFeeds::new());
    let collector = Arc::new(SnapshotCollector::new(feeds, &config.tracker));

    // One-shot mode: aggregate, persist, print the ranking table, exit.
    let args: Vec<String> = std::env::args().collect();
    if args.contains(&"--fetch".to_string()) || args.contains(&"-f".to_string()) {
        return fetch_once(&collector, &store).await;
    }

    let cache = Arc::new(SnapshotCache::new());
    if let Some(snapshot) = store.latest().await? {
        tracing::info!("✓ Loaded stored series, latest snapshot {}", snapshot.timestamp);
        cache.set(snapshot);
    }

    let narrative: Option<Arc<dyn NarrativeGenerator>> = match std::env::var("ANTHROPIC_API_KEY")
    {
        Ok(key) if !key.is_empty() => Some(Arc::new(ClaudeNarrative::new(key))),
        _ => {
            tracing::info!("ANTHROPIC_API_KEY not set, weekly analysis disabled");
            None
        }
    };

    // Background: scheduled data refresh
    let collector_clone = collector.clone();
    let store_clone = store.clone();
    let cache_clone = cache.clone();
    let interval_hours = config.refresh.interval_hours;
    tokio::spawn(async move {
        loop {
            match collector_clone.collect().await {
                Ok(snapshot) => match store_clone.append(snapshot.clone()).await {
                    Ok(()) => {
                        tracing::info!(
                            "✓ Cycle complete: {} chains | stable TVL ${:.2}B",
                            snapshot.chains.len(),
                            snapshot.totals.stable_tvl / 1e9
                        );
                        cache_clone.set(snapshot);
                    }
                    Err(e) => tracing::error!("Snapshot persist failed: {}", e),
                },
                Err(e) => tracing::warn!("Feed collection failed: {}", e),
            }
            tokio::time::sleep(Duration::from_secs(interval_hours * 3600)).await;
        }
    });

    let state = Arc::new(AppState {
        collector,
        store,
        cache,
        narrative,
        refresh: config.refresh.clone(),
    });

    let app = create_rest_router(state);
    let addr = format!("{}:{}", config.server.host, config.server.port);
    println!("\n✓ Server ready on http://{}\n", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn fetch_once(
    collector: &SnapshotCollector,
    store: &SnapshotStore,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("\nFetching data from upstream feeds...\n");

    let snapshot = collector.collect().await?;
    store.append(snapshot.clone()).await?;

    println!("Chain Rankings by Stable TVL:\n");
    println!("Rank  Chain            Stable TVL      DeFi TVL        Supply    Util%  Stbl/DeFi");
    println!("{}", "─".repeat(84));

    for chain in &snapshot.chains {
        println!(
            "{:>4}  {:<12} {:>13} {:>13} {:>13} {:>8} {:>10}",
            chain.rank,
            chain.chain,
            format_usd(chain.stable_tvl),
            format_usd(chain.defi_tvl),
            format_usd(chain.stable_supply),
            format_pct(chain.util_percent),
            format_pct(chain.stbl_defi_percent),
        );
    }

    println!("{}", "─".repeat(84));
    println!(
        "      {:<12} {:>13} {:>13} {:>13} {:>8} {:>10}",
        "TOTAL",
        format_usd(snapshot.totals.stable_tvl),
        format_usd(snapshot.totals.defi_tvl),
        format_usd(snapshot.totals.stable_supply),
        format_pct(snapshot.totals.util_percent),
        format_pct(snapshot.totals.stbl_defi_percent),
    );

    println!("\nData saved at {}", snapshot.timestamp);
    Ok(())
}
