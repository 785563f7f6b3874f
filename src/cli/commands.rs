//! CLI command implementations

use anyhow::Result;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::Config;
use crate::feed::FeedClient;
use crate::monitor::Monitor;
use crate::notifier::AlertDispatcher;
use crate::policy::PolicyEngine;
use crate::store::CoinStore;

/// Start the migration monitor
pub async fn start(config: &Config, dry_run: bool) -> Result<()> {
    if dry_run {
        warn!("Running in DRY-RUN mode - no alerts will be sent");
    }

    info!("Starting pump.fun migration monitor...");
    info!(
        "Filters: min_liquidity={}, max_creator_fee={}%, min_holders={}, min_age={}min",
        config.filters.min_liquidity,
        config.filters.max_creator_fee,
        config.filters.min_holders,
        config.filters.min_age_minutes
    );

    let store = CoinStore::open(&config.database.path)?;
    info!(
        "Database ready at {} ({} coins stored)",
        config.database.path,
        store.count()?
    );

    let source = Box::new(FeedClient::new(&config.api));
    let policy = PolicyEngine::new(config.filters.clone(), &config.blacklist);

    let dispatcher = if dry_run {
        AlertDispatcher::disabled()
    } else {
        AlertDispatcher::from_config(&config.telegram)
    };

    let monitor = Monitor::new(
        source,
        policy,
        store,
        dispatcher,
        config.api.fetch_limit,
        Duration::from_secs(config.api.poll_interval_secs),
    );

    monitor.run().await;
    Ok(())
}

/// Show current configuration (secrets masked)
pub fn show_config(config: &Config) -> Result<()> {
    println!("{}", config.masked_display());
    Ok(())
}

/// List the most recently stored coins
pub fn history(config: &Config, limit: usize) -> Result<()> {
    let store = CoinStore::open(&config.database.path)?;
    let coins = store.recent(limit)?;

    if coins.is_empty() {
        println!("No coins stored yet.");
        return Ok(());
    }

    println!("{} most recent coins:", coins.len());
    for coin in coins {
        println!(
            "  {} ({})  liquidity={:.2}  fee={:.1}%  holders={}  stored={}",
            coin.symbol,
            coin.contract_address,
            coin.initial_liquidity,
            coin.creator_fee,
            coin.holders,
            coin.created_at
        );
    }

    Ok(())
}
