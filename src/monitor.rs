//! Polling scheduler and pipeline
//!
//! Drives the fetch -> normalize -> evaluate -> persist -> notify cycle on
//! a fixed interval. Failures are isolated at two levels: a bad record is
//! skipped without aborting the batch, and a failed tick (feed down,
//! malformed response) is skipped without stopping the loop. The monitor
//! degrades gracefully and never stops on its own.

use chrono::Utc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::feed::{MigrationSource, RawMigration};
use crate::normalizer::{normalize, Coin};
use crate::notifier::{AlertDispatcher, Delivery};
use crate::policy::{PolicyEngine, Verdict};
use crate::store::{CoinStore, UpsertOutcome};

/// Externally pluggable per-coin hook (security check, analysis)
pub type CoinHook = Box<dyn Fn(&Coin) + Send + Sync>;

/// Hook points for accepted coins. Defaults are no-ops; real security
/// checking and analysis plug in from outside the pipeline.
#[derive(Default)]
pub struct Hooks {
    /// Runs on accepted coins before persistence
    pub security_check: Option<CoinHook>,
    /// Runs on newly inserted coins
    pub analysis: Option<CoinHook>,
}

/// What happened to a single record
#[derive(Debug, Clone, PartialEq)]
pub enum RecordOutcome {
    /// Accepted and stored for the first time
    Inserted,
    /// Accepted but already stored; notification suppressed
    Duplicate,
    /// Rejected by policy (reason already logged)
    Rejected,
}

/// Per-tick counters, logged as the tick summary
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TickStats {
    pub fetched: usize,
    pub inserted: usize,
    pub duplicates: usize,
    pub rejected: usize,
    pub failed: usize,
}

/// The monitor: owns the pipeline components and the polling loop
pub struct Monitor {
    source: Box<dyn MigrationSource>,
    policy: PolicyEngine,
    store: CoinStore,
    dispatcher: AlertDispatcher,
    hooks: Hooks,
    fetch_limit: u32,
    poll_interval: Duration,
}

impl Monitor {
    pub fn new(
        source: Box<dyn MigrationSource>,
        policy: PolicyEngine,
        store: CoinStore,
        dispatcher: AlertDispatcher,
        fetch_limit: u32,
        poll_interval: Duration,
    ) -> Self {
        Self {
            source,
            policy,
            store,
            dispatcher,
            hooks: Hooks::default(),
            fetch_limit,
            poll_interval,
        }
    }

    pub fn with_hooks(mut self, hooks: Hooks) -> Self {
        self.hooks = hooks;
        self
    }

    /// Run the polling loop. It has no exit condition; only process
    /// termination stops it.
    pub async fn run(&self) {
        info!(
            "Monitor running: polling every {}s, batch size {}",
            self.poll_interval.as_secs(),
            self.fetch_limit
        );

        let mut interval = tokio::time::interval(self.poll_interval);
        // A slow tick delays the next one instead of bursting; ticks never
        // overlap.
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            match self.process_tick().await {
                Ok(stats) => {
                    info!(
                        "Tick done: {} fetched, {} new, {} duplicate, {} rejected, {} failed",
                        stats.fetched,
                        stats.inserted,
                        stats.duplicates,
                        stats.rejected,
                        stats.failed
                    );
                }
                Err(e) => {
                    warn!("Tick skipped: {}", e);
                }
            }
        }
    }

    /// One fetch-process cycle. A fetch failure fails the tick; record
    /// failures are counted and skipped.
    pub async fn process_tick(&self) -> Result<TickStats> {
        let records = self.source.fetch_migrations(self.fetch_limit).await?;

        let mut stats = TickStats {
            fetched: records.len(),
            ..TickStats::default()
        };

        for raw in &records {
            match self.process_record(raw).await {
                Ok(RecordOutcome::Inserted) => stats.inserted += 1,
                Ok(RecordOutcome::Duplicate) => stats.duplicates += 1,
                Ok(RecordOutcome::Rejected) => stats.rejected += 1,
                Err(e) => {
                    warn!("Record skipped: {}", e);
                    stats.failed += 1;
                }
            }
        }

        Ok(stats)
    }

    /// Run one raw record through the full pipeline
    async fn process_record(&self, raw: &RawMigration) -> Result<RecordOutcome> {
        let now = Utc::now();
        let coin = normalize(raw, now)?;

        if let Verdict::Reject(reason) = self.policy.evaluate(&coin, now) {
            debug!("Rejected {} ({}): {}", coin.symbol, coin.contract_address, reason);
            return Ok(RecordOutcome::Rejected);
        }

        // Per-creator quota is backed by a store query, not process state
        if self.policy.quota_enabled() {
            let count = self.store.count_by_creator(&coin.creator_wallet)?;
            if let Verdict::Reject(reason) = self.policy.check_creator_quota(count) {
                debug!("Rejected {} ({}): {}", coin.symbol, coin.contract_address, reason);
                return Ok(RecordOutcome::Rejected);
            }
        }

        if let Some(check) = &self.hooks.security_check {
            check(&coin);
        }

        let outcome = self.store.upsert_if_absent(&coin)?;
        if outcome == UpsertOutcome::AlreadyExists {
            return Ok(RecordOutcome::Duplicate);
        }

        info!(
            "New coin accepted: {} ({}) liquidity={:.2} holders={}",
            coin.symbol, coin.contract_address, coin.initial_liquidity, coin.holders
        );

        if let Some(analyze) = &self.hooks.analysis {
            analyze(&coin);
        }

        // Best-effort: a delivery failure never rolls back the insert
        match self.dispatcher.dispatch(&coin).await {
            Ok(Delivery::Delivered) => {
                debug!("Alert sent for {}", coin.contract_address);
            }
            Ok(Delivery::Skipped) => {}
            Err(e) => {
                warn!("Alert failed for {}: {}", coin.contract_address, e);
            }
        }

        Ok(RecordOutcome::Inserted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BlacklistConfig, FiltersConfig};
    use crate::feed::RawToken;
    use async_trait::async_trait;
    use serde_json::json;

    struct StubSource {
        records: Vec<RawMigration>,
    }

    #[async_trait]
    impl MigrationSource for StubSource {
        async fn fetch_migrations(&self, limit: u32) -> Result<Vec<RawMigration>> {
            Ok(self.records.iter().take(limit as usize).cloned().collect())
        }
    }

    fn raw_record(address: &str, minutes_old: i64) -> RawMigration {
        RawMigration {
            contract_address: Some(address.to_string()),
            token: Some(RawToken {
                name: Some("Moon Coin".to_string()),
                symbol: Some("MOON".to_string()),
            }),
            creator: Some("0x1111111111111111111111111111111111111111".to_string()),
            migration_time: Some(
                (Utc::now() - chrono::Duration::minutes(minutes_old)).to_rfc3339(),
            ),
            initial_liquidity: Some(json!(10.0)),
            fee_percentage: Some(json!(2.0)),
            holder_count: Some(json!(30)),
        }
    }

    fn monitor_with(records: Vec<RawMigration>) -> Monitor {
        Monitor::new(
            Box::new(StubSource { records }),
            PolicyEngine::new(FiltersConfig::default(), &BlacklistConfig::default()),
            CoinStore::open_in_memory().unwrap(),
            AlertDispatcher::disabled(),
            10,
            Duration::from_secs(60),
        )
    }

    #[tokio::test]
    async fn test_bad_record_does_not_abort_batch() {
        let mut broken = raw_record("0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa", 15);
        broken.contract_address = Some("not-an-address".to_string());

        let monitor = monitor_with(vec![
            broken,
            raw_record("0xbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb", 15),
        ]);

        let stats = monitor.process_tick().await.unwrap();
        assert_eq!(stats.fetched, 2);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.inserted, 1);
    }

    #[tokio::test]
    async fn test_fetch_limit_bounds_batch() {
        let records = (0..5)
            .map(|i| {
                raw_record(
                    &format!("0x{:040x}", i + 0xa000),
                    15,
                )
            })
            .collect();

        let mut monitor = monitor_with(records);
        monitor.fetch_limit = 3;

        let stats = monitor.process_tick().await.unwrap();
        assert_eq!(stats.fetched, 3);
        assert_eq!(stats.inserted, 3);
    }

    #[tokio::test]
    async fn test_hooks_fire_on_accepted_coins() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        let checked = Arc::new(AtomicUsize::new(0));
        let analyzed = Arc::new(AtomicUsize::new(0));
        let c = checked.clone();
        let a = analyzed.clone();

        let monitor = monitor_with(vec![
            raw_record("0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa", 15),
            // Too young: rejected, hooks must not fire
            raw_record("0xbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb", 2),
        ])
        .with_hooks(Hooks {
            security_check: Some(Box::new(move |_| {
                c.fetch_add(1, Ordering::SeqCst);
            })),
            analysis: Some(Box::new(move |_| {
                a.fetch_add(1, Ordering::SeqCst);
            })),
        });

        let stats = monitor.process_tick().await.unwrap();
        assert_eq!(stats.inserted, 1);
        assert_eq!(stats.rejected, 1);
        assert_eq!(checked.load(Ordering::SeqCst), 1);
        assert_eq!(analyzed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_creator_quota_queries_store() {
        let mut filters = FiltersConfig::default();
        filters.max_coins_per_creator = 2;

        let records: Vec<_> = (0..3)
            .map(|i| raw_record(&format!("0x{:040x}", i + 0xb000), 15))
            .collect();

        let monitor = Monitor::new(
            Box::new(StubSource { records }),
            PolicyEngine::new(filters, &BlacklistConfig::default()),
            CoinStore::open_in_memory().unwrap(),
            AlertDispatcher::disabled(),
            10,
            Duration::from_secs(60),
        );

        // All three share a creator; the third must hit the quota
        let stats = monitor.process_tick().await.unwrap();
        assert_eq!(stats.inserted, 2);
        assert_eq!(stats.rejected, 1);
    }
}
