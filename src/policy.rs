//! Acceptance policy
//!
//! Evaluates a normalized coin against the blacklists and quantitative
//! filters. Evaluation is ordered and short-circuits: the first failing
//! rule names the reject reason, so logs always show why a coin was
//! dropped. Pure decisions; the scheduler does the logging.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashSet;

use crate::config::{BlacklistConfig, FiltersConfig};
use crate::normalizer::{canonical_address, Coin};

/// Reason why a coin was rejected
#[derive(Debug, Clone, PartialEq)]
pub enum RejectReason {
    /// Contract address is blacklisted
    BlacklistedContract,
    /// Creator wallet is blacklisted
    BlacklistedCreator,
    /// Liquidity below the configured floor
    LowLiquidity(f64),
    /// Creator fee above the configured ceiling
    HighCreatorFee(f64),
    /// Holder count below the configured floor
    LowHolders(i64),
    /// Migrated more recently than the minimum age allows
    TooYoung { age_minutes: i64 },
    /// Creator already has too many accepted coins
    CreatorQuotaExceeded(i64),
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectReason::BlacklistedContract => write!(f, "blacklisted contract"),
            RejectReason::BlacklistedCreator => write!(f, "blacklisted creator"),
            RejectReason::LowLiquidity(liq) => write!(f, "liquidity {} below minimum", liq),
            RejectReason::HighCreatorFee(fee) => write!(f, "creator fee {}% above maximum", fee),
            RejectReason::LowHolders(n) => write!(f, "{} holders below minimum", n),
            RejectReason::TooYoung { age_minutes } => {
                write!(f, "migrated {}min ago, below minimum age", age_minutes)
            }
            RejectReason::CreatorQuotaExceeded(n) => {
                write!(f, "creator already has {} accepted coins", n)
            }
        }
    }
}

/// Policy decision
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    /// Coin passed every rule
    Accept,
    /// Coin was rejected
    Reject(RejectReason),
}

impl Verdict {
    pub fn is_accept(&self) -> bool {
        matches!(self, Verdict::Accept)
    }
}

/// Immutable policy snapshot: thresholds plus canonicalized blacklists.
///
/// Built once at startup; the engine never mutates it.
pub struct PolicyEngine {
    filters: FiltersConfig,
    blocked_contracts: HashSet<String>,
    blocked_creators: HashSet<String>,
}

impl PolicyEngine {
    /// Build the engine from config sections.
    ///
    /// Blacklist entries are trimmed and canonicalized where possible so
    /// comparisons against canonical coin addresses stay exact; entries
    /// that are not valid addresses are kept trimmed as-is (they can
    /// never match a canonical address, which is the safe direction).
    pub fn new(filters: FiltersConfig, blacklist: &BlacklistConfig) -> Self {
        let canonicalize_set = |entries: &[String]| {
            entries
                .iter()
                .map(|e| {
                    canonical_address(e).unwrap_or_else(|_| e.trim().to_string())
                })
                .filter(|e| !e.is_empty())
                .collect()
        };

        Self {
            filters,
            blocked_contracts: canonicalize_set(&blacklist.contract_addresses),
            blocked_creators: canonicalize_set(&blacklist.creator_addresses),
        }
    }

    /// Evaluate a coin. Blacklists first, then the quantitative rules,
    /// short-circuiting on the first failure.
    pub fn evaluate(&self, coin: &Coin, now: DateTime<Utc>) -> Verdict {
        if self.blocked_contracts.contains(&coin.contract_address) {
            return Verdict::Reject(RejectReason::BlacklistedContract);
        }

        if self.blocked_creators.contains(&coin.creator_wallet) {
            return Verdict::Reject(RejectReason::BlacklistedCreator);
        }

        if coin.initial_liquidity < self.filters.min_liquidity {
            return Verdict::Reject(RejectReason::LowLiquidity(coin.initial_liquidity));
        }

        if coin.creator_fee > self.filters.max_creator_fee {
            return Verdict::Reject(RejectReason::HighCreatorFee(coin.creator_fee));
        }

        if coin.holders < self.filters.min_holders {
            return Verdict::Reject(RejectReason::LowHolders(coin.holders));
        }

        let age_floor = now - Duration::minutes(self.filters.min_age_minutes as i64);
        if coin.migration_time > age_floor {
            let age_minutes = (now - coin.migration_time).num_minutes();
            return Verdict::Reject(RejectReason::TooYoung { age_minutes });
        }

        Verdict::Accept
    }

    /// Whether the per-creator quota is configured
    pub fn quota_enabled(&self) -> bool {
        self.filters.max_coins_per_creator > 0
    }

    /// Apply the per-creator quota against a count the scheduler queried
    /// from the store. Separate from `evaluate` so the main rules stay
    /// pure and store-free.
    pub fn check_creator_quota(&self, accepted_count: i64) -> Verdict {
        if self.quota_enabled() && accepted_count >= self.filters.max_coins_per_creator {
            return Verdict::Reject(RejectReason::CreatorQuotaExceeded(accepted_count));
        }
        Verdict::Accept
    }
}
