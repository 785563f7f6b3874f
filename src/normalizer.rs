//! Record normalization
//!
//! Turns a loosely-typed `RawMigration` into a validated `Coin`. Identity
//! fields (addresses, token name/symbol, timestamp format) are strict;
//! numeric fields follow the upstream's lenient contract and coerce to
//! zero when malformed.

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::feed::RawMigration;

/// A validated, immutable coin entity
#[derive(Debug, Clone, PartialEq)]
pub struct Coin {
    /// Canonical contract address - the unique identity key
    pub contract_address: String,
    pub name: String,
    pub symbol: String,
    /// Canonical creator wallet address
    pub creator_wallet: String,
    pub migration_time: DateTime<Utc>,
    pub initial_liquidity: f64,
    pub creator_fee: f64,
    pub holders: i64,
}

/// Canonicalize an address: trim, require `0x` + 40 hex digits, lowercase.
///
/// Lowercasing makes the canonical form invariant under input case, which
/// is what the uniqueness key and blacklist comparisons rely on.
pub fn canonical_address(input: &str) -> Result<String> {
    let trimmed = input.trim();
    let hex = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .ok_or_else(|| Error::InvalidAddress(trimmed.to_string()))?;

    if hex.len() != 40 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(Error::InvalidAddress(trimmed.to_string()));
    }

    Ok(format!("0x{}", hex.to_ascii_lowercase()))
}

/// Lenient numeric coercion: JSON number or numeric string, else zero.
fn coerce_f64(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

fn coerce_i64(value: Option<&Value>) -> i64 {
    // Upstream sends holder counts as floats often enough that truncating
    // through f64 matches its behavior.
    coerce_f64(value) as i64
}

/// Normalize a raw migration record into a `Coin`.
///
/// `now` is injected so normalization stays a pure function; it is used
/// as the migration time when the upstream omits one.
pub fn normalize(raw: &RawMigration, now: DateTime<Utc>) -> Result<Coin> {
    let contract_address = canonical_address(
        raw.contract_address
            .as_deref()
            .ok_or(Error::MissingField("contractAddress"))?,
    )?;

    let token = raw.token.as_ref().ok_or(Error::MissingField("token"))?;
    let name = token
        .name
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or(Error::MissingField("token.name"))?
        .to_string();
    let symbol = token
        .symbol
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or(Error::MissingField("token.symbol"))?
        .to_string();

    let creator_wallet =
        canonical_address(raw.creator.as_deref().ok_or(Error::MissingField("creator"))?)?;

    let migration_time = match raw.migration_time.as_deref() {
        Some(ts) => DateTime::parse_from_rfc3339(ts)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|_| Error::InvalidTimestamp(ts.to_string()))?,
        None => now,
    };

    Ok(Coin {
        contract_address,
        name,
        symbol,
        creator_wallet,
        migration_time,
        initial_liquidity: coerce_f64(raw.initial_liquidity.as_ref()),
        creator_fee: coerce_f64(raw.fee_percentage.as_ref()),
        holders: coerce_i64(raw.holder_count.as_ref()),
    })
}
