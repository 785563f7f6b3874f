//! Coin persistence
//!
//! SQLite-backed store keyed by contract address. The unique constraint
//! plus `INSERT OR IGNORE` is the sole dedup mechanism: re-inserting a
//! known address is a no-op, reported as `AlreadyExists` so callers can
//! suppress duplicate notifications.

use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::debug;

use crate::error::{Error, Result};
use crate::normalizer::Coin;

/// Outcome of an idempotent insert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// Row was inserted; this is the first sighting of the address
    Inserted,
    /// Address already stored; nothing changed
    AlreadyExists,
}

/// A stored coin row, as read back for the history listing
#[derive(Debug, Clone)]
pub struct StoredCoin {
    pub contract_address: String,
    pub name: String,
    pub symbol: String,
    pub creator_wallet: String,
    pub migration_time: String,
    pub initial_liquidity: f64,
    pub creator_fee: f64,
    pub holders: i64,
    pub created_at: String,
}

/// SQLite store for accepted coins
#[derive(Clone)]
pub struct CoinStore {
    conn: Arc<Mutex<Connection>>,
}

impl CoinStore {
    /// Open (or create) the database file and ensure the schema exists
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    /// In-memory store, used by tests
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS coins (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                contract_address TEXT UNIQUE NOT NULL,
                name TEXT NOT NULL,
                symbol TEXT NOT NULL,
                creator_wallet TEXT NOT NULL,
                migration_time TEXT NOT NULL,
                initial_liquidity REAL NOT NULL,
                creator_fee REAL NOT NULL,
                holders INTEGER NOT NULL,
                created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            )",
            [],
        )?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Insert a coin unless its contract address is already stored.
    ///
    /// Atomic at the SQLite level: concurrent or repeated ticks can never
    /// race into two rows for the same address.
    pub fn upsert_if_absent(&self, coin: &Coin) -> Result<UpsertOutcome> {
        let conn = self.lock()?;

        conn.execute(
            "INSERT OR IGNORE INTO coins
                (contract_address, name, symbol, creator_wallet, migration_time,
                 initial_liquidity, creator_fee, holders)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                coin.contract_address,
                coin.name,
                coin.symbol,
                coin.creator_wallet,
                coin.migration_time.to_rfc3339(),
                coin.initial_liquidity,
                coin.creator_fee,
                coin.holders,
            ],
        )?;

        if conn.changes() == 0 {
            debug!("Coin {} already stored", coin.contract_address);
            Ok(UpsertOutcome::AlreadyExists)
        } else {
            Ok(UpsertOutcome::Inserted)
        }
    }

    /// How many accepted coins a creator wallet already has.
    ///
    /// Backs the per-creator quota: cross-tick memory lives here, not in
    /// process state.
    pub fn count_by_creator(&self, creator_wallet: &str) -> Result<i64> {
        let conn = self.lock()?;
        let count = conn.query_row(
            "SELECT COUNT(*) FROM coins WHERE creator_wallet = ?1",
            [creator_wallet],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Total stored coins
    pub fn count(&self) -> Result<i64> {
        let conn = self.lock()?;
        let count = conn.query_row("SELECT COUNT(*) FROM coins", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Most recently stored coins, newest first
    pub fn recent(&self, limit: usize) -> Result<Vec<StoredCoin>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT contract_address, name, symbol, creator_wallet, migration_time,
                    initial_liquidity, creator_fee, holders, created_at
             FROM coins ORDER BY id DESC LIMIT ?1",
        )?;

        let rows = stmt.query_map([limit as i64], |row| {
            Ok(StoredCoin {
                contract_address: row.get(0)?,
                name: row.get(1)?,
                symbol: row.get(2)?,
                creator_wallet: row.get(3)?,
                migration_time: row.get(4)?,
                initial_liquidity: row.get(5)?,
                creator_fee: row.get(6)?,
                holders: row.get(7)?,
                created_at: row.get(8)?,
            })
        })?;

        let mut coins = Vec::new();
        for row in rows {
            coins.push(row?);
        }
        Ok(coins)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| Error::Storage(format!("connection lock poisoned: {}", e)))
    }
}
