//! Configuration loading and validation

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub filters: FiltersConfig,
    #[serde(default)]
    pub blacklist: BlacklistConfig,
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the pump.fun API
    #[serde(default = "default_api_base")]
    pub base_url: String,
    /// Bearer token for the migrations feed
    #[serde(default)]
    pub api_key: String,
    /// Seconds between polling ticks
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    /// How many migrations to fetch per tick (most recent first)
    #[serde(default = "default_fetch_limit")]
    pub fetch_limit: u32,
    /// Per-request timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FiltersConfig {
    /// Minimum initial liquidity (SOL) to accept a coin
    #[serde(default = "default_min_liquidity")]
    pub min_liquidity: f64,
    /// Maximum creator fee percentage
    #[serde(default = "default_max_creator_fee")]
    pub max_creator_fee: f64,
    /// Minimum holder count
    #[serde(default = "default_min_holders")]
    pub min_holders: i64,
    /// Coins younger than this are rejected (volatility grace period)
    #[serde(default = "default_min_age_minutes")]
    pub min_age_minutes: u64,
    /// Reject a coin when its creator already has this many accepted coins.
    /// 0 disables the quota.
    #[serde(default)]
    pub max_coins_per_creator: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BlacklistConfig {
    /// Blocked token contract addresses
    #[serde(default)]
    pub contract_addresses: Vec<String>,
    /// Blocked creator wallet addresses
    #[serde(default)]
    pub creator_addresses: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TelegramConfig {
    /// Bot token; empty means notifications are skipped
    #[serde(default)]
    pub bot_token: String,
    /// Destination chat/channel id; 0 means notifications are skipped
    #[serde(default)]
    pub chat_id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

// Default value functions
fn default_api_base() -> String {
    "https://api.pump.fun".into()
}

fn default_poll_interval() -> u64 {
    60
}

fn default_fetch_limit() -> u32 {
    10
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_min_liquidity() -> f64 {
    5.0
}

fn default_max_creator_fee() -> f64 {
    10.0
}

fn default_min_holders() -> i64 {
    25
}

fn default_min_age_minutes() -> u64 {
    10
}

fn default_db_path() -> String {
    "pumpfun.db".into()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_api_base(),
            api_key: String::new(),
            poll_interval_secs: default_poll_interval(),
            fetch_limit: default_fetch_limit(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for FiltersConfig {
    fn default() -> Self {
        Self {
            min_liquidity: default_min_liquidity(),
            max_creator_fee: default_max_creator_fee(),
            min_holders: default_min_holders(),
            min_age_minutes: default_min_age_minutes(),
            max_coins_per_creator: 0,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            filters: FiltersConfig::default(),
            blacklist: BlacklistConfig::default(),
            telegram: TelegramConfig::default(),
            database: DatabaseConfig::default(),
        }
    }
}

/// Commented template written on first run so the operator has something
/// to edit instead of the monitor silently running with defaults.
const CONFIG_TEMPLATE: &str = r#"# pump.fun migration monitor configuration

[api]
base_url = "https://api.pump.fun"
api_key = "your_pumpfun_api_key_here"
poll_interval_secs = 60
fetch_limit = 10
timeout_secs = 10

[filters]
min_liquidity = 5.0
max_creator_fee = 10.0
min_holders = 25
min_age_minutes = 10
# 0 disables the per-creator quota
max_coins_per_creator = 0

[blacklist]
contract_addresses = ["0x0000000000000000000000000000000000000000"]
creator_addresses = ["0x0000000000000000000000000000000000000000"]

[telegram]
bot_token = ""
chat_id = 0

[database]
path = "pumpfun.db"
"#;

impl Config {
    /// Load configuration from file and environment variables.
    ///
    /// When the file does not exist a commented template is written in its
    /// place and an error is returned, so a first run never proceeds with
    /// silent defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            std::fs::write(path, CONFIG_TEMPLATE)
                .with_context(|| format!("Failed to write config template to {}", path.display()))?;
            anyhow::bail!(
                "Config file not found. A template was written to {} - edit it and restart",
                path.display()
            );
        }

        let settings = config::Config::builder()
            .add_source(config::File::from(path))
            // Override with environment variables (prefix MONITOR_)
            .add_source(
                config::Environment::with_prefix("MONITOR")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?;

        let config: Config = settings
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        if self.api.poll_interval_secs == 0 {
            anyhow::bail!("poll_interval_secs must be positive");
        }

        if self.api.fetch_limit == 0 {
            anyhow::bail!("fetch_limit must be positive");
        }

        if self.filters.min_liquidity < 0.0 {
            anyhow::bail!("min_liquidity cannot be negative");
        }

        if self.filters.max_creator_fee < 0.0 {
            anyhow::bail!("max_creator_fee cannot be negative");
        }

        if self.filters.min_holders < 0 {
            anyhow::bail!("min_holders cannot be negative");
        }

        if self.filters.max_coins_per_creator < 0 {
            anyhow::bail!("max_coins_per_creator cannot be negative (0 disables the quota)");
        }

        // A bot token without a chat id (or vice versa) is a likely operator
        // mistake; fail it at startup rather than silently skipping alerts.
        let telegram_half_configured = (self.telegram.bot_token.is_empty())
            != (self.telegram.chat_id == 0);
        if telegram_half_configured {
            anyhow::bail!("telegram config needs both bot_token and chat_id (or neither)");
        }

        Ok(())
    }

    /// Get masked configuration for display (hide secrets)
    pub fn masked_display(&self) -> String {
        format!(
            r#"Configuration:
  API:
    base_url: {}
    api_key: {}
    poll_interval: {}s
    fetch_limit: {}
    timeout: {}s
  Filters:
    min_liquidity: {}
    max_creator_fee: {}%
    min_holders: {}
    min_age: {}min
    max_coins_per_creator: {}
  Blacklist:
    contracts: {}
    creators: {}
  Telegram:
    bot_token: {}
    chat_id: {}
  Database:
    path: {}
"#,
            self.api.base_url,
            mask_secret(&self.api.api_key),
            self.api.poll_interval_secs,
            self.api.fetch_limit,
            self.api.timeout_secs,
            self.filters.min_liquidity,
            self.filters.max_creator_fee,
            self.filters.min_holders,
            self.filters.min_age_minutes,
            if self.filters.max_coins_per_creator == 0 {
                "disabled".to_string()
            } else {
                self.filters.max_coins_per_creator.to_string()
            },
            self.blacklist.contract_addresses.len(),
            self.blacklist.creator_addresses.len(),
            mask_secret(&self.telegram.bot_token),
            if self.telegram.chat_id == 0 {
                "(not set)".to_string()
            } else {
                self.telegram.chat_id.to_string()
            },
            self.database.path,
        )
    }
}

/// Mask a secret for display
fn mask_secret(secret: &str) -> &'static str {
    if secret.is_empty() {
        "(not set)"
    } else {
        "***"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.api.poll_interval_secs, 60);
        assert_eq!(config.filters.min_liquidity, 5.0);
        assert_eq!(config.filters.max_coins_per_creator, 0);
        assert!(config.telegram.bot_token.is_empty());
    }

    #[test]
    fn test_validate_rejects_half_configured_telegram() {
        let mut config = Config::default();
        config.telegram.bot_token = "123:abc".to_string();
        assert!(config.validate().is_err());

        config.telegram.chat_id = 42;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_writes_template_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let err = Config::load(&path).unwrap_err();
        assert!(err.to_string().contains("template was written"));
        assert!(path.exists());

        // Template itself must be loadable once the operator edits it
        let config = Config::load(&path).unwrap();
        assert_eq!(config.filters.min_holders, 25);
        assert_eq!(config.api.fetch_limit, 10);
    }

    #[test]
    fn test_mask_secret() {
        assert_eq!(mask_secret(""), "(not set)");
        assert_eq!(mask_secret("hunter2"), "***");
    }
}
