// Pump.fun migrations feed client
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::config::ApiConfig;
use crate::error::{Error, Result};

/// Nested token object inside a raw migration record
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawToken {
    pub name: Option<String>,
    pub symbol: Option<String>,
}

/// One raw record from the migrations feed.
///
/// Everything is optional and the numeric fields are kept as raw JSON
/// values because the upstream sends them as either numbers or strings.
/// Validation happens in the normalizer, not here.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawMigration {
    #[serde(rename = "contractAddress")]
    pub contract_address: Option<String>,
    pub token: Option<RawToken>,
    pub creator: Option<String>,
    #[serde(rename = "migrationTime")]
    pub migration_time: Option<String>,
    #[serde(rename = "initialLiquidity")]
    pub initial_liquidity: Option<Value>,
    #[serde(rename = "feePercentage")]
    pub fee_percentage: Option<Value>,
    #[serde(rename = "holderCount")]
    pub holder_count: Option<Value>,
}

/// Top-level feed response: `{ "data": [ ... ] }`
#[derive(Debug, Deserialize)]
struct MigrationsResponse {
    data: Option<Vec<RawMigration>>,
}

/// Source of raw migration records.
///
/// The HTTP client implements this; tests substitute a canned source.
#[async_trait]
pub trait MigrationSource: Send + Sync {
    /// Fetch up to `limit` of the most recent migrations, newest first.
    async fn fetch_migrations(&self, limit: u32) -> Result<Vec<RawMigration>>;
}

/// HTTP client for the pump.fun migrations API
pub struct FeedClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl FeedClient {
    pub fn new(config: &ApiConfig) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(config.timeout_secs))
                .build()
                .unwrap_or_default(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        }
    }
}

#[async_trait]
impl MigrationSource for FeedClient {
    async fn fetch_migrations(&self, limit: u32) -> Result<Vec<RawMigration>> {
        let url = format!("{}/migrations?limit={}&sort=desc", self.base_url, limit);
        debug!("Fetching migrations: {}", url);

        let resp = self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .header("Content-Type", "application/json")
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Fetch(format!(
                "migrations endpoint returned {}",
                status
            )));
        }

        let body: MigrationsResponse = resp
            .json()
            .await
            .map_err(|e| Error::MalformedResponse(e.to_string()))?;

        body.data
            .ok_or_else(|| Error::MalformedResponse("missing data array".to_string()))
    }
}
