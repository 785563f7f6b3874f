//! Telegram alert dispatch
//!
//! Best-effort notifications for newly inserted coins. An unconfigured
//! channel is not an error: the dispatcher reports `Skipped` and the
//! pipeline carries on. Delivery failures never roll back persistence.

use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use crate::config::TelegramConfig;
use crate::error::{Error, Result};
use crate::normalizer::Coin;

/// Outcome of a notification attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Message handed to the channel
    Delivered,
    /// No channel configured; nothing sent
    Skipped,
}

/// Message-send primitive. The Telegram client implements this; tests
/// substitute a recording sink.
#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn send(&self, text: &str) -> Result<()>;
}

/// Telegram Bot API sink
pub struct TelegramSink {
    client: reqwest::Client,
    bot_token: String,
    chat_id: i64,
}

impl TelegramSink {
    pub fn new(bot_token: String, chat_id: i64) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(10))
                .build()
                .unwrap_or_default(),
            bot_token,
            chat_id,
        }
    }
}

#[async_trait]
impl AlertSink for TelegramSink {
    async fn send(&self, text: &str) -> Result<()> {
        let url = format!("https://api.telegram.org/bot{}/sendMessage", self.bot_token);

        let resp = self
            .client
            .post(&url)
            .json(&json!({ "chat_id": self.chat_id, "text": text }))
            .send()
            .await
            .map_err(|e| Error::Delivery(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(Error::Delivery(format!(
                "telegram returned {}",
                resp.status()
            )));
        }

        Ok(())
    }
}

/// Dispatches human-readable alerts for accepted coins
pub struct AlertDispatcher {
    sink: Option<Box<dyn AlertSink>>,
}

impl AlertDispatcher {
    /// Build from config; an empty token or zero chat id leaves the
    /// dispatcher sinkless and every dispatch is `Skipped`.
    pub fn from_config(config: &TelegramConfig) -> Self {
        if config.bot_token.is_empty() || config.chat_id == 0 {
            debug!("Telegram not configured, alerts will be skipped");
            return Self { sink: None };
        }

        Self {
            sink: Some(Box::new(TelegramSink::new(
                config.bot_token.clone(),
                config.chat_id,
            ))),
        }
    }

    /// Dispatcher over an arbitrary sink, used by tests
    pub fn with_sink(sink: Box<dyn AlertSink>) -> Self {
        Self { sink: Some(sink) }
    }

    /// Dispatcher that skips everything, used for dry runs
    pub fn disabled() -> Self {
        Self { sink: None }
    }

    /// Send the new-coin alert for an accepted, newly inserted coin
    pub async fn dispatch(&self, coin: &Coin) -> Result<Delivery> {
        let Some(sink) = &self.sink else {
            return Ok(Delivery::Skipped);
        };

        sink.send(&format_alert(coin)).await?;
        Ok(Delivery::Delivered)
    }
}

/// Human-readable alert body
pub fn format_alert(coin: &Coin) -> String {
    format!(
        "New coin found:\nSymbol: {}\nContract: {}\nLiquidity: {:.2}",
        coin.symbol, coin.contract_address, coin.initial_liquidity
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::sync::{Arc, Mutex};

    #[derive(Clone)]
    struct RecordingSink {
        messages: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl AlertSink for RecordingSink {
        async fn send(&self, text: &str) -> Result<()> {
            self.messages.lock().unwrap().push(text.to_string());
            Ok(())
        }
    }

    fn test_coin() -> Coin {
        Coin {
            contract_address: "0xabcdef0123456789abcdef0123456789abcdef01".to_string(),
            name: "Moon Coin".to_string(),
            symbol: "MOON".to_string(),
            creator_wallet: "0x1111111111111111111111111111111111111111".to_string(),
            migration_time: Utc::now(),
            initial_liquidity: 12.5,
            creator_fee: 2.0,
            holders: 30,
        }
    }

    #[tokio::test]
    async fn test_unconfigured_dispatch_skips() {
        let dispatcher = AlertDispatcher::from_config(&TelegramConfig::default());
        assert_eq!(
            dispatcher.dispatch(&test_coin()).await.unwrap(),
            Delivery::Skipped
        );
    }

    #[tokio::test]
    async fn test_dispatch_sends_formatted_alert() {
        let sink = RecordingSink {
            messages: Arc::new(Mutex::new(Vec::new())),
        };
        let dispatcher = AlertDispatcher::with_sink(Box::new(sink.clone()));

        let delivery = dispatcher.dispatch(&test_coin()).await.unwrap();
        assert_eq!(delivery, Delivery::Delivered);

        let sent = sink.messages.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].contains("MOON"));
        assert!(sent[0].contains("0xabcdef0123456789abcdef0123456789abcdef01"));
        assert!(sent[0].contains("12.50"));
    }

    #[test]
    fn test_format_alert() {
        let text = format_alert(&test_coin());
        assert!(text.starts_with("New coin found:"));
        assert!(text.contains("Liquidity: 12.50"));
    }
}
