//! Pump.fun Migration Monitor Library
//!
//! Polls the pump.fun migrations feed, filters new coins against
//! configurable policy rules and blacklists, persists accepted coins and
//! sends Telegram alerts.

pub mod cli;
pub mod config;
pub mod error;
pub mod feed;
pub mod monitor;
pub mod normalizer;
pub mod notifier;
pub mod policy;
pub mod store;

// Re-export commonly used types
pub use config::Config;
pub use error::{Error, Result};
