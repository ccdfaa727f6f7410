use std::fmt::Display;
use std::ops::RangeInclusive;
use std::str::FromStr;
use std::time::Duration;

use crate::application::actors::order_scheduler::SchedulerConfig;

/// Runtime configuration for the settlement engine
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub database_url: String,
    pub bind_addr: String,
    pub price_oracle_url: String,
    pub scheduler_interval_seconds: u64, // Period between scheduler ticks
    pub price_timeout_milliseconds: u64, // Per-symbol oracle lookup timeout
    pub max_price_failures: Option<u32>, // None = retry on every tick forever
    pub max_trade_retries: u32,          // Version-conflict retries per trade
    pub max_parallel_accounts: usize,
    pub max_concurrent_price_lookups: usize,
    pub notifier_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            database_url: "sqlite://data/stockfolio.db".to_string(),
            bind_addr: "127.0.0.1:3000".to_string(),
            price_oracle_url: "http://127.0.0.1:8081".to_string(),
            scheduler_interval_seconds: 60, // once per minute
            price_timeout_milliseconds: 5000,
            max_price_failures: None,
            max_trade_retries: 3,
            max_parallel_accounts: 4,
            max_concurrent_price_lookups: 8,
            notifier_capacity: 1024,
        }
    }
}

fn parse_in_range<T>(key: &str, raw: &str, range: RangeInclusive<T>, default: T) -> T
where
    T: FromStr + PartialOrd + Display + Copy,
    T::Err: Display,
{
    match raw.trim().parse::<T>() {
        Ok(value) if range.contains(&value) => value,
        Ok(value) => {
            tracing::warn!(
                "Invalid {} value: {} (must be between {} and {}), using default: {}",
                key,
                value,
                range.start(),
                range.end(),
                default
            );
            default
        }
        Err(e) => {
            tracing::warn!(
                "Failed to parse {} '{}': {}, using default: {}",
                key,
                raw,
                e,
                default
            );
            default
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> EngineConfig {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset or invalid keys keep their default
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> EngineConfig {
        let mut config = EngineConfig::default();

        if let Some(url) = var("DATABASE_URL") {
            if !url.trim().is_empty() {
                config.database_url = url;
            }
        }

        if let Some(addr) = var("BIND_ADDR") {
            match addr.parse::<std::net::SocketAddr>() {
                Ok(_) => config.bind_addr = addr,
                Err(e) => tracing::warn!(
                    "Invalid BIND_ADDR '{}': {}, using default: {}",
                    addr,
                    e,
                    config.bind_addr
                ),
            }
        }

        if let Some(url) = var("PRICE_ORACLE_URL") {
            if url.starts_with("http://") || url.starts_with("https://") {
                config.price_oracle_url = url.trim_end_matches('/').to_string();
            } else {
                tracing::warn!(
                    "Invalid PRICE_ORACLE_URL '{}' (must be http or https), using default: {}",
                    url,
                    config.price_oracle_url
                );
            }
        }

        if let Some(raw) = var("SCHEDULER_INTERVAL_SECONDS") {
            config.scheduler_interval_seconds = parse_in_range(
                "SCHEDULER_INTERVAL_SECONDS",
                &raw,
                1..=3600,
                config.scheduler_interval_seconds,
            );
        }

        if let Some(raw) = var("PRICE_TIMEOUT_MILLISECONDS") {
            config.price_timeout_milliseconds = parse_in_range(
                "PRICE_TIMEOUT_MILLISECONDS",
                &raw,
                100..=60000,
                config.price_timeout_milliseconds,
            );
        }

        if let Some(raw) = var("MAX_PRICE_FAILURES") {
            match raw.trim().parse::<u32>() {
                Ok(value) if (1..=10000).contains(&value) => {
                    config.max_price_failures = Some(value);
                }
                _ => tracing::warn!(
                    "Invalid MAX_PRICE_FAILURES '{}' (must be between 1 and 10000), retrying without limit",
                    raw
                ),
            }
        }

        if let Some(raw) = var("MAX_TRADE_RETRIES") {
            config.max_trade_retries =
                parse_in_range("MAX_TRADE_RETRIES", &raw, 0..=10, config.max_trade_retries);
        }

        if let Some(raw) = var("MAX_PARALLEL_ACCOUNTS") {
            config.max_parallel_accounts = parse_in_range(
                "MAX_PARALLEL_ACCOUNTS",
                &raw,
                1..=64,
                config.max_parallel_accounts,
            );
        }

        if let Some(raw) = var("MAX_CONCURRENT_PRICE_LOOKUPS") {
            config.max_concurrent_price_lookups = parse_in_range(
                "MAX_CONCURRENT_PRICE_LOOKUPS",
                &raw,
                1..=64,
                config.max_concurrent_price_lookups,
            );
        }

        if let Some(raw) = var("NOTIFIER_CAPACITY") {
            config.notifier_capacity =
                parse_in_range("NOTIFIER_CAPACITY", &raw, 16..=65536, config.notifier_capacity);
        }

        config
    }

    pub fn scheduler(&self) -> SchedulerConfig {
        SchedulerConfig {
            interval: Duration::from_secs(self.scheduler_interval_seconds),
            price_timeout: Duration::from_millis(self.price_timeout_milliseconds),
            max_price_failures: self.max_price_failures,
            max_parallel_accounts: self.max_parallel_accounts,
            max_concurrent_price_lookups: self.max_concurrent_price_lookups,
        }
    }
}
