//! Configuration for the purchase coordinator.
//!
//! Loads configuration from environment variables with sensible defaults.

use seatflow_runtime::StoreConfig;
use seatflow_runtime::retry::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Bank call retry budget
    pub payment: PaymentConfig,
    /// Simulated bank behaviour
    pub bank: BankConfig,
    /// Store and request settings
    pub runtime: RuntimeConfig,
    /// Demo scenario
    pub demo: DemoConfig,
}

/// Retry budget for one payment attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentConfig {
    /// Total bank calls per attempt, first call included
    pub max_attempts: usize,
    /// Pause between calls in milliseconds
    pub retry_backoff_ms: u64,
    /// Upper bound for a single call in milliseconds
    pub call_timeout_ms: u64,
}

impl PaymentConfig {
    /// Fixed-delay retry policy for bank calls
    #[must_use]
    pub const fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::fixed(self.max_attempts, Duration::from_millis(self.retry_backoff_ms))
    }

    /// Upper bound for a single bank call
    #[must_use]
    pub const fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            retry_backoff_ms: 3000,
            call_timeout_ms: 10_000,
        }
    }
}

/// Behaviour of the simulated bank
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BankConfig {
    /// Candidate latencies in milliseconds, one picked per call
    pub latencies_ms: Vec<u64>,
    /// Chance of a timeout, in percent
    pub timeout_percent: u8,
    /// Chance of a `"400"` answer, in percent
    pub failure_percent: u8,
}

impl Default for BankConfig {
    fn default() -> Self {
        Self {
            latencies_ms: vec![2000, 3000, 5000, 7000],
            timeout_percent: 10,
            failure_percent: 30,
        }
    }
}

/// Store and request settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Capacity of the action broadcast channel
    pub broadcast_capacity: usize,
    /// How long `purchase` waits for the attempt to be recorded, in milliseconds
    pub reply_timeout_ms: u64,
    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout: u64,
}

impl RuntimeConfig {
    /// Store configuration
    #[must_use]
    pub const fn store_config(&self) -> StoreConfig {
        StoreConfig::new(self.broadcast_capacity, Duration::from_secs(self.shutdown_timeout))
    }

    /// How long `purchase` waits for the attempt to be recorded
    #[must_use]
    pub const fn reply_timeout(&self) -> Duration {
        Duration::from_millis(self.reply_timeout_ms)
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            broadcast_capacity: 1024,
            reply_timeout_ms: 5000,
            shutdown_timeout: 30,
        }
    }
}

/// Demo scenario: concurrent buyers per seat
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemoConfig {
    /// Seats on sale
    pub seats: u64,
    /// Concurrent buyers per seat
    pub buyers_per_seat: usize,
    /// Price of every seat in cents
    pub seat_price_cents: u64,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            seats: 3,
            buyers_per_seat: 4,
            seat_price_cents: 10_000,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Falls back to defaults for missing or unparsable variables.
    #[must_use]
    pub fn from_env() -> Self {
        let payment = PaymentConfig::default();
        let bank = BankConfig::default();
        let runtime = RuntimeConfig::default();
        let demo = DemoConfig::default();

        Self {
            payment: PaymentConfig {
                max_attempts: parsed("PAYMENT_MAX_ATTEMPTS").unwrap_or(payment.max_attempts),
                retry_backoff_ms: parsed("PAYMENT_RETRY_BACKOFF_MS")
                    .unwrap_or(payment.retry_backoff_ms),
                call_timeout_ms: parsed("PAYMENT_CALL_TIMEOUT_MS")
                    .unwrap_or(payment.call_timeout_ms),
            },
            bank: BankConfig {
                latencies_ms: env::var("BANK_LATENCIES_MS")
                    .ok()
                    .and_then(|s| parse_list(&s))
                    .unwrap_or(bank.latencies_ms),
                timeout_percent: parsed("BANK_TIMEOUT_PERCENT").unwrap_or(bank.timeout_percent),
                failure_percent: parsed("BANK_FAILURE_PERCENT").unwrap_or(bank.failure_percent),
            },
            runtime: RuntimeConfig {
                broadcast_capacity: parsed("STORE_BROADCAST_CAPACITY")
                    .unwrap_or(runtime.broadcast_capacity),
                reply_timeout_ms: parsed("PURCHASE_REPLY_TIMEOUT_MS")
                    .unwrap_or(runtime.reply_timeout_ms),
                shutdown_timeout: parsed("SHUTDOWN_TIMEOUT").unwrap_or(runtime.shutdown_timeout),
            },
            demo: DemoConfig {
                seats: parsed("DEMO_SEATS").unwrap_or(demo.seats),
                buyers_per_seat: parsed("DEMO_BUYERS_PER_SEAT").unwrap_or(demo.buyers_per_seat),
                seat_price_cents: parsed("DEMO_SEAT_PRICE_CENTS")
                    .unwrap_or(demo.seat_price_cents),
            },
        }
    }
}

fn parsed<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

/// Comma-separated list of numbers; `None` if any entry is malformed
fn parse_list(raw: &str) -> Option<Vec<u64>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse().ok())
        .collect()
}
