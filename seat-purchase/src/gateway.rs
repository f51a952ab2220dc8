//! Bank gateway.
//!
//! The bank is a black box: slow, sometimes failing, sometimes not answering.
//! [`SimulatedBank`] reproduces that behaviour for the demo;
//! [`ScriptedBank`] plays back a fixed list of outcomes for tests.

use crate::config::BankConfig;
use crate::error::BankError;
use crate::types::Money;
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Result codes the bank answers with
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BankResponseCode {
    /// `"200"`
    Success,
    /// `"400"`
    Failed,
}

impl BankResponseCode {
    /// Wire representation
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Success => "200",
            Self::Failed => "400",
        }
    }
}

/// Answer of a completed bank call
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankResponse {
    /// Result code, `"200"` on success
    pub code: String,
}

impl BankResponse {
    /// Response carrying one of the known codes
    #[must_use]
    pub fn new(code: BankResponseCode) -> Self {
        Self {
            code: code.code().to_string(),
        }
    }

    /// Only `"200"` counts as success; any other code is a failure
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.code == BankResponseCode::Success.code()
    }
}

/// Future returned by [`BankGateway::pay`]
pub type BankFuture = Pin<Box<dyn Future<Output = Result<BankResponse, BankError>> + Send>>;

/// Bank gateway trait
///
/// A completed call yields a [`BankResponse`] whatever its code; only
/// transport problems are errors.
pub trait BankGateway: Send + Sync {
    /// Charge `price`
    ///
    /// # Errors
    ///
    /// Returns [`BankError`] if the bank did not produce an answer.
    fn pay(&self, price: Money) -> BankFuture;
}

// ============================================================================
// Simulated bank
// ============================================================================

/// Bank with random latency, random timeouts and random declines
#[derive(Clone, Debug)]
pub struct SimulatedBank {
    latencies: Vec<Duration>,
    timeout_percent: u8,
    failure_percent: u8,
}

impl SimulatedBank {
    /// Creates a simulated bank
    ///
    /// An empty latency list answers immediately. Percentages above 100 are
    /// clamped.
    #[must_use]
    pub fn new(latencies: Vec<Duration>, timeout_percent: u8, failure_percent: u8) -> Self {
        Self {
            latencies,
            timeout_percent: timeout_percent.min(100),
            failure_percent: failure_percent.min(100),
        }
    }

    /// Creates a simulated bank from configuration
    #[must_use]
    pub fn from_config(config: &BankConfig) -> Self {
        Self::new(
            config.latencies_ms.iter().copied().map(Duration::from_millis).collect(),
            config.timeout_percent,
            config.failure_percent,
        )
    }

    /// Creates an Arc-wrapped instance for sharing
    #[must_use]
    pub fn shared(config: &BankConfig) -> Arc<dyn BankGateway> {
        Arc::new(Self::from_config(config))
    }
}

impl BankGateway for SimulatedBank {
    fn pay(&self, price: Money) -> BankFuture {
        // Draw everything up front: the thread-local rng cannot cross an await
        let mut rng = rand::thread_rng();
        let latency = self.latencies.choose(&mut rng).copied().unwrap_or_default();
        let times_out = rng.gen_range(0..100) < self.timeout_percent;
        let declines = rng.gen_range(0..100) < self.failure_percent;

        Box::pin(async move {
            tokio::time::sleep(latency).await;

            if times_out {
                tracing::error!(amount = price.cents(), "Bank timed out");
                return Err(BankError::Timeout);
            }

            let code = if declines {
                BankResponseCode::Failed
            } else {
                BankResponseCode::Success
            };
            tracing::info!(
                amount = price.cents(),
                latency_ms = latency.as_millis(),
                code = code.code(),
                "Bank call completed"
            );
            Ok(BankResponse::new(code))
        })
    }
}

// ============================================================================
// Scripted bank
// ============================================================================

/// One scripted bank behaviour
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScriptedOutcome {
    /// Answer `"200"`
    Approve,
    /// Answer `"400"`
    Decline,
    /// Fail with [`BankError::Timeout`]
    Timeout,
    /// Fail with [`BankError::Unavailable`]
    Unavailable,
    /// Never answer
    Hang,
}

/// Deterministic bank that plays back a queue of outcomes
///
/// Once the script is used up every call gets the fallback outcome.
#[derive(Debug)]
pub struct ScriptedBank {
    script: Mutex<VecDeque<ScriptedOutcome>>,
    fallback: ScriptedOutcome,
    latency: Duration,
    calls: AtomicUsize,
}

impl ScriptedBank {
    /// Bank that always answers with `fallback`
    #[must_use]
    pub const fn new(fallback: ScriptedOutcome) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback,
            latency: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    /// Bank that approves every call
    #[must_use]
    pub const fn approving() -> Self {
        Self::new(ScriptedOutcome::Approve)
    }

    /// Bank that declines every call
    #[must_use]
    pub const fn declining() -> Self {
        Self::new(ScriptedOutcome::Decline)
    }

    /// Outcomes to play back before falling back
    #[must_use]
    pub fn with_script(self, outcomes: impl IntoIterator<Item = ScriptedOutcome>) -> Self {
        Self {
            script: Mutex::new(outcomes.into_iter().collect()),
            ..self
        }
    }

    /// Delay before every answer
    #[must_use]
    pub const fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Number of calls made so far
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn next_outcome(&self) -> ScriptedOutcome {
        let mut script = self
            .script
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        script.pop_front().unwrap_or(self.fallback)
    }
}

impl Default for ScriptedBank {
    fn default() -> Self {
        Self::approving()
    }
}

impl BankGateway for ScriptedBank {
    fn pay(&self, price: Money) -> BankFuture {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let outcome = self.next_outcome();
        let latency = self.latency;

        Box::pin(async move {
            tokio::time::sleep(latency).await;
            tracing::debug!(call, amount = price.cents(), ?outcome, "Scripted bank call");

            match outcome {
                ScriptedOutcome::Approve => Ok(BankResponse::new(BankResponseCode::Success)),
                ScriptedOutcome::Decline => Ok(BankResponse::new(BankResponseCode::Failed)),
                ScriptedOutcome::Timeout => Err(BankError::Timeout),
                ScriptedOutcome::Unavailable => {
                    Err(BankError::Unavailable("scripted outage".to_string()))
                },
                ScriptedOutcome::Hang => std::future::pending().await,
            }
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const PRICE: Money = Money::from_cents(10_000);

    #[test]
    fn test_response_codes() {
        assert!(BankResponse::new(BankResponseCode::Success).is_success());
        assert!(!BankResponse::new(BankResponseCode::Failed).is_success());
        assert!(!BankResponse { code: "503".to_string() }.is_success());
    }

    #[tokio::test]
    async fn test_scripted_bank_plays_back_then_falls_back() {
        let bank = ScriptedBank::declining().with_script([
            ScriptedOutcome::Timeout,
            ScriptedOutcome::Approve,
        ]);

        assert_eq!(bank.pay(PRICE).await, Err(BankError::Timeout));
        assert!(bank.pay(PRICE).await.unwrap().is_success());
        assert!(!bank.pay(PRICE).await.unwrap().is_success());
        assert_eq!(bank.calls(), 3);
    }

    #[tokio::test]
    async fn test_scripted_hang_never_answers() {
        let bank = ScriptedBank::new(ScriptedOutcome::Hang);
        let result = tokio::time::timeout(Duration::from_millis(50), bank.pay(PRICE)).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_simulated_bank_always_declines_at_full_failure_rate() {
        let bank = SimulatedBank::new(vec![Duration::from_millis(2)], 0, 100);
        let response = bank.pay(PRICE).await.unwrap();
        assert_eq!(response.code, "400");
    }

    #[tokio::test]
    async fn test_simulated_bank_times_out_at_full_timeout_rate() {
        let bank = SimulatedBank::new(vec![Duration::from_millis(7)], 100, 0);
        assert_eq!(bank.pay(PRICE).await, Err(BankError::Timeout));
    }

    #[tokio::test]
    async fn test_simulated_bank_approves_without_failures() {
        let bank = SimulatedBank::new(Vec::new(), 0, 0);
        assert!(bank.pay(PRICE).await.unwrap().is_success());
    }

    #[test]
    fn test_percentages_are_clamped() {
        let bank = SimulatedBank::new(Vec::new(), 250, 120);
        assert_eq!(bank.timeout_percent, 100);
        assert_eq!(bank.failure_percent, 100);
    }
}
