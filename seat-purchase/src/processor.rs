//! External payment processing.
//!
//! Admitted attempts are charged on a runtime task, never inside a reducer
//! step. Every path ends in a [`PurchaseAction::PaymentProcessed`], so an
//! attempt handed to the processor always resolves.

use crate::error::BankError;
use crate::gateway::{BankGateway, BankResponse};
use crate::metrics;
use crate::reducer::{PurchaseAction, PurchaseEnvironment};
use crate::types::{AttemptId, FailureReason, Money, PaymentStatus};
use seatflow_core::async_effect;
use seatflow_core::effect::Effect;
use seatflow_runtime::retry::{RetryPolicy, retry_with_backoff};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// One bank call, bounded by `call_timeout`
///
/// # Errors
///
/// Returns [`BankError::Timeout`] if the bank does not answer in time, or
/// whatever transport error the gateway reports.
pub async fn charge_once(
    gateway: Arc<dyn BankGateway>,
    price: Money,
    call_timeout: Duration,
) -> Result<BankResponse, BankError> {
    let result = tokio::time::timeout(call_timeout, gateway.pay(price))
        .await
        .unwrap_or(Err(BankError::Timeout));

    match &result {
        Ok(response) if response.is_success() => metrics::record_bank_call("approved"),
        Ok(_) => metrics::record_bank_call("declined"),
        Err(err) => metrics::record_bank_call(err.as_str()),
    }
    result
}

/// Charges an admitted attempt, retrying transport errors
///
/// A completed call is final whatever its code: a declined payment is not
/// retried. Running out of calls forces the attempt to Failed.
pub async fn process_with_retry(
    attempt_id: AttemptId,
    price: Money,
    gateway: Arc<dyn BankGateway>,
    policy: RetryPolicy,
    call_timeout: Duration,
) -> PurchaseAction {
    let started = Instant::now();
    let outcome = retry_with_backoff(policy, || {
        charge_once(Arc::clone(&gateway), price, call_timeout)
    })
    .await;
    metrics::record_processing_time(started.elapsed());

    let (status, reason) = match outcome {
        Ok(response) if response.is_success() => (PaymentStatus::Success, None),
        Ok(response) => {
            tracing::info!(attempt_id = %attempt_id, code = %response.code, "Bank declined payment");
            (PaymentStatus::Failed, Some(FailureReason::PaymentDeclined))
        },
        Err(err) => {
            tracing::error!(attempt_id = %attempt_id, error = %err, "Bank calls exhausted, failing payment");
            (PaymentStatus::Failed, Some(FailureReason::RetriesExhausted))
        },
    };

    PurchaseAction::PaymentProcessed {
        attempt_id,
        status,
        reason,
    }
}

/// Effect that charges an admitted attempt and feeds the outcome back
#[must_use]
pub fn dispatch(attempt_id: AttemptId, price: Money, env: &PurchaseEnvironment) -> Effect<PurchaseAction> {
    let gateway = Arc::clone(&env.gateway);
    let policy = env.retry_policy.clone();
    let call_timeout = env.call_timeout;

    tracing::info!(attempt_id = %attempt_id, amount = price.cents(), "Dispatching payment to bank");

    async_effect! {
        Some(process_with_retry(attempt_id, price, gateway, policy, call_timeout).await)
    }
}
