//! Purchase service facade.
//!
//! The surface an API layer talks to. `purchase` answers as soon as the
//! attempt is recorded; the outcome is learned by polling `status`.

use crate::config::Config;
use crate::error::PurchaseError;
use crate::gateway::BankGateway;
use crate::reducer::{PurchaseAction, PurchaseEnvironment, PurchaseReducer};
use crate::state::PurchaseState;
use crate::types::{AttemptId, FailureReason, Money, PaymentAttempt, PaymentStatus, Seat, SeatId};
use seatflow_core::environment::SystemClock;
use seatflow_runtime::{Store, StoreConfig};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Store running the purchase coordinator
pub type PurchaseStore = Store<PurchaseState, PurchaseAction, PurchaseEnvironment, PurchaseReducer>;

/// Answer to an accepted purchase request
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseReceipt {
    /// Attempt to poll
    pub attempt_id: AttemptId,
    /// Seat being bought
    pub seat_id: SeatId,
    /// Always Pending: nothing is resolved yet
    pub status: PaymentStatus,
    /// Human readable summary
    pub message: String,
}

/// Current state of an attempt
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReport {
    /// Attempt
    pub attempt_id: AttemptId,
    /// Seat being bought
    pub seat_id: SeatId,
    /// Current status
    pub status: PaymentStatus,
    /// Set once the attempt failed
    pub failure: Option<FailureReason>,
    /// Human readable summary
    pub message: String,
}

impl StatusReport {
    fn from_attempt(attempt: &PaymentAttempt) -> Self {
        let message = match attempt.status {
            PaymentStatus::Success => "Seat has been purchased successfully.".to_string(),
            PaymentStatus::Failed => "Purchase failed.".to_string(),
            PaymentStatus::Pending | PaymentStatus::Waiting => {
                format!("Current status: {}", attempt.status)
            },
        };
        Self {
            attempt_id: attempt.id,
            seat_id: attempt.seat_id,
            status: attempt.status,
            failure: attempt.failure,
            message,
        }
    }

    /// Returns true once the attempt reached Success or Failed
    #[must_use]
    pub const fn is_resolved(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Seat purchase coordinator
///
/// Cheap to clone; clones share the same store.
#[derive(Clone)]
pub struct PurchaseService {
    store: PurchaseStore,
    reply_timeout: Duration,
}

impl PurchaseService {
    /// Creates a service over an existing state and environment
    #[must_use]
    pub fn new(
        state: PurchaseState,
        environment: PurchaseEnvironment,
        store_config: StoreConfig,
        reply_timeout: Duration,
    ) -> Self {
        Self {
            store: Store::with_config(state, PurchaseReducer::new(), environment, store_config),
            reply_timeout,
        }
    }

    /// Creates an empty service with the system clock
    #[must_use]
    pub fn from_config(config: &Config, gateway: Arc<dyn BankGateway>) -> Self {
        let environment = PurchaseEnvironment::new(Arc::new(SystemClock), gateway, &config.payment);
        Self::new(
            PurchaseState::new(),
            environment,
            config.runtime.store_config(),
            config.runtime.reply_timeout(),
        )
    }

    /// The underlying store
    #[must_use]
    pub const fn store(&self) -> &PurchaseStore {
        &self.store
    }

    /// Puts a seat on sale
    ///
    /// A seat that already exists is left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`PurchaseError::Unavailable`] if the service is shutting down.
    pub async fn register_seat(&self, seat_id: SeatId, price: Money) -> Result<(), PurchaseError> {
        self.store
            .send(PurchaseAction::RegisterSeat { seat_id, price })
            .await?;
        Ok(())
    }

    /// Requests a seat
    ///
    /// Returns once the attempt is recorded Pending, before the bank is
    /// involved. The reply normally arrives on the action broadcast; if it
    /// was dropped there, the attempt is looked up by request id, so an
    /// attempt that was recorded is always returned to its caller.
    ///
    /// # Errors
    ///
    /// - [`PurchaseError::SeatNotFound`], [`PurchaseError::SeatUnavailable`],
    ///   [`PurchaseError::AlreadySold`], [`PurchaseError::PriceMismatch`]:
    ///   the request was refused and nothing was recorded
    /// - [`PurchaseError::Unavailable`]: the service is shutting down, or the
    ///   refusal reason was lost; nothing was recorded in either case
    pub async fn purchase(&self, seat_id: SeatId, price: Money) -> Result<PurchaseReceipt, PurchaseError> {
        let request_id = Uuid::new_v4();

        let reply = self
            .store
            .send_and_wait_for(
                PurchaseAction::Purchase {
                    request_id,
                    seat_id,
                    price,
                },
                move |action| {
                    matches!(
                        action,
                        PurchaseAction::PaymentReceived { request_id: id, .. }
                        | PurchaseAction::PurchaseRejected { request_id: id, .. }
                            if *id == request_id
                    )
                },
                self.reply_timeout,
            )
            .await;

        match reply {
            Ok(PurchaseAction::PaymentReceived { attempt_id, .. }) => Ok(Self::receipt(attempt_id, seat_id)),
            Ok(PurchaseAction::PurchaseRejected { error, .. }) => Err(error),
            Ok(other) => Err(PurchaseError::Unavailable(format!(
                "unexpected reply {}",
                other.action_name()
            ))),
            Err(err) => {
                // The Purchase step has been reduced by now, so the ledger is authoritative
                let recorded = self
                    .store
                    .state(|state| state.attempt_for_request(request_id))
                    .await;
                match recorded {
                    Some(attempt_id) => {
                        tracing::debug!(attempt_id = %attempt_id, error = %err, "Reply missed, receipt taken from state");
                        Ok(Self::receipt(attempt_id, seat_id))
                    },
                    None => Err(err.into()),
                }
            },
        }
    }

    fn receipt(attempt_id: AttemptId, seat_id: SeatId) -> PurchaseReceipt {
        PurchaseReceipt {
            attempt_id,
            seat_id,
            status: PaymentStatus::Pending,
            message: "Seat purchase is being processed asynchronously.".to_string(),
        }
    }

    /// Reports the current state of an attempt
    ///
    /// # Errors
    ///
    /// Returns [`PurchaseError::AttemptNotFound`] for an unknown attempt.
    pub async fn status(&self, attempt_id: AttemptId) -> Result<StatusReport, PurchaseError> {
        self.store
            .state(|state| state.ledger.get(attempt_id).map(StatusReport::from_attempt))
            .await
            .ok_or(PurchaseError::AttemptNotFound(attempt_id))
    }

    /// Polls `status` until the attempt resolves or `timeout` passes
    ///
    /// Returns the last report either way.
    ///
    /// # Errors
    ///
    /// Returns [`PurchaseError::AttemptNotFound`] for an unknown attempt.
    pub async fn await_resolution(
        &self,
        attempt_id: AttemptId,
        poll_interval: Duration,
        timeout: Duration,
    ) -> Result<StatusReport, PurchaseError> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let report = self.status(attempt_id).await?;
            if report.is_resolved() || tokio::time::Instant::now() >= deadline {
                return Ok(report);
            }
            tokio::time::sleep(poll_interval).await;
        }
    }

    /// Looks up a seat
    pub async fn seat(&self, seat_id: SeatId) -> Option<Seat> {
        self.store
            .state(|state| state.seats.get_seat(seat_id).cloned())
            .await
    }

    /// Every attempt made for a seat, in recording order
    pub async fn attempts_for_seat(&self, seat_id: SeatId) -> Vec<PaymentAttempt> {
        self.store
            .state(|state| {
                state
                    .ledger
                    .attempts_for_seat(seat_id)
                    .into_iter()
                    .cloned()
                    .collect()
            })
            .await
    }

    /// Stops accepting requests and waits for in-flight payments to resolve
    ///
    /// # Errors
    ///
    /// Returns [`PurchaseError::Unavailable`] if payments were still in flight
    /// when `timeout` expired.
    pub async fn shutdown(&self, timeout: Duration) -> Result<(), PurchaseError> {
        self.store.shutdown(timeout).await?;
        Ok(())
    }
}
