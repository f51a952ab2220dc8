//! Purchase orchestrator.
//!
//! Every stage of a purchase is an action fed back through the store:
//!
//! ```text
//! Purchase ─► PaymentReceived ─► PaymentValidated ─► PaymentProcessed
//!     │                                (Admitted)          │
//!     └─► PurchaseRejected                                 └─► promotion of the
//!                                                              next Waiting attempt
//! ```
//!
//! Each step runs under the store's write lock. Writes made by a step commit
//! before any of its effects run, so a follow-up action never observes a
//! half-applied step.

use crate::config::PaymentConfig;
use crate::error::PurchaseError;
use crate::gateway::BankGateway;
use crate::metrics;
use crate::processor;
use crate::recorder;
use crate::state::{InFlight, PurchaseState};
use crate::types::{AttemptId, FailureReason, Money, PaymentStatus, SeatId, Verdict};
use crate::validator::{self, Promotion};
use seatflow_core::effect::Effect;
use seatflow_core::environment::Clock;
use seatflow_core::reducer::Reducer;
use seatflow_core::{SmallVec, async_effect, smallvec};
use seatflow_macros::Action;
use seatflow_runtime::retry::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

// ============================================================================
// Actions (Commands + Events)
// ============================================================================

/// Actions for the purchase coordinator
#[derive(Action, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum PurchaseAction {
    // Commands
    /// Put a seat on sale
    #[command]
    RegisterSeat {
        /// Seat ID
        seat_id: SeatId,
        /// Asking price
        price: Money,
    },

    /// Buy a seat
    #[command]
    Purchase {
        /// Correlates the reply with the caller
        request_id: Uuid,
        /// Seat ID
        seat_id: SeatId,
        /// Offered price
        price: Money,
    },

    // Events
    /// The request was refused before an attempt was recorded
    #[event]
    PurchaseRejected {
        /// Request being answered
        request_id: Uuid,
        /// Why
        error: PurchaseError,
    },

    /// A Pending attempt was recorded
    #[event]
    PaymentReceived {
        /// Request being answered
        request_id: Uuid,
        /// New attempt
        attempt_id: AttemptId,
        /// Seat ID
        seat_id: SeatId,
    },

    /// The validator decided on an attempt and the verdict is recorded
    #[event]
    PaymentValidated {
        /// Attempt
        attempt_id: AttemptId,
        /// Decision
        verdict: Verdict,
    },

    /// The bank call finished, or every call failed
    #[event]
    PaymentProcessed {
        /// Attempt
        attempt_id: AttemptId,
        /// Success or Failed
        status: PaymentStatus,
        /// Set when `status` is Failed
        reason: Option<FailureReason>,
    },
}

// ============================================================================
// Environment
// ============================================================================

/// Environment dependencies for the purchase coordinator
#[derive(Clone)]
pub struct PurchaseEnvironment {
    /// Clock for attempt timestamps
    pub clock: Arc<dyn Clock>,
    /// Bank used for admitted attempts
    pub gateway: Arc<dyn BankGateway>,
    /// Retry budget per attempt
    pub retry_policy: RetryPolicy,
    /// Upper bound for one bank call
    pub call_timeout: Duration,
}

impl PurchaseEnvironment {
    /// Creates a new `PurchaseEnvironment`
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, gateway: Arc<dyn BankGateway>, payment: &PaymentConfig) -> Self {
        Self {
            clock,
            gateway,
            retry_policy: payment.retry_policy(),
            call_timeout: payment.call_timeout(),
        }
    }
}

// ============================================================================
// Reducer
// ============================================================================

/// Reducer for the purchase coordinator
#[derive(Clone, Debug)]
pub struct PurchaseReducer;

impl PurchaseReducer {
    /// Creates a new `PurchaseReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Validates a Pending attempt and records the verdict
    fn validate_and_record(state: &mut PurchaseState, attempt_id: AttemptId) -> Option<Verdict> {
        let verdict = validator::validate(state, attempt_id)?;

        if let Err(err) = recorder::record_verdict(state, attempt_id, verdict) {
            tracing::warn!(attempt_id = %attempt_id, error = %err, "Could not record verdict");
            return None;
        }

        match verdict {
            Verdict::Admitted => {
                tracing::info!(attempt_id = %attempt_id, "Payment admitted");
            },
            Verdict::Waiting => {
                tracing::info!(attempt_id = %attempt_id, "Payment queued behind an older attempt");
                metrics::record_attempt_status(PaymentStatus::Waiting);
            },
            Verdict::Failed(reason) => {
                tracing::info!(attempt_id = %attempt_id, reason = reason.as_str(), "Payment failed validation");
                metrics::record_attempt_status(PaymentStatus::Failed);
            },
        }
        Some(verdict)
    }

    /// Starts the bank call for an admitted attempt, once
    fn dispatch_admitted(
        state: &mut PurchaseState,
        attempt_id: AttemptId,
        env: &PurchaseEnvironment,
    ) -> SmallVec<[Effect<PurchaseAction>; 4]> {
        let price = state
            .ledger
            .get(attempt_id)
            .filter(|attempt| attempt.status == PaymentStatus::Pending)
            .map(|attempt| attempt.price);

        match (price, state.in_flight.get_mut(&attempt_id)) {
            (Some(price), Some(progress)) if *progress == InFlight::Admitted => {
                *progress = InFlight::Dispatched;
                smallvec![processor::dispatch(attempt_id, price, env)]
            },
            _ => {
                tracing::debug!(attempt_id = %attempt_id, "Attempt not dispatchable, skipping");
                smallvec![Effect::None]
            },
        }
    }

    /// Settles the queue of a seat after one of its attempts finished
    ///
    /// A promoted attempt that fails validation hands the seat straight to
    /// the next Waiting attempt.
    fn promote_next(
        state: &mut PurchaseState,
        seat_id: SeatId,
        mut completed: PaymentStatus,
    ) -> SmallVec<[Effect<PurchaseAction>; 4]> {
        let mut effects = SmallVec::new();

        loop {
            match validator::promote_next(state, seat_id, completed) {
                Promotion::FailRemaining(remaining) => {
                    for attempt_id in remaining {
                        let verdict = Verdict::Failed(FailureReason::SoldElsewhere);
                        match recorder::record_verdict(state, attempt_id, verdict) {
                            Ok(()) => metrics::record_attempt_status(PaymentStatus::Failed),
                            Err(err) => {
                                tracing::warn!(attempt_id = %attempt_id, error = %err, "Could not fail queued attempt");
                            },
                        }
                    }
                    tracing::info!(seat_id = %seat_id, "Seat sold, queued attempts failed");
                    break;
                },
                Promotion::Promote(attempt_id) => {
                    if let Err(err) = recorder::promote(state, attempt_id) {
                        tracing::warn!(attempt_id = %attempt_id, error = %err, "Could not promote attempt");
                        break;
                    }
                    let Some(verdict) = Self::validate_and_record(state, attempt_id) else {
                        break;
                    };
                    effects.push(emit(PurchaseAction::PaymentValidated {
                        attempt_id,
                        verdict,
                    }));
                    if !matches!(verdict, Verdict::Failed(_)) {
                        break;
                    }
                    completed = PaymentStatus::Failed;
                },
                Promotion::Idle => break,
            }
        }

        if effects.is_empty() {
            effects.push(Effect::None);
        }
        effects
    }
}

impl Default for PurchaseReducer {
    fn default() -> Self {
        Self::new()
    }
}

/// Effect that feeds `action` back through the store
///
/// Effect-produced actions reach observers only after the current step has
/// committed.
fn emit(action: PurchaseAction) -> Effect<PurchaseAction> {
    async_effect! { Some(action) }
}

impl Reducer for PurchaseReducer {
    type State = PurchaseState;
    type Action = PurchaseAction;
    type Environment = PurchaseEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            // ========== Catalog ==========
            PurchaseAction::RegisterSeat { seat_id, price } => {
                if state.seats.insert(seat_id, price) {
                    tracing::info!(seat_id = %seat_id, price = price.cents(), "Seat registered");
                } else {
                    tracing::warn!(seat_id = %seat_id, "Seat already registered, keeping existing entry");
                }
                smallvec![Effect::None]
            },

            // ========== Purchase (admission) ==========
            PurchaseAction::Purchase {
                request_id,
                seat_id,
                price,
            } => {
                if let Err(error) = validator::check_purchase(state, seat_id, price) {
                    tracing::warn!(seat_id = %seat_id, error = %error, "Purchase rejected");
                    metrics::record_rejection(error.kind());
                    return smallvec![emit(PurchaseAction::PurchaseRejected { request_id, error })];
                }

                let attempt_id =
                    recorder::create_pending(state, request_id, seat_id, price, env.clock.now());
                metrics::record_attempt_status(PaymentStatus::Pending);

                smallvec![emit(PurchaseAction::PaymentReceived {
                    request_id,
                    attempt_id,
                    seat_id,
                })]
            },

            // ========== Validation ==========
            PurchaseAction::PaymentReceived { attempt_id, .. } => {
                match Self::validate_and_record(state, attempt_id) {
                    Some(verdict) => smallvec![emit(PurchaseAction::PaymentValidated {
                        attempt_id,
                        verdict,
                    })],
                    None => smallvec![Effect::None],
                }
            },

            // ========== Processing ==========
            PurchaseAction::PaymentValidated { attempt_id, verdict } => match verdict {
                Verdict::Admitted => Self::dispatch_admitted(state, attempt_id, env),
                // Recorded when the verdict was made
                Verdict::Waiting | Verdict::Failed(_) => smallvec![Effect::None],
            },

            // ========== Outcome + promotion ==========
            PurchaseAction::PaymentProcessed {
                attempt_id,
                status,
                reason,
            } => {
                let recorded = match recorder::apply_status(state, attempt_id, status, reason) {
                    Ok(recorded) => recorded,
                    Err(err) => {
                        tracing::warn!(attempt_id = %attempt_id, error = %err, "Ignoring bank outcome");
                        return smallvec![Effect::None];
                    },
                };

                metrics::record_attempt_status(recorded);
                if recorded == PaymentStatus::Success {
                    metrics::record_seat_sold();
                }

                match state.ledger.get(attempt_id).map(|attempt| attempt.seat_id) {
                    Some(seat_id) => Self::promote_next(state, seat_id, recorded),
                    None => smallvec![Effect::None],
                }
            },

            PurchaseAction::PurchaseRejected { .. } => smallvec![Effect::None],
        }
    }
}
