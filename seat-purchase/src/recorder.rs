//! Ledger and catalog writes.
//!
//! Plain functions over `&mut PurchaseState`, called from inside a reducer
//! step so each write commits together with the decision that caused it.

use crate::error::LedgerError;
use crate::state::{InFlight, PurchaseState};
use crate::types::{AttemptId, FailureReason, Money, PaymentStatus, SeatId, Verdict};
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Records a new Pending attempt for `request_id`
pub fn create_pending(
    state: &mut PurchaseState,
    request_id: Uuid,
    seat_id: SeatId,
    price: Money,
    now: DateTime<Utc>,
) -> AttemptId {
    let id = state.ledger.insert(seat_id, price, now);
    state.requests.insert(request_id, id);
    tracing::info!(attempt_id = %id, seat_id = %seat_id, price = price.cents(), "Payment attempt recorded");
    id
}

/// Writes a validator verdict
///
/// Admitted attempts stay Pending and are registered in flight.
///
/// # Errors
///
/// Fails if the attempt is unknown or already terminal.
pub fn record_verdict(
    state: &mut PurchaseState,
    attempt_id: AttemptId,
    verdict: Verdict,
) -> Result<(), LedgerError> {
    match verdict {
        Verdict::Admitted => {
            let attempt = state
                .ledger
                .get(attempt_id)
                .ok_or(LedgerError::NotFound(attempt_id))?;
            if attempt.status != PaymentStatus::Pending {
                return Err(LedgerError::Terminal {
                    id: attempt_id,
                    status: attempt.status,
                    requested: PaymentStatus::Pending,
                });
            }
            state.in_flight.entry(attempt_id).or_insert(InFlight::Admitted);
        },
        Verdict::Waiting => {
            state.ledger.update_status(attempt_id, PaymentStatus::Waiting)?;
        },
        Verdict::Failed(reason) => {
            state.ledger.mark_failed(attempt_id, reason)?;
            state.in_flight.remove(&attempt_id);
        },
    }
    Ok(())
}

/// Moves a Waiting attempt back to Pending so it can be validated again
///
/// # Errors
///
/// Fails if the attempt is unknown or already terminal.
pub fn promote(state: &mut PurchaseState, attempt_id: AttemptId) -> Result<(), LedgerError> {
    state.ledger.update_status(attempt_id, PaymentStatus::Pending)?;
    tracing::info!(attempt_id = %attempt_id, "Waiting payment promoted");
    Ok(())
}

/// Applies the outcome of the bank call and returns the status actually
/// recorded
///
/// A Success sells the seat by compare-and-swap. If the seat was no longer
/// Available the attempt is recorded Failed with
/// [`FailureReason::SoldElsewhere`] instead. A Failed outcome without a
/// reason is recorded as [`FailureReason::PaymentDeclined`].
///
/// # Errors
///
/// Fails if the attempt is unknown or already terminal; nothing is written
/// in that case.
pub fn apply_status(
    state: &mut PurchaseState,
    attempt_id: AttemptId,
    status: PaymentStatus,
    reason: Option<FailureReason>,
) -> Result<PaymentStatus, LedgerError> {
    let attempt = state
        .ledger
        .get(attempt_id)
        .ok_or(LedgerError::NotFound(attempt_id))?;
    if attempt.status.is_terminal() {
        return Err(LedgerError::Terminal {
            id: attempt_id,
            status: attempt.status,
            requested: status,
        });
    }
    let seat_id = attempt.seat_id;

    state.in_flight.remove(&attempt_id);

    let recorded = match status {
        PaymentStatus::Success => {
            if state.seats.mark_sold(seat_id) {
                state.ledger.update_status(attempt_id, PaymentStatus::Success)?;
                PaymentStatus::Success
            } else {
                tracing::warn!(
                    attempt_id = %attempt_id,
                    seat_id = %seat_id,
                    "Bank approved a payment for a seat that is no longer available"
                );
                state.ledger.mark_failed(attempt_id, FailureReason::SoldElsewhere)?;
                PaymentStatus::Failed
            }
        },
        PaymentStatus::Failed => {
            let reason = reason.unwrap_or(FailureReason::PaymentDeclined);
            state.ledger.mark_failed(attempt_id, reason)?;
            PaymentStatus::Failed
        },
        PaymentStatus::Pending | PaymentStatus::Waiting => {
            state.ledger.update_status(attempt_id, status)?;
            status
        },
    };

    tracing::info!(
        attempt_id = %attempt_id,
        seat_id = %seat_id,
        status = recorded.as_str(),
        "Payment status recorded"
    );
    Ok(recorded)
}
