//! Admission decisions.
//!
//! Everything here is a pure read of [`PurchaseState`]; the recorder writes
//! the outcome in the same reducer step.

use crate::error::PurchaseError;
use crate::state::PurchaseState;
use crate::types::{AttemptId, FailureReason, Money, PaymentStatus, Seat, SeatId, Verdict};

/// Checks a purchase request before any attempt is recorded
///
/// # Errors
///
/// In order of precedence:
/// - [`PurchaseError::SeatNotFound`]: unknown seat
/// - [`PurchaseError::SeatUnavailable`]: the seat is not Available
/// - [`PurchaseError::AlreadySold`]: an attempt already succeeded
/// - [`PurchaseError::PriceMismatch`]: the offered price is not the seat price
pub fn check_purchase(
    state: &PurchaseState,
    seat_id: SeatId,
    price: Money,
) -> Result<(), PurchaseError> {
    let seat = state
        .seats
        .get_seat(seat_id)
        .ok_or(PurchaseError::SeatNotFound(seat_id))?;

    if !seat.is_available() {
        return Err(PurchaseError::SeatUnavailable(seat_id));
    }

    if state.ledger.exists_success(seat_id) {
        return Err(PurchaseError::AlreadySold(seat_id));
    }

    if seat.price != price {
        return Err(PurchaseError::PriceMismatch {
            seat_id,
            expected: seat.price,
            offered: price,
        });
    }

    Ok(())
}

/// Decides what happens to a Pending attempt
///
/// Returns `None` when there is nothing to decide: the attempt is unknown,
/// no longer Pending, or already admitted.
#[must_use]
pub fn validate(state: &PurchaseState, attempt_id: AttemptId) -> Option<Verdict> {
    let attempt = state.ledger.get(attempt_id)?;
    if attempt.status != PaymentStatus::Pending || state.is_in_flight(attempt_id) {
        return None;
    }

    let available = state
        .seats
        .get_seat(attempt.seat_id)
        .is_some_and(Seat::is_available);
    if !available {
        return Some(Verdict::Failed(FailureReason::SeatUnavailable));
    }

    if state.ledger.exists_success(attempt.seat_id) {
        return Some(Verdict::Failed(FailureReason::AlreadySold));
    }

    if state.ledger.find_unresolved_older_than(attempt).is_some() {
        return Some(Verdict::Waiting);
    }

    Some(Verdict::Admitted)
}

/// What a terminal outcome means for the rest of the seat's queue
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Promotion {
    /// The seat is sold: these attempts can never succeed
    FailRemaining(Vec<AttemptId>),
    /// The seat is free again: this Waiting attempt goes next
    Promote(AttemptId),
    /// Nothing queued
    Idle,
}

/// Picks the follow-up for a seat after an attempt reached `completed`
#[must_use]
pub fn promote_next(state: &PurchaseState, seat_id: SeatId, completed: PaymentStatus) -> Promotion {
    match completed {
        PaymentStatus::Success => {
            let remaining = state.ledger.unresolved_for_seat(seat_id);
            if remaining.is_empty() {
                Promotion::Idle
            } else {
                Promotion::FailRemaining(remaining)
            }
        },
        PaymentStatus::Failed => state
            .ledger
            .find_oldest_waiting(seat_id)
            .map_or(Promotion::Idle, |waiting| Promotion::Promote(waiting.id)),
        PaymentStatus::Pending | PaymentStatus::Waiting => Promotion::Idle,
    }
}
