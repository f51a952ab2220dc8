//! Reducer state of the purchase coordinator.

use crate::catalog::SeatCatalog;
use crate::ledger::PaymentLedger;
use crate::types::{AttemptId, Money, SeatId};
use std::collections::HashMap;
use uuid::Uuid;

/// Progress of an admitted attempt towards the bank
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InFlight {
    /// Admitted by the validator, bank call not started
    Admitted,
    /// Bank call handed to the runtime
    Dispatched,
}

/// Everything the coordinator knows
///
/// Lives behind the store's write lock, so every reducer step sees and
/// mutates a consistent snapshot of seats and attempts.
#[derive(Clone, Debug, Default)]
pub struct PurchaseState {
    /// Seat availability and prices
    pub seats: SeatCatalog,
    /// Every payment attempt
    pub ledger: PaymentLedger,
    /// Admitted attempts whose bank outcome has not been recorded yet
    pub in_flight: HashMap<AttemptId, InFlight>,
    /// Attempt recorded for each accepted purchase request
    pub requests: HashMap<Uuid, AttemptId>,
}

impl PurchaseState {
    /// Creates an empty state
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a state with the given available seats
    #[must_use]
    pub fn with_seats(seats: impl IntoIterator<Item = (SeatId, Money)>) -> Self {
        let mut state = Self::new();
        for (id, price) in seats {
            state.seats.insert(id, price);
        }
        state
    }

    /// Returns true if the attempt is admitted or already at the bank
    #[must_use]
    pub fn is_in_flight(&self, id: AttemptId) -> bool {
        self.in_flight.contains_key(&id)
    }

    /// Attempt recorded for a purchase request, if it was accepted
    #[must_use]
    pub fn attempt_for_request(&self, request_id: Uuid) -> Option<AttemptId> {
        self.requests.get(&request_id).copied()
    }

    /// Number of admitted attempts for a seat that have not resolved
    #[must_use]
    pub fn in_flight_for_seat(&self, seat_id: SeatId) -> usize {
        self.in_flight
            .keys()
            .filter_map(|id| self.ledger.get(*id))
            .filter(|attempt| attempt.seat_id == seat_id)
            .count()
    }
}
