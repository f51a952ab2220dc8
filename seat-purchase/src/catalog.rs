//! In-memory seat catalog.

use crate::types::{Money, Seat, SeatId, SeatStatus};
use std::collections::HashMap;

/// Seats known to the coordinator
///
/// The coordinator only reads price and availability, plus the single
/// `Available -> Unavailable` write made by [`mark_sold`](Self::mark_sold).
#[derive(Clone, Debug, Default)]
pub struct SeatCatalog {
    seats: HashMap<SeatId, Seat>,
}

impl SeatCatalog {
    /// Creates an empty catalog
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an available seat
    ///
    /// Returns false and leaves the catalog untouched if the seat exists.
    pub fn insert(&mut self, id: SeatId, price: Money) -> bool {
        if self.seats.contains_key(&id) {
            return false;
        }
        self.seats.insert(id, Seat::available(id, price));
        true
    }

    /// Looks up a seat
    #[must_use]
    pub fn get_seat(&self, id: SeatId) -> Option<&Seat> {
        self.seats.get(&id)
    }

    /// Overwrites the availability of a seat
    ///
    /// Returns the previous status, or `None` for an unknown seat.
    pub fn set_seat_status(&mut self, id: SeatId, status: SeatStatus) -> Option<SeatStatus> {
        self.seats
            .get_mut(&id)
            .map(|seat| std::mem::replace(&mut seat.status, status))
    }

    /// Compare-and-swap `Available -> Unavailable`
    ///
    /// Returns true only for the caller that actually flipped the seat.
    pub fn mark_sold(&mut self, id: SeatId) -> bool {
        match self.seats.get_mut(&id) {
            Some(seat) if seat.is_available() => {
                seat.status = SeatStatus::Unavailable;
                true
            },
            _ => false,
        }
    }

    /// Number of seats
    #[must_use]
    pub fn len(&self) -> usize {
        self.seats.len()
    }

    /// Returns true if the catalog has no seats
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.seats.is_empty()
    }
}
