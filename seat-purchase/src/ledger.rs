//! In-memory ledger of payment attempts.
//!
//! Attempts are appended, never removed. Ids are handed out in strictly
//! ascending order, so they double as the tie-breaker when two attempts share
//! a timestamp.

use crate::error::LedgerError;
use crate::types::{AttemptId, FailureReason, Money, PaymentAttempt, PaymentStatus, SeatId};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};

/// Append-only store of payment attempts
#[derive(Clone, Debug, Default)]
pub struct PaymentLedger {
    attempts: BTreeMap<AttemptId, PaymentAttempt>,
    by_seat: HashMap<SeatId, Vec<AttemptId>>,
    last_id: u64,
}

impl PaymentLedger {
    /// Creates an empty ledger
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a Pending attempt and returns its id
    pub fn insert(&mut self, seat_id: SeatId, price: Money, created_at: DateTime<Utc>) -> AttemptId {
        self.last_id += 1;
        let id = AttemptId::new(self.last_id);
        self.attempts.insert(
            id,
            PaymentAttempt {
                id,
                seat_id,
                price,
                created_at,
                status: PaymentStatus::Pending,
                failure: None,
            },
        );
        self.by_seat.entry(seat_id).or_default().push(id);
        id
    }

    /// Looks up an attempt
    #[must_use]
    pub fn get(&self, id: AttemptId) -> Option<&PaymentAttempt> {
        self.attempts.get(&id)
    }

    /// Changes the status of a non-terminal attempt
    ///
    /// Returns the previous status.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::NotFound`]: unknown attempt
    /// - [`LedgerError::Terminal`]: the attempt is already Success or Failed
    pub fn update_status(
        &mut self,
        id: AttemptId,
        status: PaymentStatus,
    ) -> Result<PaymentStatus, LedgerError> {
        let attempt = self.attempts.get_mut(&id).ok_or(LedgerError::NotFound(id))?;
        if attempt.status.is_terminal() {
            return Err(LedgerError::Terminal {
                id,
                status: attempt.status,
                requested: status,
            });
        }
        Ok(std::mem::replace(&mut attempt.status, status))
    }

    /// Marks a non-terminal attempt Failed and records why
    ///
    /// # Errors
    ///
    /// Same as [`update_status`](Self::update_status).
    pub fn mark_failed(
        &mut self,
        id: AttemptId,
        reason: FailureReason,
    ) -> Result<PaymentStatus, LedgerError> {
        let previous = self.update_status(id, PaymentStatus::Failed)?;
        if let Some(attempt) = self.attempts.get_mut(&id) {
            attempt.failure = Some(reason);
        }
        Ok(previous)
    }

    /// Oldest unresolved attempt for the same seat recorded before `attempt`
    #[must_use]
    pub fn find_unresolved_older_than(&self, attempt: &PaymentAttempt) -> Option<&PaymentAttempt> {
        self.seat_attempts(attempt.seat_id)
            .filter(|other| other.id != attempt.id)
            .filter(|other| other.status.is_unresolved())
            .filter(|other| other.is_older_than(attempt))
            .min_by_key(|other| other.queue_key())
    }

    /// Oldest Waiting attempt for a seat
    #[must_use]
    pub fn find_oldest_waiting(&self, seat_id: SeatId) -> Option<&PaymentAttempt> {
        self.seat_attempts(seat_id)
            .filter(|attempt| attempt.status == PaymentStatus::Waiting)
            .min_by_key(|attempt| attempt.queue_key())
    }

    /// Returns true if any attempt for the seat reached Success
    #[must_use]
    pub fn exists_success(&self, seat_id: SeatId) -> bool {
        self.seat_attempts(seat_id)
            .any(|attempt| attempt.status == PaymentStatus::Success)
    }

    /// Ids of Pending and Waiting attempts for a seat, oldest first
    #[must_use]
    pub fn unresolved_for_seat(&self, seat_id: SeatId) -> Vec<AttemptId> {
        let mut unresolved: Vec<&PaymentAttempt> = self
            .seat_attempts(seat_id)
            .filter(|attempt| attempt.status.is_unresolved())
            .collect();
        unresolved.sort_by_key(|attempt| attempt.queue_key());
        unresolved.into_iter().map(|attempt| attempt.id).collect()
    }

    /// Every attempt for a seat, in recording order
    #[must_use]
    pub fn attempts_for_seat(&self, seat_id: SeatId) -> Vec<&PaymentAttempt> {
        self.seat_attempts(seat_id).collect()
    }

    /// Number of attempts
    #[must_use]
    pub fn len(&self) -> usize {
        self.attempts.len()
    }

    /// Returns true if nothing was recorded
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.attempts.is_empty()
    }

    fn seat_attempts(&self, seat_id: SeatId) -> impl Iterator<Item = &PaymentAttempt> {
        self.by_seat
            .get(&seat_id)
            .into_iter()
            .flatten()
            .filter_map(|id| self.attempts.get(id))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn epoch() -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(1_735_689_600, 0).unwrap()
    }

    const SEAT: SeatId = SeatId::new(1);
    const PRICE: Money = Money::from_cents(10_000);

    #[test]
    fn test_ids_are_ascending() {
        let mut ledger = PaymentLedger::new();
        let first = ledger.insert(SEAT, PRICE, epoch());
        let second = ledger.insert(SeatId::new(2), PRICE, epoch());
        let third = ledger.insert(SEAT, PRICE, epoch());

        assert!(first < second && second < third);
        assert_eq!(ledger.len(), 3);
        assert_eq!(ledger.get(first).unwrap().status, PaymentStatus::Pending);
    }

    #[test]
    fn test_terminal_status_is_final() {
        let mut ledger = PaymentLedger::new();
        let id = ledger.insert(SEAT, PRICE, epoch());

        assert_eq!(
            ledger.update_status(id, PaymentStatus::Success),
            Ok(PaymentStatus::Pending)
        );
        assert_eq!(
            ledger.update_status(id, PaymentStatus::Failed),
            Err(LedgerError::Terminal {
                id,
                status: PaymentStatus::Success,
                requested: PaymentStatus::Failed,
            })
        );
        assert!(ledger.mark_failed(id, FailureReason::PaymentDeclined).is_err());
        assert_eq!(ledger.get(id).unwrap().failure, None);
    }

    #[test]
    fn test_update_unknown_attempt() {
        let mut ledger = PaymentLedger::new();
        let missing = AttemptId::new(42);
        assert_eq!(
            ledger.update_status(missing, PaymentStatus::Waiting),
            Err(LedgerError::NotFound(missing))
        );
    }

    #[test]
    fn test_mark_failed_records_reason() {
        let mut ledger = PaymentLedger::new();
        let id = ledger.insert(SEAT, PRICE, epoch());
        ledger.mark_failed(id, FailureReason::RetriesExhausted).unwrap();

        let attempt = ledger.get(id).unwrap();
        assert_eq!(attempt.status, PaymentStatus::Failed);
        assert_eq!(attempt.failure, Some(FailureReason::RetriesExhausted));
    }

    #[test]
    fn test_find_unresolved_older_than() {
        let mut ledger = PaymentLedger::new();
        let later = ledger.insert(SEAT, PRICE, epoch() + Duration::seconds(5));
        let earlier = ledger.insert(SEAT, PRICE, epoch());
        let other_seat = ledger.insert(SeatId::new(2), PRICE, epoch() - Duration::seconds(5));

        let later_attempt = ledger.get(later).unwrap().clone();
        let earlier_attempt = ledger.get(earlier).unwrap().clone();

        assert_eq!(
            ledger.find_unresolved_older_than(&later_attempt).map(|a| a.id),
            Some(earlier)
        );
        assert!(ledger.find_unresolved_older_than(&earlier_attempt).is_none());

        ledger.mark_failed(earlier, FailureReason::PaymentDeclined).unwrap();
        assert!(ledger.find_unresolved_older_than(&later_attempt).is_none());
        assert!(ledger.get(other_seat).is_some());
    }

    #[test]
    fn test_equal_timestamps_use_id_order() {
        let mut ledger = PaymentLedger::new();
        let first = ledger.insert(SEAT, PRICE, epoch());
        let second = ledger.insert(SEAT, PRICE, epoch());

        let second_attempt = ledger.get(second).unwrap().clone();
        let first_attempt = ledger.get(first).unwrap().clone();
        assert_eq!(
            ledger.find_unresolved_older_than(&second_attempt).map(|a| a.id),
            Some(first)
        );
        assert!(ledger.find_unresolved_older_than(&first_attempt).is_none());
    }

    #[test]
    fn test_find_oldest_waiting_and_unresolved() {
        let mut ledger = PaymentLedger::new();
        let a = ledger.insert(SEAT, PRICE, epoch());
        let b = ledger.insert(SEAT, PRICE, epoch() + Duration::seconds(2));
        let c = ledger.insert(SEAT, PRICE, epoch() + Duration::seconds(1));
        ledger.update_status(b, PaymentStatus::Waiting).unwrap();
        ledger.update_status(c, PaymentStatus::Waiting).unwrap();

        assert_eq!(ledger.find_oldest_waiting(SEAT).map(|w| w.id), Some(c));
        assert_eq!(ledger.unresolved_for_seat(SEAT), vec![a, c, b]);
        assert!(ledger.find_oldest_waiting(SeatId::new(2)).is_none());
    }

    #[test]
    fn test_exists_success() {
        let mut ledger = PaymentLedger::new();
        let id = ledger.insert(SEAT, PRICE, epoch());
        assert!(!ledger.exists_success(SEAT));
        ledger.update_status(id, PaymentStatus::Success).unwrap();
        assert!(ledger.exists_success(SEAT));
        assert_eq!(ledger.attempts_for_seat(SEAT).len(), 1);
    }
}
