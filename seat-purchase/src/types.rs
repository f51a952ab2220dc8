//! Domain types for seat purchases.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Identifiers
// ============================================================================

/// Identifier of a seat in the catalog
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SeatId(u64);

impl SeatId {
    /// Wraps a raw seat number
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw seat number
    #[must_use]
    pub const fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SeatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a payment attempt
///
/// Assigned by the ledger in strictly ascending order, so a lower id always
/// belongs to an attempt that was recorded earlier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AttemptId(u64);

impl AttemptId {
    /// Wraps a raw attempt number
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw attempt number
    #[must_use]
    pub const fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for AttemptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Money Value Object (cents-based so price comparison is exact)
// ============================================================================

/// Represents money in cents
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money(u64);

impl Money {
    /// Creates a `Money` value from cents
    #[must_use]
    pub const fn from_cents(cents: u64) -> Self {
        Self(cents)
    }

    /// Creates a `Money` value from dollars
    ///
    /// # Panics
    ///
    /// Panics if the conversion would overflow (dollars * 100 > `u64::MAX`).
    /// Use `checked_from_dollars` for non-panicking conversion.
    #[must_use]
    #[allow(clippy::panic)]
    pub const fn from_dollars(dollars: u64) -> Self {
        match dollars.checked_mul(100) {
            Some(cents) => Self(cents),
            None => panic!("Money::from_dollars overflow"),
        }
    }

    /// Creates a `Money` value from dollars with overflow checking
    #[must_use]
    pub const fn checked_from_dollars(dollars: u64) -> Option<Self> {
        match dollars.checked_mul(100) {
            Some(cents) => Some(Self(cents)),
            None => None,
        }
    }

    /// Returns the amount in cents
    #[must_use]
    pub const fn cents(&self) -> u64 {
        self.0
    }

    /// Returns the amount in dollars (rounded down)
    #[must_use]
    pub const fn dollars(&self) -> u64 {
        self.0 / 100
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}.{:02}", self.dollars(), self.0 % 100)
    }
}

// ============================================================================
// Seat
// ============================================================================

/// Availability flag of a seat
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SeatStatus {
    /// Can be purchased
    Available,
    /// Sold (or withdrawn by the catalog)
    Unavailable,
}

impl fmt::Display for SeatStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Available => write!(f, "AVAILABLE"),
            Self::Unavailable => write!(f, "UNAVAILABLE"),
        }
    }
}

/// A sellable seat
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Seat {
    /// Seat identifier
    pub id: SeatId,
    /// Asking price
    pub price: Money,
    /// Availability
    pub status: SeatStatus,
}

impl Seat {
    /// Creates an available seat
    #[must_use]
    pub const fn available(id: SeatId, price: Money) -> Self {
        Self {
            id,
            price,
            status: SeatStatus::Available,
        }
    }

    /// Returns true if the seat can still be sold
    #[must_use]
    pub const fn is_available(&self) -> bool {
        matches!(self.status, SeatStatus::Available)
    }
}

// ============================================================================
// Payment attempts
// ============================================================================

/// Status of a payment attempt
///
/// ```text
/// Pending ──► Waiting ──► Pending (promoted)
///    │           └──────► Failed
///    ├──► Success
///    └──► Failed
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentStatus {
    /// Recorded, not yet resolved (possibly in flight at the bank)
    Pending,
    /// Queued behind an older attempt for the same seat
    Waiting,
    /// The seat was sold to this attempt
    Success,
    /// The attempt will never succeed
    Failed,
}

impl PaymentStatus {
    /// Success and Failed never change again
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Failed)
    }

    /// Pending or Waiting
    #[must_use]
    pub const fn is_unresolved(self) -> bool {
        !self.is_terminal()
    }

    /// Label used in logs and metrics
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Waiting => "waiting",
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::Waiting => write!(f, "WAITING"),
            Self::Success => write!(f, "SUCCESS"),
            Self::Failed => write!(f, "FAILED"),
        }
    }
}

/// Why an attempt ended Failed
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureReason {
    /// The seat was not available when the attempt was validated
    SeatUnavailable,
    /// Another attempt already succeeded for the seat
    AlreadySold,
    /// The bank accepted the charge but the seat had been sold in the meantime,
    /// or the attempt was still queued when another attempt won the seat
    SoldElsewhere,
    /// The bank answered with a failure code
    PaymentDeclined,
    /// Every bank call errored or timed out
    RetriesExhausted,
}

impl FailureReason {
    /// Label used in logs and metrics
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SeatUnavailable => "seat_unavailable",
            Self::AlreadySold => "already_sold",
            Self::SoldElsewhere => "sold_elsewhere",
            Self::PaymentDeclined => "payment_declined",
            Self::RetriesExhausted => "retries_exhausted",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One request to buy one seat
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentAttempt {
    /// Attempt identifier
    pub id: AttemptId,
    /// Seat being bought
    pub seat_id: SeatId,
    /// Offered price
    pub price: Money,
    /// When the attempt was recorded
    pub created_at: DateTime<Utc>,
    /// Current status
    pub status: PaymentStatus,
    /// Set once the attempt fails
    pub failure: Option<FailureReason>,
}

impl PaymentAttempt {
    /// Position in the seat's queue: oldest first, ties broken by id
    #[must_use]
    pub const fn queue_key(&self) -> (DateTime<Utc>, AttemptId) {
        (self.created_at, self.id)
    }

    /// Returns true if `self` was recorded before `other`
    #[must_use]
    pub fn is_older_than(&self, other: &Self) -> bool {
        self.queue_key() < other.queue_key()
    }
}

/// Decision of the validator about one Pending attempt
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    /// Stays Pending and goes to the bank
    Admitted,
    /// Queued behind an older unresolved attempt
    Waiting,
    /// Will never succeed
    Failed(FailureReason),
}
