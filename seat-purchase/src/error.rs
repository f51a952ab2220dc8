//! Error types for seat purchases.

use crate::types::{AttemptId, Money, PaymentStatus, SeatId};
use seatflow_runtime::StoreError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Coarse classification of a [`PurchaseError`], for the API collaborator
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Unknown seat or attempt
    NotFound,
    /// The seat cannot be sold any more
    Conflict,
    /// The request itself is wrong
    Validation,
    /// The coordinator could not answer
    Unavailable,
}

impl ErrorKind {
    /// Label used in logs and metrics
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::Conflict => "conflict",
            Self::Validation => "validation",
            Self::Unavailable => "unavailable",
        }
    }
}

/// Errors returned synchronously to a purchaser
#[derive(Error, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PurchaseError {
    /// No seat with this id
    #[error("Seat not found: {0}")]
    SeatNotFound(SeatId),

    /// No attempt with this id
    #[error("Payment attempt not found: {0}")]
    AttemptNotFound(AttemptId),

    /// The seat is not available
    #[error("Seat {0} is not available")]
    SeatUnavailable(SeatId),

    /// Another attempt already bought the seat
    #[error("Seat {0} has already been sold")]
    AlreadySold(SeatId),

    /// Offered price differs from the seat price
    #[error("Price mismatch for seat {seat_id}: expected {expected}, offered {offered}")]
    PriceMismatch {
        /// Seat being bought
        seat_id: SeatId,
        /// Catalog price
        expected: Money,
        /// Price in the request
        offered: Money,
    },

    /// The coordinator is shutting down or did not answer in time
    #[error("Purchase service unavailable: {0}")]
    Unavailable(String),
}

impl PurchaseError {
    /// Classifies the error
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::SeatNotFound(_) | Self::AttemptNotFound(_) => ErrorKind::NotFound,
            Self::SeatUnavailable(_) | Self::AlreadySold(_) => ErrorKind::Conflict,
            Self::PriceMismatch { .. } => ErrorKind::Validation,
            Self::Unavailable(_) => ErrorKind::Unavailable,
        }
    }
}

impl From<StoreError> for PurchaseError {
    fn from(err: StoreError) -> Self {
        Self::Unavailable(err.to_string())
    }
}

/// Transient failures of a bank call
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum BankError {
    /// The call did not complete in time
    #[error("Bank call timed out")]
    Timeout,

    /// The bank reported an internal failure
    #[error("Bank unavailable: {0}")]
    Unavailable(String),
}

impl BankError {
    /// Label used in logs and metrics
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::Unavailable(_) => "unavailable",
        }
    }
}

/// Refused ledger writes
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum LedgerError {
    /// No attempt with this id
    #[error("Payment attempt not found: {0}")]
    NotFound(AttemptId),

    /// Success and Failed never change
    #[error("Payment attempt {id} is already {status} and cannot become {requested}")]
    Terminal {
        /// Attempt
        id: AttemptId,
        /// Its terminal status
        status: PaymentStatus,
        /// Refused status
        requested: PaymentStatus,
    },
}
