//! # Seat Purchase
//!
//! Coordinates the sale of seats against a slow, unreliable bank while
//! guaranteeing at most one successful sale per seat.
//!
//! ## Flow
//!
//! 1. `purchase` checks the request and records a Pending attempt
//! 2. The validator admits the attempt, queues it behind an older one
//!    (Waiting), or fails it
//! 3. Admitted attempts are charged on a runtime task with bounded retries
//! 4. The outcome is recorded; a success sells the seat and fails the
//!    queue, a failure promotes the oldest Waiting attempt
//!
//! All state lives in one [`PurchaseState`] behind the store's write lock,
//! so every step is atomic with respect to the others.
//!
//! ## Example
//!
//! ```ignore
//! use seat_purchase::{Config, PurchaseService, ScriptedBank, types::{Money, SeatId}};
//! use std::sync::Arc;
//!
//! let service = PurchaseService::from_config(&Config::default(), Arc::new(ScriptedBank::approving()));
//! service.register_seat(SeatId::new(1), Money::from_dollars(100)).await?;
//! let receipt = service.purchase(SeatId::new(1), Money::from_dollars(100)).await?;
//! let report = service.status(receipt.attempt_id).await?;
//! ```

#![forbid(unsafe_code)]

pub mod catalog;
pub mod config;
pub mod error;
pub mod gateway;
pub mod ledger;
pub mod metrics;
pub mod processor;
pub mod recorder;
pub mod reducer;
pub mod service;
pub mod state;
pub mod types;
pub mod validator;

pub use config::Config;
pub use error::{BankError, ErrorKind, LedgerError, PurchaseError};
pub use gateway::{BankGateway, BankResponse, ScriptedBank, ScriptedOutcome, SimulatedBank};
pub use reducer::{PurchaseAction, PurchaseEnvironment, PurchaseReducer};
pub use service::{PurchaseReceipt, PurchaseService, StatusReport};
pub use state::PurchaseState;
