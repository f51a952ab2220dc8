//! Business metrics for seat purchases.
//!
//! # Exported Metrics
//!
//! ## Counters
//! - `seat_purchase_attempts_total{status}` - Attempts by recorded status
//! - `seat_purchase_rejections_total{kind}` - Purchases refused before recording
//! - `seat_purchase_bank_calls_total{outcome}` - Bank calls by outcome
//! - `seat_purchase_seats_sold_total` - Seats sold
//!
//! ## Histograms
//! - `seat_purchase_processing_seconds` - Time from dispatch to bank outcome,
//!   retries included

use crate::error::ErrorKind;
use crate::types::PaymentStatus;
use metrics::{counter, describe_counter, describe_histogram, histogram};
use std::time::Duration;

/// Initialize and register all business metrics descriptions.
///
/// This should be called once at application startup, before any metrics are recorded.
pub fn register_purchase_metrics() {
    describe_counter!(
        "seat_purchase_attempts_total",
        "Payment attempts by recorded status (pending, waiting, success, failed)"
    );
    describe_counter!(
        "seat_purchase_rejections_total",
        "Purchase requests refused before an attempt was recorded, by error kind"
    );
    describe_counter!(
        "seat_purchase_bank_calls_total",
        "Bank calls by outcome (approved, declined, timeout, unavailable)"
    );
    describe_counter!("seat_purchase_seats_sold_total", "Seats sold");
    describe_histogram!(
        "seat_purchase_processing_seconds",
        "Time from dispatch to bank outcome, retries included"
    );

    tracing::info!("Purchase metrics registered");
}

/// Record an attempt reaching `status`
pub fn record_attempt_status(status: PaymentStatus) {
    counter!("seat_purchase_attempts_total", "status" => status.as_str()).increment(1);
}

/// Record a refused purchase request
pub fn record_rejection(kind: ErrorKind) {
    counter!("seat_purchase_rejections_total", "kind" => kind.as_str()).increment(1);
}

/// Record one bank call
pub fn record_bank_call(outcome: &'static str) {
    counter!("seat_purchase_bank_calls_total", "outcome" => outcome).increment(1);
}

/// Record a sold seat
pub fn record_seat_sold() {
    counter!("seat_purchase_seats_sold_total").increment(1);
}

/// Record how long an admitted attempt spent at the bank
pub fn record_processing_time(elapsed: Duration) {
    histogram!("seat_purchase_processing_seconds").record(elapsed.as_secs_f64());
}
