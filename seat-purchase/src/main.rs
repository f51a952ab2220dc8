//! Seat purchase demo.
//!
//! Puts a few seats on sale and lets several buyers race for each one
//! against the simulated bank, then prints what every buyer ended up with.

use anyhow::Context;
use seat_purchase::{
    Config, PurchaseService, SimulatedBank, StatusReport,
    metrics::register_purchase_metrics,
    types::{Money, PaymentStatus, SeatId},
};
use seatflow_runtime::metrics::MetricsExporter;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "seat_purchase=info,seatflow_runtime=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    info!(
        seats = config.demo.seats,
        buyers_per_seat = config.demo.buyers_per_seat,
        max_attempts = config.payment.max_attempts,
        "Configuration loaded"
    );

    let mut exporter = MetricsExporter::new();
    exporter.install().context("installing metrics exporter")?;
    register_purchase_metrics();

    let service = PurchaseService::from_config(&config, SimulatedBank::shared(&config.bank));
    let price = Money::from_cents(config.demo.seat_price_cents);

    for seat in 1..=config.demo.seats {
        service.register_seat(SeatId::new(seat), price).await?;
    }

    // A buyer with the wrong price is turned away before anything is recorded
    let lowball = Money::from_cents(config.demo.seat_price_cents / 2);
    match service.purchase(SeatId::new(1), lowball).await {
        Ok(receipt) => warn!(attempt_id = %receipt.attempt_id, "Lowball offer was accepted"),
        Err(err) => info!(error = %err, kind = err.kind().as_str(), "Lowball offer rejected"),
    }

    let mut buyers = Vec::new();
    for seat in 1..=config.demo.seats {
        for _ in 0..config.demo.buyers_per_seat {
            let service = service.clone();
            buyers.push(tokio::spawn(async move {
                service.purchase(SeatId::new(seat), price).await
            }));
        }
    }

    let mut receipts = Vec::new();
    for buyer in buyers {
        match buyer.await? {
            Ok(receipt) => receipts.push(receipt),
            Err(err) => warn!(error = %err, "Purchase refused"),
        }
    }
    info!(accepted = receipts.len(), "All purchase requests answered");

    let deadline = resolution_deadline(&config);
    let mut reports: Vec<StatusReport> = Vec::new();
    for receipt in &receipts {
        let report = service
            .await_resolution(receipt.attempt_id, Duration::from_millis(250), deadline)
            .await?;
        reports.push(report);
    }

    for report in &reports {
        println!("{}", serde_json::to_string(report)?);
    }

    for seat in 1..=config.demo.seats {
        let seat_id = SeatId::new(seat);
        let sold = reports
            .iter()
            .filter(|report| report.seat_id == seat_id && report.status == PaymentStatus::Success)
            .count();
        let status = service.seat(seat_id).await.map(|s| s.status);
        info!(seat_id = %seat_id, sold, status = ?status, "Seat outcome");
    }

    service
        .shutdown(Duration::from_secs(config.runtime.shutdown_timeout))
        .await?;

    if let Some(snapshot) = exporter.render() {
        println!("{snapshot}");
    }

    Ok(())
}

/// Worst case for the last buyer of a seat: every attempt ahead of it uses
/// its full retry budget
fn resolution_deadline(config: &Config) -> Duration {
    let calls = u32::try_from(config.payment.max_attempts.max(1)).unwrap_or(u32::MAX);
    let per_attempt = config.payment.call_timeout().saturating_mul(calls).saturating_add(
        Duration::from_millis(config.payment.retry_backoff_ms).saturating_mul(calls.saturating_sub(1)),
    );
    let buyers = u32::try_from(config.demo.buyers_per_seat.max(1)).unwrap_or(u32::MAX);
    per_attempt
        .saturating_mul(buyers)
        .saturating_add(Duration::from_secs(5))
}
