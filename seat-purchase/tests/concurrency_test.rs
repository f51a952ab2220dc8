//! Concurrent buyers racing for the same seats
//!
//! Runs on the multi-threaded runtime so purchase requests really interleave.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use seat_purchase::config::PaymentConfig;
use seat_purchase::types::{FailureReason, Money, PaymentStatus, SeatId};
use seat_purchase::{
    BankGateway, ErrorKind, PurchaseEnvironment, PurchaseError, PurchaseReceipt, PurchaseService,
    PurchaseState, ScriptedBank, ScriptedOutcome,
};
use seatflow_runtime::StoreConfig;
use seatflow_testing::test_clock;
use std::sync::Arc;
use std::time::Duration;

const PRICE: Money = Money::from_cents(10_000);

fn service_with(bank: &Arc<ScriptedBank>, seats: u64) -> PurchaseService {
    service_tuned(bank, seats, 4096, Duration::from_secs(5))
}

fn service_tuned(
    bank: &Arc<ScriptedBank>,
    seats: u64,
    broadcast_capacity: usize,
    reply_timeout: Duration,
) -> PurchaseService {
    let payment = PaymentConfig {
        max_attempts: 2,
        retry_backoff_ms: 5,
        call_timeout_ms: 200,
    };
    let gateway: Arc<dyn BankGateway> = Arc::clone(bank) as Arc<dyn BankGateway>;
    PurchaseService::new(
        PurchaseState::with_seats((1..=seats).map(|seat| (SeatId::new(seat), PRICE))),
        PurchaseEnvironment::new(Arc::new(test_clock()), gateway, &payment),
        StoreConfig::default().with_broadcast_capacity(broadcast_capacity),
        reply_timeout,
    )
}

/// Fires `buyers` purchases for `seat_id` at once
async fn race(
    service: &PurchaseService,
    seat_id: SeatId,
    buyers: usize,
) -> Vec<Result<PurchaseReceipt, PurchaseError>> {
    let handles: Vec<_> = (0..buyers)
        .map(|_| {
            let service = service.clone();
            tokio::spawn(async move { service.purchase(seat_id, PRICE).await })
        })
        .collect();

    let mut replies = Vec::new();
    for handle in handles {
        replies.push(handle.await.unwrap());
    }
    replies
}

/// Accepted receipts; a refusal must be a conflict on a seat already sold
fn accepted(replies: Vec<Result<PurchaseReceipt, PurchaseError>>) -> Vec<PurchaseReceipt> {
    replies
        .into_iter()
        .filter_map(|reply| match reply {
            Ok(receipt) => Some(receipt),
            Err(err) => {
                assert_eq!(err.kind(), ErrorKind::Conflict, "unexpected refusal: {err}");
                None
            },
        })
        .collect()
}

async fn settle(service: &PurchaseService, receipts: &[PurchaseReceipt]) -> Vec<PaymentStatus> {
    let mut statuses = Vec::new();
    for receipt in receipts {
        let report = service
            .await_resolution(receipt.attempt_id, Duration::from_millis(5), Duration::from_secs(10))
            .await
            .unwrap();
        assert!(report.is_resolved(), "attempt {} never resolved", receipt.attempt_id);
        statuses.push(report.status);
    }
    statuses
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_two_buyers_one_seat() {
    let bank = Arc::new(ScriptedBank::approving().with_latency(Duration::from_millis(300)));
    let service = service_with(&bank, 1);

    let receipts: Vec<_> = race(&service, SeatId::new(1), 2)
        .await
        .into_iter()
        .map(Result::unwrap)
        .collect();
    assert!(receipts.iter().all(|r| r.status == PaymentStatus::Pending));

    let statuses = settle(&service, &receipts).await;
    let sold = statuses.iter().filter(|s| **s == PaymentStatus::Success).count();
    let failed = statuses.iter().filter(|s| **s == PaymentStatus::Failed).count();
    assert_eq!((sold, failed), (1, 1));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_many_buyers_exactly_one_sale() {
    let buyers = 32;
    let bank = Arc::new(ScriptedBank::approving().with_latency(Duration::from_millis(300)));
    let service = service_with(&bank, 1);
    let seat_id = SeatId::new(1);

    let receipts: Vec<_> = race(&service, seat_id, buyers)
        .await
        .into_iter()
        .map(Result::unwrap)
        .collect();
    assert_eq!(receipts.len(), buyers);
    assert!(receipts.iter().all(|r| r.status == PaymentStatus::Pending));

    let statuses = settle(&service, &receipts).await;

    assert_eq!(statuses.iter().filter(|s| **s == PaymentStatus::Success).count(), 1);
    assert_eq!(
        statuses.iter().filter(|s| **s == PaymentStatus::Failed).count(),
        buyers - 1
    );
    assert!(!service.seat(seat_id).await.unwrap().is_available());
    assert_eq!(bank.calls(), 1);

    for attempt in service.attempts_for_seat(seat_id).await {
        if attempt.status == PaymentStatus::Failed {
            assert_eq!(attempt.failure, Some(FailureReason::SoldElsewhere));
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_flaky_bank_never_sells_a_seat_twice() {
    let script = [
        ScriptedOutcome::Decline,
        ScriptedOutcome::Unavailable,
        ScriptedOutcome::Timeout,
        ScriptedOutcome::Decline,
        ScriptedOutcome::Approve,
        ScriptedOutcome::Unavailable,
        ScriptedOutcome::Decline,
        ScriptedOutcome::Approve,
    ];
    let bank = Arc::new(
        ScriptedBank::declining()
            .with_script(script.into_iter().cycle().take(64))
            .with_latency(Duration::from_millis(5)),
    );
    let seats = 4;
    let service = service_with(&bank, seats);

    let mut all = Vec::new();
    for seat in 1..=seats {
        all.extend(accepted(race(&service, SeatId::new(seat), 6).await));
    }
    settle(&service, &all).await;

    for seat in 1..=seats {
        let attempts = service.attempts_for_seat(SeatId::new(seat)).await;
        let sold = attempts
            .iter()
            .filter(|attempt| attempt.status == PaymentStatus::Success)
            .count();
        assert!(sold <= 1, "seat {seat} sold {sold} times");
        assert!(attempts.iter().all(|attempt| attempt.status.is_terminal()));
        assert_eq!(
            sold == 1,
            !service.seat(SeatId::new(seat)).await.unwrap().is_available()
        );
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_seats_all_sell() {
    let bank = Arc::new(ScriptedBank::approving().with_latency(Duration::from_millis(10)));
    let seats = 8;
    let service = service_with(&bank, seats);

    let handles: Vec<_> = (1..=seats)
        .map(|seat| {
            let service = service.clone();
            tokio::spawn(async move {
                let receipts = accepted(race(&service, SeatId::new(seat), 4).await);
                settle(&service, &receipts).await
            })
        })
        .collect();

    for handle in handles {
        let statuses = handle.await.unwrap();
        assert_eq!(statuses.iter().filter(|s| **s == PaymentStatus::Success).count(), 1);
    }
    assert_eq!(bank.calls(), usize::try_from(seats).unwrap());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_every_recorded_attempt_reaches_its_caller() {
    // A one-slot broadcast drops most replies
    let seats = 200;
    let bank = Arc::new(ScriptedBank::approving().with_latency(Duration::from_millis(50)));
    let service = service_tuned(&bank, seats, 1, Duration::from_millis(100));

    let handles: Vec<_> = (1..=seats)
        .map(|seat| {
            let service = service.clone();
            tokio::spawn(async move { service.purchase(SeatId::new(seat), PRICE).await })
        })
        .collect();

    let mut receipts = Vec::new();
    for handle in handles {
        receipts.push(handle.await.unwrap().unwrap());
    }

    let mut recorded = 0;
    for seat in 1..=seats {
        let attempts = service.attempts_for_seat(SeatId::new(seat)).await;
        recorded += attempts.len();
        let receipt = receipts
            .iter()
            .find(|receipt| receipt.seat_id == SeatId::new(seat))
            .unwrap();
        assert_eq!(attempts[0].id, receipt.attempt_id);
    }
    assert_eq!(recorded, receipts.len());
}
