//! Integration tests for Store action broadcasting
//!
//! Request/reply over the action broadcast is how callers wait for the
//! outcome of a command without polling state.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use seatflow_core::{SmallVec, effect::Effect, reducer::Reducer, smallvec};
use seatflow_runtime::{Store, StoreConfig, StoreError};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
enum TicketAction {
    /// Ask for a ticket number, correlated by `request_id`
    Request { request_id: u64 },
    /// Ticket issued
    Issued { request_id: u64, number: u32 },
    /// Request refused once the counter is exhausted
    Refused { request_id: u64 },
    /// Chain of follow-up steps for one request
    Chain { request_id: u64, step: u32 },
    /// Chain finished
    ChainDone { request_id: u64 },
}

#[derive(Debug, Clone, Default)]
struct TicketState {
    issued: u32,
    limit: u32,
    chain_steps: Vec<u32>,
}

#[derive(Clone)]
struct TicketEnvironment;

#[derive(Clone)]
struct TicketReducer;

impl Reducer for TicketReducer {
    type State = TicketState;
    type Action = TicketAction;
    type Environment = TicketEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        _env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            TicketAction::Request { request_id } => {
                if state.issued >= state.limit {
                    return smallvec![Effect::Future(Box::pin(async move {
                        Some(TicketAction::Refused { request_id })
                    }))];
                }
                state.issued += 1;
                let number = state.issued;
                smallvec![Effect::Future(Box::pin(async move {
                    Some(TicketAction::Issued { request_id, number })
                }))]
            },
            TicketAction::Chain { request_id, step } => {
                state.chain_steps.push(step);
                if step < 3 {
                    smallvec![Effect::Future(Box::pin(async move {
                        tokio::time::sleep(Duration::from_millis(5)).await;
                        Some(TicketAction::Chain { request_id, step: step + 1 })
                    }))]
                } else {
                    smallvec![Effect::Future(Box::pin(async move {
                        Some(TicketAction::ChainDone { request_id })
                    }))]
                }
            },
            TicketAction::Issued { .. }
            | TicketAction::Refused { .. }
            | TicketAction::ChainDone { .. } => smallvec![Effect::None],
        }
    }
}

fn store(limit: u32) -> Store<TicketState, TicketAction, TicketEnvironment, TicketReducer> {
    Store::new(
        TicketState {
            limit,
            ..TicketState::default()
        },
        TicketReducer,
        TicketEnvironment,
    )
}

fn reply_for(request_id: u64) -> impl Fn(&TicketAction) -> bool {
    move |action| match action {
        TicketAction::Issued { request_id: id, .. } | TicketAction::Refused { request_id: id } => {
            *id == request_id
        },
        _ => false,
    }
}

#[tokio::test]
async fn test_send_and_wait_for_reply() {
    let store = store(10);

    let reply = store
        .send_and_wait_for(
            TicketAction::Request { request_id: 1 },
            reply_for(1),
            Duration::from_secs(1),
        )
        .await
        .unwrap();

    assert_eq!(reply, TicketAction::Issued { request_id: 1, number: 1 });
}

#[tokio::test]
async fn test_send_and_wait_for_refusal() {
    let store = store(0);

    let reply = store
        .send_and_wait_for(
            TicketAction::Request { request_id: 7 },
            reply_for(7),
            Duration::from_secs(1),
        )
        .await
        .unwrap();

    assert_eq!(reply, TicketAction::Refused { request_id: 7 });
}

#[tokio::test]
async fn test_send_and_wait_for_multi_step_chain() {
    let store = store(0);

    let reply = store
        .send_and_wait_for(
            TicketAction::Chain { request_id: 3, step: 1 },
            |a| matches!(a, TicketAction::ChainDone { request_id: 3 }),
            Duration::from_secs(1),
        )
        .await
        .unwrap();

    assert_eq!(reply, TicketAction::ChainDone { request_id: 3 });
    assert_eq!(store.state(|s| s.chain_steps.clone()).await, vec![1, 2, 3]);
}

#[tokio::test]
async fn test_send_and_wait_for_timeout() {
    let store = store(10);

    let result = store
        .send_and_wait_for(
            TicketAction::Request { request_id: 1 },
            |a| matches!(a, TicketAction::ChainDone { .. }),
            Duration::from_millis(50),
        )
        .await;

    assert!(matches!(result, Err(StoreError::Timeout)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_get_their_own_reply() {
    let store = Arc::new(store(5));

    let handles: Vec<_> = (1..=8u64)
        .map(|request_id| {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                store
                    .send_and_wait_for(
                        TicketAction::Request { request_id },
                        reply_for(request_id),
                        Duration::from_secs(2),
                    )
                    .await
            })
        })
        .collect();

    let mut issued = Vec::new();
    let mut refused = 0;
    for (idx, handle) in handles.into_iter().enumerate() {
        match handle.await.unwrap().unwrap() {
            TicketAction::Issued { request_id, number } => {
                assert_eq!(request_id, idx as u64 + 1);
                issued.push(number);
            },
            TicketAction::Refused { request_id } => {
                assert_eq!(request_id, idx as u64 + 1);
                refused += 1;
            },
            other => panic!("unexpected reply {other:?}"),
        }
    }

    issued.sort_unstable();
    assert_eq!(issued, vec![1, 2, 3, 4, 5]);
    assert_eq!(refused, 3);
}

#[tokio::test]
async fn test_subscribe_sees_effect_actions_in_order() {
    let store = store(0);
    let mut rx = store.subscribe_actions();

    store
        .send(TicketAction::Chain { request_id: 9, step: 1 })
        .await
        .unwrap();

    let mut received = Vec::new();
    while received.len() < 3 {
        let action = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        received.push(action);
    }

    assert_eq!(
        received,
        vec![
            TicketAction::Chain { request_id: 9, step: 2 },
            TicketAction::Chain { request_id: 9, step: 3 },
            TicketAction::ChainDone { request_id: 9 },
        ]
    );
}

#[tokio::test]
async fn test_initial_actions_not_broadcast() {
    let store = store(0);
    let mut rx = store.subscribe_actions();

    // Issued has no effects, so nothing is produced
    store
        .send(TicketAction::Issued { request_id: 1, number: 1 })
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert!(matches!(
        rx.try_recv(),
        Err(tokio::sync::broadcast::error::TryRecvError::Empty)
    ));
}

#[tokio::test]
async fn test_small_broadcast_capacity_lags() {
    let store = Store::with_config(
        TicketState {
            limit: 100,
            ..TicketState::default()
        },
        TicketReducer,
        TicketEnvironment,
        StoreConfig::default().with_broadcast_capacity(2),
    );
    let mut rx = store.subscribe_actions();

    for request_id in 0..6 {
        store.send(TicketAction::Request { request_id }).await.unwrap();
    }
    tokio::time::sleep(Duration::from_millis(100)).await;

    let mut received = 0;
    let mut lagged = false;
    loop {
        match rx.try_recv() {
            Ok(_) => received += 1,
            Err(tokio::sync::broadcast::error::TryRecvError::Lagged(_)) => lagged = true,
            Err(_) => break,
        }
    }

    assert!(lagged);
    assert!(received <= 2);
}
