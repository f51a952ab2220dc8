//! # Seatflow Runtime
//!
//! The [`Store`] owns a feature's state and runs its reducer one action at a
//! time under a write lock. Effects start only after the lock is released, and
//! whatever action they yield is broadcast to observers and reduced in turn.
//!
//! The [`retry`] module bounds calls to unreliable services and [`metrics`]
//! exposes the Prometheus recorder.
//!
//! ## Example
//!
//! ```ignore
//! use seatflow_runtime::Store;
//!
//! let store = Store::new(PurchaseState::new(), PurchaseReducer::new(), environment);
//!
//! store.send(PurchaseAction::RegisterSeat { seat_id, price }).await?;
//!
//! let seats = store.state(|state| state.seats.len()).await;
//! ```

use seatflow_core::{effect::Effect, reducer::Reducer};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::{RwLock, watch};

/// Retry logic with backoff
pub mod retry;

/// Prometheus metrics for observability
pub mod metrics;

/// Error types for the Store runtime
pub mod error {
    use thiserror::Error;

    /// Errors that can occur during Store operations
    #[derive(Error, Debug)]
    pub enum StoreError {
        /// Store is shutting down and not accepting new actions
        #[error("Store is shutting down")]
        ShutdownInProgress,

        /// Shutdown timed out waiting for effects to complete
        #[error("Shutdown timed out with {0} effects still running")]
        ShutdownTimeout(usize),

        /// Timeout waiting for a matching action
        ///
        /// Returned by `send_and_wait_for` when the timeout expires before
        /// a matching action is received.
        #[error("Timeout waiting for action")]
        Timeout,

        /// Action broadcast channel closed
        #[error("Action broadcast channel closed")]
        ChannelClosed,
    }
}

pub use error::StoreError;

/// Configuration for Store instances
///
/// # Example
///
/// ```ignore
/// let config = StoreConfig::default()
///     .with_broadcast_capacity(4096)
///     .with_shutdown_timeout(Duration::from_secs(10));
///
/// let store = Store::with_config(state, reducer, env, config);
/// ```
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Number of effect-produced actions buffered for observers
    pub broadcast_capacity: usize,
    /// Default timeout for graceful shutdown
    pub default_shutdown_timeout: Duration,
}

impl StoreConfig {
    /// Create a new configuration with custom values
    #[must_use]
    pub const fn new(broadcast_capacity: usize, default_shutdown_timeout: Duration) -> Self {
        Self {
            broadcast_capacity,
            default_shutdown_timeout,
        }
    }

    /// Set the action broadcast capacity
    #[must_use]
    pub const fn with_broadcast_capacity(mut self, capacity: usize) -> Self {
        self.broadcast_capacity = capacity;
        self
    }

    /// Set the default shutdown timeout
    #[must_use]
    pub const fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.default_shutdown_timeout = timeout;
        self
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            broadcast_capacity: 16,
            default_shutdown_timeout: Duration::from_secs(30),
        }
    }
}

/// Handle for tracking effect completion
///
/// Returned by [`Store::send()`] to allow waiting for the effects spawned by
/// that action. Actions fed back by those effects get their own handles.
///
/// # Example
///
/// ```ignore
/// let mut handle = store.send(Action::Start).await?;
/// handle.wait_with_timeout(Duration::from_secs(5)).await?;
/// ```
#[derive(Clone)]
pub struct EffectHandle {
    effects: Arc<AtomicUsize>,
    completion: watch::Receiver<()>,
}

impl EffectHandle {
    fn new() -> (Self, EffectTracking) {
        let counter = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = watch::channel(());

        let handle = Self {
            effects: Arc::clone(&counter),
            completion: rx,
        };
        let tracking = EffectTracking {
            counter,
            notifier: Arc::new(tx),
        };

        (handle, tracking)
    }

    /// Create a handle that's already complete
    #[must_use]
    pub fn completed() -> Self {
        let (_, rx) = watch::channel(());

        Self {
            effects: Arc::new(AtomicUsize::new(0)),
            completion: rx,
        }
    }

    /// Number of effects still running
    #[must_use]
    pub fn pending(&self) -> usize {
        self.effects.load(Ordering::SeqCst)
    }

    /// Wait until the effect counter reaches zero
    pub async fn wait(&mut self) {
        while self.effects.load(Ordering::SeqCst) > 0 {
            if self.completion.changed().await.is_err() {
                // Every tracker is gone, nothing can still be running
                break;
            }
        }
    }

    /// Wait for all effects to complete with a timeout
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Timeout`] if the timeout expires before all effects complete.
    pub async fn wait_with_timeout(&mut self, timeout: Duration) -> Result<(), StoreError> {
        tokio::time::timeout(timeout, self.wait())
            .await
            .map_err(|_| StoreError::Timeout)
    }
}

impl std::fmt::Debug for EffectHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectHandle")
            .field("pending_effects", &self.pending())
            .finish_non_exhaustive()
    }
}

/// Internal: effect counter shared by every effect spawned from one action
#[derive(Clone)]
struct EffectTracking {
    counter: Arc<AtomicUsize>,
    notifier: Arc<watch::Sender<()>>,
}

impl EffectTracking {
    fn increment(&self) {
        self.counter.fetch_add(1, Ordering::SeqCst);
    }

    fn decrement(&self) {
        if self.counter.fetch_sub(1, Ordering::SeqCst) == 1 {
            let _ = self.notifier.send(());
        }
    }
}

/// Internal: RAII guard that decrements the effect counter on drop
///
/// Runs even if the effect panics.
struct DecrementGuard(EffectTracking);

impl Drop for DecrementGuard {
    fn drop(&mut self) {
        self.0.decrement();
    }
}

/// Guard that decrements an atomic counter on drop (for shutdown tracking)
struct AtomicCounterGuard(Arc<AtomicUsize>);

impl Drop for AtomicCounterGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Store runtime for coordinating reducer execution and effect handling.
pub mod store {
    use super::{
        Arc, AtomicBool, AtomicCounterGuard, AtomicUsize, DecrementGuard, Duration, Effect,
        EffectHandle, EffectTracking, Ordering, Reducer, RwLock, StoreConfig, StoreError,
    };
    use tokio::sync::broadcast;

    /// The Store - runtime coordinator for a reducer
    ///
    /// The Store manages:
    /// 1. State (behind `RwLock` for concurrent access)
    /// 2. Reducer (business logic)
    /// 3. Environment (injected dependencies)
    /// 4. Effect execution (with feedback loop)
    ///
    /// Every reducer step runs while holding the state write lock, so a step
    /// observes and mutates state atomically. Effects returned by the step
    /// are started only after the lock is released.
    pub struct Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E>,
    {
        state: Arc<RwLock<S>>,
        reducer: R,
        environment: E,
        shutdown: Arc<AtomicBool>,
        pending_effects: Arc<AtomicUsize>,
        default_shutdown_timeout: Duration,
        /// Every action produced by an effect is broadcast here before it is
        /// fed back into the reducer.
        action_broadcast: broadcast::Sender<A>,
    }

    impl<S, A, E, R> Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E> + Send + Sync + 'static,
        A: Send + Clone + 'static,
        S: Send + Sync + 'static,
        E: Send + Sync + 'static,
    {
        /// Create a new store with the default [`StoreConfig`]
        #[must_use]
        pub fn new(initial_state: S, reducer: R, environment: E) -> Self {
            Self::with_config(initial_state, reducer, environment, StoreConfig::default())
        }

        /// Create a new Store with custom configuration
        ///
        /// # Example
        ///
        /// ```ignore
        /// let config = StoreConfig::default().with_broadcast_capacity(1024);
        /// let store = Store::with_config(MyState::default(), MyReducer, env, config);
        /// ```
        #[must_use]
        pub fn with_config(
            initial_state: S,
            reducer: R,
            environment: E,
            config: StoreConfig,
        ) -> Self {
            let (action_broadcast, _) = broadcast::channel(config.broadcast_capacity.max(1));

            Self {
                state: Arc::new(RwLock::new(initial_state)),
                reducer,
                environment,
                shutdown: Arc::new(AtomicBool::new(false)),
                pending_effects: Arc::new(AtomicUsize::new(0)),
                default_shutdown_timeout: config.default_shutdown_timeout,
                action_broadcast,
            }
        }

        /// The shutdown timeout this store was configured with
        #[must_use]
        pub const fn default_shutdown_timeout(&self) -> Duration {
            self.default_shutdown_timeout
        }

        /// Number of effects currently running across all actions
        #[must_use]
        pub fn pending_effects(&self) -> usize {
            self.pending_effects.load(Ordering::Acquire)
        }

        /// Initiate graceful shutdown of the store
        ///
        /// Sets the shutdown flag (rejecting new actions), then waits for
        /// pending effects to complete. Actions produced by those effects are
        /// still reduced, so chains already in flight run to the end. Calling
        /// it again is harmless.
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownTimeout`] if the timeout expires before all
        /// pending effects complete.
        pub async fn shutdown(&self, timeout: Duration) -> Result<(), StoreError> {
            tracing::info!("Initiating graceful shutdown");
            metrics::counter!("store.shutdown.initiated").increment(1);

            self.shutdown.store(true, Ordering::Release);

            let start = std::time::Instant::now();
            let poll_interval = Duration::from_millis(50);

            loop {
                let pending = self.pending_effects.load(Ordering::Acquire);

                if pending == 0 {
                    tracing::info!("All effects completed, shutdown successful");
                    metrics::counter!("store.shutdown.completed").increment(1);
                    return Ok(());
                }

                if start.elapsed() >= timeout {
                    tracing::error!(pending_effects = pending, "Shutdown timed out");
                    metrics::counter!("store.shutdown.timeout").increment(1);
                    return Err(StoreError::ShutdownTimeout(pending));
                }

                tracing::debug!(
                    pending_effects = pending,
                    elapsed_ms = start.elapsed().as_millis(),
                    "Waiting for effects to complete"
                );

                tokio::time::sleep(poll_interval).await;
            }
        }

        /// Send an action to the store
        ///
        /// 1. Acquires the write lock on state
        /// 2. Calls the reducer with (state, action, environment)
        /// 3. Releases the lock, then starts the returned effects
        ///
        /// `send()` returns once effects are started, not completed.
        /// Concurrent calls serialize at the reducer.
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownInProgress`] if the store is shutting down.
        ///
        /// # Panics
        ///
        /// A panicking reducer propagates to the caller.
        #[tracing::instrument(skip(self, action), name = "store_send")]
        pub async fn send(&self, action: A) -> Result<EffectHandle, StoreError>
        where
            R: Clone,
            E: Clone,
        {
            if self.shutdown.load(Ordering::Acquire) {
                tracing::warn!("Rejected action: store is shutting down");
                metrics::counter!("store.shutdown.rejected_actions").increment(1);
                return Err(StoreError::ShutdownInProgress);
            }

            Ok(self.reduce_and_execute(action).await)
        }

        /// Run the reducer under the write lock, then start the effects
        ///
        /// Skips the shutdown check: actions produced by effects are still
        /// reduced while the store drains.
        async fn reduce_and_execute(&self, action: A) -> EffectHandle
        where
            R: Clone,
            E: Clone,
        {
            metrics::counter!("store.commands.total").increment(1);

            let (handle, tracking) = EffectHandle::new();

            let effects = {
                let mut state = self.state.write().await;

                let start = std::time::Instant::now();
                let effects = self.reducer.reduce(&mut *state, action, &self.environment);
                metrics::histogram!("store.reducer.duration_seconds")
                    .record(start.elapsed().as_secs_f64());

                #[allow(clippy::cast_precision_loss)]
                metrics::histogram!("store.effects.count").record(effects.len() as f64);

                effects
            };

            for effect in effects {
                self.execute_effect(effect, tracking.clone());
            }

            handle
        }

        /// Send an action and wait for a matching action produced by effects
        ///
        /// Subscribes to the action broadcast before sending, so a reply
        /// produced immediately by the first effect cannot be missed. Use a
        /// correlation id in the predicate to tell concurrent requests apart.
        ///
        /// # Errors
        ///
        /// - [`StoreError::Timeout`]: no matching action before the timeout
        /// - [`StoreError::ChannelClosed`]: the broadcast channel closed
        /// - [`StoreError::ShutdownInProgress`]: the store is shutting down
        ///
        /// # Example
        ///
        /// ```ignore
        /// let reply = store.send_and_wait_for(
        ///     Action::Place { request_id },
        ///     |a| matches!(a, Action::Placed { request_id: id, .. } if *id == request_id),
        ///     Duration::from_secs(5),
        /// ).await?;
        /// ```
        pub async fn send_and_wait_for<F>(
            &self,
            action: A,
            predicate: F,
            timeout: Duration,
        ) -> Result<A, StoreError>
        where
            R: Clone,
            E: Clone,
            F: Fn(&A) -> bool,
        {
            let mut rx = self.action_broadcast.subscribe();

            self.send(action).await?;

            tokio::time::timeout(timeout, async {
                loop {
                    match rx.recv().await {
                        Ok(action) if predicate(&action) => return Ok(action),
                        Ok(_) => {},
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            // The matching action may have been dropped; the timeout covers it
                            tracing::warn!(skipped, "Action observer lagged");
                        },
                        Err(broadcast::error::RecvError::Closed) => {
                            return Err(StoreError::ChannelClosed);
                        },
                    }
                }
            })
            .await
            .map_err(|_| StoreError::Timeout)?
        }

        /// Subscribe to all actions produced by effects
        ///
        /// Actions sent directly through `send` are not broadcast.
        #[must_use]
        pub fn subscribe_actions(&self) -> broadcast::Receiver<A> {
            self.action_broadcast.subscribe()
        }

        /// Read current state via a closure
        ///
        /// ```ignore
        /// let count = store.state(|s| s.orders.len()).await;
        /// ```
        pub async fn state<F, T>(&self, f: F) -> T
        where
            F: FnOnce(&S) -> T,
        {
            let state = self.state.read().await;
            f(&*state)
        }

        /// Spawn a tracked task that feeds its action (if any) back into the store
        fn spawn_tracked<Fut>(&self, tracking: EffectTracking, fut: Fut)
        where
            R: Clone,
            E: Clone,
            Fut: std::future::Future<Output = Option<A>> + Send + 'static,
        {
            tracking.increment();
            self.pending_effects.fetch_add(1, Ordering::SeqCst);
            let pending_guard = AtomicCounterGuard(Arc::clone(&self.pending_effects));
            let store = self.clone();

            tokio::spawn(async move {
                let _guard = DecrementGuard(tracking);
                let _pending_guard = pending_guard;

                if let Some(action) = fut.await {
                    let _ = store.action_broadcast.send(action.clone());
                    let _ = store.reduce_and_execute(action).await;
                }
            });
        }

        #[allow(clippy::needless_pass_by_value)]
        fn execute_effect(&self, effect: Effect<A>, tracking: EffectTracking)
        where
            R: Clone,
            E: Clone,
        {
            match effect {
                Effect::None => {
                    metrics::counter!("store.effects.executed", "type" => "none").increment(1);
                },
                Effect::Future(fut) => {
                    metrics::counter!("store.effects.executed", "type" => "future").increment(1);
                    self.spawn_tracked(tracking, fut);
                },
            }
        }
    }

    impl<S, A, E, R> Clone for Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E> + Clone,
        E: Clone,
    {
        fn clone(&self) -> Self {
            Self {
                state: Arc::clone(&self.state),
                reducer: self.reducer.clone(),
                environment: self.environment.clone(),
                shutdown: Arc::clone(&self.shutdown),
                pending_effects: Arc::clone(&self.pending_effects),
                default_shutdown_timeout: self.default_shutdown_timeout,
                action_broadcast: self.action_broadcast.clone(),
            }
        }
    }
}

pub use store::Store;

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use seatflow_core::{SmallVec, effect::Effect, reducer::Reducer, smallvec};
    use std::time::Duration;

    #[derive(Debug, Clone)]
    struct TestState {
        value: i32,
    }

    #[derive(Debug, Clone)]
    enum TestAction {
        Increment,
        Decrement,
        NoOp,
        ProduceEffect,
        ProduceSlowEffect,
        ProducePanickingEffect,
    }

    #[derive(Debug, Clone)]
    struct TestEnv;

    #[derive(Debug, Clone)]
    struct TestReducer;

    impl Reducer for TestReducer {
        type State = TestState;
        type Action = TestAction;
        type Environment = TestEnv;

        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            _env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]> {
            match action {
                TestAction::Increment => {
                    state.value += 1;
                    smallvec![Effect::None]
                },
                TestAction::Decrement => {
                    state.value -= 1;
                    smallvec![Effect::None]
                },
                TestAction::NoOp => smallvec![Effect::None],
                TestAction::ProduceEffect => {
                    smallvec![Effect::Future(Box::pin(async { Some(TestAction::Increment) }))]
                },
                TestAction::ProduceSlowEffect => {
                    smallvec![Effect::Future(Box::pin(async {
                        tokio::time::sleep(Duration::from_millis(10)).await;
                        Some(TestAction::Increment)
                    }))]
                },
                TestAction::ProducePanickingEffect => {
                    smallvec![Effect::Future(Box::pin(async {
                        panic!("Intentional panic in effect for testing");
                    }))]
                },
            }
        }
    }

    fn store() -> Store<TestState, TestAction, TestEnv, TestReducer> {
        Store::new(TestState { value: 0 }, TestReducer, TestEnv)
    }

    #[tokio::test]
    async fn test_send_action() {
        let store = store();

        let _ = store.send(TestAction::Increment).await;
        let _ = store.send(TestAction::Increment).await;
        let _ = store.send(TestAction::Decrement).await;
        let _ = store.send(TestAction::NoOp).await;

        assert_eq!(store.state(|s| s.value).await, 1);
    }

    #[tokio::test]
    async fn test_effect_future_feeds_back() {
        let store = store();

        let mut handle = store.send(TestAction::ProduceEffect).await.unwrap();
        handle.wait_with_timeout(Duration::from_secs(1)).await.unwrap();

        assert_eq!(store.state(|s| s.value).await, 1);
    }

    #[tokio::test]
    async fn test_slow_effect_applies_after_send_returns() {
        let store = store();

        let mut handle = store.send(TestAction::ProduceSlowEffect).await.unwrap();
        assert_eq!(store.state(|s| s.value).await, 0);

        handle.wait_with_timeout(Duration::from_secs(1)).await.unwrap();
        assert_eq!(store.state(|s| s.value).await, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_sends() {
        let store = store();

        let handles: Vec<_> = (0..50)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move {
                    let _ = store.send(TestAction::Increment).await;
                })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(store.state(|s| s.value).await, 50);
    }

    #[tokio::test]
    async fn test_store_clone_shares_state() {
        let store1 = store();
        let store2 = store1.clone();

        let _ = store1.send(TestAction::Increment).await;
        assert_eq!(store2.state(|s| s.value).await, 1);
    }

    #[tokio::test]
    async fn test_effect_panic_isolation() -> Result<(), StoreError> {
        let store = store();

        let mut handle = store.send(TestAction::ProducePanickingEffect).await?;
        handle.wait().await;
        tokio::time::sleep(Duration::from_millis(20)).await;

        let _ = store.send(TestAction::Increment).await;
        assert_eq!(store.state(|s| s.value).await, 1);
        assert_eq!(store.pending_effects(), 0);

        Ok(())
    }

    #[tokio::test]
    async fn test_completed_handle_does_not_block() {
        let mut handle = EffectHandle::completed();
        assert_eq!(handle.pending(), 0);
        handle.wait_with_timeout(Duration::from_millis(10)).await.unwrap();
    }

    mod shutdown_tests {
        use super::*;

        #[tokio::test]
        async fn test_shutdown_with_no_pending_effects() {
            let store = store();
            assert!(store.shutdown(Duration::from_secs(1)).await.is_ok());
        }

        #[tokio::test]
        async fn test_shutdown_rejects_new_actions() {
            let store = store();
            store.shutdown(Duration::from_secs(1)).await.unwrap();

            let result = store.send(TestAction::Increment).await;
            assert!(matches!(result, Err(StoreError::ShutdownInProgress)));
        }

        #[tokio::test]
        async fn test_shutdown_waits_for_effects() {
            let store = store();
            let _handle = store.send(TestAction::ProduceSlowEffect).await.unwrap();

            let result = store.shutdown(Duration::from_secs(5)).await;
            assert!(result.is_ok());
            assert_eq!(store.pending_effects(), 0);
        }

        #[tokio::test]
        async fn test_shutdown_still_reduces_effect_actions() {
            let store = store();
            let _handle = store.send(TestAction::ProduceSlowEffect).await.unwrap();

            store.shutdown(Duration::from_secs(5)).await.unwrap();

            assert_eq!(store.state(|s| s.value).await, 1);
        }

        #[tokio::test]
        async fn test_shutdown_timeout() {
            #[derive(Clone)]
            struct LongRunningReducer;

            impl Reducer for LongRunningReducer {
                type State = TestState;
                type Action = TestAction;
                type Environment = TestEnv;

                fn reduce(
                    &self,
                    _state: &mut Self::State,
                    _action: Self::Action,
                    _env: &Self::Environment,
                ) -> SmallVec<[Effect<Self::Action>; 4]> {
                    smallvec![Effect::Future(Box::pin(async {
                        tokio::time::sleep(Duration::from_millis(300)).await;
                        None
                    }))]
                }
            }

            let store = Store::new(TestState { value: 0 }, LongRunningReducer, TestEnv);
            let _handle = store.send(TestAction::NoOp).await.unwrap();

            let result = store.shutdown(Duration::from_millis(60)).await;
            assert!(
                matches!(result, Err(StoreError::ShutdownTimeout(pending)) if pending > 0),
                "expected ShutdownTimeout, got {result:?}"
            );
        }

        #[tokio::test]
        async fn test_shutdown_idempotent() {
            let store = store();
            assert!(store.shutdown(Duration::from_secs(1)).await.is_ok());
            assert!(store.shutdown(Duration::from_secs(1)).await.is_ok());
        }
    }

    mod config_tests {
        use super::*;

        #[test]
        fn test_store_config_default() {
            let config = StoreConfig::default();
            assert_eq!(config.broadcast_capacity, 16);
            assert_eq!(config.default_shutdown_timeout, Duration::from_secs(30));
        }

        #[test]
        fn test_store_config_chaining() {
            let config = StoreConfig::default()
                .with_broadcast_capacity(256)
                .with_shutdown_timeout(Duration::from_secs(5));

            assert_eq!(config.broadcast_capacity, 256);
            assert_eq!(config.default_shutdown_timeout, Duration::from_secs(5));
        }

        #[tokio::test]
        async fn test_store_with_config_keeps_shutdown_timeout() {
            let config = StoreConfig::new(64, Duration::from_secs(7));
            let store = Store::with_config(TestState { value: 0 }, TestReducer, TestEnv, config);

            assert_eq!(store.default_shutdown_timeout(), Duration::from_secs(7));
        }
    }
}
