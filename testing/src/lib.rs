//! # Seatflow Testing
//!
//! Testing utilities and helpers for the Seatflow architecture.
//!
//! This crate provides:
//! - Deterministic clocks for the `Clock` environment trait
//! - A Given-When-Then harness for reducers
//! - Assertion helpers for effects
//!
//! ## Example
//!
//! ```ignore
//! use seatflow_testing::{ReducerTest, test_clock};
//!
//! ReducerTest::new(OrderReducer)
//!     .with_env(OrderEnvironment::new(test_clock()))
//!     .given_state(OrderState::default())
//!     .when_action(OrderAction::Place { id: 1 })
//!     .then_state(|s| assert_eq!(s.orders.len(), 1))
//!     .run();
//! ```

use chrono::{DateTime, Utc};
use seatflow_core::environment::Clock;


/// Mock implementations of Environment traits
pub mod mocks {
    use super::{Clock, DateTime, Utc};
    use std::sync::atomic::{AtomicI64, Ordering};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use seatflow_testing::mocks::FixedClock;
    /// use seatflow_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Clock that advances by a fixed step every time it is read
    ///
    /// Gives strictly increasing timestamps without sleeping.
    ///
    /// ```
    /// use seatflow_testing::mocks::SteppingClock;
    /// use seatflow_core::environment::Clock;
    /// use chrono::{Duration, Utc};
    ///
    /// let clock = SteppingClock::new(Utc::now(), Duration::milliseconds(5));
    /// let first = clock.now();
    /// assert_eq!(clock.now() - first, Duration::milliseconds(5));
    /// ```
    #[derive(Debug)]
    pub struct SteppingClock {
        start: DateTime<Utc>,
        step_ms: i64,
        reads: AtomicI64,
    }

    impl SteppingClock {
        /// Start at `start`, advancing by `step` per read
        #[must_use]
        pub fn new(start: DateTime<Utc>, step: chrono::Duration) -> Self {
            Self {
                start,
                step_ms: step.num_milliseconds(),
                reads: AtomicI64::new(0),
            }
        }
    }

    impl Clock for SteppingClock {
        fn now(&self) -> DateTime<Utc> {
            let reads = self.reads.fetch_add(1, Ordering::SeqCst);
            self.start + chrono::Duration::milliseconds(reads.saturating_mul(self.step_ms))
        }
    }

    /// The fixed instant used by test clocks: 2025-01-01 00:00:00 UTC
    #[must_use]
    pub fn test_epoch() -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(1_735_689_600, 0).unwrap_or_default()
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    #[must_use]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(test_epoch())
    }

    /// Create a stepping clock starting at the test epoch, one second per read
    #[must_use]
    pub fn stepping_test_clock() -> SteppingClock {
        SteppingClock::new(test_epoch(), chrono::Duration::seconds(1))
    }
}

// Re-export commonly used items
pub use mocks::{FixedClock, SteppingClock, stepping_test_clock, test_clock};
pub use reducer_test::{ReducerTest, assertions};
