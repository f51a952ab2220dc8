//! # Seatflow Core
//!
//! Core traits and types for the Seatflow reducer architecture.
//!
//! This crate provides the fundamental abstractions for building event-driven
//! coordinators where every state transition goes through a reducer.
//!
//! A feature is a `State`, an `Action` enum covering its commands and the
//! events its effects report back, and a [`reducer::Reducer`] that applies one
//! action at a time. Reducers never perform I/O; they return
//! [`effect::Effect`] values and the runtime runs them once the new state is
//! visible. Time and other outside services reach the reducer through its
//! `Environment`.
//!
//! ## Example
//!
//! ```ignore
//! use seatflow_core::*;
//!
//! #[derive(Clone, Debug)]
//! enum TurnstileAction {
//!     Enter,
//! }
//!
//! impl Reducer for TurnstileReducer {
//!     type State = TurnstileState;
//!     type Action = TurnstileAction;
//!     type Environment = TurnstileEnvironment;
//!
//!     fn reduce(
//!         &self,
//!         state: &mut TurnstileState,
//!         action: TurnstileAction,
//!         env: &TurnstileEnvironment,
//!     ) -> SmallVec<[Effect<TurnstileAction>; 4]> {
//!         state.entries += 1;
//!         smallvec![Effect::None]
//!     }
//! }
//! ```

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use serde::{Deserialize, Serialize};
pub use smallvec::{smallvec, SmallVec};

/// Declarative macros for effect construction
pub mod effect_macros;

/// The reducer trait
pub mod reducer {
    use super::effect::Effect;
    use smallvec::SmallVec;

    /// Applies actions to state
    ///
    /// ```ignore
    /// impl Reducer for BoxOfficeReducer {
    ///     type State = BoxOffice;
    ///     type Action = BoxOfficeAction;
    ///     type Environment = BoxOfficeEnvironment;
    ///
    ///     fn reduce(
    ///         &self,
    ///         state: &mut BoxOffice,
    ///         action: BoxOfficeAction,
    ///         env: &BoxOfficeEnvironment,
    ///     ) -> SmallVec<[Effect<BoxOfficeAction>; 4]> {
    ///         match action {
    ///             BoxOfficeAction::Hold { seat } => {
    ///                 state.held.insert(seat);
    ///                 smallvec![Effect::None]
    ///             }
    ///             _ => smallvec![Effect::None],
    ///         }
    ///     }
    /// }
    /// ```
    pub trait Reducer {
        /// The state type this reducer operates on
        type State;

        /// The action type this reducer processes
        type Action;

        /// The environment type with injected dependencies
        type Environment;

        /// Applies `action` to `state` and describes the follow-up work
        ///
        /// Must not block or perform I/O. The runtime executes the returned effects only after the state
        /// mutation made by this call is visible to every other reader.
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]>;
    }
}

/// Descriptions of work for the runtime
pub mod effect {
    use std::future::Future;
    use std::pin::Pin;

    /// Work returned by a reducer
    ///
    /// Any action an effect yields is broadcast and then reduced like any
    /// other action.
    pub enum Effect<Action> {
        /// No-op effect
        None,

        /// Arbitrary async computation
        ///
        /// Returns `Option<Action>` - if Some, the action is fed back into the reducer
        Future(Pin<Box<dyn Future<Output = Option<Action>> + Send>>),
    }

    impl<Action> std::fmt::Debug for Effect<Action>
    where
        Action: std::fmt::Debug,
    {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Effect::None => write!(f, "Effect::None"),
                Effect::Future(_) => write!(f, "Effect::Future(<future>)"),
            }
        }
    }

    impl<Action> Effect<Action> {
        /// Returns true for `Effect::None`
        #[must_use]
        pub const fn is_none(&self) -> bool {
            matches!(self, Effect::None)
        }
    }
}

/// Services injected into reducers
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Source of the current time
    ///
    /// Reducers read time only through this, so tests can pin it.
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Production clock backed by the system time
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}
