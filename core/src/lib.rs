//! # Clubticket Core
//!
//! Core traits and types shared by every ledger component.
//!
//! ## Core Concepts
//!
//! - **State**: the data owned by one aggregate instance (a club registry, an
//!   event registry, one event's inventory)
//! - **Action**: a command submitted to an aggregate
//! - **Event**: a committed fact produced by a command
//! - **Reducer**: `decide(State, Action, Environment) → Event | Error`, then
//!   `apply(State, Event)`
//! - **Environment**: injected dependencies (the clock)
//! - **Journal**: append-only storage of facts, one stream per aggregate instance
//!
//! ## Architecture Principles
//!
//! - Deciding never mutates: a rejected command leaves state untouched
//! - Applying never fails: a committed fact always folds into state
//! - The runtime journals a fact before applying it, so state only ever reflects
//!   what the journal holds
//!
//! ## Example
//!
//! ```
//! use clubticket_core::reducer::Reducer;
//!
//! #[derive(Default)]
//! struct Turnstile {
//!     admitted: u32,
//!     capacity: u32,
//! }
//!
//! enum Command {
//!     Admit,
//! }
//!
//! struct Admitted;
//!
//! struct TurnstileReducer;
//!
//! impl Reducer for TurnstileReducer {
//!     type State = Turnstile;
//!     type Action = Command;
//!     type Event = Admitted;
//!     type Environment = ();
//!     type Error = &'static str;
//!
//!     fn decide(&self, state: &Turnstile, action: Command, _env: &()) -> Result<Admitted, &'static str> {
//!         match action {
//!             Command::Admit if state.admitted < state.capacity => Ok(Admitted),
//!             Command::Admit => Err("full"),
//!         }
//!     }
//!
//!     fn apply(&self, state: &mut Turnstile, _event: &Admitted) {
//!         state.admitted += 1;
//!     }
//! }
//!
//! let mut state = Turnstile { admitted: 0, capacity: 1 };
//! assert!(TurnstileReducer.reduce(&mut state, Command::Admit, &()).is_ok());
//! assert!(TurnstileReducer.reduce(&mut state, Command::Admit, &()).is_err());
//! assert_eq!(state.admitted, 1);
//! ```

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use serde::{Deserialize, Serialize};

/// Committed facts and their stored form
pub mod event;

/// Append-only fact storage with optimistic concurrency
pub mod journal;

/// Stream identifiers and versions
pub mod stream;

/// Reducer module - the core trait for business logic
pub mod reducer {
    /// The Reducer trait - validates commands and folds facts into state.
    ///
    /// Business logic is split in two so the runtime can put the journal write
    /// between them:
    ///
    /// 1. [`decide`](Reducer::decide) inspects the current state and either rejects
    ///    the command or returns the single fact it produces. It takes `&State`, so
    ///    it cannot leave partial changes behind.
    /// 2. [`apply`](Reducer::apply) folds a committed fact into state. It is also
    ///    used to rebuild state from the journal, so it must accept any fact that
    ///    `decide` could have produced and must not fail.
    pub trait Reducer {
        /// The state type this reducer operates on
        type State;

        /// The command type this reducer accepts
        type Action;

        /// The fact type this reducer produces and applies
        type Event;

        /// The environment type with injected dependencies
        type Environment;

        /// Why a command was rejected
        type Error;

        /// Validate a command against the current state.
        ///
        /// # Errors
        ///
        /// Returns the rejection reason; the state is unchanged.
        fn decide(
            &self,
            state: &Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> Result<Self::Event, Self::Error>;

        /// Fold a committed fact into state.
        fn apply(&self, state: &mut Self::State, event: &Self::Event);

        /// Decide and, on success, apply immediately (no journal).
        ///
        /// # Errors
        ///
        /// Returns the rejection reason from [`decide`](Reducer::decide).
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> Result<Self::Event, Self::Error> {
            let event = self.decide(state, action, env)?;
            self.apply(state, &event);
            Ok(event)
        }
    }
}

/// Environment module - Dependency injection traits
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time so "is this date in the future" is testable.
    ///
    /// ```
    /// use clubticket_core::environment::{Clock, SystemClock};
    ///
    /// let before = chrono::Utc::now();
    /// assert!(SystemClock.now() >= before);
    /// ```
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Wall-clock time.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}
