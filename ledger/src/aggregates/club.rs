//! Club registry aggregate.
//!
//! One stream (`clubs`) holds every registration. A club is keyed by its owner
//! address, registers at most once, and is never changed or removed afterwards.

use clubticket_core::event::Event;
use clubticket_core::reducer::Reducer;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::LedgerError;
use crate::types::{Address, ClubRecord, MAX_CLUB_NAME_LEN, MAX_CONTACT_LEN, bounded_text};

/// Journal stream holding club registrations.
pub const CLUBS_STREAM: &str = "clubs";

// ============================================================================
// State
// ============================================================================

/// Every registered club, by owner address.
#[derive(Clone, Debug, Default)]
pub struct ClubRegistryState {
    clubs: HashMap<Address, ClubRecord>,
}

impl ClubRegistryState {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The club owned by `owner`, if registered.
    #[must_use]
    pub fn get(&self, owner: &Address) -> Option<&ClubRecord> {
        self.clubs.get(owner)
    }

    /// Whether `owner` has registered a club.
    #[must_use]
    pub fn contains(&self, owner: &Address) -> bool {
        self.clubs.contains_key(owner)
    }

    /// Number of registered clubs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.clubs.len()
    }

    /// Whether no club has registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clubs.is_empty()
    }
}

// ============================================================================
// Commands and facts
// ============================================================================

/// Commands accepted by the club registry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClubAction {
    /// Register the caller as a club.
    RegisterClub {
        /// Caller address
        owner: Address,
        /// Club name
        name: String,
        /// Contact details
        contact: String,
    },
}

/// Facts recorded by the club registry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClubEvent {
    /// A club was registered.
    ClubRegistered {
        /// The stored record
        club: ClubRecord,
    },
}

impl Event for ClubEvent {
    const EVENT_TYPES: &'static [&'static str] = &["ClubRegistered.v1"];

    fn event_type(&self) -> &'static str {
        match self {
            Self::ClubRegistered { .. } => "ClubRegistered.v1",
        }
    }
}

// ============================================================================
// Reducer
// ============================================================================

/// Validates registrations and folds them into [`ClubRegistryState`].
#[derive(Clone, Copy, Debug, Default)]
pub struct ClubRegistryReducer;

impl Reducer for ClubRegistryReducer {
    type State = ClubRegistryState;
    type Action = ClubAction;
    type Event = ClubEvent;
    type Environment = ();
    type Error = LedgerError;

    fn decide(
        &self,
        state: &ClubRegistryState,
        action: ClubAction,
        _env: &(),
    ) -> Result<ClubEvent, LedgerError> {
        match action {
            ClubAction::RegisterClub {
                owner,
                name,
                contact,
            } => {
                if state.contains(&owner) {
                    return Err(LedgerError::AlreadyRegistered(owner.to_string()));
                }
                let name = bounded_text("club name", &name, MAX_CLUB_NAME_LEN)?;
                let contact = bounded_text("contact", &contact, MAX_CONTACT_LEN)?;

                Ok(ClubEvent::ClubRegistered {
                    club: ClubRecord {
                        owner,
                        name,
                        contact,
                    },
                })
            },
        }
    }

    fn apply(&self, state: &mut ClubRegistryState, event: &ClubEvent) {
        match event {
            ClubEvent::ClubRegistered { club } => {
                // First registration wins, also when replaying.
                state
                    .clubs
                    .entry(club.owner.clone())
                    .or_insert_with(|| club.clone());
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use clubticket_testing::ReducerTest;

    fn address(raw: &str) -> Address {
        Address::parse(raw).unwrap()
    }

    fn register(owner: &str, name: &str, contact: &str) -> ClubAction {
        ClubAction::RegisterClub {
            owner: address(owner),
            name: name.to_string(),
            contact: contact.to_string(),
        }
    }

    fn registry_with(owner: &str, name: &str) -> ClubRegistryState {
        let mut state = ClubRegistryState::new();
        ClubRegistryReducer
            .reduce(&mut state, register(owner, name, "first@campus.edu"), &())
            .unwrap();
        state
    }

    #[test]
    fn registers_a_new_club() {
        ReducerTest::new(ClubRegistryReducer)
            .with_env(())
            .given_state(ClubRegistryState::new())
            .when_action(register("MLSC", " MLSC ", "mlsc@campus.edu"))
            .then_event(|event| {
                let ClubEvent::ClubRegistered { club } = event;
                assert_eq!(club.name, "MLSC");
            })
            .then_state(|state| {
                let club = state.get(&Address::parse("MLSC").unwrap()).unwrap();
                assert_eq!(club.contact, "mlsc@campus.edu");
                assert_eq!(state.len(), 1);
            })
            .run();
    }

    #[test]
    fn second_registration_is_rejected_and_keeps_first_record() {
        ReducerTest::new(ClubRegistryReducer)
            .with_env(())
            .given_state(registry_with("MLSC", "Original"))
            .when_action(register("MLSC", "Rebrand", "new@campus.edu"))
            .then_error(|error| {
                assert_eq!(*error, LedgerError::AlreadyRegistered("MLSC".to_string()));
            })
            .then_state(|state| {
                let club = state.get(&Address::parse("MLSC").unwrap()).unwrap();
                assert_eq!(club.name, "Original");
                assert_eq!(club.contact, "first@campus.edu");
            })
            .run();
    }

    #[test]
    fn empty_name_is_invalid() {
        ReducerTest::new(ClubRegistryReducer)
            .with_env(())
            .given_state(ClubRegistryState::new())
            .when_action(register("MLSC", "   ", "mlsc@campus.edu"))
            .then_error(|error| assert_eq!(error.kind(), "INVALID_INPUT"))
            .then_state(|state| assert!(state.is_empty()))
            .run();
    }

    #[test]
    fn overlong_contact_is_invalid() {
        ReducerTest::new(ClubRegistryReducer)
            .with_env(())
            .given_state(ClubRegistryState::new())
            .when_action(register("MLSC", "MLSC", &"c".repeat(MAX_CONTACT_LEN + 1)))
            .then_error(|error| assert_eq!(error.kind(), "INVALID_INPUT"))
            .run();
    }

    #[test]
    fn replaying_a_duplicate_fact_keeps_the_first() {
        let mut state = registry_with("MLSC", "Original");
        let duplicate = ClubEvent::ClubRegistered {
            club: ClubRecord {
                owner: address("MLSC"),
                name: "Other".to_string(),
                contact: "x@y".to_string(),
            },
        };

        ClubRegistryReducer.apply(&mut state, &duplicate);

        assert_eq!(state.get(&address("MLSC")).unwrap().name, "Original");
    }
}
