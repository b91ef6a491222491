//! Event registry aggregate.
//!
//! The `events` stream records every event creation. Deciding a `CreateEvent`
//! assigns the next event id and the ticket asset id and builds the record;
//! applying the resulting `EventCreated` stores the record and mints the asset
//! by materializing the event's own [`InventoryStore`]. A record therefore
//! never exists without its asset, and the other way round.

use clubticket_core::environment::Clock;
use clubticket_core::event::Event;
use clubticket_core::journal::Journal;
use clubticket_core::reducer::Reducer;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use super::inventory::{InventoryReducer, InventoryState, InventoryStore, event_stream};
use crate::error::LedgerError;
use crate::types::{
    Address, Amount, AssetId, EventId, EventRecord, MAX_EVENT_NAME_LEN, MAX_TICKETS_PER_EVENT,
    MAX_VENUE_LEN, TicketAssetParams, bounded_text,
};

/// Journal stream holding event creations.
pub const EVENTS_STREAM: &str = "events";

// ============================================================================
// Policy and environment
// ============================================================================

/// Limits and asset parameters applied to every new event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegistryPolicy {
    /// The ledger's own account; manager and reserve of every ticket asset
    pub ledger_address: Address,
    /// Largest ticket supply accepted, at most [`MAX_TICKETS_PER_EVENT`]
    pub max_tickets_per_event: u64,
    /// Ticket asset ids are `asset_id_base + event_id`
    pub asset_id_base: u64,
    /// Unit name of ticket assets
    pub unit_name: String,
    /// URL recorded on ticket assets
    pub asset_url: String,
}

impl RegistryPolicy {
    /// Default policy for a ledger account.
    #[must_use]
    pub fn new(ledger_address: Address) -> Self {
        Self {
            ledger_address,
            max_tickets_per_event: MAX_TICKETS_PER_EVENT,
            asset_id_base: 1000,
            unit_name: "TKT".to_string(),
            asset_url: "https://campus-tix.algo".to_string(),
        }
    }
}

/// Dependencies of the registry's `decide`.
#[derive(Clone)]
pub struct RegistryEnvironment {
    /// Ledger time, for "event date must be in the future"
    pub clock: Arc<dyn Clock>,
    /// Limits and asset parameters
    pub policy: RegistryPolicy,
}

impl RegistryEnvironment {
    /// Bundle a clock and a policy.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, policy: RegistryPolicy) -> Self {
        Self { clock, policy }
    }
}

// ============================================================================
// State
// ============================================================================

/// Every event's inventory store, plus the asset index and event counter.
///
/// Cloning shares the inventory stores; only the index maps are copied.
#[derive(Clone, Debug, Default)]
pub struct EventRegistryState {
    events: BTreeMap<EventId, Arc<InventoryStore>>,
    assets: HashMap<AssetId, EventId>,
    total_events: u64,
}

impl EventRegistryState {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The inventory store of `event_id`, if it exists.
    #[must_use]
    pub fn inventory(&self, event_id: EventId) -> Option<Arc<InventoryStore>> {
        self.events.get(&event_id).cloned()
    }

    /// The event whose ticket asset is `asset_id`.
    #[must_use]
    pub fn event_for_asset(&self, asset_id: AssetId) -> Option<EventId> {
        self.assets.get(&asset_id).copied()
    }

    /// Number of events created.
    #[must_use]
    pub const fn total_events(&self) -> u64 {
        self.total_events
    }

    /// Every inventory store, in event id order.
    #[must_use]
    pub fn inventories(&self) -> Vec<Arc<InventoryStore>> {
        self.events.values().cloned().collect()
    }
}

// ============================================================================
// Commands and facts
// ============================================================================

/// Commands accepted by the event registry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RegistryAction {
    /// Create an event owned by `owner`.
    ///
    /// The caller must already be a registered club; the ledger checks that
    /// against the club registry before sending this command.
    CreateEvent {
        /// Organizing club
        owner: Address,
        /// Event name
        name: String,
        /// Venue
        venue: String,
        /// Start time, unix seconds
        event_date: u64,
        /// Price per ticket
        ticket_price: Amount,
        /// Ticket supply
        total_tickets: u64,
    },
}

/// Facts recorded by the event registry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegistryEvent {
    /// An event was created and its ticket asset minted.
    EventCreated {
        /// The new record, with `sold_tickets = 0`
        record: EventRecord,
        /// The minted asset
        asset: TicketAssetParams,
    },
}

impl Event for RegistryEvent {
    const EVENT_TYPES: &'static [&'static str] = &["EventCreated.v1"];

    fn event_type(&self) -> &'static str {
        match self {
            Self::EventCreated { .. } => "EventCreated.v1",
        }
    }
}

// ============================================================================
// Reducer
// ============================================================================

/// Validates event creation and materializes each event's inventory.
///
/// Holds the journal so that applying `EventCreated` can open the new event's
/// store on its own stream.
#[derive(Clone)]
pub struct EventRegistryReducer {
    journal: Arc<dyn Journal>,
}

impl EventRegistryReducer {
    /// Create a reducer whose inventories write to `journal`.
    #[must_use]
    pub fn new(journal: Arc<dyn Journal>) -> Self {
        Self { journal }
    }

    fn validate_schedule(
        env: &RegistryEnvironment,
        event_date: u64,
        ticket_price: Amount,
        total_tickets: u64,
    ) -> Result<(), LedgerError> {
        let now = env.clock.now().timestamp();
        let in_future = i64::try_from(event_date).map_or(true, |date| date > now);
        if !in_future {
            return Err(LedgerError::EventInPast {
                date: event_date,
                now,
            });
        }

        if ticket_price.is_zero() {
            return Err(LedgerError::InvalidPrice);
        }

        let max = env.policy.max_tickets_per_event.min(MAX_TICKETS_PER_EVENT);
        if total_tickets == 0 || total_tickets > max {
            return Err(LedgerError::InvalidQuantity {
                quantity: total_tickets,
                max,
            });
        }

        Ok(())
    }
}

impl std::fmt::Debug for EventRegistryReducer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventRegistryReducer").finish_non_exhaustive()
    }
}

impl Reducer for EventRegistryReducer {
    type State = EventRegistryState;
    type Action = RegistryAction;
    type Event = RegistryEvent;
    type Environment = RegistryEnvironment;
    type Error = LedgerError;

    fn decide(
        &self,
        state: &EventRegistryState,
        action: RegistryAction,
        env: &RegistryEnvironment,
    ) -> Result<RegistryEvent, LedgerError> {
        match action {
            RegistryAction::CreateEvent {
                owner,
                name,
                venue,
                event_date,
                ticket_price,
                total_tickets,
            } => {
                let name = bounded_text("event name", &name, MAX_EVENT_NAME_LEN)?;
                let venue = bounded_text("venue", &venue, MAX_VENUE_LEN)?;
                Self::validate_schedule(env, event_date, ticket_price, total_tickets)?;

                let event_id = state
                    .total_events
                    .checked_add(1)
                    .map(EventId::new)
                    .ok_or_else(|| LedgerError::InvalidInput("event id space exhausted".into()))?;
                let asset_id = env
                    .policy
                    .asset_id_base
                    .checked_add(event_id.value())
                    .map(AssetId::new)
                    .ok_or_else(|| LedgerError::InvalidInput("asset id space exhausted".into()))?;

                let asset = TicketAssetParams {
                    asset_id,
                    asset_name: name.clone(),
                    unit_name: env.policy.unit_name.clone(),
                    url: env.policy.asset_url.clone(),
                    total: total_tickets,
                    decimals: 0,
                    manager: env.policy.ledger_address.clone(),
                    reserve: env.policy.ledger_address.clone(),
                };
                let record = EventRecord {
                    event_id,
                    owner,
                    name,
                    venue,
                    event_date,
                    ticket_price,
                    total_tickets,
                    sold_tickets: 0,
                    asset_id,
                };

                Ok(RegistryEvent::EventCreated { record, asset })
            },
        }
    }

    fn apply(&self, state: &mut EventRegistryState, event: &RegistryEvent) {
        match event {
            RegistryEvent::EventCreated { record, asset } => {
                let event_id = record.event_id;
                if state.events.contains_key(&event_id) {
                    return;
                }

                let inventory = InventoryStore::new(
                    "event",
                    event_stream(event_id),
                    InventoryState::new(record.clone(), asset.clone()),
                    InventoryReducer,
                    (),
                    Arc::clone(&self.journal),
                );

                state.events.insert(event_id, Arc::new(inventory));
                state.assets.insert(asset.asset_id, event_id);
                state.total_events = state.total_events.max(event_id.value());
            },
        }
    }
}
