//! Aggregate reducers for the club ticket ledger.
//!
//! - Club: club registration (`clubs` stream)
//! - Registry: event creation and the asset index (`events` stream)
//! - Inventory: ticket sales and opt-ins, one per event (`event-<id>` streams)

pub mod club;
pub mod inventory;
pub mod registry;

pub use club::{CLUBS_STREAM, ClubAction, ClubEvent, ClubRegistryReducer, ClubRegistryState};
pub use inventory::{InventoryAction, InventoryEvent, InventoryReducer, InventoryState, InventoryStore};
pub use registry::{
    EVENTS_STREAM, EventRegistryReducer, EventRegistryState, RegistryAction, RegistryEnvironment,
    RegistryEvent, RegistryPolicy,
};
