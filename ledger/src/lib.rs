//! Club Ticket Ledger - registered clubs selling fixed-supply tickets
//!
//! Clubs register once, create events, and sell tickets for them. Each event
//! mints its own ticket asset whose supply equals the event's ticket count;
//! owning a ticket means holding at least one unit of that asset.
//!
//! # Architecture
//!
//! ```text
//!               ┌──────────────┐     ┌──────────────┐
//!   register ──►│ Club registry│     │Event registry│◄── create_event
//!               │  ("clubs")   │     │  ("events")  │
//!               └──────────────┘     └──────┬───────┘
//!                                           │ one per event
//!                                           ▼
//!                                   ┌──────────────┐
//!        buy_ticket, opt_in ───────►│  Inventory   │
//!                                   │ ("event-<id>")│
//!                                   └──────────────┘
//! ```
//!
//! Every box is a [`Store`](clubticket_runtime::Store): commands are decided,
//! journaled and applied one at a time per box, so two buyers racing for the
//! last ticket of an event are serialized, while sales for different events
//! never wait on each other.
//!
//! # Example
//!
//! ```
//! use clubticket_core::environment::SystemClock;
//! use clubticket_ledger::{
//!     Address, Amount, CallContext, Ledger, NewEvent, Payment, RegistryPolicy,
//! };
//! use clubticket_runtime::InMemoryJournal;
//! use std::sync::Arc;
//!
//! # tokio_test::block_on(async {
//! let ledger = Ledger::new(
//!     RegistryPolicy::new(Address::parse("LEDGER")?),
//!     Arc::new(InMemoryJournal::new()),
//!     Arc::new(SystemClock),
//! );
//!
//! let club = CallContext::new(Address::parse("MLSC")?);
//! ledger.register_club(&club, "MLSC", "mlsc@campus.edu").await?;
//! let event_id = ledger
//!     .create_event(
//!         &club,
//!         NewEvent {
//!             name: "Hexpiration".to_string(),
//!             venue: "Lab A".to_string(),
//!             event_date: 4_102_444_800,
//!             ticket_price: Amount::new(3_000_000),
//!             total_tickets: 50,
//!         },
//!     )
//!     .await?;
//!
//! let buyer = Address::parse("BUYER")?;
//! let asset_id = ledger.get_event_details(event_id).map(|e| e.asset_id);
//! if let Some(asset_id) = asset_id {
//!     ledger.opt_in(asset_id, &CallContext::new(buyer.clone())).await?;
//! }
//! let paid = CallContext::new(buyer.clone()).with_payment(Payment {
//!     sender: buyer.clone(),
//!     receiver: club.caller.clone(),
//!     amount: Amount::new(3_000_000),
//! });
//! ledger.buy_ticket(event_id, &paid).await?;
//!
//! assert!(ledger.verify_ticket(event_id, &buyer));
//! # Ok::<(), clubticket_ledger::LedgerError>(())
//! # }).unwrap();
//! ```

pub mod aggregates;
pub mod api;
pub mod config;
pub mod error;
pub mod ledger;
pub mod server;
pub mod types;

pub use aggregates::RegistryPolicy;
pub use config::{Config, ConfigError, JournalBackend, JournalConfig};
pub use error::{LedgerError, Result};
pub use ledger::Ledger;
pub use types::{
    Address, Amount, AssetId, CallContext, ClubRecord, EventDetails, EventId, EventRecord,
    NewEvent, Payment, TicketAssetParams, TicketReceipt,
};
