//! The ledger service.
//!
//! [`Ledger`] owns the club registry and event registry stores and, through
//! the event registry, one inventory store per event. Every public method is
//! one ledger operation. Mutations go through a store, so each either commits
//! a single journaled fact or is rejected with no state change. Reads are
//! synchronous: they look at the last published snapshot of each store and
//! never wait on a writer, including the creation of another event.

use clubticket_core::environment::Clock;
use clubticket_core::journal::{Journal, JournalError};
use clubticket_core::stream::StreamId;
use clubticket_runtime::metrics::LedgerMetrics;
use clubticket_runtime::{HealthReport, Store, StoreError};
use serde_json::json;
use std::sync::Arc;

use crate::aggregates::{
    CLUBS_STREAM, ClubAction, ClubEvent, ClubRegistryReducer, ClubRegistryState, EVENTS_STREAM,
    EventRegistryReducer, EventRegistryState, InventoryAction, InventoryEvent, InventoryStore,
    RegistryAction, RegistryEnvironment, RegistryEvent, RegistryPolicy,
};
use crate::error::{LedgerError, Result};
use crate::types::{
    Address, AssetId, CallContext, ClubRecord, EventDetails, EventId, NewEvent,
    TicketAssetParams, TicketReceipt,
};

/// Club registrations, events, ticket inventories and asset holdings.
pub struct Ledger {
    clubs: Store<ClubRegistryReducer>,
    events: Store<EventRegistryReducer>,
    policy: RegistryPolicy,
}

impl Ledger {
    /// Create an empty ledger writing to `journal`.
    #[must_use]
    pub fn new(policy: RegistryPolicy, journal: Arc<dyn Journal>, clock: Arc<dyn Clock>) -> Self {
        let clubs = Store::new(
            "clubs",
            StreamId::new(CLUBS_STREAM),
            ClubRegistryState::new(),
            ClubRegistryReducer,
            (),
            Arc::clone(&journal),
        );
        let events = Store::new(
            "events",
            StreamId::new(EVENTS_STREAM),
            EventRegistryState::new(),
            EventRegistryReducer::new(Arc::clone(&journal)),
            RegistryEnvironment::new(clock, policy.clone()),
            journal,
        );

        Self {
            clubs,
            events,
            policy,
        }
    }

    /// Rebuild a ledger from everything `journal` holds.
    ///
    /// Clubs are replayed first, then event creations (which recreate every
    /// inventory store), then each event's own stream.
    ///
    /// # Errors
    ///
    /// Returns [`JournalError`] if a stream cannot be read or holds a fact
    /// that does not decode.
    #[tracing::instrument(skip_all)]
    pub async fn restore(
        policy: RegistryPolicy,
        journal: Arc<dyn Journal>,
        clock: Arc<dyn Clock>,
    ) -> std::result::Result<Self, JournalError> {
        let ledger = Self::new(policy, journal, clock);

        let clubs = ledger.clubs.hydrate().await?;
        let events = ledger.events.hydrate().await?;

        let mut facts = 0;
        for inventory in ledger.inventories() {
            facts += inventory.hydrate().await?;
        }

        let total = ledger.get_total_events();
        LedgerMetrics::record_event_count(total);
        tracing::info!(clubs, events, inventory_facts = facts, "Ledger restored from journal");
        Ok(ledger)
    }

    /// Limits and asset parameters this ledger applies.
    #[must_use]
    pub const fn policy(&self) -> &RegistryPolicy {
        &self.policy
    }

    // ========================================================================
    // Club registry
    // ========================================================================

    /// Register the caller as a club.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::AlreadyRegistered`] if the caller already has a club
    /// - [`LedgerError::InvalidInput`] for an empty or overlong name or contact
    /// - [`LedgerError::Storage`] if the journal refused the write
    #[tracing::instrument(skip(self, ctx, name, contact), fields(caller = %ctx.caller))]
    pub async fn register_club(
        &self,
        ctx: &CallContext,
        name: &str,
        contact: &str,
    ) -> Result<ClubRecord> {
        let action = ClubAction::RegisterClub {
            owner: ctx.caller.clone(),
            name: name.to_string(),
            contact: contact.to_string(),
        };

        let event = observe(
            "register_club",
            self.clubs.send_with_metadata(action, caller_metadata(ctx)).await,
        )?;
        let ClubEvent::ClubRegistered { club } = event;

        tracing::info!(club = %club.name, "Club registered");
        Ok(club)
    }

    /// Whether `address` has registered a club.
    #[must_use]
    pub fn is_club_registered(&self, address: &Address) -> bool {
        self.clubs.state(|clubs| clubs.contains(address))
    }

    /// Name of the club registered by `address`.
    #[must_use]
    pub fn get_club_name(&self, address: &Address) -> Option<String> {
        self.clubs
            .state(|clubs| clubs.get(address).map(|club| club.name.clone()))
    }

    /// Full club record of `address`.
    #[must_use]
    pub fn get_club(&self, address: &Address) -> Option<ClubRecord> {
        self.clubs.state(|clubs| clubs.get(address).cloned())
    }

    // ========================================================================
    // Event registry
    // ========================================================================

    /// Create an event owned by the caller and mint its ticket asset.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::ClubNotRegistered`] if the caller is not a club
    /// - [`LedgerError::InvalidInput`] for an empty or overlong name or venue
    /// - [`LedgerError::EventInPast`] if the date is not after the current time
    /// - [`LedgerError::InvalidPrice`] for a zero price
    /// - [`LedgerError::InvalidQuantity`] for a supply outside `1..=max`
    /// - [`LedgerError::Storage`] if the journal refused the write
    #[tracing::instrument(skip(self, ctx, event), fields(caller = %ctx.caller, name = %event.name))]
    pub async fn create_event(&self, ctx: &CallContext, event: NewEvent) -> Result<EventId> {
        // Clubs are never removed, so the check cannot go stale before the send.
        if !self.is_club_registered(&ctx.caller) {
            let rejection = LedgerError::ClubNotRegistered(ctx.caller.to_string());
            return observe("create_event", Err(StoreError::Rejected(rejection)));
        }

        let action = RegistryAction::CreateEvent {
            owner: ctx.caller.clone(),
            name: event.name,
            venue: event.venue,
            event_date: event.event_date,
            ticket_price: event.ticket_price,
            total_tickets: event.total_tickets,
        };

        let created = observe(
            "create_event",
            self.events.send_with_metadata(action, caller_metadata(ctx)).await,
        )?;
        let RegistryEvent::EventCreated { record, asset } = created;

        LedgerMetrics::record_event_count(record.event_id.value());
        tracing::info!(
            event_id = %record.event_id,
            asset_id = %asset.asset_id,
            total_tickets = record.total_tickets,
            "Event created"
        );
        Ok(record.event_id)
    }

    /// Current details of an event, including its sold count.
    #[must_use]
    pub fn get_event_details(&self, event_id: EventId) -> Option<EventDetails> {
        let inventory = self.inventory(event_id)?;
        Some(inventory.state(|state| EventDetails::from(state.record())))
    }

    /// Number of events created so far. Event ids run from 1 to this value.
    #[must_use]
    pub fn get_total_events(&self) -> u64 {
        self.events.state(EventRegistryState::total_events)
    }

    // ========================================================================
    // Ticket issuance
    // ========================================================================

    /// Buy one ticket for the caller, paid by the call's attached payment.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::EventNotFound`] if the event does not exist
    /// - [`LedgerError::PaymentMismatch`] if the payment is absent, not sent by
    ///   the caller, not addressed to the organizing club, or not the ticket price
    /// - [`LedgerError::SoldOut`] if no tickets remain
    /// - [`LedgerError::NotOptedIn`] if the caller has not opted in to the asset
    /// - [`LedgerError::Storage`] if the journal refused the write
    #[tracing::instrument(skip(self, ctx), fields(caller = %ctx.caller))]
    pub async fn buy_ticket(&self, event_id: EventId, ctx: &CallContext) -> Result<TicketReceipt> {
        let Some(inventory) = self.inventory(event_id) else {
            return observe(
                "buy_ticket",
                Err(StoreError::Rejected(LedgerError::EventNotFound(event_id))),
            );
        };

        let action = InventoryAction::IssueTicket {
            buyer: ctx.caller.clone(),
            payment: ctx.payment.clone(),
        };
        let issued = observe(
            "buy_ticket",
            inventory.send_with_metadata(action, caller_metadata(ctx)).await,
        )?;

        let InventoryEvent::TicketIssued { holder, serial, .. } = issued else {
            return Err(LedgerError::Storage(
                "ticket purchase produced an unexpected fact".to_string(),
            ));
        };
        let asset_id = inventory.state(|state| state.asset().asset_id);

        LedgerMetrics::record_ticket_issued();
        tracing::info!(serial, %asset_id, "Ticket issued");
        Ok(TicketReceipt {
            event_id,
            asset_id,
            holder,
            serial,
        })
    }

    // ========================================================================
    // Ownership verification
    // ========================================================================

    /// Whether `holder` holds at least one ticket for the event.
    ///
    /// An unknown event is `false`, not an error.
    #[must_use]
    pub fn verify_ticket(&self, event_id: EventId, holder: &Address) -> bool {
        match self.inventory(event_id) {
            Some(inventory) => inventory.state(|state| state.holds_ticket(holder)),
            None => false,
        }
    }

    // ========================================================================
    // Asset primitives
    // ========================================================================

    /// Declare that the caller is willing to hold `asset_id`.
    ///
    /// Opting in twice is a no-op.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::AssetNotFound`] if no event minted this asset
    /// - [`LedgerError::Storage`] if the journal refused the write
    #[tracing::instrument(skip(self, ctx), fields(caller = %ctx.caller))]
    pub async fn opt_in(&self, asset_id: AssetId, ctx: &CallContext) -> Result<()> {
        let inventory = match self.inventory_for_asset(asset_id) {
            Ok(inventory) => inventory,
            Err(rejection) => return observe("opt_in", Err(StoreError::Rejected(rejection))),
        };

        if inventory.state(|state| state.is_opted_in(&ctx.caller)) {
            tracing::debug!("Already opted in");
            return Ok(());
        }

        let action = InventoryAction::OptIn {
            holder: ctx.caller.clone(),
        };
        observe(
            "opt_in",
            inventory.send_with_metadata(action, caller_metadata(ctx)).await,
        )?;

        tracing::info!(%asset_id, "Holder opted in");
        Ok(())
    }

    /// Units of `asset_id` held by `holder`; `None` if `holder` never opted in.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::AssetNotFound`] if no event minted this asset.
    pub fn asset_balance(&self, asset_id: AssetId, holder: &Address) -> Result<Option<u64>> {
        let inventory = self.inventory_for_asset(asset_id)?;
        Ok(inventory.state(|state| state.balance(holder)))
    }

    /// Whether `holder` has opted in to `asset_id`.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::AssetNotFound`] if no event minted this asset.
    pub fn is_opted_in(&self, asset_id: AssetId, holder: &Address) -> Result<bool> {
        let inventory = self.inventory_for_asset(asset_id)?;
        Ok(inventory.state(|state| state.is_opted_in(holder)))
    }

    /// Parameters of a ticket asset.
    #[must_use]
    pub fn get_asset_params(&self, asset_id: AssetId) -> Option<TicketAssetParams> {
        let inventory = self.inventory_for_asset(asset_id).ok()?;
        Some(inventory.state(|state| state.asset().clone()))
    }

    /// Units of `asset_id` still held in the ledger's reserve.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::AssetNotFound`] if no event minted this asset.
    pub fn asset_reserve(&self, asset_id: AssetId) -> Result<u64> {
        let inventory = self.inventory_for_asset(asset_id)?;
        Ok(inventory.state(|state| state.reserve()))
    }

    /// The event that minted `asset_id`.
    #[must_use]
    pub fn event_for_asset(&self, asset_id: AssetId) -> Option<EventId> {
        self.events.state(|registry| registry.event_for_asset(asset_id))
    }

    // ========================================================================
    // Health
    // ========================================================================

    /// Report every registry stream and how many inventories are live.
    #[must_use]
    pub fn health(&self) -> HealthReport {
        let inventories = self.inventories().len();
        let checks = vec![
            self.clubs.health(),
            self.events
                .health()
                .with_metadata("inventories", inventories.to_string()),
        ];
        HealthReport::new(checks)
    }

    fn inventory(&self, event_id: EventId) -> Option<Arc<InventoryStore>> {
        self.events.state(|registry| registry.inventory(event_id))
    }

    fn inventory_for_asset(&self, asset_id: AssetId) -> Result<Arc<InventoryStore>> {
        let inventory = self.events.state(|registry| {
            registry
                .event_for_asset(asset_id)
                .and_then(|event_id| registry.inventory(event_id))
        });
        inventory.ok_or(LedgerError::AssetNotFound(asset_id))
    }

    fn inventories(&self) -> Vec<Arc<InventoryStore>> {
        self.events.state(EventRegistryState::inventories)
    }
}

impl std::fmt::Debug for Ledger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ledger")
            .field("clubs", &self.clubs)
            .field("events", &self.events)
            .field("policy", &self.policy)
            .finish()
    }
}

fn caller_metadata(ctx: &CallContext) -> Option<serde_json::Value> {
    Some(json!({ "caller": ctx.caller.as_str() }))
}

/// Log and count the outcome of a store command, then flatten its error.
fn observe<T>(operation: &'static str, outcome: std::result::Result<T, StoreError<LedgerError>>) -> Result<T> {
    outcome.map_err(|err| {
        let err = LedgerError::from(err);
        if err.is_storage() {
            tracing::error!(operation, error = %err, "Ledger write failed");
        } else {
            tracing::warn!(operation, kind = err.kind(), reason = %err, "Ledger call rejected");
        }
        LedgerMetrics::record_rejection(err.kind());
        err
    })
}
