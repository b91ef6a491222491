//! Per-event ticket inventory aggregate.
//!
//! Each event has its own stream (`event-<id>`) and its own store, so sales of
//! different events never wait on each other while sales of one event are
//! linearized by that store's writer lock.
//!
//! The state holds the event record, the ticket asset's parameters, the units
//! still held by the ledger (the reserve) and every holder's balance. Issuing a
//! ticket is one fact that moves a unit from the reserve to the buyer and bumps
//! `sold_tickets`, so these always agree:
//!
//! ```text
//! reserve + sold_tickets == total_tickets
//! sum(holder balances)   == sold_tickets
//! ```

use clubticket_core::event::Event;
use clubticket_core::reducer::Reducer;
use clubticket_core::stream::StreamId;
use clubticket_runtime::Store;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::error::LedgerError;
use crate::types::{Address, Amount, EventId, EventRecord, Payment, TicketAssetParams};

/// Store type running one event's inventory.
pub type InventoryStore = Store<InventoryReducer>;

/// Journal stream for one event's sales and opt-ins.
#[must_use]
pub fn event_stream(event_id: EventId) -> StreamId {
    StreamId::new(format!("event-{event_id}"))
}

// ============================================================================
// State
// ============================================================================

/// One event's record, ticket asset and holdings.
#[derive(Clone, Debug)]
pub struct InventoryState {
    record: EventRecord,
    asset: TicketAssetParams,
    reserve: u64,
    balances: HashMap<Address, u64>,
    opted_in: HashSet<Address>,
}

impl InventoryState {
    /// Fresh inventory: every unit held by the ledger, nobody opted in.
    #[must_use]
    pub fn new(record: EventRecord, asset: TicketAssetParams) -> Self {
        Self {
            reserve: record.remaining(),
            record,
            asset,
            balances: HashMap::new(),
            opted_in: HashSet::new(),
        }
    }

    /// The event record, including `sold_tickets`.
    #[must_use]
    pub const fn record(&self) -> &EventRecord {
        &self.record
    }

    /// The ticket asset's parameters.
    #[must_use]
    pub const fn asset(&self) -> &TicketAssetParams {
        &self.asset
    }

    /// Units not yet issued.
    #[must_use]
    pub const fn reserve(&self) -> u64 {
        self.reserve
    }

    /// Whether `holder` has opted in to this event's asset.
    #[must_use]
    pub fn is_opted_in(&self, holder: &Address) -> bool {
        self.opted_in.contains(holder)
    }

    /// Units held by `holder`; `None` if it never opted in.
    #[must_use]
    pub fn balance(&self, holder: &Address) -> Option<u64> {
        self.is_opted_in(holder)
            .then(|| self.balances.get(holder).copied().unwrap_or(0))
    }

    /// Whether `holder` is opted in and holds at least one unit.
    #[must_use]
    pub fn holds_ticket(&self, holder: &Address) -> bool {
        self.balance(holder).is_some_and(|units| units > 0)
    }

    /// Sum of all holder balances.
    #[must_use]
    pub fn issued(&self) -> u64 {
        self.balances.values().sum()
    }
}

// ============================================================================
// Commands and facts
// ============================================================================

/// Commands accepted by an event's inventory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InventoryAction {
    /// Sell one ticket to `buyer`, paid by `payment`.
    IssueTicket {
        /// Caller address
        buyer: Address,
        /// Payment attached to the call
        payment: Option<Payment>,
    },

    /// Declare that `holder` accepts units of this event's asset.
    OptIn {
        /// Caller address
        holder: Address,
    },
}

/// Facts recorded in an event's stream.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum InventoryEvent {
    /// One unit moved from the reserve to `holder`.
    TicketIssued {
        /// Buyer
        holder: Address,
        /// Amount paid to the club
        amount_paid: Amount,
        /// `sold_tickets` after this sale
        serial: u64,
    },

    /// `holder` opted in to the asset.
    HolderOptedIn {
        /// Account that opted in
        holder: Address,
    },
}

impl Event for InventoryEvent {
    const EVENT_TYPES: &'static [&'static str] = &["TicketIssued.v1", "HolderOptedIn.v1"];

    fn event_type(&self) -> &'static str {
        match self {
            Self::TicketIssued { .. } => "TicketIssued.v1",
            Self::HolderOptedIn { .. } => "HolderOptedIn.v1",
        }
    }
}

// ============================================================================
// Reducer
// ============================================================================

/// Runs the check-and-increment for ticket sales.
#[derive(Clone, Copy, Debug, Default)]
pub struct InventoryReducer;

impl InventoryReducer {
    /// Checks the attached payment against the event.
    ///
    /// The payment must exist, go to the organizing club, come from the buyer,
    /// and match the ticket price exactly.
    fn validate_payment(
        record: &EventRecord,
        buyer: &Address,
        payment: Option<&Payment>,
    ) -> Result<Amount, LedgerError> {
        let Some(payment) = payment else {
            return Err(LedgerError::PaymentMismatch(
                "no payment attached to the call".to_string(),
            ));
        };
        if payment.receiver != record.owner {
            return Err(LedgerError::PaymentMismatch(format!(
                "payment must be sent to the organizing club {}, not {}",
                record.owner, payment.receiver
            )));
        }
        if payment.sender != *buyer {
            return Err(LedgerError::PaymentMismatch(format!(
                "payment must come from the buyer {buyer}, not {}",
                payment.sender
            )));
        }
        if payment.amount != record.ticket_price {
            return Err(LedgerError::PaymentMismatch(format!(
                "paid {}, ticket price is {}",
                payment.amount, record.ticket_price
            )));
        }
        Ok(payment.amount)
    }
}

impl Reducer for InventoryReducer {
    type State = InventoryState;
    type Action = InventoryAction;
    type Event = InventoryEvent;
    type Environment = ();
    type Error = LedgerError;

    fn decide(
        &self,
        state: &InventoryState,
        action: InventoryAction,
        _env: &(),
    ) -> Result<InventoryEvent, LedgerError> {
        match action {
            InventoryAction::IssueTicket { buyer, payment } => {
                let record = &state.record;
                let amount_paid = Self::validate_payment(record, &buyer, payment.as_ref())?;

                if record.is_sold_out() || state.reserve == 0 {
                    return Err(LedgerError::SoldOut(record.event_id));
                }
                if !state.is_opted_in(&buyer) {
                    return Err(LedgerError::NotOptedIn {
                        holder: buyer.to_string(),
                        asset_id: record.asset_id,
                    });
                }

                Ok(InventoryEvent::TicketIssued {
                    holder: buyer,
                    amount_paid,
                    serial: record.sold_tickets + 1,
                })
            },
            // Opting in twice is harmless; apply is idempotent.
            InventoryAction::OptIn { holder } => Ok(InventoryEvent::HolderOptedIn { holder }),
        }
    }

    fn apply(&self, state: &mut InventoryState, event: &InventoryEvent) {
        match event {
            InventoryEvent::TicketIssued { holder, .. } => {
                state.record.sold_tickets += 1;
                state.reserve = state.reserve.saturating_sub(1);
                state.opted_in.insert(holder.clone());
                *state.balances.entry(holder.clone()).or_insert(0) += 1;
            },
            InventoryEvent::HolderOptedIn { holder } => {
                state.opted_in.insert(holder.clone());
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::AssetId;
    use clubticket_testing::{ReducerTest, assertions};
    use proptest::prelude::*;

    const PRICE: u64 = 3_000_000;

    fn address(raw: &str) -> Address {
        Address::parse(raw).unwrap()
    }

    fn inventory(total: u64) -> InventoryState {
        let record = EventRecord {
            event_id: EventId::new(1),
            owner: address("MLSC"),
            name: "Hexpiration".to_string(),
            venue: "Lab A".to_string(),
            event_date: 1_900_000_000,
            ticket_price: Amount::new(PRICE),
            total_tickets: total,
            sold_tickets: 0,
            asset_id: AssetId::new(1001),
        };
        let asset = TicketAssetParams {
            asset_id: AssetId::new(1001),
            asset_name: "Hexpiration".to_string(),
            unit_name: "TKT".to_string(),
            url: "https://campus-tix.algo".to_string(),
            total,
            decimals: 0,
            manager: address("LEDGER"),
            reserve: address("LEDGER"),
        };
        InventoryState::new(record, asset)
    }

    fn opted_in(mut state: InventoryState, holder: &str) -> InventoryState {
        InventoryReducer
            .reduce(
                &mut state,
                InventoryAction::OptIn {
                    holder: address(holder),
                },
                &(),
            )
            .unwrap();
        state
    }

    fn pay(from: &str, to: &str, amount: u64) -> Option<Payment> {
        Some(Payment {
            sender: address(from),
            receiver: address(to),
            amount: Amount::new(amount),
        })
    }

    fn buy(buyer: &str, payment: Option<Payment>) -> InventoryAction {
        InventoryAction::IssueTicket {
            buyer: address(buyer),
            payment,
        }
    }

    #[test]
    fn issues_a_ticket_to_an_opted_in_buyer() {
        ReducerTest::new(InventoryReducer)
            .with_env(())
            .given_state(opted_in(inventory(50), "BUYER"))
            .when_action(buy("BUYER", pay("BUYER", "MLSC", PRICE)))
            .then_event(|event| {
                assert_eq!(
                    *event,
                    InventoryEvent::TicketIssued {
                        holder: Address::parse("BUYER").unwrap(),
                        amount_paid: Amount::new(PRICE),
                        serial: 1,
                    }
                );
            })
            .then_state(|state| {
                let buyer = Address::parse("BUYER").unwrap();
                assert_eq!(state.record().sold_tickets, 1);
                assert_eq!(state.reserve(), 49);
                assert_eq!(state.balance(&buyer), Some(1));
                assert!(state.holds_ticket(&buyer));
            })
            .run();
    }

    #[test]
    fn missing_payment_is_a_mismatch() {
        ReducerTest::new(InventoryReducer)
            .with_env(())
            .given_state(opted_in(inventory(5), "BUYER"))
            .when_action(buy("BUYER", None))
            .then_error(|error| assert_eq!(error.kind(), "PAYMENT_MISMATCH"))
            .then_state(|state| assert_eq!(state.record().sold_tickets, 0))
            .run();
    }

    #[test]
    fn underpayment_by_one_unit_is_a_mismatch() {
        ReducerTest::new(InventoryReducer)
            .with_env(())
            .given_state(opted_in(inventory(5), "BUYER"))
            .when_action(buy("BUYER", pay("BUYER", "MLSC", PRICE - 1)))
            .then_error(|error| assert_eq!(error.kind(), "PAYMENT_MISMATCH"))
            .then_state(|state| {
                assert_eq!(state.record().sold_tickets, 0);
                assert_eq!(state.reserve(), 5);
            })
            .run();
    }

    #[test]
    fn payment_to_someone_else_is_a_mismatch() {
        let mut state = opted_in(inventory(5), "BUYER");
        let outcome = InventoryReducer.reduce(&mut state, buy("BUYER", pay("BUYER", "LEDGER", PRICE)), &());
        assert!(matches!(outcome, Err(LedgerError::PaymentMismatch(_))));
    }

    #[test]
    fn payment_from_a_third_party_is_a_mismatch() {
        let mut state = opted_in(inventory(5), "BUYER");
        let outcome = InventoryReducer.reduce(&mut state, buy("BUYER", pay("FRIEND", "MLSC", PRICE)), &());
        assert!(matches!(outcome, Err(LedgerError::PaymentMismatch(_))));
    }

    #[test]
    fn buyer_must_opt_in_first() {
        ReducerTest::new(InventoryReducer)
            .with_env(())
            .given_state(inventory(5))
            .when_action(buy("BUYER", pay("BUYER", "MLSC", PRICE)))
            .then_error(|error| {
                assert_eq!(
                    *error,
                    LedgerError::NotOptedIn {
                        holder: "BUYER".to_string(),
                        asset_id: AssetId::new(1001),
                    }
                );
            })
            .run();
    }

    #[test]
    fn last_ticket_then_sold_out() {
        let mut state = opted_in(opted_in(inventory(1), "FIRST"), "SECOND");

        let first = InventoryReducer.reduce(&mut state, buy("FIRST", pay("FIRST", "MLSC", PRICE)), &());
        assertions::assert_committed(first);

        let second = InventoryReducer.reduce(&mut state, buy("SECOND", pay("SECOND", "MLSC", PRICE)), &());
        assertions::assert_rejected(&second, &LedgerError::SoldOut(EventId::new(1)));

        assert!(state.record().is_sold_out());
        assert_eq!(state.balance(&address("SECOND")), Some(0));
    }

    #[test]
    fn sold_out_is_reported_before_missing_opt_in() {
        let mut state = opted_in(inventory(1), "FIRST");
        InventoryReducer
            .reduce(&mut state, buy("FIRST", pay("FIRST", "MLSC", PRICE)), &())
            .unwrap();

        let outcome = InventoryReducer.reduce(&mut state, buy("LATE", pay("LATE", "MLSC", PRICE)), &());
        assertions::assert_rejected(&outcome, &LedgerError::SoldOut(EventId::new(1)));
    }

    #[test]
    fn opt_in_is_idempotent() {
        let state = opted_in(opted_in(inventory(5), "BUYER"), "BUYER");
        assert_eq!(state.balance(&address("BUYER")), Some(0));
        assert_eq!(state.balance(&address("STRANGER")), None);
    }

    #[test]
    fn repeat_purchases_accumulate() {
        let mut state = opted_in(inventory(5), "BUYER");
        for _ in 0..3 {
            InventoryReducer
                .reduce(&mut state, buy("BUYER", pay("BUYER", "MLSC", PRICE)), &())
                .unwrap();
        }
        assert_eq!(state.balance(&address("BUYER")), Some(3));
        assert_eq!(state.record().sold_tickets, 3);
    }

    proptest! {
        #[test]
        fn sold_never_exceeds_total(total in 1u64..40, attempts in proptest::collection::vec(0u8..4, 0..120)) {
            let mut state = inventory(total);
            for holder in ["A", "B", "C"] {
                state = opted_in(state, holder);
            }

            for attempt in attempts {
                let action = match attempt {
                    0 => buy("A", pay("A", "MLSC", PRICE)),
                    1 => buy("B", pay("B", "MLSC", PRICE)),
                    2 => buy("C", pay("C", "MLSC", PRICE - 1)),
                    _ => buy("D", pay("D", "MLSC", PRICE)),
                };
                let _ = InventoryReducer.reduce(&mut state, action, &());

                let record = state.record();
                prop_assert!(record.sold_tickets <= record.total_tickets);
                prop_assert_eq!(state.reserve() + record.sold_tickets, record.total_tickets);
                prop_assert_eq!(state.issued(), record.sold_tickets);
            }
        }
    }
}
