//! End-to-end ledger scenarios.
//!
//! Each test drives the public `Ledger` API the way the gateway would and
//! checks the records left behind, including after rejected calls.

#![allow(clippy::unwrap_used)]

use clubticket_ledger::{
    Address, Amount, AssetId, CallContext, EventId, Ledger, LedgerError, NewEvent, Payment,
    RegistryPolicy,
};
use clubticket_core::environment::Clock;
use clubticket_runtime::InMemoryJournal;
use clubticket_testing::test_clock;
use std::sync::Arc;

const PRICE: u64 = 3_000_000;
const FUTURE: u64 = 1_900_000_000;

fn address(raw: &str) -> Address {
    Address::parse(raw).unwrap()
}

fn ledger() -> Ledger {
    Ledger::new(
        RegistryPolicy::new(address("LEDGER")),
        Arc::new(InMemoryJournal::new()),
        Arc::new(test_clock()),
    )
}

fn hexpiration(event_date: u64, total_tickets: u64) -> NewEvent {
    NewEvent {
        name: "Hexpiration".to_string(),
        venue: "Lab A".to_string(),
        event_date,
        ticket_price: Amount::new(PRICE),
        total_tickets,
    }
}

fn paying(buyer: &str, amount: u64) -> CallContext {
    CallContext::new(address(buyer)).with_payment(Payment {
        sender: address(buyer),
        receiver: address("MLSC"),
        amount: Amount::new(amount),
    })
}

async fn mlsc_with_event(ledger: &Ledger, total_tickets: u64) -> EventId {
    let club = CallContext::new(address("MLSC"));
    ledger
        .register_club(&club, "MLSC", "mlsc@campus.edu")
        .await
        .unwrap();
    ledger
        .create_event(&club, hexpiration(FUTURE, total_tickets))
        .await
        .unwrap()
}

async fn opt_in(ledger: &Ledger, event_id: EventId, buyer: &str) {
    let asset_id = ledger.get_event_details(event_id).unwrap().asset_id;
    ledger
        .opt_in(asset_id, &CallContext::new(address(buyer)))
        .await
        .unwrap();
}

#[tokio::test]
async fn campus_scenario_sells_out_at_fifty() {
    let ledger = ledger();
    let event_id = mlsc_with_event(&ledger, 50).await;

    assert_eq!(event_id, EventId::new(1));
    let details = ledger.get_event_details(event_id).unwrap();
    assert_eq!((details.total, details.sold), (50, 0));
    let asset = ledger.get_asset_params(details.asset_id).unwrap();
    assert_eq!(asset.total, 50);

    opt_in(&ledger, event_id, "BUYERB").await;
    let receipt = ledger
        .buy_ticket(event_id, &paying("BUYERB", PRICE))
        .await
        .unwrap();
    assert_eq!(receipt.serial, 1);
    assert_eq!(ledger.get_event_details(event_id).unwrap().sold, 1);
    assert!(ledger.verify_ticket(event_id, &address("BUYERB")));

    for n in 0..49 {
        let buyer = format!("FAN{n}");
        opt_in(&ledger, event_id, &buyer).await;
        ledger
            .buy_ticket(event_id, &paying(&buyer, PRICE))
            .await
            .unwrap();
    }

    opt_in(&ledger, event_id, "LATE").await;
    let err = ledger
        .buy_ticket(event_id, &paying("LATE", PRICE))
        .await
        .unwrap_err();
    assert_eq!(err, LedgerError::SoldOut(event_id));
    assert_eq!(ledger.get_event_details(event_id).unwrap().sold, 50);
}

#[tokio::test]
async fn duplicate_registration_keeps_original_record() {
    let ledger = ledger();
    let club = CallContext::new(address("MLSC"));

    ledger
        .register_club(&club, "MLSC", "mlsc@campus.edu")
        .await
        .unwrap();
    let err = ledger
        .register_club(&club, "Renamed", "new@campus.edu")
        .await
        .unwrap_err();

    assert_eq!(err, LedgerError::AlreadyRegistered("MLSC".to_string()));
    let record = ledger.get_club(&address("MLSC")).unwrap();
    assert_eq!(record.name, "MLSC");
    assert_eq!(record.contact, "mlsc@campus.edu");
    assert_eq!(
        ledger.get_club_name(&address("MLSC")).as_deref(),
        Some("MLSC")
    );
    assert!(ledger.get_club_name(&address("OTHER")).is_none());
}

#[tokio::test]
async fn past_event_creates_no_record_or_asset() {
    let ledger = ledger();
    let club = CallContext::new(address("MLSC"));
    ledger
        .register_club(&club, "MLSC", "mlsc@campus.edu")
        .await
        .unwrap();
    let now = u64::try_from(test_clock().now().timestamp()).unwrap();

    for date in [now - 1, now] {
        let err = ledger
            .create_event(&club, hexpiration(date, 50))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "EVENT_IN_PAST");
    }

    assert_eq!(ledger.get_total_events(), 0);
    assert!(ledger.get_event_details(EventId::new(1)).is_none());
    let first_asset = AssetId::new(ledger.policy().asset_id_base + 1);
    assert!(ledger.get_asset_params(first_asset).is_none());
    assert!(ledger.event_for_asset(first_asset).is_none());
}

#[tokio::test]
async fn underpayment_leaves_sold_count_unchanged() {
    let ledger = ledger();
    let event_id = mlsc_with_event(&ledger, 50).await;
    opt_in(&ledger, event_id, "BUYERB").await;

    let err = ledger
        .buy_ticket(event_id, &paying("BUYERB", PRICE - 1))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), "PAYMENT_MISMATCH");
    assert_eq!(ledger.get_event_details(event_id).unwrap().sold, 0);
    assert!(!ledger.verify_ticket(event_id, &address("BUYERB")));
}

#[tokio::test]
async fn payment_must_come_from_caller_and_reach_the_club() {
    let ledger = ledger();
    let event_id = mlsc_with_event(&ledger, 5).await;
    opt_in(&ledger, event_id, "BUYERB").await;

    let missing = CallContext::new(address("BUYERB"));
    let to_ledger = CallContext::new(address("BUYERB")).with_payment(Payment {
        sender: address("BUYERB"),
        receiver: address("LEDGER"),
        amount: Amount::new(PRICE),
    });
    let from_friend = CallContext::new(address("BUYERB")).with_payment(Payment {
        sender: address("FRIEND"),
        receiver: address("MLSC"),
        amount: Amount::new(PRICE),
    });

    for ctx in [missing, to_ledger, from_friend] {
        let err = ledger.buy_ticket(event_id, &ctx).await.unwrap_err();
        assert_eq!(err.kind(), "PAYMENT_MISMATCH");
    }
    assert_eq!(ledger.get_event_details(event_id).unwrap().sold, 0);
}

#[tokio::test]
async fn buyer_must_opt_in_before_receiving_a_ticket() {
    let ledger = ledger();
    let event_id = mlsc_with_event(&ledger, 5).await;

    let err = ledger
        .buy_ticket(event_id, &paying("BUYERB", PRICE))
        .await
        .unwrap_err();

    assert!(matches!(err, LedgerError::NotOptedIn { .. }));
    assert_eq!(ledger.get_event_details(event_id).unwrap().sold, 0);
}

#[tokio::test]
async fn repeat_buyer_holds_several_units() {
    let ledger = ledger();
    let event_id = mlsc_with_event(&ledger, 5).await;
    opt_in(&ledger, event_id, "BUYERB").await;

    for expected in 1..=3 {
        let receipt = ledger
            .buy_ticket(event_id, &paying("BUYERB", PRICE))
            .await
            .unwrap();
        assert_eq!(receipt.serial, expected);
    }

    let asset_id = ledger.get_event_details(event_id).unwrap().asset_id;
    assert_eq!(
        ledger.asset_balance(asset_id, &address("BUYERB")).unwrap(),
        Some(3)
    );
    assert_eq!(ledger.asset_reserve(asset_id).unwrap(), 2);
}

#[tokio::test]
async fn verification_is_false_for_strangers_and_unknown_events() {
    let ledger = ledger();
    let event_id = mlsc_with_event(&ledger, 5).await;
    opt_in(&ledger, event_id, "BUYERB").await;
    ledger
        .buy_ticket(event_id, &paying("BUYERB", PRICE))
        .await
        .unwrap();

    assert!(ledger.verify_ticket(event_id, &address("BUYERB")));
    assert!(!ledger.verify_ticket(event_id, &address("STRANGER")));
    assert!(!ledger.verify_ticket(EventId::new(99), &address("BUYERB")));

    // Opting in alone is not a ticket.
    opt_in(&ledger, event_id, "WATCHER").await;
    assert!(!ledger.verify_ticket(event_id, &address("WATCHER")));
}

#[tokio::test]
async fn event_ids_are_contiguous_across_clubs() {
    let ledger = ledger();
    for (n, club) in ["MLSC", "ROBOTICS", "CHESS"].into_iter().enumerate() {
        let ctx = CallContext::new(address(club));
        ledger
            .register_club(&ctx, club, "club@campus.edu")
            .await
            .unwrap();
        let event_id = ledger
            .create_event(&ctx, hexpiration(FUTURE, 10))
            .await
            .unwrap();
        assert_eq!(event_id.value(), u64::try_from(n).unwrap() + 1);
    }

    assert_eq!(ledger.get_total_events(), 3);
    let owners: Vec<_> = (1..=3)
        .map(|id| ledger.get_event_details(EventId::new(id)).unwrap().owner)
        .collect();
    assert_eq!(owners, vec![address("MLSC"), address("ROBOTICS"), address("CHESS")]);
}

#[tokio::test]
async fn invalid_events_are_rejected_without_side_effects() {
    let ledger = ledger();
    let club = CallContext::new(address("MLSC"));
    ledger
        .register_club(&club, "MLSC", "mlsc@campus.edu")
        .await
        .unwrap();

    let mut free = hexpiration(FUTURE, 10);
    free.ticket_price = Amount::new(0);
    let empty = hexpiration(FUTURE, 0);
    let huge = hexpiration(FUTURE, 10_001);
    let mut unnamed = hexpiration(FUTURE, 10);
    unnamed.name = "  ".to_string();

    let kinds: Vec<_> = futures::future::join_all(
        [free, empty, huge, unnamed]
            .into_iter()
            .map(|event| ledger.create_event(&club, event)),
    )
    .await
    .into_iter()
    .map(|outcome| outcome.unwrap_err().kind())
    .collect();

    assert_eq!(
        kinds,
        vec!["INVALID_PRICE", "INVALID_QUANTITY", "INVALID_QUANTITY", "INVALID_INPUT"]
    );
    assert_eq!(ledger.get_total_events(), 0);
}
