//! Club Ticket Ledger Demo
//!
//! Walks through the campus scenario end to end against an in-memory ledger:
//! - A club registers and creates an event with 50 tickets
//! - A buyer opts in and buys the first ticket
//! - Wrong payments and unregistered organizers are rejected
//! - Concurrent buyers exhaust the supply and the next buyer is told it is sold out
//! - The ledger is rebuilt from its journal and still agrees
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin demo
//! ```

use chrono::{Duration, Utc};
use clubticket_core::environment::SystemClock;
use clubticket_ledger::{
    Address, Amount, CallContext, EventId, Ledger, LedgerError, NewEvent, Payment, RegistryPolicy,
};
use clubticket_runtime::InMemoryJournal;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const PRICE: u64 = 3_000_000;
const TICKETS: u64 = 50;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,clubticket_ledger=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    println!("\n============================================");
    println!("   Club Ticket Ledger - Live Demo");
    println!("============================================\n");

    let journal = Arc::new(InMemoryJournal::new());
    let policy = RegistryPolicy::new(Address::parse("CAMPUSLEDGER")?);
    let ledger = Arc::new(Ledger::new(policy.clone(), journal.clone(), Arc::new(SystemClock)));

    // Step 1: club registration
    println!("1. Registering club MLSC...");
    let club = CallContext::new(Address::parse("MLSC")?);
    ledger.register_club(&club, "MLSC", "mlsc@campus.edu").await?;
    println!("   registered: {}", ledger.is_club_registered(&club.caller));

    match ledger.register_club(&club, "MLSC again", "other@campus.edu").await {
        Err(err) => println!("   second registration rejected: {err}"),
        Ok(_) => println!("   unexpected: second registration accepted"),
    }

    // Step 2: event creation
    println!("\n2. Creating event Hexpiration ({TICKETS} tickets)...");
    let event_date = u64::try_from((Utc::now() + Duration::days(30)).timestamp())?;
    let event_id = ledger
        .create_event(
            &club,
            NewEvent {
                name: "Hexpiration".to_string(),
                venue: "Lab A".to_string(),
                event_date,
                ticket_price: Amount::new(PRICE),
                total_tickets: TICKETS,
            },
        )
        .await?;
    let details = ledger
        .get_event_details(event_id)
        .ok_or(LedgerError::EventNotFound(event_id))?;
    println!(
        "   event {event_id}: asset {} with {} tickets, {} sold",
        details.asset_id, details.total, details.sold
    );

    let outsider = CallContext::new(Address::parse("NOTACLUB")?);
    if let Err(err) = ledger
        .create_event(
            &outsider,
            NewEvent {
                name: "Pirate party".to_string(),
                venue: "Quad".to_string(),
                event_date,
                ticket_price: Amount::new(1),
                total_tickets: 10,
            },
        )
        .await
    {
        println!("   unregistered organizer rejected: {err}");
    }

    // Step 3: first purchase
    println!("\n3. Buyer B opts in and buys a ticket...");
    let buyer = Address::parse("BUYERB")?;
    ledger
        .opt_in(details.asset_id, &CallContext::new(buyer.clone()))
        .await?;

    if let Err(err) = ledger
        .buy_ticket(event_id, &paying(&buyer, &club.caller, PRICE - 1))
        .await
    {
        println!("   underpayment rejected: {err}");
    }

    let receipt = ledger
        .buy_ticket(event_id, &paying(&buyer, &club.caller, PRICE))
        .await?;
    println!(
        "   ticket #{} issued, verify_ticket = {}",
        receipt.serial,
        ledger.verify_ticket(event_id, &buyer)
    );

    // Step 4: contention for the remaining supply
    let contenders = 80;
    println!("\n4. {contenders} buyers race for the remaining {} tickets...", TICKETS - 1);
    let (won, sold_out) = race(&ledger, event_id, details.asset_id, &club.caller, contenders).await?;
    println!("   {won} purchases succeeded, {sold_out} were told the event is sold out");

    let late = Address::parse("LATECOMER")?;
    ledger
        .opt_in(details.asset_id, &CallContext::new(late.clone()))
        .await?;
    if let Err(err) = ledger.buy_ticket(event_id, &paying(&late, &club.caller, PRICE)).await {
        println!("   51st attempt: {err}");
    }

    // Step 5: recovery
    println!("\n5. Rebuilding the ledger from its journal ({} facts)...", journal.len());
    let restored = Ledger::restore(policy, journal, Arc::new(SystemClock)).await?;
    let restored_details = restored
        .get_event_details(event_id)
        .ok_or(LedgerError::EventNotFound(event_id))?;
    println!(
        "   restored: {} events, {} of {} sold, buyer B still verified: {}",
        restored.get_total_events(),
        restored_details.sold,
        restored_details.total,
        restored.verify_ticket(event_id, &buyer)
    );

    println!("\nDone.\n");
    Ok(())
}

fn paying(buyer: &Address, club: &Address, amount: u64) -> CallContext {
    CallContext::new(buyer.clone()).with_payment(Payment {
        sender: buyer.clone(),
        receiver: club.clone(),
        amount: Amount::new(amount),
    })
}

async fn race(
    ledger: &Arc<Ledger>,
    event_id: EventId,
    asset_id: clubticket_ledger::AssetId,
    club: &Address,
    contenders: usize,
) -> anyhow::Result<(usize, usize)> {
    let mut handles = Vec::with_capacity(contenders);
    for n in 0..contenders {
        let buyer = Address::parse(&format!("RACER{n}"))?;
        let ledger = Arc::clone(ledger);
        let ctx = paying(&buyer, club, PRICE);
        handles.push(tokio::spawn(async move {
            ledger.opt_in(asset_id, &CallContext::new(buyer)).await?;
            ledger.buy_ticket(event_id, &ctx).await
        }));
    }

    let (mut won, mut sold_out) = (0, 0);
    for handle in handles {
        match handle.await? {
            Ok(_) => won += 1,
            Err(LedgerError::SoldOut(_)) => sold_out += 1,
            Err(other) => return Err(other.into()),
        }
    }
    Ok((won, sold_out))
}
