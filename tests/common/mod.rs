#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use evrent::SettlementEngine;
use evrent::application::rentals::NewRental;
use evrent::config::GatewayConfig;
use evrent::domain::deposit::Deposit;
use evrent::domain::money::Money;
use evrent::domain::ports::Stores;
use evrent::domain::rental::{Rental, RentalId, UserId};
use evrent::infrastructure::clock::ManualClock;
use std::fs::File;
use std::io::Error;
use std::path::Path;
use std::sync::Arc;

pub const TMN_CODE: &str = "EVRENT01";
pub const SECRET: &str = "SECRETKEY";

pub fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 5, day, hour, 0, 0).unwrap()
}

pub struct Fixture {
    pub engine: SettlementEngine,
    pub clock: ManualClock,
}

pub fn fixture() -> Fixture {
    let clock = ManualClock::new(at(1, 8));
    let engine = SettlementEngine::new(
        Stores::in_memory(),
        Arc::new(clock.clone()),
        GatewayConfig::new(TMN_CODE, SECRET),
    );
    Fixture { engine, clock }
}

/// Books rental `id` for customer 7 at 500,000 a day over `days` days.
pub async fn book(engine: &SettlementEngine, id: u64, days: i64) -> Rental {
    engine
        .rentals()
        .book(NewRental {
            id: RentalId(id),
            vehicle: format!("VF8-{id:04}"),
            customer: UserId(7),
            pickup_station: None,
            start_at: at(1, 8),
            end_at: at(1, 8) + chrono::Duration::days(days),
            daily_rate: Money::from_major(500_000),
        })
        .await
        .expect("booking failed")
}

pub async fn book_with_deposit(engine: &SettlementEngine, id: u64, deposit: i64) -> Deposit {
    let rental = book(engine, id, 2).await;
    engine
        .ledger()
        .open(rental.id, rental.customer, Money::from_major(deposit))
        .await
        .expect("deposit failed")
}

/// The deposit held for rental `id`, if any.
pub async fn deposit_for(engine: &SettlementEngine, id: u64) -> Option<Deposit> {
    engine
        .ledger()
        .find_by_rental(RentalId(id))
        .await
        .expect("deposit lookup failed")
}

pub fn write_config(path: &Path) -> Result<(), Error> {
    std::fs::write(
        path,
        format!(
            "[gateway]\ntmn_code = \"{TMN_CODE}\"\nhash_secret = \"{SECRET}\"\n\
             return_url = \"https://evrent.example/return\"\n"
        ),
    )
}

/// Writes a command file: the header followed by `rows`, each a full record.
pub fn write_commands(path: &Path, rows: &[[&str; 8]]) -> Result<(), Error> {
    let file = File::create(path)?;
    let mut wtr = csv::WriterBuilder::new().from_writer(file);

    wtr.write_record([
        "op",
        "rental",
        "ref",
        "amount",
        "start",
        "end",
        "use_deposit",
        "note",
    ])?;
    for row in rows {
        wtr.write_record(row)?;
    }

    wtr.flush()?;
    Ok(())
}
