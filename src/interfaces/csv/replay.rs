use super::command_reader::{Command, CommandType};
use crate::application::engine::SettlementEngine;
use crate::application::rentals::NewRental;
use crate::domain::money::Money;
use crate::domain::penalty::{PaymentMethod, PenaltyId, RentalPenaltyId};
use crate::domain::rental::{RentalId, UserId};
use crate::error::{Result, SettlementError};
use tracing::debug;

fn missing(op: CommandType, column: &str) -> SettlementError {
    SettlementError::InvalidInput(format!("{op:?} needs a value in column {column:?}"))
}

fn rental_id(command: &Command) -> Result<RentalId> {
    command
        .rental
        .map(RentalId)
        .ok_or_else(|| missing(command.op, "rental"))
}

fn reference_id(command: &Command) -> Result<u64> {
    let raw = command
        .reference
        .as_deref()
        .ok_or_else(|| missing(command.op, "ref"))?;
    raw.parse()
        .map_err(|_| SettlementError::InvalidInput(format!("ref {raw:?} is not a number")))
}

fn amount(command: &Command) -> Result<Money> {
    command
        .amount
        .map(Money::new)
        .ok_or_else(|| missing(command.op, "amount"))
}

fn note(command: &Command) -> Option<String> {
    command.note.clone().filter(|n| !n.is_empty())
}

/// Applies one command row to the engine.
///
/// | op         | reads                                                        |
/// |------------|--------------------------------------------------------------|
/// | `book`     | rental, ref = customer, amount = daily rate, start, end, note = vehicle |
/// | `checkout` | rental, start (defaults to now)                              |
/// | `checkin`  | rental, end (defaults to now)                                |
/// | `cancel`   | rental                                                       |
/// | `deposit`  | rental, amount                                               |
/// | `catalog`  | note = violation type, amount                                |
/// | `penalty`  | rental, ref = catalog id, amount (defaults to catalog rate), use_deposit, note |
/// | `settle`   | ref = rental penalty id, amount, use_deposit, note = method  |
/// | `waive`    | ref = rental penalty id, note = reason                       |
/// | `refund`   | rental, note = reason                                        |
/// | `forfeit`  | rental, note = reason                                        |
pub async fn apply(engine: &SettlementEngine, command: Command) -> Result<()> {
    debug!(?command, "applying command");
    match command.op {
        CommandType::Book => {
            let customer = UserId(reference_id(&command)?);
            engine
                .rentals()
                .book(NewRental {
                    id: rental_id(&command)?,
                    vehicle: note(&command).unwrap_or_default(),
                    customer,
                    pickup_station: None,
                    start_at: command.start.ok_or_else(|| missing(command.op, "start"))?,
                    end_at: command.end.ok_or_else(|| missing(command.op, "end"))?,
                    daily_rate: amount(&command)?,
                })
                .await?;
        }
        CommandType::Checkout => {
            engine
                .rentals()
                .check_out(rental_id(&command)?, command.start, None)
                .await?;
        }
        CommandType::Checkin => {
            engine
                .rentals()
                .check_in(rental_id(&command)?, command.end, None)
                .await?;
        }
        CommandType::Cancel => {
            engine.rentals().cancel(rental_id(&command)?).await?;
        }
        CommandType::Deposit => {
            let rental = engine.rentals().get(rental_id(&command)?).await?;
            engine
                .ledger()
                .open(rental.id, rental.customer, amount(&command)?)
                .await?;
        }
        CommandType::Catalog => {
            let violation = note(&command).ok_or_else(|| missing(command.op, "note"))?;
            engine
                .catalog()
                .register(violation.clone(), violation, amount(&command)?)
                .await?;
        }
        CommandType::Penalty => {
            let penalty_id = PenaltyId(reference_id(&command)?);
            let charged = match command.amount {
                Some(value) => Money::new(value),
                None => engine.catalog().get(penalty_id).await?.amount,
            };
            engine
                .assessor()
                .assess(
                    rental_id(&command)?,
                    penalty_id,
                    charged,
                    note(&command).unwrap_or_default(),
                    command.use_deposit.unwrap_or(false),
                )
                .await?;
        }
        CommandType::Settle => {
            let method = match note(&command) {
                Some(raw) => raw
                    .parse::<PaymentMethod>()
                    .map_err(SettlementError::InvalidInput)?,
                None => PaymentMethod::Cash,
            };
            engine
                .settlement()
                .settle(
                    RentalPenaltyId(reference_id(&command)?),
                    amount(&command)?,
                    method,
                    command.use_deposit.unwrap_or(false),
                    None,
                )
                .await?;
        }
        CommandType::Waive => {
            engine
                .settlement()
                .waive(RentalPenaltyId(reference_id(&command)?), note(&command))
                .await?;
        }
        CommandType::Refund | CommandType::Forfeit => {
            let rental = rental_id(&command)?;
            let deposit = engine
                .ledger()
                .find_by_rental(rental)
                .await?
                .ok_or(SettlementError::NoDepositForRental(rental))?;
            if command.op == CommandType::Refund {
                engine.ledger().refund(deposit.id, note(&command)).await?;
            } else {
                let reason = note(&command).unwrap_or_else(|| "forfeited".to_string());
                engine.ledger().forfeit(deposit.id, reason).await?;
            }
        }
    }
    Ok(())
}
