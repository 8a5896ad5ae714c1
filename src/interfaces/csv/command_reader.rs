use crate::error::{Result, SettlementError};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;

#[derive(Debug, Deserialize, PartialEq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum CommandType {
    Book,
    Checkout,
    Checkin,
    Cancel,
    Deposit,
    Catalog,
    Penalty,
    Settle,
    Waive,
    Refund,
    Forfeit,
}

/// One row of a settlement command file.
///
/// Columns are `op, rental, ref, amount, start, end, use_deposit, note`;
/// which of them an operation reads is described on [`super::replay::apply`].
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct Command {
    pub op: CommandType,
    pub rental: Option<u64>,
    #[serde(rename = "ref")]
    pub reference: Option<String>,
    pub amount: Option<Decimal>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub use_deposit: Option<bool>,
    pub note: Option<String>,
}

/// Streams settlement commands out of a CSV source.
///
/// Fields are trimmed and short rows are accepted; missing trailing
/// columns read as empty.
pub struct CommandReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> CommandReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Rows are decoded lazily; a bad row yields an error and the next row still reads.
    pub fn commands(self) -> impl Iterator<Item = Result<Command>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(SettlementError::from))
    }
}
