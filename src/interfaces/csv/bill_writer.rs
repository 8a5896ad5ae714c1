use crate::application::billing::RentalBill;
use crate::domain::money::Money;
use crate::domain::rental::{RentalId, RentalStatus};
use crate::error::Result;
use serde::Serialize;
use std::io::Write;

/// Flat CSV form of a bill; penalty lines are summarized.
#[derive(Serialize)]
struct BillRow {
    rental: RentalId,
    status: RentalStatus,
    rental_cost: Money,
    deposit: Money,
    penalties: Money,
    total: Money,
    outstanding: Money,
    refund: Option<Money>,
}

impl From<&RentalBill> for BillRow {
    fn from(bill: &RentalBill) -> Self {
        Self {
            rental: bill.rental_id,
            status: bill.status,
            rental_cost: bill.rental_cost,
            deposit: bill.deposit_amount,
            penalties: bill.penalty_amount,
            total: bill.total_amount,
            outstanding: bill.outstanding_amount,
            refund: bill.refund_amount,
        }
    }
}

/// Writes rental bills as CSV, one row per rental.
pub struct BillWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> BillWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_bills(&mut self, bills: &[RentalBill]) -> Result<()> {
        for bill in bills {
            self.writer.serialize(BillRow::from(bill))?;
        }
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_writes_header_and_rows() {
        let bill = RentalBill {
            rental_id: RentalId(1),
            status: RentalStatus::Completed,
            rental_cost: Money::from_major(1_000_000),
            deposit_amount: Money::from_major(500_000),
            penalty_amount: Money::from_major(300_000),
            total_amount: Money::from_major(1_300_000),
            outstanding_amount: Money::ZERO,
            refund_amount: Some(Money::from_major(200_000)),
            penalties: Vec::new(),
        };
        let no_deposit = RentalBill {
            rental_id: RentalId(2),
            deposit_amount: Money::ZERO,
            refund_amount: None,
            ..bill.clone()
        };

        let mut out = Vec::new();
        BillWriter::new(&mut out)
            .write_bills(&[bill, no_deposit])
            .unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines[0],
            "rental,status,rental_cost,deposit,penalties,total,outstanding,refund"
        );
        assert_eq!(
            lines[1],
            "1,completed,1000000.00,500000.00,300000.00,1300000.00,0.00,200000.00"
        );
        assert_eq!(
            lines[2],
            "2,completed,1000000.00,0.00,300000.00,1300000.00,0.00,"
        );
    }
}
