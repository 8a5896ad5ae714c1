//! Application layer orchestrating the domain over the storage ports.
//!
//! `SettlementEngine` is the entry point; each service owns one concern and
//! serializes writes to the records it mutates with a per-record async lock.

pub mod assessor;
pub mod billing;
pub mod catalog;
pub mod engine;
pub mod ledger;
pub mod locks;
pub mod payments;
pub mod rentals;
pub mod settlement;
