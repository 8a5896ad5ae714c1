//! Financial settlement engine for short-term EV rentals.
//!
//! Computes rental cost, keeps each rental's deposit ledger, assesses and
//! settles penalties, and authenticates payment gateway traffic before any
//! money movement it reports is applied.

pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod interfaces;

pub use application::engine::SettlementEngine;
pub use domain::money::Money;
pub use error::{ErrorKind, Result, SettlementError};
