//! Domain records, value objects and the ports the engine is written against.

pub mod deposit;
pub mod money;
pub mod payment;
pub mod penalty;
pub mod ports;
pub mod pricing;
pub mod rental;
