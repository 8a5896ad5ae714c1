//! Adapters between the engine and the outside world: the payment gateway
//! wire format and the CSV replay tooling.

pub mod csv;
pub mod vnpay;
