//! CSV command files in, CSV bills out.

pub mod bill_writer;
pub mod command_reader;
pub mod replay;
