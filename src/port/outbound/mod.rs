//! Outbound ports (driven side): interfaces implemented by outbound adapters.
//!
//! These contracts describe the storage engine and the transaction
//! coordinator's barrier, both external to the ledger core.

pub mod barrier;
pub mod repository;
