//! Configuration loading.

pub mod ledger;
pub mod logging;
pub mod settings;
