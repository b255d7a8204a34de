//! Position lifecycle under distributed transactions.
//!
//! [`PositionManager`] is the single entry point. Its handlers are split
//! by protocol: `tcc` reserves sell-side quantity, `saga` grants buy-side
//! quantity and settles or refunds reservations.

mod manager;
mod saga;
mod tcc;

pub use manager::{ManagerSettings, PositionManager};
