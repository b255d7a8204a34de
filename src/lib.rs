//! Position ledger - per-trader exposure under distributed transactions.
//!
//! This crate holds each trader's open exposure per instrument and keeps it
//! consistent while buys, sells and cancellations are driven by TCC
//! (Try-Confirm-Cancel) and Saga (Forward/Compensate) branches issued by an
//! external transaction coordinator.
//!
//! # Architecture
//!
//! - **`domain`** - The [`Position`](domain::Position) aggregate, identifiers,
//!   and the branch state machine ([`BranchPhase`](domain::BranchPhase)).
//! - **`port`** - Outbound traits: [`PositionRepository`](port::outbound::repository::PositionRepository)
//!   and [`BranchBarrier`](port::outbound::barrier::BranchBarrier).
//! - **`adapter`** - In-memory implementations of both ports.
//! - **`application`** - [`PositionManager`](application::position::PositionManager),
//!   the facade exposing the TCC and Saga handlers.
//! - **`infrastructure`** - TOML configuration and logging setup.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use position_ledger::adapter::outbound::memory::{MemoryBarrier, MemoryPositionRepository};
//! use position_ledger::application::position::PositionManager;
//! use position_ledger::domain::{Barrier, Symbol, UserId};
//! use rust_decimal_macros::dec;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> position_ledger::error::Result<()> {
//! let manager = PositionManager::new(
//!     Arc::new(MemoryPositionRepository::new()),
//!     Arc::new(MemoryBarrier::new()),
//! );
//!
//! let user = UserId::new("u1");
//! let symbol = Symbol::new("BTC-USD");
//! manager
//!     .saga_add_position(&Barrier::new("gid-1", "buy"), &user, &symbol, dec!(10), dec!(100))
//!     .await?;
//!
//! let position = manager.find_open_position(&user, &symbol).await?;
//! assert_eq!(position.map(|p| p.quantity()), Some(dec!(10)));
//! # Ok(())
//! # }
//! ```

pub mod adapter;
pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod port;

#[cfg(any(test, feature = "testkit"))]
pub mod testkit;
