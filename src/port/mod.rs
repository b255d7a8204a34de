//! Trait definitions (hexagonal ports). Depend only on domain.
//!
//! The ledger core talks to two driven collaborators it does not own:
//!
//! ```text
//!                 ┌──────────────────────┐
//!                 │   PositionManager    │
//!                 │  (TCC + Saga sets)   │
//!                 └──────────┬───────────┘
//!              ┌─────────────┴─────────────┐
//!              ▼                           ▼
//!      ┌──────────────┐            ┌──────────────┐
//!      │  Repository  │            │   Barrier    │
//!      │   Adapter    │            │   Adapter    │
//!      └──────────────┘            └──────────────┘
//! ```
//!
//! - [`PositionRepository`](outbound::repository::PositionRepository) - persistence and lookup
//! - [`BranchBarrier`](outbound::barrier::BranchBarrier) - at-most-once branch execution

pub mod outbound;
