//! Shared test utilities available to both unit and integration tests.
//!
//! Enabled via `#[cfg(test)]` (unit tests) or the `testkit` feature
//! (integration tests).
//!
//! # Modules
//!
//! - [`domain`] - Fixture identifiers, position builders and a ready
//!   in-memory [`PositionManager`](crate::application::position::PositionManager).
//! - [`fault`] - A repository wrapper that injects storage failures,
//!   version conflicts and latency.

pub mod domain;
pub mod fault;
