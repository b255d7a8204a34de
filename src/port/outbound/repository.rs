//! Persistence port for positions.

use std::future::Future;

use crate::domain::{Position, PositionId, Price, Symbol, UserId};
use crate::error::Result;

/// One page of a trader's positions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PositionPage {
    /// Positions on this page, oldest first.
    pub positions: Vec<Position>,
    /// Total number of positions the trader has, across all pages.
    pub total: usize,
}

/// Storage operations for positions.
///
/// Implementations own [`Position::version`]: `save` stores version 0,
/// and every successful `update` or `close` increments it. An `update`
/// whose version differs from the stored one must fail with
/// [`RepositoryError::VersionConflict`](crate::error::RepositoryError::VersionConflict)
/// and leave the stored row untouched.
pub trait PositionRepository: Send + Sync {
    /// List a trader's positions, open and closed, oldest first.
    fn get_by_user(
        &self,
        user_id: &UserId,
        limit: usize,
        offset: usize,
    ) -> impl Future<Output = Result<PositionPage>> + Send;

    /// Get the OPEN position for a trader and symbol, if any.
    fn find_open(
        &self,
        user_id: &UserId,
        symbol: &Symbol,
    ) -> impl Future<Output = Result<Option<Position>>> + Send;

    /// Get a position by ID.
    fn get(&self, id: &PositionId) -> impl Future<Output = Result<Option<Position>>> + Send;

    /// Insert a new position. Fails if the ID exists or if the trader
    /// already holds an OPEN position in the symbol.
    fn save(&self, position: &Position) -> impl Future<Output = Result<()>> + Send;

    /// Replace a stored position, checking its version.
    fn update(&self, position: &Position) -> impl Future<Output = Result<()>> + Send;

    /// Close a stored position at `close_price` and return the closed row.
    fn close(
        &self,
        id: &PositionId,
        close_price: Price,
    ) -> impl Future<Output = Result<Position>> + Send;
}
