//! In-memory position repository.

use std::collections::HashMap;

use chrono::Utc;
use parking_lot::RwLock;

use crate::domain::{Position, PositionId, Price, Symbol, UserId};
use crate::error::{Error, PositionLookup, RepositoryError, Result};
use crate::port::outbound::repository::{PositionPage, PositionRepository};

#[derive(Debug, Default)]
struct Rows {
    positions: HashMap<PositionId, Position>,
    /// Insertion order, for stable paging.
    order: Vec<PositionId>,
    /// OPEN position per trader and symbol.
    open: HashMap<(UserId, Symbol), PositionId>,
}

/// In-memory repository with optimistic versioning.
///
/// Enforces the one-open-position-per-symbol rule on `save` and keeps
/// closed rows for history.
#[derive(Debug, Default)]
pub struct MemoryPositionRepository {
    rows: RwLock<Rows>,
}

impl MemoryPositionRepository {
    /// Create a new empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored positions, open and closed.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.read().positions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PositionRepository for MemoryPositionRepository {
    async fn get_by_user(
        &self,
        user_id: &UserId,
        limit: usize,
        offset: usize,
    ) -> Result<PositionPage> {
        let rows = self.rows.read();
        let owned: Vec<&Position> = rows
            .order
            .iter()
            .filter_map(|id| rows.positions.get(id))
            .filter(|p| p.user_id() == user_id)
            .collect();

        Ok(PositionPage {
            total: owned.len(),
            positions: owned
                .into_iter()
                .skip(offset)
                .take(limit)
                .cloned()
                .collect(),
        })
    }

    async fn find_open(&self, user_id: &UserId, symbol: &Symbol) -> Result<Option<Position>> {
        let rows = self.rows.read();
        let key = (user_id.clone(), symbol.clone());
        Ok(rows
            .open
            .get(&key)
            .and_then(|id| rows.positions.get(id))
            .cloned())
    }

    async fn get(&self, id: &PositionId) -> Result<Option<Position>> {
        Ok(self.rows.read().positions.get(id).cloned())
    }

    async fn save(&self, position: &Position) -> Result<()> {
        let mut rows = self.rows.write();
        if rows.positions.contains_key(position.id()) {
            return Err(RepositoryError::DuplicatePosition(position.id().clone()).into());
        }

        let key = (position.user_id().clone(), position.symbol().clone());
        if position.is_open() {
            if rows.open.contains_key(&key) {
                return Err(RepositoryError::OpenPositionExists {
                    user_id: key.0,
                    symbol: key.1,
                }
                .into());
            }
            rows.open.insert(key, position.id().clone());
        }

        let mut stored = position.clone();
        stored.set_version(0);
        rows.order.push(stored.id().clone());
        rows.positions.insert(stored.id().clone(), stored);
        Ok(())
    }

    async fn update(&self, position: &Position) -> Result<()> {
        let mut rows = self.rows.write();
        let found = rows
            .positions
            .get(position.id())
            .map(Position::version)
            .ok_or_else(|| Error::PositionNotFound(PositionLookup::Id(position.id().clone())))?;
        if found != position.version() {
            return Err(RepositoryError::VersionConflict {
                position_id: position.id().clone(),
                expected: position.version(),
                found,
            }
            .into());
        }

        if !position.is_open() {
            let key = (position.user_id().clone(), position.symbol().clone());
            if rows.open.get(&key) == Some(position.id()) {
                rows.open.remove(&key);
            }
        }

        let mut stored = position.clone();
        stored.set_version(found + 1);
        rows.positions.insert(stored.id().clone(), stored);
        Ok(())
    }

    async fn close(&self, id: &PositionId, close_price: Price) -> Result<Position> {
        let mut rows = self.rows.write();
        let mut position = rows
            .positions
            .get(id)
            .cloned()
            .ok_or_else(|| Error::PositionNotFound(PositionLookup::Id(id.clone())))?;

        position.close(close_price, Utc::now())?;
        position.set_version(position.version() + 1);

        let key = (position.user_id().clone(), position.symbol().clone());
        if rows.open.get(&key) == Some(id) {
            rows.open.remove(&key);
        }
        rows.positions.insert(id.clone(), position.clone());
        Ok(position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Side;
    use crate::error::ErrorKind;
    use rust_decimal_macros::dec;

    fn position(id: &str, user: &str, symbol: &str) -> Position {
        Position::open(
            PositionId::new(id),
            UserId::new(user),
            Symbol::new(symbol),
            Side::Long,
            dec!(10),
            dec!(100),
            Utc::now(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn save_then_find_open() {
        let repo = MemoryPositionRepository::new();
        repo.save(&position("p1", "u1", "BTC-USD")).await.unwrap();

        let found = repo
            .find_open(&UserId::new("u1"), &Symbol::new("BTC-USD"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id().as_str(), "p1");
        assert_eq!(found.version(), 0);

        let other = repo
            .find_open(&UserId::new("u1"), &Symbol::new("ETH-USD"))
            .await
            .unwrap();
        assert!(other.is_none());
    }

    #[tokio::test]
    async fn save_rejects_second_open_position() {
        let repo = MemoryPositionRepository::new();
        repo.save(&position("p1", "u1", "BTC-USD")).await.unwrap();

        let err = repo
            .save(&position("p2", "u1", "BTC-USD"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Repository(RepositoryError::OpenPositionExists { .. })
        ));

        let err = repo
            .save(&position("p1", "u2", "ETH-USD"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Repository(RepositoryError::DuplicatePosition(_))
        ));
        assert_eq!(repo.len(), 1);
    }

    #[tokio::test]
    async fn update_bumps_version_and_rejects_stale_writes() {
        let repo = MemoryPositionRepository::new();
        repo.save(&position("p1", "u1", "BTC-USD")).await.unwrap();

        let id = PositionId::new("p1");
        let mut first = repo.get(&id).await.unwrap().unwrap();
        let mut second = first.clone();

        first.reduce_quantity(dec!(3)).unwrap();
        repo.update(&first).await.unwrap();

        second.reduce_quantity(dec!(4)).unwrap();
        let err = repo.update(&second).await.unwrap_err();
        assert!(err.is_write_conflict());
        assert_eq!(err.kind(), ErrorKind::RepositoryFailure);

        let stored = repo.get(&id).await.unwrap().unwrap();
        assert_eq!(stored.quantity(), dec!(7));
        assert_eq!(stored.version(), 1);
    }

    #[tokio::test]
    async fn update_of_missing_position_is_not_found() {
        let repo = MemoryPositionRepository::new();
        let err = repo
            .update(&position("ghost", "u1", "BTC-USD"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PositionNotFound);
    }

    #[tokio::test]
    async fn close_frees_the_open_slot_and_keeps_history() {
        let repo = MemoryPositionRepository::new();
        repo.save(&position("p1", "u1", "BTC-USD")).await.unwrap();

        let closed = repo.close(&PositionId::new("p1"), dec!(110)).await.unwrap();
        assert!(closed.status().is_closed());
        assert_eq!(closed.realized_pnl(), dec!(100));
        assert_eq!(closed.version(), 1);

        let user = UserId::new("u1");
        let symbol = Symbol::new("BTC-USD");
        assert!(repo.find_open(&user, &symbol).await.unwrap().is_none());

        repo.save(&position("p2", "u1", "BTC-USD")).await.unwrap();
        let page = repo.get_by_user(&user, 10, 0).await.unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.positions[0].id().as_str(), "p1");
        assert_eq!(page.positions[1].id().as_str(), "p2");
    }

    #[tokio::test]
    async fn close_twice_is_rejected() {
        let repo = MemoryPositionRepository::new();
        repo.save(&position("p1", "u1", "BTC-USD")).await.unwrap();
        repo.close(&PositionId::new("p1"), dec!(100)).await.unwrap();

        let err = repo
            .close(&PositionId::new("p1"), dec!(100))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Domain(_)));
    }

    #[tokio::test]
    async fn get_by_user_pages() {
        let repo = MemoryPositionRepository::new();
        for (i, symbol) in ["A", "B", "C", "D"].iter().enumerate() {
            repo.save(&position(&format!("p{i}"), "u1", symbol))
                .await
                .unwrap();
        }
        repo.save(&position("x", "u2", "A")).await.unwrap();

        let page = repo.get_by_user(&UserId::new("u1"), 2, 1).await.unwrap();
        assert_eq!(page.total, 4);
        let ids: Vec<_> = page.positions.iter().map(|p| p.id().as_str()).collect();
        assert_eq!(ids, vec!["p1", "p2"]);

        let empty = repo.get_by_user(&UserId::new("u1"), 2, 10).await.unwrap();
        assert_eq!(empty.total, 4);
        assert!(empty.positions.is_empty());
    }
}
