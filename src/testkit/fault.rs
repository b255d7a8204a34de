//! Fault injection for repository-facing tests.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::adapter::outbound::memory::{MemoryBarrier, MemoryPositionRepository};
use crate::application::position::{ManagerSettings, PositionManager};
use crate::domain::{Position, PositionId, Price, Symbol, UserId};
use crate::error::{RepositoryError, Result};
use crate::port::outbound::repository::{PositionPage, PositionRepository};

/// Failure injected into writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// `RepositoryError::Storage`.
    Storage,
    /// `RepositoryError::VersionConflict` against the written row.
    Conflict,
}

/// Wraps a repository and fails the next N writes (`save` and `update`)
/// with a chosen [`Fault`]. Reads always pass through.
#[derive(Debug)]
pub struct FaultyRepository<R> {
    inner: R,
    fault: parking_lot::Mutex<Fault>,
    pending: AtomicU32,
    injected: AtomicU32,
    write_delay_ms: AtomicU64,
}

impl<R> FaultyRepository<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            fault: parking_lot::Mutex::new(Fault::Storage),
            pending: AtomicU32::new(0),
            injected: AtomicU32::new(0),
            write_delay_ms: AtomicU64::new(0),
        }
    }

    /// Fail the next `count` writes with `fault`.
    pub fn fail_writes(&self, fault: Fault, count: u32) {
        *self.fault.lock() = fault;
        self.pending.store(count, Ordering::SeqCst);
    }

    /// Sleep before every write.
    pub fn delay_writes(&self, delay: Duration) {
        let millis = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self.write_delay_ms.store(millis, Ordering::SeqCst);
    }

    /// Number of faults handed out so far.
    pub fn injected(&self) -> u32 {
        self.injected.load(Ordering::SeqCst)
    }

    async fn before_write(&self, position: &Position) -> Result<()> {
        let delay = self.write_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        let armed = self
            .pending
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if !armed {
            return Ok(());
        }
        self.injected.fetch_add(1, Ordering::SeqCst);

        let err = match *self.fault.lock() {
            Fault::Storage => RepositoryError::Storage("injected storage fault".into()),
            Fault::Conflict => RepositoryError::VersionConflict {
                position_id: position.id().clone(),
                expected: position.version(),
                found: position.version() + 1,
            },
        };
        Err(err.into())
    }
}

impl<R: PositionRepository> PositionRepository for FaultyRepository<R> {
    async fn get_by_user(&self, user_id: &UserId, limit: usize, offset: usize) -> Result<PositionPage> {
        self.inner.get_by_user(user_id, limit, offset).await
    }

    async fn find_open(&self, user_id: &UserId, symbol: &Symbol) -> Result<Option<Position>> {
        self.inner.find_open(user_id, symbol).await
    }

    async fn get(&self, id: &PositionId) -> Result<Option<Position>> {
        self.inner.get(id).await
    }

    async fn save(&self, position: &Position) -> Result<()> {
        self.before_write(position).await?;
        self.inner.save(position).await
    }

    async fn update(&self, position: &Position) -> Result<()> {
        self.before_write(position).await?;
        self.inner.update(position).await
    }

    async fn close(&self, id: &PositionId, close_price: Price) -> Result<Position> {
        self.inner.close(id, close_price).await
    }
}

/// Manager whose repository can be told to misbehave.
pub type FaultyManager = PositionManager<FaultyRepository<MemoryPositionRepository>, MemoryBarrier>;

/// A [`FaultyManager`] over fresh in-memory adapters.
pub fn faulty_manager(settings: ManagerSettings) -> FaultyManager {
    PositionManager::with_settings(
        Arc::new(FaultyRepository::new(MemoryPositionRepository::new())),
        Arc::new(MemoryBarrier::new()),
        settings,
    )
}
