//! Position manager facade.
//!
//! Owns the repository and barrier handles and exposes the plain reads and
//! writes. The TCC and Saga handler sets live in sibling modules as further
//! `impl` blocks on [`PositionManager`].

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::domain::{
    ensure_positive_price, Barrier, BranchOp, Position, PositionId, Price, Symbol, UserId,
};
use crate::error::{Error, PositionLookup, Result};
use crate::port::outbound::barrier::{BarrierOutcome, BranchBarrier};
use crate::port::outbound::repository::{PositionPage, PositionRepository};

/// Runtime knobs for [`PositionManager`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagerSettings {
    /// Deadline for one barrier-guarded branch call.
    pub branch_timeout: Duration,
    /// How many times a branch body is re-read and re-applied after a
    /// concurrent writer won the race.
    pub conflict_retries: u32,
    /// Page size used when a listing does not name one.
    pub default_page_size: usize,
}

impl Default for ManagerSettings {
    fn default() -> Self {
        Self {
            branch_timeout: Duration::from_secs(5),
            conflict_retries: 3,
            default_page_size: 50,
        }
    }
}

/// Facade over the position aggregate, its repository and the branch
/// barrier.
///
/// Every TCC and Saga handler runs inside
/// [`BranchBarrier::exec_with_barrier`] under a deadline, and performs a
/// single read-modify-write of one position. Errors are never swallowed;
/// the caller (the transaction coordinator) decides between retry and
/// compensation using [`Error::kind`] and [`Error::is_retryable`].
pub struct PositionManager<R, B> {
    pub(super) repository: Arc<R>,
    pub(super) barrier: Arc<B>,
    pub(super) settings: ManagerSettings,
}

impl<R, B> PositionManager<R, B>
where
    R: PositionRepository,
    B: BranchBarrier,
{
    /// Create a manager with default settings.
    pub fn new(repository: Arc<R>, barrier: Arc<B>) -> Self {
        Self::with_settings(repository, barrier, ManagerSettings::default())
    }

    pub fn with_settings(repository: Arc<R>, barrier: Arc<B>, settings: ManagerSettings) -> Self {
        Self {
            repository,
            barrier,
            settings,
        }
    }

    #[must_use]
    pub fn settings(&self) -> &ManagerSettings {
        &self.settings
    }

    #[must_use]
    pub fn repository(&self) -> &Arc<R> {
        &self.repository
    }

    #[must_use]
    pub fn barrier(&self) -> &Arc<B> {
        &self.barrier
    }

    /// Close a position at `close_price`, realizing any remaining quantity.
    pub async fn close_position(&self, position_id: &PositionId, close_price: Price) -> Result<Position> {
        position_id.ensure_present()?;
        ensure_positive_price(close_price)?;

        let closed = self.repository.close(position_id, close_price).await?;
        info!(
            position_id = %position_id,
            close_price = %close_price,
            realized_pnl = %closed.realized_pnl(),
            "Position closed"
        );
        Ok(closed)
    }

    /// Record the latest market price for a position.
    pub async fn update_position_price(&self, position_id: &PositionId, current_price: Price) -> Result<()> {
        position_id.ensure_present()?;
        ensure_positive_price(current_price)?;

        self.mark(position_id, current_price).await?;
        debug!(position_id = %position_id, price = %current_price, "Position marked");
        Ok(())
    }

    /// Get a position by ID.
    pub async fn get_position(&self, position_id: &PositionId) -> Result<Position> {
        position_id.ensure_present()?;
        self.repository
            .get(position_id)
            .await?
            .ok_or_else(|| Error::PositionNotFound(PositionLookup::Id(position_id.clone())))
    }

    /// Get the OPEN position for a trader and symbol, if any.
    pub async fn find_open_position(&self, user_id: &UserId, symbol: &Symbol) -> Result<Option<Position>> {
        user_id.ensure_present()?;
        symbol.ensure_present()?;
        self.repository.find_open(user_id, symbol).await
    }

    /// List a trader's positions, oldest first.
    ///
    /// `limit` falls back to [`ManagerSettings::default_page_size`].
    pub async fn list_positions(
        &self,
        user_id: &UserId,
        limit: Option<usize>,
        offset: usize,
    ) -> Result<PositionPage> {
        user_id.ensure_present()?;
        let limit = limit.unwrap_or(self.settings.default_page_size);
        self.repository.get_by_user(user_id, limit, offset).await
    }

    /// Run `work` as `op` on `barrier` under the branch deadline.
    pub(super) async fn run_branch<W>(&self, barrier: &Barrier, op: BranchOp, work: W) -> Result<BarrierOutcome>
    where
        W: Future<Output = Result<()>> + Send,
    {
        let deadline = self.settings.branch_timeout;
        let guarded = self.barrier.exec_with_barrier(barrier, op, work);

        match tokio::time::timeout(deadline, guarded).await {
            Ok(Ok(outcome)) => Ok(outcome),
            Ok(Err(err)) => {
                warn!(
                    gid = barrier.gid(),
                    branch = barrier.branch_id(),
                    %op,
                    error = %err,
                    retryable = err.is_retryable(),
                    "Branch failed"
                );
                Err(err)
            }
            Err(_) => {
                warn!(
                    gid = barrier.gid(),
                    branch = barrier.branch_id(),
                    %op,
                    deadline = ?deadline,
                    "Branch deadline exceeded"
                );
                Err(Error::DeadlineExceeded {
                    barrier: barrier.clone(),
                    op,
                    after: deadline,
                })
            }
        }
    }

    /// Whether a failed read-modify-write should be re-read and re-applied.
    ///
    /// True for write conflicts while fewer than
    /// [`ManagerSettings::conflict_retries`] have been absorbed; bumps
    /// `conflicts` when it is.
    pub(super) fn absorb_conflict(&self, err: &Error, conflicts: &mut u32) -> bool {
        if !err.is_write_conflict() || *conflicts >= self.settings.conflict_retries {
            return false;
        }
        *conflicts += 1;
        warn!(attempt = *conflicts, error = %err, "Write conflict, re-reading position");
        true
    }

    /// Load the OPEN position for a trader and symbol, or fail.
    pub(super) async fn require_open(&self, user_id: &UserId, symbol: &Symbol) -> Result<Position> {
        self.repository
            .find_open(user_id, symbol)
            .await?
            .ok_or_else(|| {
                Error::PositionNotFound(PositionLookup::Open {
                    user_id: user_id.clone(),
                    symbol: symbol.clone(),
                })
            })
    }

    async fn mark(&self, position_id: &PositionId, price: Price) -> Result<()> {
        let mut conflicts = 0;
        loop {
            let mut position = self
                .repository
                .get(position_id)
                .await?
                .ok_or_else(|| Error::PositionNotFound(PositionLookup::Id(position_id.clone())))?;
            position.mark_price(price)?;
            match self.repository.update(&position).await {
                Err(err) if self.absorb_conflict(&err, &mut conflicts) => {}
                result => return result,
            }
        }
    }
}

/// Validate the identifiers every branch handler receives.
pub(super) fn ensure_branch_args(barrier: &Barrier, user_id: &UserId, symbol: &Symbol) -> Result<()> {
    barrier.ensure_present()?;
    user_id.ensure_present()?;
    symbol.ensure_present()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::testkit::domain::{btc, manager, user};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn close_position_validates_price() {
        let manager = manager();
        let err = manager
            .close_position(&PositionId::new("p1"), dec!(0))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParameters);

        let err = manager
            .close_position(&PositionId::new(""), dec!(10))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParameters);
    }

    #[tokio::test]
    async fn close_position_of_unknown_id_is_not_found() {
        let manager = manager();
        let err = manager
            .close_position(&PositionId::new("ghost"), dec!(10))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PositionNotFound);
    }

    #[tokio::test]
    async fn update_price_marks_position() {
        let manager = manager();
        manager
            .saga_add_position(&Barrier::new("g1", "buy"), &user(), &btc(), dec!(10), dec!(100))
            .await
            .unwrap();
        let id = manager
            .find_open_position(&user(), &btc())
            .await
            .unwrap()
            .unwrap()
            .id()
            .clone();

        manager.update_position_price(&id, dec!(105)).await.unwrap();

        let position = manager.get_position(&id).await.unwrap();
        assert_eq!(position.current_price(), dec!(105));
        assert_eq!(position.unrealized_pnl(), dec!(50));
        assert_eq!(position.entry_price(), dec!(100));
    }

    #[tokio::test]
    async fn update_price_of_unknown_id_is_not_found() {
        let manager = manager();
        let err = manager
            .update_position_price(&PositionId::new("ghost"), dec!(1))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::PositionNotFound(PositionLookup::Id(_))));
    }

    #[tokio::test]
    async fn update_price_leaves_closed_position_untouched() {
        let manager = manager();
        manager
            .saga_add_position(&Barrier::new("g1", "buy"), &user(), &btc(), dec!(10), dec!(100))
            .await
            .unwrap();
        let id = manager
            .find_open_position(&user(), &btc())
            .await
            .unwrap()
            .unwrap()
            .id()
            .clone();
        let closed = manager.close_position(&id, dec!(110)).await.unwrap();

        let err = manager.update_position_price(&id, dec!(150)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PositionNotFound);

        let stored = manager.get_position(&id).await.unwrap();
        assert_eq!(stored, closed);
        assert_eq!(stored.current_price(), dec!(110));
        assert_eq!(stored.unrealized_pnl(), Decimal::ZERO);
    }

    #[tokio::test]
    async fn list_positions_uses_default_page_size() {
        let manager = PositionManager::with_settings(
            Arc::new(crate::adapter::outbound::memory::MemoryPositionRepository::new()),
            Arc::new(crate::adapter::outbound::memory::MemoryBarrier::new()),
            ManagerSettings {
                default_page_size: 2,
                ..ManagerSettings::default()
            },
        );
        for (i, symbol) in ["A", "B", "C"].iter().enumerate() {
            manager
                .saga_add_position(
                    &Barrier::new(format!("g{i}"), "buy"),
                    &user(),
                    &Symbol::new(*symbol),
                    dec!(1),
                    dec!(1),
                )
                .await
                .unwrap();
        }

        let page = manager.list_positions(&user(), None, 0).await.unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.positions.len(), 2);

        let rest = manager.list_positions(&user(), Some(5), 2).await.unwrap();
        assert_eq!(rest.positions.len(), 1);
        assert_eq!(rest.positions[0].symbol().as_str(), "C");
    }
}
