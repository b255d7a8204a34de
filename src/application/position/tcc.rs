//! TCC handlers: sell-side exposure reservation.
//!
//! `try_freeze` removes quantity from what the trader can sell before the
//! sale is final, `confirm_freeze` commits that reservation and
//! `cancel_freeze` hands it back.

use tracing::info;

use super::manager::{ensure_branch_args, PositionManager};
use crate::domain::{ensure_positive_quantity, Barrier, BranchOp, Quantity, Symbol, UserId};
use crate::error::Result;
use crate::port::outbound::barrier::{BarrierOutcome, BranchBarrier};
use crate::port::outbound::repository::PositionRepository;

impl<R, B> PositionManager<R, B>
where
    R: PositionRepository,
    B: BranchBarrier,
{
    /// Reserve `quantity` of the trader's OPEN position.
    ///
    /// Fails with `PositionNotFound` when nothing is held and with
    /// `InsufficientQuantity` when the reservation exceeds the holding;
    /// in both cases nothing is written.
    pub async fn try_freeze(
        &self,
        barrier: &Barrier,
        user_id: &UserId,
        symbol: &Symbol,
        quantity: Quantity,
    ) -> Result<BarrierOutcome> {
        ensure_branch_args(barrier, user_id, symbol)?;
        ensure_positive_quantity(quantity)?;

        let outcome = self
            .run_branch(barrier, BranchOp::Try, self.freeze(user_id, symbol, quantity))
            .await?;
        info!(
            gid = barrier.gid(),
            branch = barrier.branch_id(),
            user_id = %user_id,
            symbol = %symbol,
            quantity = %quantity,
            outcome = ?outcome,
            "Freeze tried"
        );
        Ok(outcome)
    }

    /// Commit a reservation. The quantity already left in `try_freeze`,
    /// so only the branch phase moves.
    pub async fn confirm_freeze(
        &self,
        barrier: &Barrier,
        user_id: &UserId,
        symbol: &Symbol,
        quantity: Quantity,
    ) -> Result<BarrierOutcome> {
        ensure_branch_args(barrier, user_id, symbol)?;
        ensure_positive_quantity(quantity)?;

        let outcome = self
            .run_branch(barrier, BranchOp::Confirm, self.ensure_held(user_id, symbol))
            .await?;
        info!(
            gid = barrier.gid(),
            branch = barrier.branch_id(),
            user_id = %user_id,
            symbol = %symbol,
            quantity = %quantity,
            outcome = ?outcome,
            "Freeze confirmed"
        );
        Ok(outcome)
    }

    /// Release a reservation made by `try_freeze`.
    ///
    /// A cancel arriving before its try is recorded as a null
    /// compensation and restores nothing; a cancel after a confirm is
    /// rejected as out of order.
    pub async fn cancel_freeze(
        &self,
        barrier: &Barrier,
        user_id: &UserId,
        symbol: &Symbol,
        quantity: Quantity,
    ) -> Result<BarrierOutcome> {
        ensure_branch_args(barrier, user_id, symbol)?;
        ensure_positive_quantity(quantity)?;

        let outcome = self
            .run_branch(barrier, BranchOp::Cancel, self.restore(user_id, symbol, quantity))
            .await?;
        info!(
            gid = barrier.gid(),
            branch = barrier.branch_id(),
            user_id = %user_id,
            symbol = %symbol,
            quantity = %quantity,
            outcome = ?outcome,
            "Freeze cancelled"
        );
        Ok(outcome)
    }

    async fn freeze(&self, user_id: &UserId, symbol: &Symbol, quantity: Quantity) -> Result<()> {
        let mut conflicts = 0;
        loop {
            let mut position = self.require_open(user_id, symbol).await?;
            position.reduce_quantity(quantity)?;
            match self.repository.update(&position).await {
                Err(err) if self.absorb_conflict(&err, &mut conflicts) => {}
                result => return result,
            }
        }
    }

    async fn ensure_held(&self, user_id: &UserId, symbol: &Symbol) -> Result<()> {
        self.require_open(user_id, symbol).await.map(|_| ())
    }

    /// Give reserved quantity back. Shared with the saga refund.
    pub(super) async fn restore(&self, user_id: &UserId, symbol: &Symbol, quantity: Quantity) -> Result<()> {
        let mut conflicts = 0;
        loop {
            let mut position = self.require_open(user_id, symbol).await?;
            position.restore_quantity(quantity)?;
            match self.repository.update(&position).await {
                Err(err) if self.absorb_conflict(&err, &mut conflicts) => {}
                result => return result,
            }
        }
    }
}
