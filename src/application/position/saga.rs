//! Saga handlers: buy-side exposure growth and sell-side settlement.
//!
//! | forward              | compensation          | compensation kind |
//! |----------------------|-----------------------|-------------------|
//! | `saga_add_position`  | `saga_sub_position`   | reverse           |
//! | `saga_deduct_frozen` | `saga_refund_frozen`  | release           |
//!
//! A reverse compensation only undoes a forward that applied on its own
//! branch. A release compensation hands back TCC-reserved quantity and is
//! only legal while the settlement forward has *not* applied, since the
//! realized `PnL` would otherwise be left in place.

use chrono::Utc;
use tracing::info;

use super::manager::{ensure_branch_args, PositionManager};
use crate::domain::{
    ensure_positive_price, ensure_positive_quantity, Barrier, BranchOp, Position, PositionId,
    Price, Quantity, Side, Symbol, UserId,
};
use crate::error::Result;
use crate::port::outbound::barrier::{BarrierOutcome, BranchBarrier};
use crate::port::outbound::repository::PositionRepository;

impl<R, B> PositionManager<R, B>
where
    R: PositionRepository,
    B: BranchBarrier,
{
    /// Grant `quantity` bought at `price` to the trader.
    ///
    /// Opens a LONG position when none is OPEN for the symbol, otherwise
    /// folds the fill into the weighted entry price.
    pub async fn saga_add_position(
        &self,
        barrier: &Barrier,
        user_id: &UserId,
        symbol: &Symbol,
        quantity: Quantity,
        price: Price,
    ) -> Result<BarrierOutcome> {
        ensure_branch_args(barrier, user_id, symbol)?;
        ensure_positive_quantity(quantity)?;
        ensure_positive_price(price)?;

        let outcome = self
            .run_branch(barrier, BranchOp::Grant, self.grant(user_id, symbol, quantity, price))
            .await?;
        info!(
            gid = barrier.gid(),
            branch = barrier.branch_id(),
            user_id = %user_id,
            symbol = %symbol,
            quantity = %quantity,
            price = %price,
            outcome = ?outcome,
            "Position added"
        );
        Ok(outcome)
    }

    /// Compensate `saga_add_position` by taking `quantity` back.
    ///
    /// The entry price is left alone, so the reversal is exact only when
    /// no other fill was folded in after the forward action.
    pub async fn saga_sub_position(
        &self,
        barrier: &Barrier,
        user_id: &UserId,
        symbol: &Symbol,
        quantity: Quantity,
    ) -> Result<BarrierOutcome> {
        ensure_branch_args(barrier, user_id, symbol)?;
        ensure_positive_quantity(quantity)?;

        let outcome = self
            .run_branch(barrier, BranchOp::Reverse, self.revoke(user_id, symbol, quantity))
            .await?;
        info!(
            gid = barrier.gid(),
            branch = barrier.branch_id(),
            user_id = %user_id,
            symbol = %symbol,
            quantity = %quantity,
            outcome = ?outcome,
            "Position add compensated"
        );
        Ok(outcome)
    }

    /// Settle a sell whose quantity `try_freeze` already reserved, booking
    /// the realized `PnL` at `exec_price`.
    pub async fn saga_deduct_frozen(
        &self,
        barrier: &Barrier,
        user_id: &UserId,
        symbol: &Symbol,
        quantity: Quantity,
        exec_price: Price,
    ) -> Result<BarrierOutcome> {
        ensure_branch_args(barrier, user_id, symbol)?;
        ensure_positive_quantity(quantity)?;
        ensure_positive_price(exec_price)?;

        let outcome = self
            .run_branch(
                barrier,
                BranchOp::Settle,
                self.settle(user_id, symbol, quantity, exec_price),
            )
            .await?;
        info!(
            gid = barrier.gid(),
            branch = barrier.branch_id(),
            user_id = %user_id,
            symbol = %symbol,
            quantity = %quantity,
            exec_price = %exec_price,
            outcome = ?outcome,
            "Frozen quantity settled"
        );
        Ok(outcome)
    }

    /// Compensate a settlement that never happened by returning the
    /// reserved quantity. Rejected once `saga_deduct_frozen` applied on
    /// the same branch.
    pub async fn saga_refund_frozen(
        &self,
        barrier: &Barrier,
        user_id: &UserId,
        symbol: &Symbol,
        quantity: Quantity,
    ) -> Result<BarrierOutcome> {
        ensure_branch_args(barrier, user_id, symbol)?;
        ensure_positive_quantity(quantity)?;

        let outcome = self
            .run_branch(barrier, BranchOp::Release, self.restore(user_id, symbol, quantity))
            .await?;
        info!(
            gid = barrier.gid(),
            branch = barrier.branch_id(),
            user_id = %user_id,
            symbol = %symbol,
            quantity = %quantity,
            outcome = ?outcome,
            "Frozen quantity refunded"
        );
        Ok(outcome)
    }

    async fn grant(&self, user_id: &UserId, symbol: &Symbol, quantity: Quantity, price: Price) -> Result<()> {
        let mut conflicts = 0;
        loop {
            let written = match self.repository.find_open(user_id, symbol).await? {
                Some(mut position) => {
                    position.add_quantity(quantity, price)?;
                    self.repository.update(&position).await
                }
                None => {
                    let position = Position::open(
                        PositionId::generate(),
                        user_id.clone(),
                        symbol.clone(),
                        Side::Long,
                        quantity,
                        price,
                        Utc::now(),
                    )?;
                    self.repository.save(&position).await
                }
            };
            match written {
                Err(err) if self.absorb_conflict(&err, &mut conflicts) => {}
                result => return result,
            }
        }
    }

    async fn revoke(&self, user_id: &UserId, symbol: &Symbol, quantity: Quantity) -> Result<()> {
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

    async fn settle(&self, user_id: &UserId, symbol: &Symbol, quantity: Quantity, exec_price: Price) -> Result<()> {
        let mut conflicts = 0;
        loop {
            let mut position = self.require_open(user_id, symbol).await?;
            position.realize_pnl(quantity, exec_price)?;
            match self.repository.update(&position).await {
                Err(err) if self.absorb_conflict(&err, &mut conflicts) => {}
                result => return result,
            }
        }
    }
}
