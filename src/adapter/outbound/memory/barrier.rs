//! In-memory branch barrier.
//!
//! Keeps one [`BranchPhase`] per barrier behind an async mutex, so calls
//! for the same branch run one at a time while different branches proceed
//! in parallel. Phases are never dropped: a terminal branch must keep
//! answering duplicates and suppressing late origins.

use std::future::Future;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::domain::{Barrier, BranchOp, BranchPhase, Transition};
use crate::error::{BarrierError, Result};
use crate::port::outbound::barrier::{BarrierOutcome, BranchBarrier};

/// Branch barrier backed by process memory.
#[derive(Debug, Default)]
pub struct MemoryBarrier {
    branches: DashMap<Barrier, Arc<Mutex<BranchPhase>>>,
}

impl MemoryBarrier {
    /// Create a barrier with no recorded branches.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of branches seen so far.
    #[must_use]
    pub fn tracked_branches(&self) -> usize {
        self.branches.len()
    }

    fn slot(&self, barrier: &Barrier) -> Arc<Mutex<BranchPhase>> {
        Arc::clone(self.branches.entry(barrier.clone()).or_default().value())
    }
}

impl BranchBarrier for MemoryBarrier {
    async fn exec_with_barrier<W>(
        &self,
        barrier: &Barrier,
        op: BranchOp,
        work: W,
    ) -> Result<BarrierOutcome>
    where
        W: Future<Output = Result<()>> + Send,
    {
        let slot = self.slot(barrier);
        let mut phase = slot.lock().await;
        let current = *phase;

        match current.advance(op) {
            Transition::Apply(next) => {
                work.await?;
                *phase = next;
                Ok(BarrierOutcome::Applied)
            }
            Transition::Duplicate => {
                debug!(%barrier, %op, phase = %current, "Duplicate branch call skipped");
                Ok(BarrierOutcome::Duplicate)
            }
            Transition::NullCompensation(next) => {
                warn!(%barrier, %op, "Compensation before origin, recorded as null");
                *phase = next;
                Ok(BarrierOutcome::NullCompensation)
            }
            Transition::Suppressed => {
                warn!(%barrier, %op, phase = %current, "Late origin after compensation suppressed");
                Ok(BarrierOutcome::Suppressed)
            }
            Transition::Rejected(reason) => {
                warn!(%barrier, %op, phase = %current, %reason, "Branch call out of order");
                Err(BarrierError::OutOfOrder {
                    barrier: barrier.clone(),
                    op,
                    phase: current,
                    reason,
                }
                .into())
            }
        }
    }

    async fn phase(&self, barrier: &Barrier) -> Result<BranchPhase> {
        let Some(slot) = self.branches.get(barrier).map(|entry| Arc::clone(entry.value())) else {
            return Ok(BranchPhase::Pending);
        };
        let phase = *slot.lock().await;
        Ok(phase)
    }
}
