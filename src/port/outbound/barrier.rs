//! Branch barrier port.
//!
//! The barrier is the coordinator-side primitive that makes a branch
//! handler safe to redeliver. The ledger only depends on its contract.

use std::future::Future;

use crate::domain::{Barrier, BranchOp, BranchPhase};
use crate::error::Result;

/// What the barrier did with a branch call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarrierOutcome {
    /// The work ran and its effect is now recorded.
    Applied,
    /// The op had already applied; the work was skipped.
    Duplicate,
    /// Compensation arrived before its origin; nothing to undo.
    NullCompensation,
    /// Origin arrived after its compensation; the work was skipped.
    Suppressed,
}

impl BarrierOutcome {
    /// Returns true if this call changed ledger state.
    #[must_use]
    pub fn is_applied(self) -> bool {
        matches!(self, Self::Applied)
    }
}

/// At-most-once execution of branch work.
///
/// # Contract
///
/// - For a given barrier and op, `work` takes effect at most once, even
///   under concurrent redelivery.
/// - An error returned by `work` propagates unmodified and leaves the
///   branch phase unchanged, so the call may be retried.
/// - Ops illegal in the current phase fail with
///   [`BarrierError::OutOfOrder`](crate::error::BarrierError::OutOfOrder)
///   without running `work`.
pub trait BranchBarrier: Send + Sync {
    /// Run `work` as `op` on the branch named by `barrier`.
    ///
    /// `work` is only polled when the op applies; otherwise it is dropped
    /// unpolled.
    fn exec_with_barrier<W>(
        &self,
        barrier: &Barrier,
        op: BranchOp,
        work: W,
    ) -> impl Future<Output = Result<BarrierOutcome>> + Send
    where
        W: Future<Output = Result<()>> + Send;

    /// Current phase of the branch.
    fn phase(&self, barrier: &Barrier) -> impl Future<Output = Result<BranchPhase>> + Send;
}
