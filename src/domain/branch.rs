//! Branch identity and the per-branch state machine.
//!
//! The transaction coordinator addresses each branch of a global
//! transaction with a [`Barrier`]. Every handler on the position manager
//! runs under exactly one [`BranchOp`], and [`BranchPhase::advance`]
//! decides whether that op may apply given what already happened on the
//! branch.
//!
//! ```text
//! TCC:   Pending -> Tried -> Confirmed | Cancelled
//! Saga:  Pending -> Granted | Settled -> Compensated
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use super::DomainError;

/// Coordinator-supplied token naming one branch of a global transaction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Barrier {
    gid: String,
    branch_id: String,
}

impl Barrier {
    /// Create a barrier for branch `branch_id` of global transaction `gid`.
    pub fn new(gid: impl Into<String>, branch_id: impl Into<String>) -> Self {
        Self {
            gid: gid.into(),
            branch_id: branch_id.into(),
        }
    }

    /// Global transaction identifier.
    #[must_use]
    pub fn gid(&self) -> &str {
        &self.gid
    }

    /// Branch identifier within the global transaction.
    #[must_use]
    pub fn branch_id(&self) -> &str {
        &self.branch_id
    }

    /// Fail with [`DomainError::EmptyIdentifier`] if either part is blank.
    pub fn ensure_present(&self) -> Result<(), DomainError> {
        if self.gid.trim().is_empty() {
            return Err(DomainError::EmptyIdentifier { field: "gid" });
        }
        if self.branch_id.trim().is_empty() {
            return Err(DomainError::EmptyIdentifier { field: "branch_id" });
        }
        Ok(())
    }
}

impl fmt::Display for Barrier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.gid, self.branch_id)
    }
}

/// Operation a handler performs on its branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BranchOp {
    /// TCC reservation.
    Try,
    /// TCC commit of a reservation.
    Confirm,
    /// TCC release of a reservation.
    Cancel,
    /// Saga forward action that grants bought quantity.
    Grant,
    /// Saga forward action that settles reserved quantity.
    Settle,
    /// Saga compensation that undoes an applied grant.
    Reverse,
    /// Saga compensation that hands back reserved quantity because the
    /// forward settlement never applied.
    Release,
}

impl BranchOp {
    /// Stable name used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Try => "try",
            Self::Confirm => "confirm",
            Self::Cancel => "cancel",
            Self::Grant => "grant",
            Self::Settle => "settle",
            Self::Reverse => "reverse",
            Self::Release => "release",
        }
    }
}

impl fmt::Display for BranchOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a branch currently stands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BranchPhase {
    /// Nothing has applied yet.
    #[default]
    Pending,
    /// Reservation applied, awaiting confirm or cancel.
    Tried,
    /// Reservation committed.
    Confirmed,
    /// Reservation released, or cancelled before any try.
    Cancelled,
    /// Saga grant applied.
    Granted,
    /// Saga settlement applied.
    Settled,
    /// Saga compensation applied, or registered before any forward.
    Compensated,
}

impl BranchPhase {
    /// Returns true once no further effect can apply on the branch.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Confirmed | Self::Cancelled | Self::Compensated)
    }

    /// Decide what `op` does when the branch is in this phase.
    #[must_use]
    pub fn advance(self, op: BranchOp) -> Transition {
        use BranchOp as Op;
        use BranchPhase as Phase;

        match (self, op) {
            (Phase::Pending, Op::Try) => Transition::Apply(Phase::Tried),
            (Phase::Pending, Op::Grant) => Transition::Apply(Phase::Granted),
            (Phase::Pending, Op::Settle) => Transition::Apply(Phase::Settled),
            (Phase::Pending, Op::Release) => Transition::Apply(Phase::Compensated),
            (Phase::Pending, Op::Cancel) => Transition::NullCompensation(Phase::Cancelled),
            (Phase::Pending, Op::Reverse) => Transition::NullCompensation(Phase::Compensated),
            (Phase::Pending, Op::Confirm) => Transition::Rejected(RejectReason::ConfirmWithoutTry),

            (Phase::Tried, Op::Try) => Transition::Duplicate,
            (Phase::Tried, Op::Confirm) => Transition::Apply(Phase::Confirmed),
            (Phase::Tried, Op::Cancel) => Transition::Apply(Phase::Cancelled),

            (Phase::Confirmed, Op::Try | Op::Confirm) => Transition::Duplicate,
            (Phase::Confirmed, Op::Cancel) => Transition::Rejected(RejectReason::CancelAfterConfirm),

            (Phase::Cancelled, Op::Cancel) => Transition::Duplicate,
            (Phase::Cancelled, Op::Try) => Transition::Suppressed,
            (Phase::Cancelled, Op::Confirm) => Transition::Rejected(RejectReason::ConfirmAfterCancel),

            (Phase::Granted, Op::Grant) => Transition::Duplicate,
            (Phase::Granted, Op::Reverse) => Transition::Apply(Phase::Compensated),
            (Phase::Granted, Op::Release) => Transition::Rejected(RejectReason::CompensationMismatch),

            (Phase::Settled, Op::Settle) => Transition::Duplicate,
            (Phase::Settled, Op::Release) => Transition::Rejected(RejectReason::ReleaseAfterSettle),
            (Phase::Settled, Op::Reverse) => Transition::Rejected(RejectReason::CompensationMismatch),

            (Phase::Compensated, Op::Reverse | Op::Release) => Transition::Duplicate,
            (Phase::Compensated, Op::Grant | Op::Settle) => Transition::Suppressed,

            _ => Transition::Rejected(RejectReason::ProtocolMismatch),
        }
    }
}

impl fmt::Display for BranchPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pending => "pending",
            Self::Tried => "tried",
            Self::Confirmed => "confirmed",
            Self::Cancelled => "cancelled",
            Self::Granted => "granted",
            Self::Settled => "settled",
            Self::Compensated => "compensated",
        };
        f.write_str(name)
    }
}

/// Outcome of [`BranchPhase::advance`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Run the work; on success the branch moves to the given phase.
    Apply(BranchPhase),
    /// The op already applied; skip the work.
    Duplicate,
    /// Compensation for an origin that never applied; skip the work and
    /// move to the given phase so a late origin is suppressed.
    NullCompensation(BranchPhase),
    /// Origin arriving after its compensation; skip the work.
    Suppressed,
    /// The op is illegal in this phase.
    Rejected(RejectReason),
}

/// Why a branch op was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    ConfirmWithoutTry,
    ConfirmAfterCancel,
    CancelAfterConfirm,
    ReleaseAfterSettle,
    /// The compensation does not undo the forward action that applied.
    CompensationMismatch,
    /// The op belongs to another protocol or forward action than the one
    /// already recorded on the branch.
    ProtocolMismatch,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::ConfirmWithoutTry => "confirm issued before try applied",
            Self::ConfirmAfterCancel => "confirm issued after cancel",
            Self::CancelAfterConfirm => "cancel issued after confirm",
            Self::ReleaseAfterSettle => "release issued after settlement applied",
            Self::CompensationMismatch => "compensation does not match the applied forward action",
            Self::ProtocolMismatch => "operation does not belong to this branch",
        };
        f.write_str(text)
    }
}
