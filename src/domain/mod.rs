//! Exchange-agnostic domain logic: the position aggregate and branch
//! state machine. No I/O happens here.

mod branch;
mod error;
mod id;
mod money;
mod position;

pub use branch::{Barrier, BranchOp, BranchPhase, RejectReason, Transition};
pub use error::DomainError;
pub(crate) use error::{ensure_positive_price, ensure_positive_quantity};
pub use id::{PositionId, Symbol, UserId};
pub use money::{Pnl, Price, Quantity};
pub use position::{Position, PositionStatus, Side};
