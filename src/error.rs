use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::domain::{Barrier, BranchOp, BranchPhase, DomainError, PositionId, RejectReason, Symbol, UserId};

/// Configuration-related errors with structured variants.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[source] toml::de::Error),
}

/// Storage errors raised by repository implementations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    /// The stored row moved on since it was read.
    #[error("version conflict on position {position_id}: expected {expected}, found {found}")]
    VersionConflict {
        position_id: PositionId,
        expected: u64,
        found: u64,
    },

    /// A second OPEN row for the same trader and symbol was about to be saved.
    #[error("open position already exists for {user_id}/{symbol}")]
    OpenPositionExists { user_id: UserId, symbol: Symbol },

    #[error("position {0} already exists")]
    DuplicatePosition(PositionId),

    /// Underlying storage I/O failure.
    #[error("storage failure: {0}")]
    Storage(String),
}

/// Errors raised by the branch barrier itself.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BarrierError {
    /// The op is not legal in the branch's current phase.
    #[error("{op} rejected on branch {barrier} in phase {phase}: {reason}")]
    OutOfOrder {
        barrier: Barrier,
        op: BranchOp,
        phase: BranchPhase,
        reason: RejectReason,
    },

    /// The barrier backend could not be reached.
    #[error("barrier unavailable: {0}")]
    Unavailable(String),
}

/// How a missing position was looked up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PositionLookup {
    Id(PositionId),
    Open { user_id: UserId, symbol: Symbol },
}

impl fmt::Display for PositionLookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "id {id}"),
            Self::Open { user_id, symbol } => write!(f, "open {user_id}/{symbol}"),
        }
    }
}

/// Coarse error classification handed back to the transaction coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidParameters,
    PositionNotFound,
    InsufficientQuantity,
    RepositoryFailure,
    BarrierFailure,
    OutOfOrder,
    DeadlineExceeded,
    Configuration,
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("position not found: {0}")]
    PositionNotFound(PositionLookup),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Barrier(#[from] BarrierError),

    #[error("{op} on branch {barrier} exceeded deadline of {after:?}")]
    DeadlineExceeded {
        barrier: Barrier,
        op: BranchOp,
        after: Duration,
    },
}

impl Error {
    /// Classify the error for the coordinator.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) => ErrorKind::Configuration,
            Self::Domain(err) => match err {
                DomainError::NonPositiveQuantity { .. }
                | DomainError::NonPositivePrice { .. }
                | DomainError::EmptyIdentifier { .. }
                | DomainError::ArithmeticOverflow { .. } => ErrorKind::InvalidParameters,
                DomainError::InsufficientQuantity { .. } => ErrorKind::InsufficientQuantity,
                DomainError::PositionClosed { .. } => ErrorKind::PositionNotFound,
            },
            Self::PositionNotFound(_) => ErrorKind::PositionNotFound,
            Self::Repository(_) => ErrorKind::RepositoryFailure,
            Self::Barrier(BarrierError::OutOfOrder { .. }) => ErrorKind::OutOfOrder,
            Self::Barrier(BarrierError::Unavailable(_)) => ErrorKind::BarrierFailure,
            Self::DeadlineExceeded { .. } => ErrorKind::DeadlineExceeded,
        }
    }

    /// Returns true if repeating the same branch call is safe and may
    /// succeed. Domain violations and ordering errors never are.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Repository(RepositoryError::DuplicatePosition(_)) => false,
            Self::Repository(_) => true,
            Self::Barrier(BarrierError::Unavailable(_)) => true,
            Self::DeadlineExceeded { .. } => true,
            _ => false,
        }
    }

    /// Returns true when a concurrent writer got to the row first: a
    /// stale version, or a racing insert of the same open position.
    #[must_use]
    pub fn is_write_conflict(&self) -> bool {
        matches!(
            self,
            Self::Repository(
                RepositoryError::VersionConflict { .. } | RepositoryError::OpenPositionExists { .. }
            )
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
