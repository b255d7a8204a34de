//! In-memory adapters for the repository and barrier ports.
//!
//! Used by the test suite and by embedders that keep the ledger in
//! process. Neither survives a restart.

mod barrier;
mod repository;

pub use barrier::MemoryBarrier;
pub use repository::MemoryPositionRepository;
