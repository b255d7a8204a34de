//! Builders for domain primitives used across tests.
//!
//! Provides concise factory functions for identifiers, positions and a
//! wired-up manager so tests focus on assertions rather than construction
//! boilerplate.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::Utc;

use crate::adapter::outbound::memory::{MemoryBarrier, MemoryPositionRepository};
use crate::application::position::{ManagerSettings, PositionManager};
use crate::domain::{Barrier, Position, PositionId, Price, Quantity, Side, Symbol, UserId};

/// Manager over the in-memory adapters.
pub type MemoryManager = PositionManager<MemoryPositionRepository, MemoryBarrier>;

static SEED_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// The trader every fixture belongs to unless stated otherwise.
pub fn user() -> UserId {
    UserId::new("U1")
}

/// The default instrument.
pub fn btc() -> Symbol {
    Symbol::new("BTC-USD")
}

/// An OPEN position for [`user`] in [`btc`].
pub fn position(side: Side, quantity: Quantity, price: Price) -> Position {
    Position::open(
        PositionId::generate(),
        user(),
        btc(),
        side,
        quantity,
        price,
        Utc::now(),
    )
    .expect("fixture position is valid")
}

/// An OPEN LONG position for [`user`] in [`btc`].
pub fn long(quantity: Quantity, price: Price) -> Position {
    position(Side::Long, quantity, price)
}

/// An OPEN SHORT position for [`user`] in [`btc`].
pub fn short(quantity: Quantity, price: Price) -> Position {
    position(Side::Short, quantity, price)
}

/// A manager over fresh in-memory adapters with default settings.
pub fn manager() -> MemoryManager {
    manager_with(ManagerSettings::default())
}

/// A manager over fresh in-memory adapters.
pub fn manager_with(settings: ManagerSettings) -> MemoryManager {
    PositionManager::with_settings(
        Arc::new(MemoryPositionRepository::new()),
        Arc::new(MemoryBarrier::new()),
        settings,
    )
}

/// Give [`user`] a LONG [`btc`] holding through a saga forward on a
/// branch no test names.
pub async fn seed_long<R, B>(manager: &PositionManager<R, B>, quantity: Quantity, price: Price)
where
    R: crate::port::outbound::repository::PositionRepository,
    B: crate::port::outbound::barrier::BranchBarrier,
{
    let n = SEED_COUNTER.fetch_add(1, Ordering::Relaxed);
    manager
        .saga_add_position(
            &Barrier::new(format!("seed-{n}"), "buy"),
            &user(),
            &btc(),
            quantity,
            price,
        )
        .await
        .expect("seed position");
}

/// The OPEN [`btc`] position of [`user`]; panics when there is none.
pub async fn open_btc<R, B>(manager: &PositionManager<R, B>) -> Position
where
    R: crate::port::outbound::repository::PositionRepository,
    B: crate::port::outbound::barrier::BranchBarrier,
{
    manager
        .find_open_position(&user(), &btc())
        .await
        .expect("lookup succeeds")
        .expect("open position exists")
}
