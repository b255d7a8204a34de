//! The position aggregate.
//!
//! A [`Position`] is one trader's exposure in one instrument. All mutating
//! operations validate first and only then write, so a failed call leaves
//! the aggregate exactly as it was.

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::{ensure_positive_price, ensure_positive_quantity};
use super::{DomainError, Pnl, PositionId, Price, Quantity, Symbol, UserId};

/// Direction of a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    /// Profits when the price rises.
    Long,
    /// Profits when the price falls.
    Short,
}

impl Side {
    /// Stable name used in logs and persisted rows.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Long => "LONG",
            Self::Short => "SHORT",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status of a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PositionStatus {
    /// Holding exposure; may still change.
    Open,
    /// Retained for history; quantity is zero.
    Closed,
}

impl PositionStatus {
    /// Returns true if the position is open.
    #[must_use]
    pub fn is_open(self) -> bool {
        matches!(self, Self::Open)
    }

    /// Returns true if the position is closed.
    #[must_use]
    pub fn is_closed(self) -> bool {
        matches!(self, Self::Closed)
    }
}

/// One trader's exposure in one instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    id: PositionId,
    user_id: UserId,
    symbol: Symbol,
    side: Side,
    quantity: Quantity,
    entry_price: Price,
    current_price: Price,
    realized_pnl: Pnl,
    status: PositionStatus,
    opened_at: DateTime<Utc>,
    closed_at: Option<DateTime<Utc>>,
    version: u64,
}

impl Position {
    /// Open a new position holding `quantity` at `price`.
    ///
    /// The mark price starts at the entry price, so unrealized `PnL` is zero.
    pub fn open(
        id: PositionId,
        user_id: UserId,
        symbol: Symbol,
        side: Side,
        quantity: Quantity,
        price: Price,
        opened_at: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        id.ensure_present()?;
        user_id.ensure_present()?;
        symbol.ensure_present()?;
        ensure_positive_quantity(quantity)?;
        ensure_positive_price(price)?;

        Ok(Self {
            id,
            user_id,
            symbol,
            side,
            quantity,
            entry_price: price,
            current_price: price,
            realized_pnl: Decimal::ZERO,
            status: PositionStatus::Open,
            opened_at,
            closed_at: None,
            version: 0,
        })
    }

    /// Get the position ID.
    #[must_use]
    pub fn id(&self) -> &PositionId {
        &self.id
    }

    /// Get the owning trader.
    #[must_use]
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    /// Get the instrument symbol.
    #[must_use]
    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    #[must_use]
    pub fn side(&self) -> Side {
        self.side
    }

    /// Quantity currently available (reserved quantity excluded).
    #[must_use]
    pub fn quantity(&self) -> Quantity {
        self.quantity
    }

    /// Volume-weighted average entry price.
    #[must_use]
    pub fn entry_price(&self) -> Price {
        self.entry_price
    }

    /// Last marked price.
    #[must_use]
    pub fn current_price(&self) -> Price {
        self.current_price
    }

    #[must_use]
    pub fn realized_pnl(&self) -> Pnl {
        self.realized_pnl
    }

    #[must_use]
    pub fn status(&self) -> PositionStatus {
        self.status
    }

    #[must_use]
    pub fn opened_at(&self) -> DateTime<Utc> {
        self.opened_at
    }

    #[must_use]
    pub fn closed_at(&self) -> Option<DateTime<Utc>> {
        self.closed_at
    }

    /// Optimistic concurrency version, owned by the repository.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Returns true if the position is open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.status.is_open()
    }

    /// Unrealized `PnL` at the last mark, sign-adjusted for shorts.
    ///
    /// Derived on every read; saturates instead of overflowing.
    #[must_use]
    pub fn unrealized_pnl(&self) -> Pnl {
        let per_unit = self.current_price.saturating_sub(self.entry_price);
        let pnl = per_unit.saturating_mul(self.quantity);
        match self.side {
            Side::Long => pnl,
            Side::Short => -pnl,
        }
    }

    /// Grow exposure by `quantity` bought at `price`.
    ///
    /// The entry price becomes the volume-weighted average of the held
    /// quantity and the new fill.
    pub fn add_quantity(&mut self, quantity: Quantity, price: Price) -> Result<(), DomainError> {
        self.ensure_open()?;
        ensure_positive_quantity(quantity)?;
        ensure_positive_price(price)?;

        let overflow = || DomainError::ArithmeticOverflow {
            operation: "weighted entry price",
        };
        let held_cost = self
            .quantity
            .checked_mul(self.entry_price)
            .ok_or_else(overflow)?;
        let fill_cost = quantity.checked_mul(price).ok_or_else(overflow)?;
        let total_quantity = self.quantity.checked_add(quantity).ok_or_else(overflow)?;
        let entry_price = held_cost
            .checked_add(fill_cost)
            .and_then(|cost| cost.checked_div(total_quantity))
            .ok_or_else(overflow)?;

        self.entry_price = entry_price;
        self.quantity = total_quantity;
        Ok(())
    }

    /// Remove `quantity` from tradable exposure without touching the
    /// entry price.
    pub fn reduce_quantity(&mut self, quantity: Quantity) -> Result<(), DomainError> {
        self.ensure_open()?;
        ensure_positive_quantity(quantity)?;
        if quantity > self.quantity {
            return Err(DomainError::InsufficientQuantity {
                requested: quantity,
                available: self.quantity,
            });
        }

        self.quantity -= quantity;
        Ok(())
    }

    /// Undo a reservation made by [`Self::reduce_quantity`].
    pub fn restore_quantity(&mut self, quantity: Quantity) -> Result<(), DomainError> {
        self.ensure_open()?;
        ensure_positive_quantity(quantity)?;

        self.quantity = self
            .quantity
            .checked_add(quantity)
            .ok_or(DomainError::ArithmeticOverflow {
                operation: "restored quantity",
            })?;
        Ok(())
    }

    /// Book profit or loss for `quantity` executed at `exec_price`.
    ///
    /// Quantity is not touched; it must already have been removed by a
    /// prior [`Self::reduce_quantity`]. Returns the realized delta.
    pub fn realize_pnl(&mut self, quantity: Quantity, exec_price: Price) -> Result<Pnl, DomainError> {
        self.ensure_open()?;
        ensure_positive_quantity(quantity)?;
        ensure_positive_price(exec_price)?;

        let delta = self.pnl_delta(quantity, exec_price)?;
        self.realized_pnl = self
            .realized_pnl
            .checked_add(delta)
            .ok_or(DomainError::ArithmeticOverflow {
                operation: "realized pnl",
            })?;
        Ok(delta)
    }

    /// Close the position at `close_price`, realizing any remaining
    /// quantity. Returns the `PnL` realized by the close itself.
    pub fn close(&mut self, close_price: Price, closed_at: DateTime<Utc>) -> Result<Pnl, DomainError> {
        self.ensure_open()?;
        ensure_positive_price(close_price)?;

        let delta = if self.quantity > Decimal::ZERO {
            self.pnl_delta(self.quantity, close_price)?
        } else {
            Decimal::ZERO
        };
        let realized_pnl = self
            .realized_pnl
            .checked_add(delta)
            .ok_or(DomainError::ArithmeticOverflow {
                operation: "realized pnl",
            })?;

        self.realized_pnl = realized_pnl;
        self.quantity = Decimal::ZERO;
        self.current_price = close_price;
        self.status = PositionStatus::Closed;
        self.closed_at = Some(closed_at);
        Ok(delta)
    }

    /// Record the latest market price. A closed row keeps its close price.
    pub fn mark_price(&mut self, price: Price) -> Result<(), DomainError> {
        self.ensure_open()?;
        ensure_positive_price(price)?;
        self.current_price = price;
        Ok(())
    }

    /// Set the stored version. Called by repositories after a write.
    pub fn set_version(&mut self, version: u64) {
        self.version = version;
    }

    fn ensure_open(&self) -> Result<(), DomainError> {
        if self.status.is_closed() {
            return Err(DomainError::PositionClosed {
                position_id: self.id.clone(),
            });
        }
        Ok(())
    }

    fn pnl_delta(&self, quantity: Quantity, exec_price: Price) -> Result<Pnl, DomainError> {
        let per_unit = match self.side {
            Side::Long => exec_price.checked_sub(self.entry_price),
            Side::Short => self.entry_price.checked_sub(exec_price),
        };
        per_unit
            .and_then(|p| p.checked_mul(quantity))
            .ok_or(DomainError::ArithmeticOverflow {
                operation: "pnl delta",
            })
    }
}
