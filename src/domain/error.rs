//! Domain validation errors for the position aggregate.
//!
//! These errors are returned when a position rule is violated. Every
//! operation that returns one leaves the aggregate unchanged.
//!
//! # Examples
//!
//! ```
//! use chrono::Utc;
//! use position_ledger::domain::{DomainError, Position, PositionId, Side, Symbol, UserId};
//! use rust_decimal_macros::dec;
//!
//! let mut position = Position::open(
//!     PositionId::new("p-1"),
//!     UserId::new("u1"),
//!     Symbol::new("BTC-USD"),
//!     Side::Long,
//!     dec!(10),
//!     dec!(100),
//!     Utc::now(),
//! )
//! .unwrap();
//!
//! let result = position.reduce_quantity(dec!(11));
//! assert!(matches!(result, Err(DomainError::InsufficientQuantity { .. })));
//! assert_eq!(position.quantity(), dec!(10));
//! ```

use rust_decimal::Decimal;
use thiserror::Error;

use super::PositionId;

/// Errors that occur when position invariants would be violated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Quantities must be strictly positive.
    #[error("quantity must be positive, got {quantity}")]
    NonPositiveQuantity {
        /// The invalid quantity that was provided.
        quantity: Decimal,
    },

    /// Prices must be strictly positive.
    #[error("price must be positive, got {price}")]
    NonPositivePrice {
        /// The invalid price that was provided.
        price: Decimal,
    },

    /// Identifiers must not be empty.
    #[error("{field} cannot be empty")]
    EmptyIdentifier {
        /// Name of the empty identifier.
        field: &'static str,
    },

    /// Decimal arithmetic left the representable range.
    #[error("arithmetic overflow while computing {operation}")]
    ArithmeticOverflow {
        /// The computation that overflowed.
        operation: &'static str,
    },

    /// A reservation or compensation asked for more than is held.
    #[error("insufficient quantity: requested {requested}, available {available}")]
    InsufficientQuantity {
        /// Quantity requested.
        requested: Decimal,
        /// Quantity currently held.
        available: Decimal,
    },

    /// The position is closed and can no longer change exposure.
    #[error("position {position_id} is closed")]
    PositionClosed {
        /// The closed position.
        position_id: PositionId,
    },
}

/// Reject zero and negative quantities.
pub(crate) fn ensure_positive_quantity(quantity: Decimal) -> Result<(), DomainError> {
    if quantity <= Decimal::ZERO {
        return Err(DomainError::NonPositiveQuantity { quantity });
    }
    Ok(())
}

/// Reject zero and negative prices.
pub(crate) fn ensure_positive_price(price: Decimal) -> Result<(), DomainError> {
    if price <= Decimal::ZERO {
        return Err(DomainError::NonPositivePrice { price });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn ensure_helpers_reject_non_positive() {
        assert!(ensure_positive_quantity(dec!(0)).is_err());
        assert!(ensure_positive_quantity(dec!(-1)).is_err());
        assert!(ensure_positive_quantity(dec!(0.0001)).is_ok());
        assert!(ensure_positive_price(dec!(-5)).is_err());
        assert!(ensure_positive_price(dec!(5)).is_ok());
    }

    #[test]
    fn display_includes_amounts() {
        let err = DomainError::InsufficientQuantity {
            requested: dec!(20),
            available: dec!(15),
        };
        assert_eq!(
            err.to_string(),
            "insufficient quantity: requested 20, available 15"
        );
    }
}
