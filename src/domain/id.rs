//! Domain identifier types with proper encapsulation.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::DomainError;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident, $field:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(String);

        impl $name {
            #[doc = concat!("Create a new `", stringify!($name), "` from a string.")]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Get the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Fail with [`DomainError::EmptyIdentifier`] if blank.
            pub fn ensure_present(&self) -> Result<(), DomainError> {
                if self.0.trim().is_empty() {
                    return Err(DomainError::EmptyIdentifier { field: $field });
                }
                Ok(())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self::new(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self::new(s)
            }
        }
    };
}

string_id!(
    /// Trader identifier.
    ///
    /// The inner String is private to ensure all construction goes through
    /// the defined constructors.
    UserId,
    "user_id"
);

string_id!(
    /// Instrument symbol, e.g. `BTC-USD`.
    Symbol,
    "symbol"
);

string_id!(
    /// Opaque position identifier assigned at creation.
    PositionId,
    "position_id"
);

impl PositionId {
    /// Create a new `PositionId` with a generated UUID.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}
