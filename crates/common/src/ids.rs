//! Typed entity identifiers.
//!
//! Each identifier wraps the `i64` key assigned by the database sequence.
//! Wrapping prevents mixing up, say, a product id with the review id it
//! happens to share a value with.

use serde::{Deserialize, Serialize};

macro_rules! entity_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Wraps an existing database key.
            pub fn from_i64(id: i64) -> Self {
                Self(id)
            }

            /// Returns the underlying database key.
            pub fn as_i64(&self) -> i64 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

entity_id!(
    /// Unique identifier of a product.
    ProductId
);
entity_id!(
    /// Unique identifier of an order.
    OrderId
);
entity_id!(
    /// Unique identifier of a review.
    ReviewId
);
entity_id!(
    /// Opaque reference to a user. No referential integrity is enforced on it.
    UserId
);
