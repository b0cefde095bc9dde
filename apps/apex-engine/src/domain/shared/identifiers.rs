//! Strongly-typed identifiers for domain entities.
//!
//! These prevent mixing up IDs from different registries.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! define_id {
    ($name:ident, $prefix:literal, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create an identifier from an existing string.
            #[must_use]
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Generate a new unique identifier.
            #[must_use]
            pub fn generate() -> Self {
                Self(format!(concat!($prefix, "-{}"), uuid::Uuid::new_v4()))
            }

            /// Get the inner string value.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

define_id!(OrderId, "ord", "Internal identifier of an order.");
define_id!(VenueOrderId, "vnd", "Identifier assigned to an order by a venue.");
define_id!(PositionId, "pos", "Identifier of a tracked position.");
define_id!(ExecutionId, "exe", "Identifier of a running execution algorithm.");
define_id!(
    AdvancedOrderId,
    "adv",
    "Identifier of an iceberg, trailing-stop or bracket order."
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_carry_prefix() {
        assert!(OrderId::generate().as_str().starts_with("ord-"));
        assert!(ExecutionId::generate().as_str().starts_with("exe-"));
        assert!(AdvancedOrderId::generate().as_str().starts_with("adv-"));
    }

    #[test]
    fn generated_ids_are_unique() {
        assert_ne!(PositionId::generate(), PositionId::generate());
    }

    #[test]
    fn id_from_str_and_display() {
        let id: OrderId = "ord-123".into();
        assert_eq!(id.as_str(), "ord-123");
        assert_eq!(id.to_string(), "ord-123");
    }

    #[test]
    fn id_serializes_transparently() {
        let id = VenueOrderId::new("abc");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"abc\"");
    }
}
