use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Creates an identifier from an existing UUID.
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the underlying UUID.
            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

uuid_id! {
    /// Unique identifier for an order.
    ///
    /// Wraps a UUID to provide type safety and prevent mixing up
    /// order IDs with other UUID-based identifiers.
    OrderId
}

uuid_id! {
    /// Unique identifier for a customer, issued by the authentication layer
    /// and treated as opaque here.
    CustomerId
}

uuid_id! {
    /// Unique identifier for a shipping address.
    AddressId
}

/// Product identifier (SKU).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(String);

impl ProductId {
    /// Creates a new product ID from a string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the product ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ProductId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ProductId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ProductId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for ProductId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Payment intent identifier assigned by the payment gateway.
///
/// This is the sole correlation key between a checkout and the webhook
/// deliveries that settle it, so it gets its own type rather than a bare
/// `String`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IntentId(String);

impl IntentId {
    /// Creates an intent ID from the gateway-supplied handle.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the intent ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for IntentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for IntentId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for IntentId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for IntentId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_id_new_creates_unique_ids() {
        let id1 = OrderId::new();
        let id2 = OrderId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn order_id_from_uuid_preserves_value() {
        let uuid = Uuid::new_v4();
        let id = OrderId::from_uuid(uuid);
        assert_eq!(id.as_uuid(), uuid);
    }

    #[test]
    fn customer_and_address_ids_are_distinct_types() {
        // Compile-time property really, but keep the runtime check honest.
        let uuid = Uuid::new_v4();
        let customer = CustomerId::from_uuid(uuid);
        let address = AddressId::from_uuid(uuid);
        assert_eq!(customer.as_uuid(), address.as_uuid());
    }

    #[test]
    fn product_id_string_conversion() {
        let id = ProductId::new("SKU-001");
        assert_eq!(id.as_str(), "SKU-001");

        let id2: ProductId = "SKU-002".into();
        assert_eq!(id2.as_str(), "SKU-002");
    }

    #[test]
    fn intent_id_roundtrip() {
        let id = IntentId::new("pi_12345");
        assert_eq!(id.as_str(), "pi_12345");
        assert_eq!(id.to_string(), "pi_12345");
    }

    #[test]
    fn id_serialization_is_transparent() {
        let id = OrderId::new();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{id}\""));

        let back: OrderId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);

        let intent = IntentId::new("pi_42");
        assert_eq!(serde_json::to_string(&intent).unwrap(), "\"pi_42\"");
    }
}
