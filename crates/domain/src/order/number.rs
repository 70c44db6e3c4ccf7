//! Human-readable order numbers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use common::OrderId;

/// Human-readable, unique order number, e.g. `ORD-20260214-9F3A2C`.
///
/// Derived from the order date and the order ID so uniqueness follows from
/// the ID without a separate sequence.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderNumber(String);

impl OrderNumber {
    /// Derives the number for an order placed at `placed_at`.
    pub fn derive(order_id: OrderId, placed_at: DateTime<Utc>) -> Self {
        let suffix = order_id.as_uuid().simple().to_string();
        // UUID simple form is 32 lowercase hex chars, so the slice is safe.
        Self(format!(
            "ORD-{}-{}",
            placed_at.format("%Y%m%d"),
            suffix[..6].to_uppercase()
        ))
    }

    /// Wraps a number loaded from storage.
    pub fn from_stored(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Returns the number as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
