//! Order and payment state machines.

use serde::{Deserialize, Serialize};

/// Fulfillment state of an order.
///
/// State transitions:
/// ```text
/// Created ──► Confirmed ──► Preparing ──► Shipped ──► Delivered
///    │            │
///    └────────────┴──► Cancelled
/// ```
///
/// Only `Created → Confirmed` and the two cancellation edges are driven by
/// this core (payment reconciliation); the rest belong to the fulfillment
/// workflow and are expressed here so that workflow shares one source of
/// truth for legality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderState {
    /// Order placed, payment not yet settled.
    #[default]
    Created,

    /// Payment captured, order awaiting fulfillment.
    Confirmed,

    /// Warehouse is picking the order.
    Preparing,

    /// Handed to the carrier.
    Shipped,

    /// Received by the customer (terminal state).
    Delivered,

    /// Order was cancelled (terminal state).
    Cancelled,
}

impl OrderState {
    /// Returns true if payment confirmation may move the order to Confirmed.
    pub fn can_confirm(&self) -> bool {
        matches!(self, OrderState::Created)
    }

    /// Returns true if the order can still be cancelled.
    pub fn can_cancel(&self) -> bool {
        matches!(self, OrderState::Created | OrderState::Confirmed)
    }

    /// Returns true if fulfillment can start preparing the order.
    pub fn can_prepare(&self) -> bool {
        matches!(self, OrderState::Confirmed)
    }

    /// Returns true if the order can be marked shipped.
    pub fn can_ship(&self) -> bool {
        matches!(self, OrderState::Preparing)
    }

    /// Returns true if the order can be marked delivered.
    pub fn can_deliver(&self) -> bool {
        matches!(self, OrderState::Shipped)
    }

    /// Returns true if this is a terminal state (no further transitions possible).
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderState::Delivered | OrderState::Cancelled)
    }

    /// Returns the state name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderState::Created => "created",
            OrderState::Confirmed => "confirmed",
            OrderState::Preparing => "preparing",
            OrderState::Shipped => "shipped",
            OrderState::Delivered => "delivered",
            OrderState::Cancelled => "cancelled",
        }
    }

    /// Parses a state name as stored in the database.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "created" => Some(OrderState::Created),
            "confirmed" => Some(OrderState::Confirmed),
            "preparing" => Some(OrderState::Preparing),
            "shipped" => Some(OrderState::Shipped),
            "delivered" => Some(OrderState::Delivered),
            "cancelled" => Some(OrderState::Cancelled),
            _ => None,
        }
    }
}

impl std::fmt::Display for OrderState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Payment settlement state, reconciled from gateway webhooks.
///
/// State transitions:
/// ```text
/// Pending ──► Processing ──► Paid
///    │            │
///    └────────────┴──► Failed
/// ```
///
/// `Paid` and `Failed` are terminal; `Paid` is monotonic, meaning once
/// reached it is never overwritten, whatever arrives later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentState {
    /// Order created, no payment intent issued yet.
    #[default]
    Pending,

    /// Gateway intent created, customer completing payment.
    Processing,

    /// Gateway confirmed capture (terminal state).
    Paid,

    /// Gateway reported failure, or checkout compensated (terminal state).
    Failed,
}

impl PaymentState {
    /// Returns true if a gateway intent can be attached in this state.
    pub fn can_start_processing(&self) -> bool {
        matches!(self, PaymentState::Pending)
    }

    /// Returns true if a success event may settle payment from this state.
    pub fn can_settle(&self) -> bool {
        matches!(self, PaymentState::Processing)
    }

    /// Returns true if payment can still fail from this state.
    pub fn can_fail(&self) -> bool {
        matches!(self, PaymentState::Pending | PaymentState::Processing)
    }

    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, PaymentState::Paid | PaymentState::Failed)
    }

    /// Returns the state name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentState::Pending => "pending",
            PaymentState::Processing => "processing",
            PaymentState::Paid => "paid",
            PaymentState::Failed => "failed",
        }
    }

    /// Parses a state name as stored in the database.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(PaymentState::Pending),
            "processing" => Some(PaymentState::Processing),
            "paid" => Some(PaymentState::Paid),
            "failed" => Some(PaymentState::Failed),
            _ => None,
        }
    }
}

impl std::fmt::Display for PaymentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
