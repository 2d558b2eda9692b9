//! Order lifecycle state machine.

use serde::{Deserialize, Serialize};

use super::OrderError;

/// The status of an order in its lifecycle.
///
/// Transitions:
/// ```text
/// Pending ──► Processing ──► Couriered ──► Shipped ──► Delivered ──► Completed
///    │            │              │            │            │
///    └────────────┴──────────────┴────────────┴────────────┴──► Cancelled | Returned
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum OrderStatus {
    /// Order was placed and awaits handling.
    #[default]
    Pending,

    /// Order is being prepared.
    Processing,

    /// Order was handed to a courier.
    Couriered,

    /// Order is in transit.
    Shipped,

    /// Order reached the customer.
    Delivered,

    /// Order was sent back (terminal).
    Returned,

    /// Order was cancelled (terminal).
    Cancelled,

    /// Order is closed (terminal).
    Completed,
}

impl OrderStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [OrderStatus; 8] = [
        OrderStatus::Pending,
        OrderStatus::Processing,
        OrderStatus::Couriered,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
        OrderStatus::Completed,
        OrderStatus::Cancelled,
        OrderStatus::Returned,
    ];

    /// Returns the next status on the fulfilment path, if any.
    pub fn next(&self) -> Option<OrderStatus> {
        match self {
            OrderStatus::Pending => Some(OrderStatus::Processing),
            OrderStatus::Processing => Some(OrderStatus::Couriered),
            OrderStatus::Couriered => Some(OrderStatus::Shipped),
            OrderStatus::Shipped => Some(OrderStatus::Delivered),
            OrderStatus::Delivered => Some(OrderStatus::Completed),
            OrderStatus::Returned | OrderStatus::Cancelled | OrderStatus::Completed => None,
        }
    }

    /// Returns true if `to` is an allowed edge from this status.
    pub fn can_transition_to(&self, to: OrderStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        match to {
            OrderStatus::Cancelled | OrderStatus::Returned => true,
            _ => self.next() == Some(to),
        }
    }

    /// Validates an edge, failing with `InvalidTransition` if it is not allowed.
    pub fn check_transition(&self, to: OrderStatus) -> Result<(), OrderError> {
        if self.can_transition_to(to) {
            Ok(())
        } else {
            Err(OrderError::InvalidTransition { from: *self, to })
        }
    }

    /// Returns true if this is a terminal status (no further transitions possible).
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Returned | OrderStatus::Cancelled | OrderStatus::Completed
        )
    }

    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::Processing => "Processing",
            OrderStatus::Couriered => "Couriered",
            OrderStatus::Shipped => "Shipped",
            OrderStatus::Delivered => "Delivered",
            OrderStatus::Returned => "Returned",
            OrderStatus::Cancelled => "Cancelled",
            OrderStatus::Completed => "Completed",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
