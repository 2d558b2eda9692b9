//! Order domain events.

use chrono::{DateTime, Utc};
use common::{Money, OrderId, UserId};
use serde::{Deserialize, Serialize};

use crate::aggregate::DomainEvent;

use super::{AppliedOffer, Cancellation, OrderLine, OrderStatus, PaymentEvent};

/// Events that can occur on an order aggregate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum OrderEvent {
    /// Order was placed from a priced basket.
    OrderPlaced(OrderPlacedData),

    /// Status changed. This is the audit record of the transition.
    StatusChanged(OrderStatusChange),

    /// A payment or refund was recorded.
    PaymentRecorded(PaymentEvent),

    /// One line was cancelled and left the total.
    LineCancelled(LineCancelledData),
}

impl DomainEvent for OrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            OrderEvent::OrderPlaced(_) => "OrderPlaced",
            OrderEvent::StatusChanged(_) => "StatusChanged",
            OrderEvent::PaymentRecorded(_) => "PaymentRecorded",
            OrderEvent::LineCancelled(_) => "LineCancelled",
        }
    }
}

/// Data for OrderPlaced event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderPlacedData {
    pub order_id: OrderId,

    /// Owning user, None for a guest checkout.
    pub user_id: Option<UserId>,

    /// Lines with their final line ids and per-unit discounts.
    pub lines: Vec<OrderLine>,

    /// Order-level discount.
    pub discount: Money,

    pub tax: Money,

    pub shipping_waived: bool,

    pub applied_offers: Vec<AppliedOffer>,

    pub placed_at: DateTime<Utc>,
}

/// Immutable audit record of one status transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderStatusChange {
    pub order_id: OrderId,
    pub from: OrderStatus,
    pub to: OrderStatus,
    pub changed_at: DateTime<Utc>,

    /// Present only when `to` is Cancelled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancellation: Option<Cancellation>,
}

/// Data for LineCancelled event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineCancelledData {
    pub line_id: u32,
    pub cancelled_at: DateTime<Utc>,
}

// Convenience constructors
impl OrderEvent {
    pub fn status_changed(
        order_id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
        changed_at: DateTime<Utc>,
        cancellation: Option<Cancellation>,
    ) -> Self {
        OrderEvent::StatusChanged(OrderStatusChange {
            order_id,
            from,
            to,
            changed_at,
            cancellation,
        })
    }

    pub fn payment_recorded(event: PaymentEvent) -> Self {
        OrderEvent::PaymentRecorded(event)
    }

    pub fn line_cancelled(line_id: u32, cancelled_at: DateTime<Utc>) -> Self {
        OrderEvent::LineCancelled(LineCancelledData {
            line_id,
            cancelled_at,
        })
    }
}
