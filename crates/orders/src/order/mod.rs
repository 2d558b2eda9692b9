//! Order aggregate and related types.

mod aggregate;
mod commands;
mod events;
mod filter;
mod line;
mod locks;
mod payments;
mod service;
mod status;
pub mod totals;

pub use aggregate::Order;
pub use commands::*;
pub use events::{LineCancelledData, OrderEvent, OrderPlacedData, OrderStatusChange};
pub use filter::OrderFilter;
pub use line::{AppliedOffer, Cancellation, LineStatus, OrderLine};
pub use payments::{PaymentBalance, PaymentEvent, PaymentKind, PaymentStatus, payment_status};
pub use service::OrderService;
pub use status::OrderStatus;
pub use totals::TotalBreakdown;

use common::Money;
use thiserror::Error;

/// Errors that can occur during order operations.
#[derive(Debug, Error)]
pub enum OrderError {
    /// The requested status edge is not allowed.
    #[error("Invalid transition: {from} -> {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    /// The order is in a terminal status.
    #[error("Order is closed ({status})")]
    OrderClosed { status: OrderStatus },

    #[error("Line not found: {line_id}")]
    LineNotFound { line_id: u32 },

    #[error("Invalid quantity: {quantity} (must be greater than 0)")]
    InvalidQuantity { quantity: u32 },

    #[error("Invalid price: {price} (must not be negative)")]
    InvalidPrice { price: i64 },

    /// A discount is negative or larger than the price it reduces.
    #[error("Invalid discount: {amount}")]
    InvalidDiscount { amount: i64 },

    #[error("Invalid tax: {amount}")]
    InvalidTax { amount: i64 },

    #[error("Order has no lines")]
    EmptyOrder,

    #[error("Invalid payment amount: {amount} (must be greater than 0)")]
    InvalidPaymentAmount { amount: i64 },

    #[error("Refund of {requested} exceeds paid balance of {available}")]
    RefundExceedsBalance { requested: Money, available: Money },

    #[error("Order already placed")]
    AlreadyPlaced,

    /// The command targets an order that has no events.
    #[error("Order not placed")]
    NotPlaced,
}
