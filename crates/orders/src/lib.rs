//! Order management for the storefront.
//!
//! This crate provides:
//! - The event-sourced [`Order`] aggregate with its lifecycle state machine
//! - Total derivation and the payment ledger
//! - [`HashToken`] lookup tokens for guest access
//! - [`OrderService`], which serializes commands per order

pub mod aggregate;
pub mod command;
pub mod error;
pub mod order;
pub mod token;

pub use aggregate::{Aggregate, DomainEvent};
pub use command::{CommandHandler, CommandResult};
pub use error::DomainError;
pub use order::{
    AppliedOffer, CancelLine, CancelOrder, Cancellation, LineStatus, Order, OrderError,
    OrderEvent, OrderFilter, OrderLine, OrderService, OrderStatus, OrderStatusChange, PaymentEvent,
    PaymentKind, PaymentStatus, PlaceOrder, RecordPayment, TotalBreakdown, TransitionOrder,
};
pub use token::HashToken;
