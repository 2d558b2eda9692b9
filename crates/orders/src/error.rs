//! Domain error types.

use common::OrderId;
use event_store::EventStoreError;
use thiserror::Error;

use crate::order::OrderError;

/// Errors that can occur during order operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// Storage failure, passed through unchanged.
    #[error("Event store error: {0}")]
    EventStore(#[from] EventStoreError),

    /// The order rejected the command.
    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// A stored payload no longer matches the event schema.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DomainError {
    /// Returns true if the error came from the order's own rules rather than storage.
    pub fn is_rejection(&self) -> bool {
        matches!(self, DomainError::Order(_) | DomainError::OrderNotFound(_))
    }
}
