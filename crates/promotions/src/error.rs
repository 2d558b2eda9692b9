//! Promotion error types.

use common::{OfferId, OrderId};
use thiserror::Error;

/// Errors from recording offer usage or managing the catalog.
#[derive(Debug, Error)]
pub enum PromotionError {
    /// The offer was already recorded for this order.
    #[error("Offer {offer_id} already applied to order {order_id}")]
    DuplicateApplication { offer_id: OfferId, order_id: OrderId },

    /// A usage limit was reached before this application could be recorded.
    #[error("Usage limit reached for offer {offer_id}")]
    UsageLimitReached { offer_id: OfferId },

    #[error("Offer not found: {0}")]
    OfferNotFound(OfferId),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

pub type Result<T> = std::result::Result<T, PromotionError>;

/// Why an offer does not apply to a basket.
///
/// Reported to callers as a reason code, never raised as a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum OfferNotEligible {
    #[error("offer is inactive")]
    Inactive,

    #[error("offer has not started yet")]
    NotYetActive,

    #[error("offer has expired")]
    Expired,

    #[error("voucher code does not match")]
    VoucherMismatch,

    #[error("offer is reserved for another user")]
    ScopeMismatch,

    #[error("no basket line is in the offer's range")]
    RangeMismatch,

    #[error("basket does not meet the offer's condition")]
    ConditionUnmet,

    #[error("usage limit exceeded")]
    LimitExceeded,
}
