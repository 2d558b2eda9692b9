//! Checkout error types.

use orders::DomainError;
use promotions::PromotionError;
use thiserror::Error;

/// Errors that can occur while checking out a basket.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// The basket cannot become an order.
    #[error("Invalid basket: {0}")]
    InvalidBasket(String),

    /// Order placement failed.
    #[error("Order error: {0}")]
    Domain(#[from] DomainError),

    /// Offer lookup or usage recording failed.
    #[error("Promotion error: {0}")]
    Promotion(#[from] PromotionError),
}

impl CheckoutError {
    /// Returns true if the request was refused rather than failing in storage.
    pub fn is_rejection(&self) -> bool {
        match self {
            CheckoutError::InvalidBasket(_) => true,
            CheckoutError::Domain(e) => e.is_rejection(),
            CheckoutError::Promotion(_) => false,
        }
    }
}

/// Convenience type alias for checkout results.
pub type Result<T> = std::result::Result<T, CheckoutError>;
