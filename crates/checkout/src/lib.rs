//! Checkout orchestration.
//!
//! [`CheckoutService`] turns a basket into a placed order:
//! 1. Match the catalog's offers against the basket
//! 2. Select offers per the configured [`StackingPolicy`] and price the basket
//! 3. Record each offer's application, enforcing usage limits
//! 4. Persist the order
//!
//! If persisting the order fails, the recorded applications are revoked.

pub mod config;
pub mod error;
pub mod pricing;
pub mod service;

pub use config::{CheckoutConfig, ConfigError, StackingPolicy};
pub use error::CheckoutError;
pub use pricing::PricedBasket;
pub use service::{CheckoutService, OfferPreview, PlacedOrder, PreviewedOffer};
