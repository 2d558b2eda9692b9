//! Promotional offers.
//!
//! An [`Offer`] pairs a product [`OfferRange`], a basket [`OfferCondition`]
//! and an [`OfferBenefit`]. [`OfferMatcher`] decides which offers apply to a
//! basket; [`ApplicationRecorder`] logs each use and enforces usage limits.

pub mod basket;
pub mod benefit;
pub mod catalog;
pub mod condition;
pub mod error;
pub mod matcher;
pub mod offer;
pub mod range;
pub mod recorder;

pub use basket::BasketLine;
pub use benefit::{BenefitKind, BenefitOutcome, LineDiscount, OfferBenefit, UnitGroup};
pub use catalog::{InMemoryOfferCatalog, OfferCatalog, OfferFilter};
pub use condition::OfferCondition;
pub use error::{OfferNotEligible, PromotionError, Result};
pub use matcher::{MatchReport, OfferMatcher, OfferUsage, UsageSnapshot, in_range};
pub use offer::{ActiveWindow, Offer, OfferScope, UsageLimits};
pub use range::OfferRange;
pub use recorder::{
    ApplicationRecorder, InMemoryApplicationRecorder, OfferApplication,
    PostgresApplicationRecorder,
};
