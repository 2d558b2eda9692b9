//! Shared types for the order and promotion core.

pub mod clock;
pub mod money;
pub mod types;

pub use clock::{Clock, FixedClock, SystemClock};
pub use money::Money;
pub use types::{BrandId, CategoryId, ClassId, OfferId, OrderId, ProductId, UserId};
