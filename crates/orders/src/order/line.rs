//! Value objects owned by an order.

use chrono::{DateTime, Utc};
use common::{Money, OfferId, ProductId};
use serde::{Deserialize, Serialize};

/// Whether a line still counts towards the order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum LineStatus {
    #[default]
    Open,
    Cancelled,
}

/// A line item in an order.
///
/// `discount` is per unit, so the line contributes
/// `(unit_price - discount) * quantity` while it is open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    /// Position of the line within its order, starting at 1.
    pub line_id: u32,

    pub product_id: ProductId,

    /// Product name at the time of purchase.
    pub product_name: String,

    /// Undiscounted price per unit.
    pub unit_price: Money,

    /// Discount per unit granted by offers.
    #[serde(default)]
    pub discount: Money,

    pub quantity: u32,

    #[serde(default)]
    pub status: LineStatus,
}

impl OrderLine {
    /// Creates an open, undiscounted line. The line id is assigned when the order is placed.
    pub fn new(
        product_id: impl Into<ProductId>,
        product_name: impl Into<String>,
        quantity: u32,
        unit_price: Money,
    ) -> Self {
        Self {
            line_id: 0,
            product_id: product_id.into(),
            product_name: product_name.into(),
            unit_price,
            discount: Money::zero(),
            quantity,
            status: LineStatus::Open,
        }
    }

    /// Sets the per-unit discount.
    pub fn with_discount(mut self, discount: Money) -> Self {
        self.discount = discount;
        self
    }

    /// Price actually charged per unit.
    pub fn effective_unit_price(&self) -> Money {
        self.unit_price - self.discount
    }

    /// Amount this line adds to the subtotal, ignoring its status.
    pub fn line_total(&self) -> Money {
        self.effective_unit_price().times(self.quantity)
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == LineStatus::Cancelled
    }
}

/// Cancellation metadata stamped together with the Cancelled status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cancellation {
    pub cancelled_by: Option<String>,
    pub reason: Option<String>,
    pub cancelled_at: DateTime<Utc>,
}

/// An offer applied when the order was placed, with the discount it contributed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedOffer {
    pub offer_id: OfferId,
    pub name: String,
    pub discount: Money,
    #[serde(default)]
    pub shipping_waived: bool,
}
