//! Order total derivation.
//!
//! Totals are never stored as ground truth; they are recomputed from the
//! current lines every time an order is replayed or inspected.

use common::Money;
use serde::{Deserialize, Serialize};

use super::OrderLine;

/// The parts of an order total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TotalBreakdown {
    /// Sum of open lines at their discounted unit price.
    pub subtotal: Money,

    /// Order-level discount.
    pub discount: Money,

    pub tax: Money,

    /// `subtotal - discount + tax`.
    pub total: Money,
}

/// Computes the total of an order from its lines and order-level adjustments.
///
/// Cancelled lines are skipped.
pub fn calculate(lines: &[OrderLine], discount: Money, tax: Money) -> TotalBreakdown {
    let subtotal: Money = lines
        .iter()
        .filter(|line| !line.is_cancelled())
        .map(OrderLine::line_total)
        .sum();

    TotalBreakdown {
        subtotal,
        discount,
        tax,
        total: subtotal - discount + tax,
    }
}
