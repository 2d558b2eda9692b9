//! Basket thresholds that activate an offer.

use std::collections::BTreeSet;

use common::Money;
use serde::{Deserialize, Serialize};

use crate::basket::BasketLine;

/// Threshold a basket must reach, measured over the lines in the offer's range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum OfferCondition {
    /// Sum of quantities is at least this many.
    BasketItems(u32),
    /// Sum of `unit_price * quantity` is at least this much.
    BasketValue(Money),
    /// Number of distinct products is at least this many.
    DistinctItems(u32),
}

impl OfferCondition {
    /// Returns true if the in-range lines satisfy the threshold.
    pub fn satisfied_by<'a>(&self, lines: impl IntoIterator<Item = &'a BasketLine>) -> bool {
        let lines = lines.into_iter();
        match *self {
            OfferCondition::BasketItems(threshold) => {
                let count: u64 = lines.map(|line| u64::from(line.quantity)).sum();
                count >= u64::from(threshold)
            }
            OfferCondition::BasketValue(threshold) => {
                lines.map(BasketLine::line_value).sum::<Money>() >= threshold
            }
            OfferCondition::DistinctItems(threshold) => {
                let distinct: BTreeSet<_> = lines
                    .filter(|line| line.quantity > 0)
                    .map(|line| &line.product_id)
                    .collect();
                distinct.len() >= threshold as usize
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines() -> Vec<BasketLine> {
        vec![
            BasketLine::new("A", Money::from_units(10), 3),
            BasketLine::new("B", Money::from_units(4), 1),
            BasketLine::new("A", Money::from_units(10), 1),
        ]
    }

    #[test]
    fn basket_items_counts_quantities() {
        assert!(OfferCondition::BasketItems(5).satisfied_by(&lines()));
        assert!(!OfferCondition::BasketItems(6).satisfied_by(&lines()));
    }

    #[test]
    fn basket_value_is_inclusive() {
        assert!(OfferCondition::BasketValue(Money::from_units(44)).satisfied_by(&lines()));
        assert!(!OfferCondition::BasketValue(Money::from_cents(4401)).satisfied_by(&lines()));
    }

    #[test]
    fn distinct_items_counts_products_once() {
        assert!(OfferCondition::DistinctItems(2).satisfied_by(&lines()));
        assert!(!OfferCondition::DistinctItems(3).satisfied_by(&lines()));
    }

    #[test]
    fn thirty_meets_twenty_five_threshold() {
        let basket = [BasketLine::new("A", Money::from_units(10), 3)];
        assert!(OfferCondition::BasketValue(Money::from_units(25)).satisfied_by(&basket));
    }

    #[test]
    fn empty_basket_only_meets_zero_thresholds() {
        assert!(OfferCondition::BasketItems(0).satisfied_by(&Vec::<BasketLine>::new()));
        assert!(!OfferCondition::BasketItems(1).satisfied_by(&Vec::<BasketLine>::new()));
    }
}
