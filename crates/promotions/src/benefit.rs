//! Monetary and shipping effects of an offer.
//!
//! Units are visited in a fixed order: ascending unit price, then ascending
//! product id, then caller line index. Caps on affected units therefore hit
//! the cheapest units first. Every outcome carries a per-line allocation whose
//! sum equals the discount to the cent.

use common::{Money, ProductId};
use rust_decimal::{Decimal, RoundingStrategy, prelude::ToPrimitive};
use serde::{Deserialize, Serialize};

/// What an offer grants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum BenefitKind {
    /// Fixed amount off the in-range subtotal.
    FixedAmount(Money),
    /// Percentage off, e.g. `10` for 10%.
    Percentage(Decimal),
    /// No monetary discount; shipping is waived.
    FreeShipping,
    /// Each affected unit costs this much.
    FixedPrice(Money),
}

/// An offer's benefit with its optional cap on affected units.
///
/// The cap applies to percentage and fixed-price benefits. A fixed amount is
/// taken off the whole in-range subtotal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferBenefit {
    pub kind: BenefitKind,
    #[serde(default)]
    pub max_affected_items: Option<u32>,
}

/// Units of one line at one price, as seen by the calculator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitGroup {
    /// Caller-defined line index, echoed back in allocations.
    pub line: usize,
    pub product_id: ProductId,
    /// Current price per unit, after any earlier discounts.
    pub unit_price: Money,
    pub quantity: u32,
}

/// Discount assigned to some units of one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineDiscount {
    pub line: usize,
    pub units: u32,
    pub per_unit: Money,
}

impl LineDiscount {
    pub fn amount(&self) -> Money {
        self.per_unit.times(self.units)
    }
}

/// Result of applying a benefit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BenefitOutcome {
    pub discount: Money,
    pub shipping_waived: bool,
    pub allocations: Vec<LineDiscount>,
}

impl OfferBenefit {
    pub fn fixed_amount(amount: Money) -> Self {
        Self::uncapped(BenefitKind::FixedAmount(amount))
    }

    pub fn percentage(percent: impl Into<Decimal>) -> Self {
        Self::uncapped(BenefitKind::Percentage(percent.into()))
    }

    pub fn free_shipping() -> Self {
        Self::uncapped(BenefitKind::FreeShipping)
    }

    pub fn fixed_price(price: Money) -> Self {
        Self::uncapped(BenefitKind::FixedPrice(price))
    }

    pub fn with_max_affected_items(mut self, cap: u32) -> Self {
        self.max_affected_items = Some(cap);
        self
    }

    fn uncapped(kind: BenefitKind) -> Self {
        Self {
            kind,
            max_affected_items: None,
        }
    }

    /// Computes the benefit over the in-range units.
    ///
    /// The discount is never negative and never exceeds the price of the
    /// units it touches.
    pub fn calculate(&self, groups: &[UnitGroup]) -> BenefitOutcome {
        let ordered = ordered(groups);

        match self.kind {
            BenefitKind::FreeShipping => BenefitOutcome {
                shipping_waived: true,
                ..BenefitOutcome::default()
            },
            BenefitKind::FixedAmount(amount) => {
                let slices = take_units(&ordered, None);
                let discount = amount.max(Money::zero()).min(subtotal(&slices));
                allocated(discount, &slices)
            }
            BenefitKind::Percentage(percent) => {
                let slices = take_units(&ordered, self.max_affected_items);
                let base = subtotal(&slices);
                let discount = percent_of(base, percent).max(Money::zero()).min(base);
                allocated(discount, &slices)
            }
            BenefitKind::FixedPrice(price) => {
                let price = price.max(Money::zero());
                let allocations: Vec<LineDiscount> = take_units(&ordered, self.max_affected_items)
                    .into_iter()
                    .map(|slice| LineDiscount {
                        line: slice.line,
                        units: slice.units,
                        per_unit: slice.unit_price.saturating_sub(price),
                    })
                    .filter(|allocation| allocation.per_unit.is_positive())
                    .collect();
                BenefitOutcome {
                    discount: allocations.iter().map(LineDiscount::amount).sum(),
                    shipping_waived: false,
                    allocations,
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Slice {
    line: usize,
    unit_price: Money,
    units: u32,
}

fn ordered(groups: &[UnitGroup]) -> Vec<&UnitGroup> {
    let mut ordered: Vec<&UnitGroup> = groups.iter().filter(|g| g.quantity > 0).collect();
    ordered.sort_by(|a, b| {
        a.unit_price
            .cmp(&b.unit_price)
            .then_with(|| a.product_id.cmp(&b.product_id))
            .then_with(|| a.line.cmp(&b.line))
    });
    ordered
}

/// The first `cap` units in visiting order, or all of them.
fn take_units(ordered: &[&UnitGroup], cap: Option<u32>) -> Vec<Slice> {
    let mut left = cap.unwrap_or(u32::MAX);
    let mut slices = Vec::new();
    for group in ordered {
        if left == 0 {
            break;
        }
        let units = group.quantity.min(left);
        left -= units;
        slices.push(Slice {
            line: group.line,
            unit_price: group.unit_price,
            units,
        });
    }
    slices
}

fn subtotal(slices: &[Slice]) -> Money {
    slices.iter().map(|s| s.unit_price.times(s.units)).sum()
}

/// `base * percent / 100`, rounded half away from zero to the cent.
fn percent_of(base: Money, percent: Decimal) -> Money {
    Decimal::from(base.cents())
        .checked_mul(percent)
        .and_then(|scaled| scaled.checked_div(Decimal::ONE_HUNDRED))
        .map(|value| value.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero))
        .and_then(|value| value.to_i64())
        .map(Money::from_cents)
        .unwrap_or(base)
}

fn allocated(discount: Money, slices: &[Slice]) -> BenefitOutcome {
    BenefitOutcome {
        discount,
        shipping_waived: false,
        allocations: allocate(discount, slices),
    }
}

/// Splits `discount` over the units in proportion to their price.
///
/// Each unit first receives the floor of its share; the cents left over go one
/// per unit in visiting order to units that still have room. Requires
/// `0 <= discount <= subtotal(slices)`.
fn allocate(discount: Money, slices: &[Slice]) -> Vec<LineDiscount> {
    let base: i128 = slices
        .iter()
        .map(|s| i128::from(s.unit_price.cents()) * i128::from(s.units))
        .sum();
    let total = i128::from(discount.cents());
    if total <= 0 || base <= 0 {
        return Vec::new();
    }

    let shares: Vec<i128> = slices
        .iter()
        .map(|s| total * i128::from(s.unit_price.cents()) / base)
        .collect();
    let mut remainder = total
        - slices
            .iter()
            .zip(&shares)
            .map(|(s, share)| share * i128::from(s.units))
            .sum::<i128>();

    let mut allocations = Vec::new();
    for (slice, &share) in slices.iter().zip(&shares) {
        let has_room = share < i128::from(slice.unit_price.cents());
        let bumped = if has_room {
            remainder.min(i128::from(slice.units))
        } else {
            0
        };
        remainder -= bumped;
        // bumped <= slice.units, so both casts are lossless.
        let bumped = bumped as u32;
        let share = share as i64;

        if bumped > 0 {
            allocations.push(LineDiscount {
                line: slice.line,
                units: bumped,
                per_unit: Money::from_cents(share + 1),
            });
        }
        if slice.units > bumped && share > 0 {
            allocations.push(LineDiscount {
                line: slice.line,
                units: slice.units - bumped,
                per_unit: Money::from_cents(share),
            });
        }
    }
    allocations
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(line: usize, product: &str, cents: i64, quantity: u32) -> UnitGroup {
        UnitGroup {
            line,
            product_id: ProductId::new(product),
            unit_price: Money::from_cents(cents),
            quantity,
        }
    }

    fn allocated_sum(outcome: &BenefitOutcome) -> Money {
        outcome.allocations.iter().map(LineDiscount::amount).sum()
    }

    #[test]
    fn ten_percent_of_thirty() {
        let outcome = OfferBenefit::percentage(10).calculate(&[group(0, "A", 1000, 3)]);

        assert_eq!(outcome.discount, Money::from_cents(300));
        assert_eq!(
            outcome.allocations,
            vec![LineDiscount {
                line: 0,
                units: 3,
                per_unit: Money::from_cents(100)
            }]
        );
    }

    #[test]
    fn fixed_price_with_cap_hits_cheapest_units() {
        let benefit = OfferBenefit::fixed_price(Money::from_cents(500)).with_max_affected_items(2);
        let outcome = benefit.calculate(&[
            group(0, "eight", 800, 1),
            group(1, "six", 600, 1),
            group(2, "nine", 900, 1),
        ]);

        assert_eq!(outcome.discount, Money::from_cents(400));
        assert_eq!(outcome.allocations.len(), 2);
        assert_eq!(outcome.allocations[0].line, 1);
        assert_eq!(outcome.allocations[0].per_unit, Money::from_cents(100));
        assert_eq!(outcome.allocations[1].line, 0);
        assert_eq!(outcome.allocations[1].per_unit, Money::from_cents(300));
        assert!(outcome.allocations.iter().all(|a| a.line != 2));
    }

    #[test]
    fn fixed_price_above_unit_price_is_floored_at_zero() {
        let outcome = OfferBenefit::fixed_price(Money::from_cents(700))
            .calculate(&[group(0, "A", 500, 2), group(1, "B", 900, 1)]);

        assert_eq!(outcome.discount, Money::from_cents(200));
        assert_eq!(outcome.allocations.len(), 1);
    }

    #[test]
    fn percentage_cap_excludes_units_beyond_it() {
        let benefit = OfferBenefit::percentage(50).with_max_affected_items(1);
        let outcome = benefit.calculate(&[group(0, "A", 1000, 1), group(1, "B", 600, 2)]);

        assert_eq!(outcome.discount, Money::from_cents(300));
        assert_eq!(outcome.allocations[0].line, 1);
        assert_eq!(outcome.allocations[0].units, 1);
    }

    #[test]
    fn percentage_rounds_half_away_from_zero() {
        let outcome = OfferBenefit::percentage(50).calculate(&[group(0, "A", 5, 1)]);
        assert_eq!(outcome.discount, Money::from_cents(3));

        let outcome = OfferBenefit::percentage(Decimal::new(125, 1)).calculate(&[group(0, "A", 1001, 1)]);
        // 12.5% of 10.01 = 1.25125
        assert_eq!(outcome.discount, Money::from_cents(125));
    }

    #[test]
    fn percentage_never_exceeds_base() {
        let outcome = OfferBenefit::percentage(150).calculate(&[group(0, "A", 400, 2)]);
        assert_eq!(outcome.discount, Money::from_cents(800));

        let outcome = OfferBenefit::percentage(-10).calculate(&[group(0, "A", 400, 2)]);
        assert_eq!(outcome.discount, Money::zero());
        assert!(outcome.allocations.is_empty());
    }

    #[test]
    fn fixed_amount_is_capped_by_subtotal() {
        let outcome = OfferBenefit::fixed_amount(Money::from_units(50))
            .calculate(&[group(0, "A", 1200, 2)]);
        assert_eq!(outcome.discount, Money::from_cents(2400));
        assert_eq!(allocated_sum(&outcome), outcome.discount);
    }

    #[test]
    fn fixed_amount_ignores_unit_cap() {
        let outcome = OfferBenefit::fixed_amount(Money::from_cents(1500))
            .with_max_affected_items(1)
            .calculate(&[group(0, "A", 1000, 2)]);
        assert_eq!(outcome.discount, Money::from_cents(1500));
    }

    #[test]
    fn fixed_amount_remainder_goes_to_first_units() {
        let outcome = OfferBenefit::fixed_amount(Money::from_cents(1000))
            .calculate(&[group(0, "A", 1000, 3)]);

        assert_eq!(
            outcome.allocations,
            vec![
                LineDiscount {
                    line: 0,
                    units: 1,
                    per_unit: Money::from_cents(334)
                },
                LineDiscount {
                    line: 0,
                    units: 2,
                    per_unit: Money::from_cents(333)
                },
            ]
        );
    }

    #[test]
    fn allocations_always_sum_to_discount() {
        let groups = [
            group(0, "A", 333, 7),
            group(1, "B", 1999, 1),
            group(2, "C", 0, 4),
            group(3, "D", 1, 13),
            group(4, "E", 750, 2),
        ];
        for cents in [1, 7, 99, 1000, 2999, 5000, 6593] {
            let outcome = OfferBenefit::fixed_amount(Money::from_cents(cents)).calculate(&groups);
            assert_eq!(allocated_sum(&outcome), outcome.discount, "fixed {cents}");
            for allocation in &outcome.allocations {
                let price = groups[allocation.line].unit_price;
                assert!(allocation.per_unit <= price);
            }
        }
        for percent in [1, 13, 33, 50, 99, 100] {
            let outcome = OfferBenefit::percentage(percent).calculate(&groups);
            assert_eq!(allocated_sum(&outcome), outcome.discount, "percent {percent}");
        }
    }

    #[test]
    fn free_shipping_sets_flag_only() {
        let outcome = OfferBenefit::free_shipping().calculate(&[group(0, "A", 1000, 1)]);
        assert!(outcome.shipping_waived);
        assert_eq!(outcome.discount, Money::zero());
        assert!(outcome.allocations.is_empty());
    }

    #[test]
    fn ties_break_on_product_id() {
        let outcome = OfferBenefit::percentage(100)
            .with_max_affected_items(1)
            .calculate(&[group(0, "zeta", 500, 1), group(1, "alpha", 500, 1)]);
        assert_eq!(outcome.allocations[0].line, 1);
    }
}
