//! Applying offer benefits to a basket, one offer after another.
//!
//! A basket line is tracked as slices of units that share a per-unit
//! discount. Each offer sees the prices left by the offers before it and
//! splits slices when it discounts only some of their units.

use common::Money;
use orders::{AppliedOffer, OrderLine};
use promotions::{BasketLine, LineDiscount, Offer, UnitGroup};

use crate::config::StackingPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PriceSlice {
    /// Index of the basket line.
    line: usize,
    units: u32,
    /// Discount per unit accumulated so far.
    discount: Money,
}

/// A basket with the offers applied to it so far.
#[derive(Debug, Clone)]
pub struct PricedBasket<'b> {
    basket: &'b [BasketLine],
    slices: Vec<PriceSlice>,
    applied: Vec<AppliedOffer>,
}

impl<'b> PricedBasket<'b> {
    pub fn new(basket: &'b [BasketLine]) -> Self {
        let slices = basket
            .iter()
            .enumerate()
            .filter(|(_, line)| line.quantity > 0)
            .map(|(line, item)| PriceSlice {
                line,
                units: item.quantity,
                discount: Money::zero(),
            })
            .collect();
        Self {
            basket,
            slices,
            applied: Vec::new(),
        }
    }

    /// Prices `offers` in order.
    pub fn with_offers<'o>(
        basket: &'b [BasketLine],
        offers: impl IntoIterator<Item = &'o Offer>,
    ) -> Self {
        let mut priced = Self::new(basket);
        for offer in offers {
            priced.apply(offer);
        }
        priced
    }

    /// Prices eligible offers, already in rank order, under `policy`.
    ///
    /// Offers that would change nothing are passed over, so a lower-ranked
    /// offer still applies when a higher-ranked one has no effect.
    pub fn with_policy(
        basket: &'b [BasketLine],
        policy: StackingPolicy,
        eligible: &[&Offer],
    ) -> Self {
        let mut priced = Self::new(basket);
        for &offer in eligible {
            match policy {
                StackingPolicy::SingleBest => {
                    if priced.apply(offer).is_some() {
                        break;
                    }
                }
                StackingPolicy::StackByPriority => {
                    if offer.exclusive && !priced.applied.is_empty() {
                        break;
                    }
                    if priced.apply(offer).is_some() && offer.exclusive {
                        break;
                    }
                }
            }
        }
        priced
    }

    /// Applies one offer over the current prices.
    ///
    /// Returns None, leaving the basket untouched, when the offer has no
    /// effect left to give.
    pub fn apply(&mut self, offer: &Offer) -> Option<&AppliedOffer> {
        let groups: Vec<UnitGroup> = self
            .slices
            .iter()
            .enumerate()
            .filter(|(_, slice)| offer.range.matches(&self.basket[slice.line]))
            .map(|(index, slice)| {
                let item = &self.basket[slice.line];
                UnitGroup {
                    line: index,
                    product_id: item.product_id.clone(),
                    unit_price: item.unit_price.saturating_sub(slice.discount),
                    quantity: slice.units,
                }
            })
            .collect();

        let outcome = offer.benefit.calculate(&groups);
        if outcome.discount.is_zero() && !outcome.shipping_waived {
            tracing::debug!(offer_id = %offer.id, "offer has no effect on remaining prices");
            return None;
        }

        self.split(&outcome.allocations);
        self.applied.push(AppliedOffer {
            offer_id: offer.id,
            name: offer.name.clone(),
            discount: outcome.discount,
            shipping_waived: outcome.shipping_waived,
        });
        self.applied.last()
    }

    fn split(&mut self, allocations: &[LineDiscount]) {
        let mut slices = Vec::with_capacity(self.slices.len() + allocations.len());
        for (index, slice) in self.slices.iter().enumerate() {
            let mut left = slice.units;
            for allocation in allocations.iter().filter(|a| a.line == index) {
                let units = allocation.units.min(left);
                if units == 0 {
                    continue;
                }
                left -= units;
                slices.push(PriceSlice {
                    units,
                    discount: slice.discount + allocation.per_unit,
                    ..*slice
                });
            }
            if left > 0 {
                slices.push(PriceSlice {
                    units: left,
                    ..*slice
                });
            }
        }
        self.slices = slices;
    }

    /// Offers that took effect, in application order.
    pub fn applied(&self) -> &[AppliedOffer] {
        &self.applied
    }

    pub fn into_applied(self) -> Vec<AppliedOffer> {
        self.applied
    }

    /// Total discount granted by every applied offer.
    pub fn discount(&self) -> Money {
        self.applied.iter().map(|offer| offer.discount).sum()
    }

    pub fn shipping_waived(&self) -> bool {
        self.applied.iter().any(|offer| offer.shipping_waived)
    }

    /// Basket value before any offer.
    pub fn subtotal(&self) -> Money {
        self.basket.iter().map(BasketLine::line_value).sum()
    }

    /// Basket value after every applied offer.
    pub fn total(&self) -> Money {
        self.subtotal() - self.discount()
    }

    /// Order lines carrying the per-unit discounts.
    ///
    /// A basket line becomes several order lines when its units ended up with
    /// different discounts.
    pub fn order_lines(&self) -> Vec<OrderLine> {
        let mut lines: Vec<OrderLine> = Vec::with_capacity(self.slices.len());
        let mut previous: Option<(usize, Money)> = None;
        for slice in &self.slices {
            if previous == Some((slice.line, slice.discount))
                && let Some(last) = lines.last_mut()
            {
                last.quantity += slice.units;
                continue;
            }
            let item = &self.basket[slice.line];
            lines.push(
                OrderLine::new(
                    item.product_id.clone(),
                    item.name.clone(),
                    slice.units,
                    item.unit_price,
                )
                .with_discount(slice.discount),
            );
            previous = Some((slice.line, slice.discount));
        }
        lines
    }
}
