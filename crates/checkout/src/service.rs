//! Checkout service: turns a basket into a placed order.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use common::{Clock, Money, OfferId, OrderId, SystemClock, UserId};
use event_store::EventStore;
use orders::{AppliedOffer, Order, OrderService, PlaceOrder};
use promotions::{
    ApplicationRecorder, BasketLine, BenefitOutcome, Offer, OfferCatalog, OfferMatcher,
    OfferNotEligible, PromotionError, UnitGroup, UsageSnapshot, in_range,
};

use crate::config::{CheckoutConfig, StackingPolicy};
use crate::error::{CheckoutError, Result};
use crate::pricing::PricedBasket;

/// An order placed by checkout, with the token that grants guest access to it.
#[derive(Debug, Clone)]
pub struct PlacedOrder {
    pub order: Order,
    pub token: String,
}

/// An eligible offer and the benefit it would give on its own.
#[derive(Debug, Clone)]
pub struct PreviewedOffer {
    pub offer: Offer,
    pub benefit: BenefitOutcome,
}

/// What checkout would do with a basket right now.
#[derive(Debug, Clone)]
pub struct OfferPreview {
    /// Eligible offers in rank order.
    pub eligible: Vec<PreviewedOffer>,
    pub rejected: Vec<(Offer, OfferNotEligible)>,
    /// Offers the stacking policy would apply, with their contribution.
    pub applied: Vec<AppliedOffer>,
    pub subtotal: Money,
    pub total: Money,
    pub shipping_waived: bool,
}

/// Orchestrates order placement with offers.
///
/// Placement matches offers, prices the basket, records each offer's
/// application and persists the order. When persisting fails the recorded
/// applications are revoked before the error is returned.
pub struct CheckoutService<S, R, C>
where
    S: EventStore,
    R: ApplicationRecorder,
    C: OfferCatalog,
{
    orders: Arc<OrderService<S>>,
    recorder: R,
    catalog: C,
    clock: Arc<dyn Clock>,
    policy: StackingPolicy,
}

impl<S, R, C> CheckoutService<S, R, C>
where
    S: EventStore,
    R: ApplicationRecorder,
    C: OfferCatalog,
{
    /// Creates a checkout service applying only the best offer.
    pub fn new(orders: Arc<OrderService<S>>, recorder: R, catalog: C) -> Self {
        Self {
            orders,
            recorder,
            catalog,
            clock: Arc::new(SystemClock),
            policy: StackingPolicy::default(),
        }
    }

    /// Replaces the time source used for matching and usage records.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_policy(mut self, policy: StackingPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Applies the settings from a loaded configuration.
    pub fn with_config(self, config: &CheckoutConfig) -> Self {
        self.with_policy(config.stacking)
    }

    pub fn policy(&self) -> StackingPolicy {
        self.policy
    }

    pub fn orders(&self) -> &Arc<OrderService<S>> {
        &self.orders
    }

    pub fn recorder(&self) -> &R {
        &self.recorder
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    /// Places an order for a basket, applying eligible offers.
    ///
    /// An offer whose usage limit is taken by a concurrent checkout before
    /// its application is recorded is dropped and the remaining offers are
    /// selected again.
    #[tracing::instrument(
        skip(self, basket, voucher),
        fields(lines = basket.len(), policy = %self.policy)
    )]
    pub async fn place_order(
        &self,
        basket: &[BasketLine],
        user: Option<UserId>,
        voucher: Option<&str>,
    ) -> Result<PlacedOrder> {
        let started = Instant::now();
        let result = self.checkout(basket, user, voucher).await;
        metrics::histogram!("checkout_duration_seconds").record(started.elapsed().as_secs_f64());

        if let Err(e) = &result {
            if e.is_rejection() {
                tracing::info!(error = %e, "checkout rejected");
            } else {
                tracing::warn!(error = %e, "checkout failed");
            }
        }
        result
    }

    async fn checkout(
        &self,
        basket: &[BasketLine],
        user: Option<UserId>,
        voucher: Option<&str>,
    ) -> Result<PlacedOrder> {
        validate_basket(basket)?;
        let now = self.clock.now();
        let order_id = OrderId::new();

        let offers = self.catalog.offers().await?;
        let usage = UsageSnapshot::collect(&self.recorder, &offers, user.as_ref()).await?;
        let mut candidates = OfferMatcher::new(now)
            .for_user(user.as_ref())
            .with_voucher(voucher)
            .find_eligible(basket, &offers, &usage);

        let priced = loop {
            let priced = PricedBasket::with_policy(basket, self.policy, &candidates);
            match self
                .record_applications(priced.applied(), &candidates, user.as_ref(), order_id, now)
                .await
            {
                Ok(()) => break priced,
                Err(PromotionError::UsageLimitReached { offer_id }) => {
                    tracing::info!(%offer_id, "offer used up during checkout, selecting again");
                    candidates.retain(|offer| offer.id != offer_id);
                }
                Err(e) => return Err(e.into()),
            }
        };

        let applied_ids: Vec<OfferId> = priced.applied().iter().map(|a| a.offer_id).collect();
        let discount = priced.discount();
        let cmd = PlaceOrder::new(user, priced.order_lines())
            .with_order_id(order_id)
            .with_shipping_waived(priced.shipping_waived())
            .with_applied_offers(priced.into_applied());

        match self.orders.place_order(cmd).await {
            Ok(result) => {
                tracing::info!(
                    %order_id,
                    offers = applied_ids.len(),
                    %discount,
                    "checkout complete"
                );
                Ok(PlacedOrder {
                    token: self.orders.order_token(&order_id),
                    order: result.aggregate,
                })
            }
            Err(e) => {
                tracing::warn!(
                    %order_id,
                    error = %e,
                    "order placement failed, revoking offer applications"
                );
                self.revoke_applications(&applied_ids, order_id).await;
                Err(e.into())
            }
        }
    }

    /// Records every applied offer, undoing the records already made if one fails.
    async fn record_applications(
        &self,
        applied: &[AppliedOffer],
        candidates: &[&Offer],
        user: Option<&UserId>,
        order_id: OrderId,
        at: DateTime<Utc>,
    ) -> std::result::Result<(), PromotionError> {
        let mut recorded = Vec::with_capacity(applied.len());
        for entry in applied {
            let Some(offer) = candidates.iter().find(|offer| offer.id == entry.offer_id) else {
                continue;
            };
            if let Err(e) = self.recorder.record(offer, user, order_id, at).await {
                self.revoke_applications(&recorded, order_id).await;
                return Err(e);
            }
            recorded.push(offer.id);
        }
        Ok(())
    }

    async fn revoke_applications(&self, offer_ids: &[OfferId], order_id: OrderId) {
        for &offer_id in offer_ids {
            match self.recorder.revoke(offer_id, order_id).await {
                Ok(true) => tracing::debug!(%offer_id, %order_id, "offer application revoked"),
                Ok(false) => {}
                Err(e) => tracing::warn!(
                    %offer_id,
                    %order_id,
                    error = %e,
                    "failed to revoke offer application"
                ),
            }
        }
    }

    /// Eligible offers for a basket now, with their computed benefits.
    pub async fn preview_offers(
        &self,
        basket: &[BasketLine],
        user: Option<&UserId>,
        voucher: Option<&str>,
    ) -> Result<OfferPreview> {
        self.preview_offers_at(basket, user, voucher, self.clock.now())
            .await
    }

    /// Eligible offers for a basket at `now`, with their computed benefits.
    ///
    /// Nothing is recorded.
    #[tracing::instrument(skip(self, basket, voucher), fields(lines = basket.len()))]
    pub async fn preview_offers_at(
        &self,
        basket: &[BasketLine],
        user: Option<&UserId>,
        voucher: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<OfferPreview> {
        validate_basket(basket)?;
        let offers = self.catalog.offers().await?;
        let usage = UsageSnapshot::collect(&self.recorder, &offers, user).await?;
        let report = OfferMatcher::new(now)
            .for_user(user)
            .with_voucher(voucher)
            .report(basket, &offers, &usage);

        let eligible = report
            .eligible
            .iter()
            .map(|&offer| PreviewedOffer {
                offer: offer.clone(),
                benefit: offer.benefit.calculate(&unit_groups(offer, basket)),
            })
            .collect();
        let priced = PricedBasket::with_policy(basket, self.policy, &report.eligible);

        Ok(OfferPreview {
            eligible,
            rejected: report
                .rejected
                .into_iter()
                .map(|(offer, reason)| (offer.clone(), reason))
                .collect(),
            subtotal: priced.subtotal(),
            total: priced.total(),
            shipping_waived: priced.shipping_waived(),
            applied: priced.into_applied(),
        })
    }
}

fn unit_groups(offer: &Offer, basket: &[BasketLine]) -> Vec<UnitGroup> {
    in_range(&offer.range, basket)
        .map(|(line, item)| UnitGroup {
            line,
            product_id: item.product_id.clone(),
            unit_price: item.unit_price,
            quantity: item.quantity,
        })
        .collect()
}

fn validate_basket(basket: &[BasketLine]) -> Result<()> {
    if basket.is_empty() {
        return Err(CheckoutError::InvalidBasket("basket is empty".to_string()));
    }
    let mut total = Money::zero();
    for line in basket {
        if line.quantity == 0 {
            return Err(CheckoutError::InvalidBasket(format!(
                "line {} has zero quantity",
                line.product_id
            )));
        }
        if line.unit_price.is_negative() {
            return Err(CheckoutError::InvalidBasket(format!(
                "line {} has a negative price",
                line.product_id
            )));
        }
        total = line
            .unit_price
            .checked_times(line.quantity)
            .and_then(|value| total.checked_add(value))
            .ok_or_else(|| {
                CheckoutError::InvalidBasket(format!(
                    "line {} pushes the basket value out of range",
                    line.product_id
                ))
            })?;
    }
    Ok(())
}
