//! Offer eligibility over a basket.
//!
//! Matching is pure: usage counts are read up front into a [`UsageSnapshot`]
//! and the final limit check happens again, atomically, when an application
//! is recorded.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use common::{OfferId, UserId};

use crate::basket::BasketLine;
use crate::error::{OfferNotEligible, Result};
use crate::offer::{Offer, OfferScope};
use crate::range::OfferRange;
use crate::recorder::ApplicationRecorder;

/// How often an offer has been used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OfferUsage {
    /// Applications by everyone.
    pub total: u32,
    /// Applications by the acting user; zero for guests.
    pub by_user: u32,
}

/// Usage counts for a set of offers, read before matching.
#[derive(Debug, Clone, Default)]
pub struct UsageSnapshot {
    usage: HashMap<OfferId, OfferUsage>,
}

impl UsageSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads the usage of every offer from a recorder.
    pub async fn collect<R>(recorder: &R, offers: &[Offer], user: Option<&UserId>) -> Result<Self>
    where
        R: ApplicationRecorder + ?Sized,
    {
        let mut snapshot = Self::new();
        for offer in offers {
            snapshot.insert(offer.id, recorder.usage(offer.id, user).await?);
        }
        Ok(snapshot)
    }

    pub fn insert(&mut self, offer_id: OfferId, usage: OfferUsage) {
        self.usage.insert(offer_id, usage);
    }

    /// Usage of an offer; unseen offers count as unused.
    pub fn get(&self, offer_id: OfferId) -> OfferUsage {
        self.usage.get(&offer_id).copied().unwrap_or_default()
    }
}

/// Eligible offers in rank order, plus the reason each other offer was rejected.
#[derive(Debug, Clone, Default)]
pub struct MatchReport<'o> {
    pub eligible: Vec<&'o Offer>,
    pub rejected: Vec<(&'o Offer, OfferNotEligible)>,
}

/// Checks offers against a basket for one caller at one instant.
#[derive(Debug, Clone, Copy)]
pub struct OfferMatcher<'a> {
    now: DateTime<Utc>,
    user: Option<&'a UserId>,
    voucher: Option<&'a str>,
}

impl<'a> OfferMatcher<'a> {
    /// A guest caller with no voucher.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now,
            user: None,
            voucher: None,
        }
    }

    pub fn for_user(mut self, user: Option<&'a UserId>) -> Self {
        self.user = user;
        self
    }

    pub fn with_voucher(mut self, voucher: Option<&'a str>) -> Self {
        self.voucher = voucher;
        self
    }

    /// Runs every check for one offer, returning the first failing reason.
    ///
    /// Checks run in this order: active flag and window, scope, range,
    /// condition, usage limits.
    pub fn evaluate(
        &self,
        offer: &Offer,
        basket: &[BasketLine],
        usage: OfferUsage,
    ) -> std::result::Result<(), OfferNotEligible> {
        if !offer.is_active {
            return Err(OfferNotEligible::Inactive);
        }
        if !offer.window.has_started(self.now) {
            return Err(OfferNotEligible::NotYetActive);
        }
        if offer.window.has_ended(self.now) {
            return Err(OfferNotEligible::Expired);
        }

        self.check_scope(offer)?;

        let lines: Vec<&BasketLine> = in_range(&offer.range, basket).map(|(_, l)| l).collect();
        if lines.is_empty() {
            return Err(OfferNotEligible::RangeMismatch);
        }
        if !offer.condition.satisfied_by(lines) {
            return Err(OfferNotEligible::ConditionUnmet);
        }

        if offer.limits.total.is_some_and(|limit| usage.total >= limit) {
            return Err(OfferNotEligible::LimitExceeded);
        }
        if offer
            .limits
            .per_user
            .is_some_and(|limit| usage.by_user >= limit)
        {
            return Err(OfferNotEligible::LimitExceeded);
        }

        Ok(())
    }

    /// Eligible offers, priority descending then id ascending.
    pub fn find_eligible<'o>(
        &self,
        basket: &[BasketLine],
        offers: &'o [Offer],
        usage: &UsageSnapshot,
    ) -> Vec<&'o Offer> {
        self.report(basket, offers, usage).eligible
    }

    /// Like [`find_eligible`](Self::find_eligible), keeping the rejections.
    pub fn report<'o>(
        &self,
        basket: &[BasketLine],
        offers: &'o [Offer],
        usage: &UsageSnapshot,
    ) -> MatchReport<'o> {
        let mut report = MatchReport::default();
        for offer in offers {
            match self.evaluate(offer, basket, usage.get(offer.id)) {
                Ok(()) => report.eligible.push(offer),
                Err(reason) => {
                    tracing::debug!(offer_id = %offer.id, %reason, "offer rejected");
                    report.rejected.push((offer, reason));
                }
            }
        }
        report.eligible.sort_by(|a, b| a.rank_cmp(b));
        report
    }

    fn check_scope(&self, offer: &Offer) -> std::result::Result<(), OfferNotEligible> {
        match &offer.scope {
            OfferScope::Site => {}
            OfferScope::Voucher { code } => {
                if self.voucher != Some(code.as_str()) {
                    return Err(OfferNotEligible::VoucherMismatch);
                }
            }
            OfferScope::User { user_id } => {
                if self.user != Some(user_id) {
                    return Err(OfferNotEligible::ScopeMismatch);
                }
            }
        }
        // Per-user limits cannot be tracked for guests.
        if offer.limits.per_user.is_some() && self.user.is_none() {
            return Err(OfferNotEligible::ScopeMismatch);
        }
        Ok(())
    }
}

/// Basket lines in a range, with their basket index.
pub fn in_range<'b>(
    range: &'b OfferRange,
    basket: &'b [BasketLine],
) -> impl Iterator<Item = (usize, &'b BasketLine)> + 'b {
    basket
        .iter()
        .enumerate()
        .filter(move |(_, line)| range.matches(line))
}
