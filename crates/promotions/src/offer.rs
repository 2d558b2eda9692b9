//! Offer definitions.

use chrono::{DateTime, Utc};
use common::{OfferId, UserId};
use serde::{Deserialize, Serialize};

use crate::benefit::OfferBenefit;
use crate::condition::OfferCondition;
use crate::range::OfferRange;

/// Who may use an offer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "type")]
pub enum OfferScope {
    /// Everyone.
    #[default]
    Site,
    /// Callers presenting exactly this code.
    Voucher { code: String },
    /// One user.
    User { user_id: UserId },
}

/// Activation window. Both ends are inclusive; a missing end is unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ActiveWindow {
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
}

impl ActiveWindow {
    pub fn always() -> Self {
        Self::default()
    }

    pub fn between(starts_at: DateTime<Utc>, ends_at: DateTime<Utc>) -> Self {
        Self {
            starts_at: Some(starts_at),
            ends_at: Some(ends_at),
        }
    }

    pub fn has_started(&self, now: DateTime<Utc>) -> bool {
        self.starts_at.is_none_or(|start| start <= now)
    }

    pub fn has_ended(&self, now: DateTime<Utc>) -> bool {
        self.ends_at.is_some_and(|end| now > end)
    }

    pub fn contains(&self, now: DateTime<Utc>) -> bool {
        self.has_started(now) && !self.has_ended(now)
    }
}

/// Usage limits. `None` means unlimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct UsageLimits {
    pub per_user: Option<u32>,
    pub total: Option<u32>,
}

/// A promotional offer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Offer {
    pub id: OfferId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub scope: OfferScope,
    pub range: OfferRange,
    pub condition: OfferCondition,
    pub benefit: OfferBenefit,
    pub is_active: bool,
    #[serde(default)]
    pub is_featured: bool,
    /// Applied alone; ends a stack when it is not first.
    #[serde(default)]
    pub exclusive: bool,
    /// Higher is preferred.
    pub priority: i32,
    #[serde(default)]
    pub window: ActiveWindow,
    #[serde(default)]
    pub limits: UsageLimits,
}

impl Offer {
    /// Creates an active, site-wide offer with no window or limits.
    pub fn new(
        name: impl Into<String>,
        range: OfferRange,
        condition: OfferCondition,
        benefit: OfferBenefit,
    ) -> Self {
        Self {
            id: OfferId::new(),
            name: name.into(),
            description: String::new(),
            scope: OfferScope::Site,
            range,
            condition,
            benefit,
            is_active: true,
            is_featured: false,
            exclusive: false,
            priority: 0,
            window: ActiveWindow::always(),
            limits: UsageLimits::default(),
        }
    }

    pub fn with_id(mut self, id: OfferId) -> Self {
        self.id = id;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_voucher(mut self, code: impl Into<String>) -> Self {
        self.scope = OfferScope::Voucher { code: code.into() };
        self
    }

    pub fn for_user(mut self, user_id: UserId) -> Self {
        self.scope = OfferScope::User { user_id };
        self
    }

    pub fn with_window(mut self, window: ActiveWindow) -> Self {
        self.window = window;
        self
    }

    pub fn with_limit_per_user(mut self, limit: u32) -> Self {
        self.limits.per_user = Some(limit);
        self
    }

    pub fn with_limit_total(mut self, limit: u32) -> Self {
        self.limits.total = Some(limit);
        self
    }

    pub fn exclusive(mut self) -> Self {
        self.exclusive = true;
        self
    }

    pub fn featured(mut self) -> Self {
        self.is_featured = true;
        self
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }

    /// Ordering used everywhere offers are ranked: priority descending, then id ascending.
    pub fn rank_cmp(&self, other: &Offer) -> std::cmp::Ordering {
        other
            .priority
            .cmp(&self.priority)
            .then_with(|| self.id.cmp(&other.id))
    }
}
