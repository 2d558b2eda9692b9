//! Typed predicates for listing orders.

use chrono::NaiveDate;
use common::UserId;

use crate::aggregate::Aggregate;

use super::{Order, OrderStatus, PaymentStatus};

/// Conjunction of optional predicates. An empty filter matches every order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderFilter {
    /// Case-insensitive substring of the order id or the user id.
    pub query: Option<String>,
    pub status: Option<OrderStatus>,
    pub user_id: Option<UserId>,
    pub payment_status: Option<PaymentStatus>,
    /// UTC calendar day the order was placed on.
    pub placed_on: Option<NaiveDate>,
}

impl OrderFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn status(mut self, status: OrderStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn user(mut self, user_id: UserId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn payment_status(mut self, status: PaymentStatus) -> Self {
        self.payment_status = Some(status);
        self
    }

    pub fn placed_on(mut self, day: NaiveDate) -> Self {
        self.placed_on = Some(day);
        self
    }

    pub fn matches(&self, order: &Order) -> bool {
        self.status.is_none_or(|status| order.status() == status)
            && self
                .user_id
                .as_ref()
                .is_none_or(|user| order.user_id() == Some(user))
            && self
                .payment_status
                .is_none_or(|status| order.payment_status() == status)
            && self.placed_on.is_none_or(|day| {
                order
                    .placed_at()
                    .is_some_and(|placed| placed.date_naive() == day)
            })
            && self
                .query
                .as_deref()
                .is_none_or(|query| matches_text(order, query))
    }
}

fn matches_text(order: &Order, query: &str) -> bool {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return true;
    }
    let id_hit = order
        .id()
        .is_some_and(|id| id.to_string().contains(&needle));
    let user_hit = order
        .user_id()
        .is_some_and(|user| user.as_str().to_lowercase().contains(&needle));
    id_hit || user_hit
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::{OrderLine, PlaceOrder};
    use chrono::{TimeZone, Utc};
    use common::Money;

    fn order_for(user: Option<&str>) -> Order {
        let mut order = Order::default();
        let cmd = PlaceOrder::new(
            user.map(UserId::new),
            vec![OrderLine::new("A", "A", 1, Money::from_cents(100))],
        );
        let placed_at = Utc.with_ymd_and_hms(2026, 3, 14, 9, 30, 0).unwrap();
        let events = order.place(&cmd, placed_at).unwrap();
        order.apply_events(events);
        order
    }

    #[test]
    fn empty_filter_matches_everything() {
        assert!(OrderFilter::new().matches(&order_for(None)));
    }

    #[test]
    fn predicates_are_conjunctive() {
        let order = order_for(Some("Alice"));

        assert!(OrderFilter::new()
            .status(OrderStatus::Pending)
            .user(UserId::new("Alice"))
            .matches(&order));
        assert!(!OrderFilter::new()
            .status(OrderStatus::Pending)
            .user(UserId::new("bob"))
            .matches(&order));
        assert!(!OrderFilter::new()
            .payment_status(PaymentStatus::Paid)
            .matches(&order));
    }

    #[test]
    fn free_text_matches_user_or_order_id() {
        let order = order_for(Some("Alice"));
        let id_prefix: String = order.id().unwrap().to_string().chars().take(8).collect();

        assert!(OrderFilter::new().query("ali").matches(&order));
        assert!(OrderFilter::new().query(id_prefix).matches(&order));
        assert!(!OrderFilter::new().query("carol").matches(&order));
        assert!(!OrderFilter::new().query("carol").matches(&order_for(None)));
    }

    #[test]
    fn placed_on_compares_utc_day() {
        let order = order_for(None);
        let day = NaiveDate::from_ymd_opt(2026, 3, 14).unwrap();

        assert!(OrderFilter::new().placed_on(day).matches(&order));
        assert!(!OrderFilter::new()
            .placed_on(day.succ_opt().unwrap())
            .matches(&order));
    }
}
