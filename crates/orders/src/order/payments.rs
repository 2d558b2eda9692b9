//! Payment ledger: append-only payment events and the status derived from them.

use chrono::{DateTime, Utc};
use common::Money;
use serde::{Deserialize, Serialize};

use super::OrderError;

/// Kind of money movement recorded against an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentKind {
    PaymentReceived,
    RefundIssued,
}

impl PaymentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentKind::PaymentReceived => "payment_received",
            PaymentKind::RefundIssued => "refund_issued",
        }
    }
}

/// One immutable ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentEvent {
    pub kind: PaymentKind,
    pub amount: Money,
    pub recorded_at: DateTime<Utc>,
}

/// Payment status derived from the whole ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum PaymentStatus {
    #[default]
    Pending,
    PartiallyPaid,
    Paid,
    PartiallyRefunded,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "Pending",
            PaymentStatus::PartiallyPaid => "PartiallyPaid",
            PaymentStatus::Paid => "Paid",
            PaymentStatus::PartiallyRefunded => "PartiallyRefunded",
            PaymentStatus::Refunded => "Refunded",
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Running sums over a ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PaymentBalance {
    pub received: Money,
    pub refunded: Money,
    pub has_refund: bool,
}

impl PaymentBalance {
    /// Folds a ledger in order.
    pub fn from_events<'a>(events: impl IntoIterator<Item = &'a PaymentEvent>) -> Self {
        events
            .into_iter()
            .fold(PaymentBalance::default(), |mut balance, event| {
                match event.kind {
                    PaymentKind::PaymentReceived => balance.received += event.amount,
                    PaymentKind::RefundIssued => {
                        balance.refunded += event.amount;
                        balance.has_refund = true;
                    }
                }
                balance
            })
    }

    /// Amount paid minus amount refunded.
    pub fn net(&self) -> Money {
        self.received - self.refunded
    }

    /// Derives the status against the order total.
    pub fn status(&self, order_total: Money) -> PaymentStatus {
        let net = self.net();
        if self.has_refund {
            if net.is_positive() {
                PaymentStatus::PartiallyRefunded
            } else {
                PaymentStatus::Refunded
            }
        } else if net.is_zero() {
            PaymentStatus::Pending
        } else if net >= order_total {
            PaymentStatus::Paid
        } else {
            PaymentStatus::PartiallyPaid
        }
    }

    /// Checks that a new entry keeps the ledger consistent.
    pub fn check(&self, kind: PaymentKind, amount: Money) -> Result<(), OrderError> {
        if !amount.is_positive() {
            return Err(OrderError::InvalidPaymentAmount {
                amount: amount.cents(),
            });
        }
        if kind == PaymentKind::RefundIssued && amount > self.net() {
            return Err(OrderError::RefundExceedsBalance {
                requested: amount,
                available: self.net(),
            });
        }
        Ok(())
    }
}

/// Payment status of a ledger against an order total.
pub fn payment_status(events: &[PaymentEvent], order_total: Money) -> PaymentStatus {
    PaymentBalance::from_events(events).status(order_total)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(kind: PaymentKind, cents: i64) -> PaymentEvent {
        PaymentEvent {
            kind,
            amount: Money::from_cents(cents),
            recorded_at: Utc::now(),
        }
    }

    fn paid(cents: i64) -> PaymentEvent {
        event(PaymentKind::PaymentReceived, cents)
    }

    fn refund(cents: i64) -> PaymentEvent {
        event(PaymentKind::RefundIssued, cents)
    }

    const TOTAL: Money = Money::from_cents(2700);

    #[test]
    fn no_events_is_pending() {
        assert_eq!(payment_status(&[], TOTAL), PaymentStatus::Pending);
    }

    #[test]
    fn full_payment_is_paid() {
        assert_eq!(payment_status(&[paid(2700)], TOTAL), PaymentStatus::Paid);
        assert_eq!(
            payment_status(&[paid(1000), paid(1700)], TOTAL),
            PaymentStatus::Paid
        );
    }

    #[test]
    fn partial_payment_is_partially_paid() {
        assert_eq!(
            payment_status(&[paid(1000)], TOTAL),
            PaymentStatus::PartiallyPaid
        );
    }

    #[test]
    fn partial_refund_keeps_remaining_balance_visible() {
        let ledger = [paid(2700), refund(700)];
        assert_eq!(
            payment_status(&ledger, TOTAL),
            PaymentStatus::PartiallyRefunded
        );
        assert_eq!(
            PaymentBalance::from_events(&ledger).net(),
            Money::from_cents(2000)
        );
    }

    #[test]
    fn full_refund_is_refunded() {
        assert_eq!(
            payment_status(&[paid(2700), refund(2700)], TOTAL),
            PaymentStatus::Refunded
        );
    }

    #[test]
    fn payment_after_refund_stays_partially_refunded() {
        let ledger = [paid(2700), refund(2700), paid(500)];
        assert_eq!(
            payment_status(&ledger, TOTAL),
            PaymentStatus::PartiallyRefunded
        );
    }

    #[test]
    fn rejects_non_positive_amounts() {
        let balance = PaymentBalance::default();
        assert!(matches!(
            balance.check(PaymentKind::PaymentReceived, Money::zero()),
            Err(OrderError::InvalidPaymentAmount { amount: 0 })
        ));
        assert!(matches!(
            balance.check(PaymentKind::RefundIssued, Money::from_cents(-5)),
            Err(OrderError::InvalidPaymentAmount { .. })
        ));
    }

    #[test]
    fn rejects_refund_above_net_balance() {
        let balance = PaymentBalance::from_events(&[paid(1000), refund(400)]);
        assert!(balance
            .check(PaymentKind::RefundIssued, Money::from_cents(600))
            .is_ok());
        assert!(matches!(
            balance.check(PaymentKind::RefundIssued, Money::from_cents(601)),
            Err(OrderError::RefundExceedsBalance { .. })
        ));
    }
}
