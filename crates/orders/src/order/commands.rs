//! Order commands.

use common::{Money, OrderId, UserId};

use super::{AppliedOffer, OrderLine, OrderStatus, PaymentKind};

/// Command to place a new order from priced lines.
#[derive(Debug, Clone)]
pub struct PlaceOrder {
    pub order_id: OrderId,
    pub user_id: Option<UserId>,
    pub lines: Vec<OrderLine>,
    pub discount: Money,
    pub tax: Money,
    pub shipping_waived: bool,
    pub applied_offers: Vec<AppliedOffer>,
}

impl PlaceOrder {
    /// Creates a command with a generated order id and no adjustments.
    pub fn new(user_id: Option<UserId>, lines: Vec<OrderLine>) -> Self {
        Self {
            order_id: OrderId::new(),
            user_id,
            lines,
            discount: Money::zero(),
            tax: Money::zero(),
            shipping_waived: false,
            applied_offers: Vec::new(),
        }
    }

    pub fn with_order_id(mut self, order_id: OrderId) -> Self {
        self.order_id = order_id;
        self
    }

    pub fn with_discount(mut self, discount: Money) -> Self {
        self.discount = discount;
        self
    }

    pub fn with_tax(mut self, tax: Money) -> Self {
        self.tax = tax;
        self
    }

    pub fn with_shipping_waived(mut self, waived: bool) -> Self {
        self.shipping_waived = waived;
        self
    }

    pub fn with_applied_offers(mut self, offers: Vec<AppliedOffer>) -> Self {
        self.applied_offers = offers;
        self
    }
}

/// Command to move an order to a new status.
#[derive(Debug, Clone, Copy)]
pub struct TransitionOrder {
    pub order_id: OrderId,
    pub to: OrderStatus,
}

impl TransitionOrder {
    pub fn new(order_id: OrderId, to: OrderStatus) -> Self {
        Self { order_id, to }
    }
}

/// Command to cancel an order with audit metadata.
#[derive(Debug, Clone)]
pub struct CancelOrder {
    pub order_id: OrderId,
    pub cancelled_by: Option<String>,
    pub reason: Option<String>,
}

impl CancelOrder {
    pub fn new(order_id: OrderId) -> Self {
        Self {
            order_id,
            cancelled_by: None,
            reason: None,
        }
    }

    pub fn by(mut self, cancelled_by: impl Into<String>) -> Self {
        self.cancelled_by = Some(cancelled_by.into());
        self
    }

    pub fn because(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

/// Command to append a payment ledger entry.
#[derive(Debug, Clone, Copy)]
pub struct RecordPayment {
    pub order_id: OrderId,
    pub kind: PaymentKind,
    pub amount: Money,
}

impl RecordPayment {
    pub fn received(order_id: OrderId, amount: Money) -> Self {
        Self {
            order_id,
            kind: PaymentKind::PaymentReceived,
            amount,
        }
    }

    pub fn refund(order_id: OrderId, amount: Money) -> Self {
        Self {
            order_id,
            kind: PaymentKind::RefundIssued,
            amount,
        }
    }
}

/// Command to cancel a single line.
#[derive(Debug, Clone, Copy)]
pub struct CancelLine {
    pub order_id: OrderId,
    pub line_id: u32,
}

impl CancelLine {
    pub fn new(order_id: OrderId, line_id: u32) -> Self {
        Self { order_id, line_id }
    }
}
