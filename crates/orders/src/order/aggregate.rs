//! Order aggregate implementation.

use chrono::{DateTime, Utc};
use common::{Money, OrderId, UserId};
use event_store::Version;
use serde::{Deserialize, Serialize};

use crate::aggregate::Aggregate;

use super::{
    AppliedOffer, Cancellation, LineStatus, OrderError, OrderEvent, OrderLine, OrderStatus,
    OrderStatusChange, PaymentBalance, PaymentEvent, PaymentKind, PaymentStatus, PlaceOrder,
    TotalBreakdown, events::OrderPlacedData, totals,
};

/// Order aggregate root.
///
/// Rebuilt from its stream on every load. The total is derived from the
/// current lines and never stored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Order {
    id: Option<OrderId>,

    #[serde(default)]
    version: Version,

    user_id: Option<UserId>,
    status: OrderStatus,
    lines: Vec<OrderLine>,
    discount: Money,
    tax: Money,
    shipping_waived: bool,
    applied_offers: Vec<AppliedOffer>,
    cancellation: Option<Cancellation>,
    status_history: Vec<OrderStatusChange>,
    payments: Vec<PaymentEvent>,
    placed_at: Option<DateTime<Utc>>,
}

impl Aggregate for Order {
    type Event = OrderEvent;
    type Error = OrderError;

    fn id(&self) -> Option<OrderId> {
        self.id
    }

    fn version(&self) -> Version {
        self.version
    }

    fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    fn apply(&mut self, event: Self::Event) {
        match event {
            OrderEvent::OrderPlaced(data) => self.apply_order_placed(data),
            OrderEvent::StatusChanged(change) => self.apply_status_changed(change),
            OrderEvent::PaymentRecorded(payment) => self.payments.push(payment),
            OrderEvent::LineCancelled(data) => {
                if let Some(line) = self.lines.iter_mut().find(|l| l.line_id == data.line_id) {
                    line.status = LineStatus::Cancelled;
                }
            }
        }
    }
}

// Query methods
impl Order {
    /// Returns the owning user, None for a guest order.
    pub fn user_id(&self) -> Option<&UserId> {
        self.user_id.as_ref()
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    /// Returns all lines, including cancelled ones.
    pub fn lines(&self) -> &[OrderLine] {
        &self.lines
    }

    /// Returns a line by id.
    pub fn line(&self, line_id: u32) -> Option<&OrderLine> {
        self.lines.iter().find(|line| line.line_id == line_id)
    }

    /// Order-level discount.
    pub fn discount(&self) -> Money {
        self.discount
    }

    pub fn tax(&self) -> Money {
        self.tax
    }

    pub fn shipping_waived(&self) -> bool {
        self.shipping_waived
    }

    pub fn applied_offers(&self) -> &[AppliedOffer] {
        &self.applied_offers
    }

    /// Cancellation metadata, present once the order is Cancelled.
    pub fn cancellation(&self) -> Option<&Cancellation> {
        self.cancellation.as_ref()
    }

    /// Every status change in the order they happened.
    pub fn status_history(&self) -> &[OrderStatusChange] {
        &self.status_history
    }

    /// The payment ledger in recording order.
    pub fn payments(&self) -> &[PaymentEvent] {
        &self.payments
    }

    pub fn placed_at(&self) -> Option<DateTime<Utc>> {
        self.placed_at
    }

    /// Recomputes the total breakdown from the current lines.
    pub fn totals(&self) -> TotalBreakdown {
        totals::calculate(&self.lines, self.discount, self.tax)
    }

    pub fn total(&self) -> Money {
        self.totals().total
    }

    pub fn payment_balance(&self) -> PaymentBalance {
        PaymentBalance::from_events(&self.payments)
    }

    pub fn payment_status(&self) -> PaymentStatus {
        self.payment_balance().status(self.total())
    }

    /// Returns true if the order is in a terminal status.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

// Command methods (return events)
impl Order {
    /// Places the order, assigning line ids in input order starting at 1.
    pub fn place(&self, cmd: &PlaceOrder, at: DateTime<Utc>) -> Result<Vec<OrderEvent>, OrderError> {
        if self.id.is_some() {
            return Err(OrderError::AlreadyPlaced);
        }
        if cmd.lines.is_empty() {
            return Err(OrderError::EmptyOrder);
        }
        if cmd.discount.is_negative() {
            return Err(OrderError::InvalidDiscount {
                amount: cmd.discount.cents(),
            });
        }
        if cmd.tax.is_negative() {
            return Err(OrderError::InvalidTax {
                amount: cmd.tax.cents(),
            });
        }

        let mut lines = Vec::with_capacity(cmd.lines.len());
        for (line_id, line) in (1..).zip(&cmd.lines) {
            if line.quantity == 0 {
                return Err(OrderError::InvalidQuantity {
                    quantity: line.quantity,
                });
            }
            if line.unit_price.is_negative() {
                return Err(OrderError::InvalidPrice {
                    price: line.unit_price.cents(),
                });
            }
            if line.discount.is_negative() || line.discount > line.unit_price {
                return Err(OrderError::InvalidDiscount {
                    amount: line.discount.cents(),
                });
            }
            lines.push(OrderLine {
                line_id,
                status: LineStatus::Open,
                ..line.clone()
            });
        }

        Ok(vec![OrderEvent::OrderPlaced(OrderPlacedData {
            order_id: cmd.order_id,
            user_id: cmd.user_id.clone(),
            lines,
            discount: cmd.discount,
            tax: cmd.tax,
            shipping_waived: cmd.shipping_waived,
            applied_offers: cmd.applied_offers.clone(),
            placed_at: at,
        })])
    }

    /// Moves the order to `to`, producing the audit record.
    ///
    /// A move to Cancelled through this path stamps a cancellation without
    /// actor or reason.
    pub fn transition(
        &self,
        to: OrderStatus,
        at: DateTime<Utc>,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        if to == OrderStatus::Cancelled {
            return self.cancel(None, None, at);
        }
        self.status.check_transition(to)?;

        Ok(vec![OrderEvent::status_changed(
            self.order_id()?,
            self.status,
            to,
            at,
            None,
        )])
    }

    /// Cancels the order, stamping who cancelled it and why.
    pub fn cancel(
        &self,
        cancelled_by: Option<String>,
        reason: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        self.status.check_transition(OrderStatus::Cancelled)?;

        Ok(vec![OrderEvent::status_changed(
            self.order_id()?,
            self.status,
            OrderStatus::Cancelled,
            at,
            Some(Cancellation {
                cancelled_by,
                reason,
                cancelled_at: at,
            }),
        )])
    }

    /// Appends a payment or refund to the ledger.
    pub fn record_payment(
        &self,
        kind: PaymentKind,
        amount: Money,
        at: DateTime<Utc>,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        self.order_id()?;
        self.payment_balance().check(kind, amount)?;

        Ok(vec![OrderEvent::payment_recorded(PaymentEvent {
            kind,
            amount,
            recorded_at: at,
        })])
    }

    /// Cancels one line. Cancelling an already cancelled line is a no-op.
    pub fn cancel_line(
        &self,
        line_id: u32,
        at: DateTime<Utc>,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        if self.is_terminal() {
            return Err(OrderError::OrderClosed {
                status: self.status,
            });
        }

        let line = self
            .line(line_id)
            .ok_or(OrderError::LineNotFound { line_id })?;

        if line.is_cancelled() {
            return Ok(vec![]);
        }

        Ok(vec![OrderEvent::line_cancelled(line_id, at)])
    }

    fn order_id(&self) -> Result<OrderId, OrderError> {
        self.id.ok_or(OrderError::NotPlaced)
    }
}

// Apply event helpers
impl Order {
    fn apply_order_placed(&mut self, data: OrderPlacedData) {
        self.id = Some(data.order_id);
        self.user_id = data.user_id;
        self.status = OrderStatus::Pending;
        self.lines = data.lines;
        self.discount = data.discount;
        self.tax = data.tax;
        self.shipping_waived = data.shipping_waived;
        self.applied_offers = data.applied_offers;
        self.placed_at = Some(data.placed_at);
    }

    fn apply_status_changed(&mut self, change: OrderStatusChange) {
        self.status = change.to;
        if let Some(cancellation) = &change.cancellation {
            self.cancellation = Some(cancellation.clone());
        }
        self.status_history.push(change);
    }
}
