//! Order service providing the order-management API.

use std::sync::Arc;

use common::{Clock, OrderId, SystemClock, UserId};
use event_store::EventStore;

use crate::aggregate::Aggregate;
use crate::command::{CommandHandler, CommandResult};
use crate::error::DomainError;
use crate::token::HashToken;

use super::locks::OrderLocks;
use super::{
    CancelLine, CancelOrder, Order, OrderFilter, OrderStatus, PlaceOrder, RecordPayment,
    TransitionOrder,
};

/// Service for managing orders.
///
/// Commands on one order run one at a time; commands on different orders run
/// in parallel. The store's optimistic concurrency check stays in place for
/// writers outside this process.
pub struct OrderService<S: EventStore> {
    handler: CommandHandler<S, Order>,
    clock: Arc<dyn Clock>,
    tokens: HashToken,
    locks: OrderLocks,
}

impl<S: EventStore> OrderService<S> {
    /// Creates a new order service with the given event store.
    pub fn new(store: S) -> Self {
        Self {
            handler: CommandHandler::new(store),
            clock: Arc::new(SystemClock),
            tokens: HashToken::unkeyed(),
            locks: OrderLocks::default(),
        }
    }

    /// Replaces the time source used to stamp events.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replaces the lookup token scheme.
    pub fn with_tokens(mut self, tokens: HashToken) -> Self {
        self.tokens = tokens;
        self
    }

    /// Returns a reference to the underlying command handler.
    pub fn handler(&self) -> &CommandHandler<S, Order> {
        &self.handler
    }

    /// Places a new order.
    #[tracing::instrument(skip(self, cmd), fields(order_id = %cmd.order_id, lines = cmd.lines.len()))]
    pub async fn place_order(&self, cmd: PlaceOrder) -> Result<CommandResult<Order>, DomainError> {
        let _guard = self.locks.acquire(cmd.order_id).await;
        let at = self.clock.now();

        let result = self
            .handler
            .execute(cmd.order_id, |order| order.place(&cmd, at))
            .await?;

        metrics::counter!("orders_placed_total").increment(1);
        tracing::info!(total = %result.aggregate.total(), "order placed");
        Ok(result)
    }

    /// Moves an order to a new status.
    #[tracing::instrument(skip(self))]
    pub async fn transition_order(
        &self,
        cmd: TransitionOrder,
    ) -> Result<CommandResult<Order>, DomainError> {
        let _guard = self.locks.acquire(cmd.order_id).await;
        let at = self.clock.now();

        let result = self
            .handler
            .execute_existing(cmd.order_id, |order| order.transition(cmd.to, at))
            .await?;

        metrics::counter!("order_transitions_total", "to" => cmd.to.as_str()).increment(1);
        Ok(result)
    }

    /// Cancels an order, recording who cancelled it and why.
    #[tracing::instrument(skip(self))]
    pub async fn cancel_order(&self, cmd: CancelOrder) -> Result<CommandResult<Order>, DomainError> {
        let _guard = self.locks.acquire(cmd.order_id).await;
        let at = self.clock.now();
        let CancelOrder {
            order_id,
            cancelled_by,
            reason,
        } = cmd;

        let result = self
            .handler
            .execute_existing(order_id, |order| order.cancel(cancelled_by, reason, at))
            .await?;

        metrics::counter!("order_transitions_total", "to" => OrderStatus::Cancelled.as_str())
            .increment(1);
        Ok(result)
    }

    /// Appends a payment or refund to an order's ledger.
    #[tracing::instrument(skip(self))]
    pub async fn record_payment(
        &self,
        cmd: RecordPayment,
    ) -> Result<CommandResult<Order>, DomainError> {
        let _guard = self.locks.acquire(cmd.order_id).await;
        let at = self.clock.now();

        let result = self
            .handler
            .execute_existing(cmd.order_id, |order| {
                order.record_payment(cmd.kind, cmd.amount, at)
            })
            .await?;

        metrics::counter!("payment_events_total", "kind" => cmd.kind.as_str()).increment(1);
        tracing::info!(status = %result.aggregate.payment_status(), "payment recorded");
        Ok(result)
    }

    /// Cancels a single line of a non-terminal order.
    #[tracing::instrument(skip(self))]
    pub async fn cancel_line(&self, cmd: CancelLine) -> Result<CommandResult<Order>, DomainError> {
        let _guard = self.locks.acquire(cmd.order_id).await;
        let at = self.clock.now();

        self.handler
            .execute_existing(cmd.order_id, |order| order.cancel_line(cmd.line_id, at))
            .await
    }

    /// Loads an order.
    ///
    /// With `user` set, orders owned by someone else (or by a guest) are
    /// reported as missing.
    #[tracing::instrument(skip(self))]
    pub async fn get_order(
        &self,
        order_id: OrderId,
        user: Option<&UserId>,
    ) -> Result<Option<Order>, DomainError> {
        let order = self.handler.load_existing(order_id).await?;
        Ok(order.filter(|order| user.is_none_or(|user| order.user_id() == Some(user))))
    }

    /// Returns the public lookup token for an order.
    pub fn order_token(&self, order_id: &OrderId) -> String {
        self.tokens.generate(order_id)
    }

    /// Loads an order for a caller holding its lookup token.
    ///
    /// A token mismatch is reported as a missing order.
    #[tracing::instrument(skip(self, token))]
    pub async fn lookup_order_by_token(
        &self,
        order_id: OrderId,
        token: &str,
    ) -> Result<Option<Order>, DomainError> {
        if !self.tokens.verify(&order_id, token) {
            tracing::debug!("lookup token mismatch");
            return Ok(None);
        }
        self.handler.load_existing(order_id).await
    }

    /// Lists orders matching a filter, newest first.
    #[tracing::instrument(skip(self))]
    pub async fn list_orders(&self, filter: &OrderFilter) -> Result<Vec<Order>, DomainError> {
        let mut orders = Vec::new();
        for order_id in self.handler.store().order_ids().await? {
            if let Some(order) = self.handler.load_existing(order_id).await?
                && filter.matches(&order)
            {
                orders.push(order);
            }
        }

        orders.sort_by(|a, b| b.placed_at().cmp(&a.placed_at()).then(a.id().cmp(&b.id())));
        Ok(orders)
    }
}
