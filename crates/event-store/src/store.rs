use async_trait::async_trait;

use crate::{EventStoreError, OrderId, RecordedEvent, Result, Version};

/// Storage for order event streams.
///
/// All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Appends events to one order's stream.
    ///
    /// The batch is written atomically: either every event is stored or none
    /// is. Fails with `ConcurrencyConflict` if the stream is not at `expected`.
    ///
    /// Returns the stream version after the append.
    async fn append(
        &self,
        order_id: OrderId,
        expected: Version,
        events: Vec<RecordedEvent>,
    ) -> Result<Version>;

    /// Returns every event of an order in version order (oldest first).
    async fn load(&self, order_id: OrderId) -> Result<Vec<RecordedEvent>>;

    /// Returns the current version of an order's stream, or None if it has no events.
    async fn current_version(&self, order_id: OrderId) -> Result<Option<Version>>;

    /// Returns the ids of every order with at least one event.
    async fn order_ids(&self) -> Result<Vec<OrderId>>;
}

/// Convenience methods available on every store.
#[async_trait]
pub trait EventStoreExt: EventStore {
    async fn order_exists(&self, order_id: OrderId) -> Result<bool> {
        Ok(self.current_version(order_id).await?.is_some())
    }
}

impl<T: EventStore + ?Sized> EventStoreExt for T {}

/// Checks that a batch targets `order_id` with versions `expected + 1, expected + 2, ...`.
pub fn validate_batch(
    order_id: OrderId,
    expected: Version,
    events: &[RecordedEvent],
) -> Result<()> {
    if events.is_empty() {
        return Err(EventStoreError::InvalidAppend(
            "cannot append an empty batch".to_string(),
        ));
    }

    let mut version = expected;
    for event in events {
        version = version.next();
        if event.order_id != order_id {
            return Err(EventStoreError::InvalidAppend(format!(
                "event {} belongs to order {}, not {order_id}",
                event.event_type, event.order_id
            )));
        }
        if event.version != version {
            return Err(EventStoreError::InvalidAppend(format!(
                "versions must be sequential: expected {version}, got {}",
                event.version
            )));
        }
    }

    Ok(())
}
