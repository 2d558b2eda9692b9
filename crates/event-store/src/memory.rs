use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    EventStoreError, OrderId, RecordedEvent, Result, Version,
    store::{EventStore, validate_batch},
};

/// In-memory event store.
///
/// Offers the same guarantees as the PostgreSQL store within one process: the
/// version check and the write happen under one write lock.
#[derive(Clone, Default)]
pub struct InMemoryEventStore {
    streams: Arc<RwLock<HashMap<OrderId, Vec<RecordedEvent>>>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of events stored across all orders.
    pub async fn event_count(&self) -> usize {
        self.streams.read().await.values().map(Vec::len).sum()
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn append(
        &self,
        order_id: OrderId,
        expected: Version,
        events: Vec<RecordedEvent>,
    ) -> Result<Version> {
        validate_batch(order_id, expected, &events)?;

        let mut streams = self.streams.write().await;
        let stream = streams.entry(order_id).or_default();

        let actual = stream
            .last()
            .map(|e| e.version)
            .unwrap_or(Version::initial());
        if actual != expected {
            return Err(EventStoreError::ConcurrencyConflict {
                order_id,
                expected,
                actual,
            });
        }

        let last = events.last().map(|e| e.version).unwrap_or(actual);
        stream.extend(events);
        tracing::trace!(%order_id, version = %last, "events appended");

        Ok(last)
    }

    async fn load(&self, order_id: OrderId) -> Result<Vec<RecordedEvent>> {
        let streams = self.streams.read().await;
        Ok(streams.get(&order_id).cloned().unwrap_or_default())
    }

    async fn current_version(&self, order_id: OrderId) -> Result<Option<Version>> {
        let streams = self.streams.read().await;
        Ok(streams
            .get(&order_id)
            .and_then(|stream| stream.last())
            .map(|e| e.version))
    }

    async fn order_ids(&self) -> Result<Vec<OrderId>> {
        let streams = self.streams.read().await;
        let mut ids: Vec<OrderId> = streams
            .iter()
            .filter(|(_, stream)| !stream.is_empty())
            .map(|(id, _)| *id)
            .collect();
        ids.sort();
        Ok(ids)
    }
}
