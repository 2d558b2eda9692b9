//! Keyed async mutexes serializing commands per order.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use common::OrderId;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

#[derive(Debug, Clone, Default)]
pub(crate) struct OrderLocks {
    inner: Arc<Mutex<HashMap<OrderId, Arc<AsyncMutex<()>>>>>,
}

impl OrderLocks {
    /// Waits until no other command holds `order_id`.
    pub(crate) async fn acquire(&self, order_id: OrderId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            // Entries only referenced by the map have no holder and no waiter.
            map.retain(|_, lock| Arc::strong_count(lock) > 1);
            map.entry(order_id).or_default().clone()
        };
        lock.lock_owned().await
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn same_order_is_exclusive() {
        let locks = OrderLocks::default();
        let id = OrderId::new();

        let guard = locks.acquire(id).await;
        let contender = tokio::time::timeout(Duration::from_millis(20), locks.acquire(id)).await;
        assert!(contender.is_err());

        drop(guard);
        let reacquired = tokio::time::timeout(Duration::from_millis(200), locks.acquire(id)).await;
        assert!(reacquired.is_ok());
    }

    #[tokio::test]
    async fn different_orders_do_not_block() {
        let locks = OrderLocks::default();
        let _a = locks.acquire(OrderId::new()).await;
        let b = tokio::time::timeout(Duration::from_millis(200), locks.acquire(OrderId::new())).await;
        assert!(b.is_ok());
    }

    #[tokio::test]
    async fn idle_entries_are_pruned() {
        let locks = OrderLocks::default();
        for _ in 0..10 {
            let _guard = locks.acquire(OrderId::new()).await;
        }
        let _held = locks.acquire(OrderId::new()).await;
        assert_eq!(locks.len(), 1);
    }
}
