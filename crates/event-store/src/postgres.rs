use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{
    EventId, EventStoreError, OrderId, RecordedEvent, Result, Version,
    store::{EventStore, validate_batch},
};

/// PostgreSQL-backed event store.
#[derive(Clone)]
pub struct PostgresEventStore {
    pool: PgPool,
}

impl PostgresEventStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the workspace migrations (order events and offer applications).
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    fn row_to_event(row: PgRow) -> Result<RecordedEvent> {
        Ok(RecordedEvent {
            event_id: EventId::from_uuid(row.try_get::<Uuid, _>("id")?),
            order_id: OrderId::from_uuid(row.try_get::<Uuid, _>("order_id")?),
            event_type: row.try_get("event_type")?,
            version: Version::new(row.try_get("version")?),
            recorded_at: row.try_get("recorded_at")?,
            payload: row.try_get("payload")?,
        })
    }
}

#[async_trait]
impl EventStore for PostgresEventStore {
    #[tracing::instrument(skip(self, events), fields(count = events.len()))]
    async fn append(
        &self,
        order_id: OrderId,
        expected: Version,
        events: Vec<RecordedEvent>,
    ) -> Result<Version> {
        validate_batch(order_id, expected, &events)?;

        let mut tx = self.pool.begin().await?;

        let current: Option<i64> =
            sqlx::query_scalar("SELECT MAX(version) FROM order_events WHERE order_id = $1")
                .bind(order_id.as_uuid())
                .fetch_one(&mut *tx)
                .await?;
        let actual = Version::new(current.unwrap_or(0));
        if actual != expected {
            return Err(EventStoreError::ConcurrencyConflict {
                order_id,
                expected,
                actual,
            });
        }

        let mut last = expected;
        for event in &events {
            sqlx::query(
                r#"
                INSERT INTO order_events (id, order_id, event_type, version, recorded_at, payload)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(event.event_id.as_uuid())
            .bind(order_id.as_uuid())
            .bind(&event.event_type)
            .bind(event.version.as_i64())
            .bind(event.recorded_at)
            .bind(&event.payload)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                // A concurrent writer committed the same version first.
                if let sqlx::Error::Database(ref db_err) = e
                    && db_err.constraint() == Some("unique_order_version")
                {
                    return EventStoreError::ConcurrencyConflict {
                        order_id,
                        expected,
                        actual: event.version,
                    };
                }
                EventStoreError::Database(e)
            })?;

            last = event.version;
        }

        tx.commit().await?;
        Ok(last)
    }

    async fn load(&self, order_id: OrderId) -> Result<Vec<RecordedEvent>> {
        let rows = sqlx::query(
            r#"
            SELECT id, order_id, event_type, version, recorded_at, payload
            FROM order_events
            WHERE order_id = $1
            ORDER BY version ASC
            "#,
        )
        .bind(order_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_event).collect()
    }

    async fn current_version(&self, order_id: OrderId) -> Result<Option<Version>> {
        let version: Option<i64> =
            sqlx::query_scalar("SELECT MAX(version) FROM order_events WHERE order_id = $1")
                .bind(order_id.as_uuid())
                .fetch_one(&self.pool)
                .await?;

        Ok(version.map(Version::new))
    }

    async fn order_ids(&self) -> Result<Vec<OrderId>> {
        let ids: Vec<Uuid> =
            sqlx::query_scalar("SELECT DISTINCT order_id FROM order_events ORDER BY order_id")
                .fetch_all(&self.pool)
                .await?;

        Ok(ids.into_iter().map(OrderId::from_uuid).collect())
    }
}
