//! Offer usage log and limit enforcement.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{OfferId, OrderId, UserId};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool, Row, postgres::PgRow};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::{PromotionError, Result};
use crate::matcher::OfferUsage;
use crate::offer::Offer;

/// One recorded use of an offer by an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferApplication {
    pub id: Uuid,
    pub offer_id: OfferId,
    pub user_id: Option<UserId>,
    pub order_id: OrderId,
    pub applied_at: DateTime<Utc>,
}

/// Records offer usage.
///
/// `record` checks the offer's limits and writes the log entry as one atomic
/// step, so concurrent checkouts cannot both take the last use.
#[async_trait]
pub trait ApplicationRecorder: Send + Sync {
    /// Applications of an offer in total and by `user`.
    async fn usage(&self, offer_id: OfferId, user: Option<&UserId>) -> Result<OfferUsage>;

    /// Records one application of `offer` to `order_id`.
    ///
    /// Fails with `DuplicateApplication` if the pair is already logged and
    /// with `UsageLimitReached` if a limit is already exhausted.
    async fn record(
        &self,
        offer: &Offer,
        user: Option<&UserId>,
        order_id: OrderId,
        at: DateTime<Utc>,
    ) -> Result<OfferApplication>;

    /// Removes the log entry for an order that was never persisted.
    ///
    /// Returns false if there was nothing to remove.
    async fn revoke(&self, offer_id: OfferId, order_id: OrderId) -> Result<bool>;

    /// Every application logged for an order.
    async fn applications_for_order(&self, order_id: OrderId) -> Result<Vec<OfferApplication>>;
}

fn check_limits(offer: &Offer, user: Option<&UserId>, usage: OfferUsage) -> Result<()> {
    let total_reached = offer.limits.total.is_some_and(|limit| usage.total >= limit);
    let user_reached = match (offer.limits.per_user, user) {
        (Some(limit), Some(_)) => usage.by_user >= limit,
        (Some(_), None) => true,
        (None, _) => false,
    };

    if total_reached || user_reached {
        metrics::counter!("offer_limit_rejections_total").increment(1);
        tracing::warn!(offer_id = %offer.id, ?usage, "offer usage limit reached");
        return Err(PromotionError::UsageLimitReached { offer_id: offer.id });
    }
    Ok(())
}

fn saturating_u32(count: i64) -> u32 {
    u32::try_from(count.max(0)).unwrap_or(u32::MAX)
}

/// In-memory application log.
///
/// A single mutex covers the check and the insert.
#[derive(Debug, Clone, Default)]
pub struct InMemoryApplicationRecorder {
    log: Arc<Mutex<Vec<OfferApplication>>>,
}

impl InMemoryApplicationRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of logged applications.
    pub async fn len(&self) -> usize {
        self.log.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.log.lock().await.is_empty()
    }
}

fn count_usage(log: &[OfferApplication], offer_id: OfferId, user: Option<&UserId>) -> OfferUsage {
    let mut usage = OfferUsage::default();
    for application in log.iter().filter(|a| a.offer_id == offer_id) {
        usage.total += 1;
        if user.is_some() && application.user_id.as_ref() == user {
            usage.by_user += 1;
        }
    }
    usage
}

#[async_trait]
impl ApplicationRecorder for InMemoryApplicationRecorder {
    async fn usage(&self, offer_id: OfferId, user: Option<&UserId>) -> Result<OfferUsage> {
        let log = self.log.lock().await;
        Ok(count_usage(&log, offer_id, user))
    }

    #[tracing::instrument(skip(self, offer), fields(offer_id = %offer.id))]
    async fn record(
        &self,
        offer: &Offer,
        user: Option<&UserId>,
        order_id: OrderId,
        at: DateTime<Utc>,
    ) -> Result<OfferApplication> {
        let mut log = self.log.lock().await;

        if log
            .iter()
            .any(|a| a.offer_id == offer.id && a.order_id == order_id)
        {
            return Err(PromotionError::DuplicateApplication {
                offer_id: offer.id,
                order_id,
            });
        }
        check_limits(offer, user, count_usage(&log, offer.id, user))?;

        let application = OfferApplication {
            id: Uuid::new_v4(),
            offer_id: offer.id,
            user_id: user.cloned(),
            order_id,
            applied_at: at,
        };
        log.push(application.clone());

        metrics::counter!("offer_applications_total").increment(1);
        Ok(application)
    }

    async fn revoke(&self, offer_id: OfferId, order_id: OrderId) -> Result<bool> {
        let mut log = self.log.lock().await;
        let before = log.len();
        log.retain(|a| !(a.offer_id == offer_id && a.order_id == order_id));
        Ok(log.len() < before)
    }

    async fn applications_for_order(&self, order_id: OrderId) -> Result<Vec<OfferApplication>> {
        let log = self.log.lock().await;
        Ok(log
            .iter()
            .filter(|a| a.order_id == order_id)
            .cloned()
            .collect())
    }
}

/// PostgreSQL application log.
///
/// `record` takes a transaction-scoped advisory lock on the offer, so check
/// and insert are serialized across processes. The unique `(offer_id,
/// order_id)` constraint makes retries idempotent.
#[derive(Clone)]
pub struct PostgresApplicationRecorder {
    pool: PgPool,
}

impl PostgresApplicationRecorder {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the workspace migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    fn row_to_application(row: PgRow) -> Result<OfferApplication> {
        Ok(OfferApplication {
            id: row.try_get("id")?,
            offer_id: OfferId::from_uuid(row.try_get::<Uuid, _>("offer_id")?),
            user_id: row
                .try_get::<Option<String>, _>("user_id")?
                .map(UserId::new),
            order_id: OrderId::from_uuid(row.try_get::<Uuid, _>("order_id")?),
            applied_at: row.try_get("applied_at")?,
        })
    }
}

async fn count_in(
    conn: &mut PgConnection,
    offer_id: OfferId,
    user: Option<&UserId>,
) -> Result<OfferUsage> {
    let total: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM offer_applications WHERE offer_id = $1")
            .bind(offer_id.as_uuid())
            .fetch_one(&mut *conn)
            .await?;

    let by_user: i64 = match user {
        Some(user) => {
            sqlx::query_scalar(
                "SELECT COUNT(*) FROM offer_applications WHERE offer_id = $1 AND user_id = $2",
            )
            .bind(offer_id.as_uuid())
            .bind(user.as_str())
            .fetch_one(&mut *conn)
            .await?
        }
        None => 0,
    };

    Ok(OfferUsage {
        total: saturating_u32(total),
        by_user: saturating_u32(by_user),
    })
}

#[async_trait]
impl ApplicationRecorder for PostgresApplicationRecorder {
    async fn usage(&self, offer_id: OfferId, user: Option<&UserId>) -> Result<OfferUsage> {
        let mut conn = self.pool.acquire().await?;
        count_in(&mut conn, offer_id, user).await
    }

    #[tracing::instrument(skip(self, offer), fields(offer_id = %offer.id))]
    async fn record(
        &self,
        offer: &Offer,
        user: Option<&UserId>,
        order_id: OrderId,
        at: DateTime<Utc>,
    ) -> Result<OfferApplication> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1::text, 0))")
            .bind(offer.id.as_uuid())
            .execute(&mut *tx)
            .await?;

        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM offer_applications WHERE offer_id = $1 AND order_id = $2)",
        )
        .bind(offer.id.as_uuid())
        .bind(order_id.as_uuid())
        .fetch_one(&mut *tx)
        .await?;
        if exists {
            return Err(PromotionError::DuplicateApplication {
                offer_id: offer.id,
                order_id,
            });
        }

        let usage = count_in(&mut tx, offer.id, user).await?;
        check_limits(offer, user, usage)?;

        let application = OfferApplication {
            id: Uuid::new_v4(),
            offer_id: offer.id,
            user_id: user.cloned(),
            order_id,
            applied_at: at,
        };

        sqlx::query(
            r#"
            INSERT INTO offer_applications (id, offer_id, user_id, order_id, applied_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(application.id)
        .bind(offer.id.as_uuid())
        .bind(user.map(UserId::as_str))
        .bind(order_id.as_uuid())
        .bind(at)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.constraint() == Some("unique_offer_order")
            {
                return PromotionError::DuplicateApplication {
                    offer_id: offer.id,
                    order_id,
                };
            }
            PromotionError::Database(e)
        })?;

        tx.commit().await?;

        metrics::counter!("offer_applications_total").increment(1);
        Ok(application)
    }

    async fn revoke(&self, offer_id: OfferId, order_id: OrderId) -> Result<bool> {
        let result =
            sqlx::query("DELETE FROM offer_applications WHERE offer_id = $1 AND order_id = $2")
                .bind(offer_id.as_uuid())
                .bind(order_id.as_uuid())
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn applications_for_order(&self, order_id: OrderId) -> Result<Vec<OfferApplication>> {
        let rows = sqlx::query(
            r#"
            SELECT id, offer_id, user_id, order_id, applied_at
            FROM offer_applications
            WHERE order_id = $1
            ORDER BY applied_at ASC, id ASC
            "#,
        )
        .bind(order_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_application).collect()
    }
}
