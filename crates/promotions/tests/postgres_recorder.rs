//! PostgreSQL application recorder tests.
//!
//! These use a shared PostgreSQL container, so Docker must be running.
//! Run with:
//!
//! ```bash
//! cargo test -p promotions --test postgres_recorder -- --test-threads=1
//! ```

use std::sync::Arc;

use chrono::Utc;
use common::{OrderId, UserId};
use promotions::{
    ApplicationRecorder, Offer, OfferBenefit, OfferCondition, OfferRange,
    PostgresApplicationRecorder, PromotionError,
};
use sqlx::PgPool;
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();
            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let pool = PgPool::connect(&connection_string).await.unwrap();
            PostgresApplicationRecorder::new(pool.clone())
                .run_migrations()
                .await
                .unwrap();
            pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

async fn get_test_recorder() -> PostgresApplicationRecorder {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(10)
        .connect(&info.connection_string)
        .await
        .unwrap();

    PostgresApplicationRecorder::new(pool)
}

fn offer() -> Offer {
    Offer::new(
        "pg offer",
        OfferRange::all_products(),
        OfferCondition::BasketItems(1),
        OfferBenefit::percentage(10),
    )
}

#[tokio::test]
async fn record_duplicate_and_revoke() {
    let recorder = get_test_recorder().await;
    let offer = offer();
    let order_id = OrderId::new();
    let alice = UserId::new("alice");

    let application = recorder
        .record(&offer, Some(&alice), order_id, Utc::now())
        .await
        .unwrap();
    assert_eq!(application.user_id, Some(alice.clone()));

    let duplicate = recorder.record(&offer, Some(&alice), order_id, Utc::now()).await;
    assert!(matches!(
        duplicate,
        Err(PromotionError::DuplicateApplication { .. })
    ));

    let usage = recorder.usage(offer.id, Some(&alice)).await.unwrap();
    assert_eq!((usage.total, usage.by_user), (1, 1));

    let listed = recorder.applications_for_order(order_id).await.unwrap();
    assert_eq!(listed.len(), 1);

    assert!(recorder.revoke(offer.id, order_id).await.unwrap());
    assert_eq!(recorder.usage(offer.id, None).await.unwrap().total, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_records_never_overrun_total_limit() {
    let recorder = Arc::new(get_test_recorder().await);
    let offer = Arc::new(offer().with_limit_total(3));

    let handles: Vec<_> = (0..12)
        .map(|i| {
            let recorder = Arc::clone(&recorder);
            let offer = Arc::clone(&offer);
            tokio::spawn(async move {
                let user = UserId::new(format!("user-{i}"));
                recorder
                    .record(&offer, Some(&user), OrderId::new(), Utc::now())
                    .await
            })
        })
        .collect();

    let mut applied = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => applied += 1,
            Err(PromotionError::UsageLimitReached { .. }) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(applied, 3);
    assert_eq!(recorder.usage(offer.id, None).await.unwrap().total, 3);
}

#[tokio::test]
async fn per_user_limit_counts_only_that_user() {
    let recorder = get_test_recorder().await;
    let offer = offer().with_limit_per_user(1);
    let alice = UserId::new("alice");
    let bob = UserId::new("bob");

    recorder
        .record(&offer, Some(&alice), OrderId::new(), Utc::now())
        .await
        .unwrap();
    let again = recorder
        .record(&offer, Some(&alice), OrderId::new(), Utc::now())
        .await;
    assert!(matches!(again, Err(PromotionError::UsageLimitReached { .. })));

    recorder
        .record(&offer, Some(&bob), OrderId::new(), Utc::now())
        .await
        .unwrap();
}
