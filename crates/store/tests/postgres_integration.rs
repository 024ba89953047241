//! PostgreSQL integration tests
//!
//! These tests use a shared PostgreSQL container for efficiency.
//! Run with:
//!
//! ```bash
//! cargo test -p store --test postgres_integration
//! ```

use std::sync::Arc;

use common::{Money, ProductId, UserId};
use serial_test::serial;
use sqlx::PgPool;
use store::{
    NewOrder, NewProduct, NewReview, OrderPatch, PostgresStore, ProductFilter, ProductPatch,
    ReviewPatch, Store, StoreError,
};
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

/// Global shared container
static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            // Bootstrap the schema once; the migration is idempotent.
            let temp_pool = PgPool::connect(&connection_string).await.unwrap();
            PostgresStore::new(temp_pool.clone())
                .run_migrations()
                .await
                .unwrap();
            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh store with its own pool and cleared tables
async fn get_test_store() -> PostgresStore {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(8)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query("TRUNCATE TABLE products, orders, reviews RESTART IDENTITY")
        .execute(&pool)
        .await
        .unwrap();

    PostgresStore::new(pool)
}

fn widget() -> NewProduct {
    NewProduct {
        name: "Widget".to_string(),
        about: "A sturdy widget".to_string(),
        price: Money::from_units(10),
    }
}

fn review_for(product_id: ProductId, score: i32) -> NewReview {
    NewReview {
        user_id: UserId::from_i64(1),
        product_id,
        score,
        content: "solid".to_string(),
    }
}

#[tokio::test]
#[serial]
async fn product_roundtrip() {
    let store = get_test_store().await;

    let created = store.insert_product(widget()).await.unwrap();
    assert_eq!(created.name, "Widget");
    assert_eq!(created.price, Money::from_units(10));
    assert!(created.review_ids.is_empty());
    assert_eq!(created.average_score, 0.0);

    let fetched = store.get_product(created.id).await.unwrap().unwrap();
    assert_eq!(fetched, created);
}

#[tokio::test]
#[serial]
async fn product_filters_combine_with_and() {
    let store = get_test_store().await;
    store.insert_product(widget()).await.unwrap();
    store
        .insert_product(NewProduct {
            name: "Gadget Deluxe".to_string(),
            about: "A shiny gadget".to_string(),
            price: Money::from_units(50),
        })
        .await
        .unwrap();

    // case-insensitive substring on name
    let found = store
        .list_products(&ProductFilter {
            name: Some("gadget".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].name, "Gadget Deluxe");

    // all three filters together
    let found = store
        .list_products(&ProductFilter {
            name: Some("GADGET".to_string()),
            about: Some("shiny".to_string()),
            max_price: Some(Money::from_units(60)),
        })
        .await
        .unwrap();
    assert_eq!(found.len(), 1);

    // max price excludes the expensive one
    let found = store
        .list_products(&ProductFilter {
            max_price: Some(Money::from_units(20)),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].name, "Widget");
}

#[tokio::test]
#[serial]
async fn update_and_delete_product() {
    let store = get_test_store().await;
    let product = store.insert_product(widget()).await.unwrap();

    let updated = store
        .update_product(
            product.id,
            ProductPatch {
                name: Some("Widget v2".to_string()),
                price: Some(Money::from_units(12)),
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.name, "Widget v2");
    assert_eq!(updated.price, Money::from_units(12));

    store.delete_product(product.id).await.unwrap();
    assert!(store.get_product(product.id).await.unwrap().is_none());

    let err = store.delete_product(product.id).await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound));

    let err = store
        .update_product(product.id, ProductPatch::default())
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::NotFound));
}

#[tokio::test]
#[serial]
async fn order_lifecycle() {
    let store = get_test_store().await;

    let order = store
        .insert_order(NewOrder {
            user_id: UserId::from_i64(7),
            product_ids: vec![ProductId::from_i64(1), ProductId::from_i64(1)],
            total: Money::from_cents(2400),
        })
        .await
        .unwrap();
    assert!(!order.payment);
    assert_eq!(order.product_ids.len(), 2);
    assert_eq!(order.created_at, order.updated_at);

    let paid = store
        .update_order(
            order.id,
            OrderPatch {
                payment: Some(true),
            },
        )
        .await
        .unwrap();
    assert!(paid.payment);
    assert!(paid.updated_at >= order.updated_at);
    // total untouched by the patch
    assert_eq!(paid.total, Money::from_cents(2400));

    store.delete_order(order.id).await.unwrap();
    assert!(store.get_order(order.id).await.unwrap().is_none());
}

#[tokio::test]
#[serial]
async fn review_insert_updates_product_aggregate() {
    let store = get_test_store().await;
    let product = store.insert_product(widget()).await.unwrap();

    let r1 = store.insert_review(review_for(product.id, 4)).await.unwrap();
    let r2 = store.insert_review(review_for(product.id, 2)).await.unwrap();

    let product = store.get_product(product.id).await.unwrap().unwrap();
    assert_eq!(product.review_ids, vec![r1.id, r2.id]);
    assert_eq!(product.average_score, 3.0);

    let reviews = store.reviews_for_product(product.id).await.unwrap();
    assert_eq!(reviews.len(), 2);
}

#[tokio::test]
#[serial]
async fn review_against_unknown_product_is_rejected() {
    let store = get_test_store().await;

    let err = store
        .insert_review(review_for(ProductId::from_i64(424242), 3))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::NotFound));
}

#[tokio::test]
#[serial]
async fn out_of_range_score_hits_check_constraint() {
    let store = get_test_store().await;
    let product = store.insert_product(widget()).await.unwrap();

    // The service layer validates first; the schema check is the backstop.
    let err = store
        .insert_review(review_for(product.id, 6))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::ConstraintViolation(_)));
}

#[tokio::test]
#[serial]
async fn review_update_and_delete_keep_aggregate_consistent() {
    let store = get_test_store().await;
    let product = store.insert_product(widget()).await.unwrap();
    let r1 = store.insert_review(review_for(product.id, 5)).await.unwrap();
    let r2 = store.insert_review(review_for(product.id, 1)).await.unwrap();

    store
        .update_review(
            r1.id,
            ReviewPatch {
                score: Some(3),
                content: None,
            },
        )
        .await
        .unwrap();
    let p = store.get_product(product.id).await.unwrap().unwrap();
    assert_eq!(p.average_score, 2.0);
    assert_eq!(p.review_ids, vec![r1.id, r2.id]);

    store.delete_review(r1.id).await.unwrap();
    let p = store.get_product(product.id).await.unwrap().unwrap();
    assert_eq!(p.review_ids, vec![r2.id]);
    assert_eq!(p.average_score, 1.0);

    store.delete_review(r2.id).await.unwrap();
    let p = store.get_product(product.id).await.unwrap().unwrap();
    assert!(p.review_ids.is_empty());
    assert_eq!(p.average_score, 0.0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[serial]
async fn concurrent_review_creation_loses_no_update() {
    let store = get_test_store().await;
    let product = store.insert_product(widget()).await.unwrap();

    let scores = [1, 2, 3, 4, 5, 3, 4, 2];
    let mut handles = Vec::new();
    for score in scores {
        let store = store.clone();
        let product_id = product.id;
        handles.push(tokio::spawn(async move {
            store.insert_review(review_for(product_id, score)).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let expected = scores.iter().sum::<i32>() as f64 / scores.len() as f64;
    let product = store.get_product(product.id).await.unwrap().unwrap();
    assert_eq!(product.review_ids.len(), scores.len());
    assert!((product.average_score - expected).abs() < 1e-9);
}

#[tokio::test]
#[serial]
async fn recompute_aggregate_repairs_drift() {
    let store = get_test_store().await;
    let product = store.insert_product(widget()).await.unwrap();
    store.insert_review(review_for(product.id, 4)).await.unwrap();
    store.insert_review(review_for(product.id, 2)).await.unwrap();

    // Corrupt the stored aggregate out-of-band.
    sqlx::query("UPDATE products SET average_score = 42, review_ids = '{}' WHERE id = $1")
        .bind(product.id.as_i64())
        .execute(store.pool())
        .await
        .unwrap();

    let repaired = store.recompute_aggregate(product.id).await.unwrap();
    assert_eq!(repaired.average_score, 3.0);
    assert_eq!(repaired.review_ids.len(), 2);

    let err = store
        .recompute_aggregate(ProductId::from_i64(999_999))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::NotFound));
}

#[tokio::test]
#[serial]
async fn deleting_product_leaves_reviews_addressable() {
    let store = get_test_store().await;
    let product = store.insert_product(widget()).await.unwrap();
    let review = store.insert_review(review_for(product.id, 3)).await.unwrap();

    store.delete_product(product.id).await.unwrap();

    // Orphaned review can still be read, updated and deleted.
    assert!(store.get_review(review.id).await.unwrap().is_some());
    let updated = store
        .update_review(
            review.id,
            ReviewPatch {
                score: None,
                content: Some("still here".to_string()),
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.content, "still here");

    store.delete_review(review.id).await.unwrap();
    assert!(store.get_review(review.id).await.unwrap().is_none());
}
