//! Maintenance of the denormalized review aggregate on product rows.
//!
//! A product carries two derived columns, `review_ids` and `average_score`.
//! Every helper here recomputes the average with a full aggregate query over
//! the review set instead of adjusting a running sum, so a crash or a missed
//! update can never leave the stored mean drifting away from the rows it
//! summarizes. The mean of an empty review set is exactly 0.
//!
//! Callers must hold the product row lock ([`lock_product`]) and run inside
//! the same transaction as the review mutation. The lock serializes
//! recomputation per product: a concurrent writer blocks until the first
//! transaction commits, then recomputes over a review set that includes the
//! committed change.

use common::{ProductId, ReviewId};
use sqlx::PgConnection;
use sqlx::postgres::PgRow;

use crate::Result;

/// Takes the row lock on a product, returning whether the product exists.
pub(crate) async fn lock_product(conn: &mut PgConnection, id: ProductId) -> Result<bool> {
    let row: Option<i64> = sqlx::query_scalar("SELECT id FROM products WHERE id = $1 FOR UPDATE")
        .bind(id.as_i64())
        .fetch_optional(conn)
        .await?;
    Ok(row.is_some())
}

/// Appends a freshly inserted review id and recomputes the average score.
pub(crate) async fn append_review(
    conn: &mut PgConnection,
    product: ProductId,
    review: ReviewId,
) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE products
        SET review_ids = array_append(review_ids, $2),
            average_score = COALESCE(
                (SELECT AVG(score)::float8 FROM reviews WHERE product_id = $1), 0.0)
        WHERE id = $1
        "#,
    )
    .bind(product.as_i64())
    .bind(review.as_i64())
    .execute(conn)
    .await?;
    Ok(())
}

/// Removes a deleted review id and recomputes the average score.
///
/// `array_remove` strips every occurrence of the id; ids are unique so
/// exactly one entry disappears.
pub(crate) async fn remove_review(
    conn: &mut PgConnection,
    product: ProductId,
    review: ReviewId,
) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE products
        SET review_ids = array_remove(review_ids, $2),
            average_score = COALESCE(
                (SELECT AVG(score)::float8 FROM reviews WHERE product_id = $1), 0.0)
        WHERE id = $1
        "#,
    )
    .bind(product.as_i64())
    .bind(review.as_i64())
    .execute(conn)
    .await?;
    Ok(())
}

/// Recomputes the average score after a review's score changed. The id list
/// is untouched.
pub(crate) async fn refresh_average(conn: &mut PgConnection, product: ProductId) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE products
        SET average_score = COALESCE(
                (SELECT AVG(score)::float8 FROM reviews WHERE product_id = $1), 0.0)
        WHERE id = $1
        "#,
    )
    .bind(product.as_i64())
    .execute(conn)
    .await?;
    Ok(())
}

/// Rebuilds both aggregate columns from the full review set and returns the
/// updated product row. Used by the explicit recompute operation.
pub(crate) async fn rebuild(conn: &mut PgConnection, product: ProductId) -> Result<PgRow> {
    let row = sqlx::query(
        r#"
        UPDATE products
        SET review_ids = COALESCE(
                (SELECT array_agg(id ORDER BY id) FROM reviews WHERE product_id = $1), '{}'),
            average_score = COALESCE(
                (SELECT AVG(score)::float8 FROM reviews WHERE product_id = $1), 0.0)
        WHERE id = $1
        RETURNING id, name, about, price, review_ids, average_score
        "#,
    )
    .bind(product.as_i64())
    .fetch_one(conn)
    .await?;
    Ok(row)
}
