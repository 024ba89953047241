use std::collections::HashMap;

use async_trait::async_trait;
use common::{Money, OrderId, ProductId, ReviewId, UserId};
use sqlx::{PgPool, Row, postgres::PgRow};

use crate::records::{
    NewOrder, NewProduct, NewReview, Order, OrderPatch, Product, ProductFilter, ProductPatch,
    Review, ReviewPatch,
};
use crate::{Result, Store, StoreError, aggregate};

/// PostgreSQL-backed storage gateway.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL gateway over an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations. Safe to call on every start.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }
}

fn row_to_product(row: PgRow) -> Result<Product> {
    Ok(Product {
        id: ProductId::from_i64(row.try_get("id")?),
        name: row.try_get("name")?,
        about: row.try_get("about")?,
        price: Money::from_cents(row.try_get("price")?),
        review_ids: row
            .try_get::<Vec<i64>, _>("review_ids")?
            .into_iter()
            .map(ReviewId::from_i64)
            .collect(),
        average_score: row.try_get("average_score")?,
    })
}

fn row_to_order(row: PgRow) -> Result<Order> {
    Ok(Order {
        id: OrderId::from_i64(row.try_get("id")?),
        user_id: UserId::from_i64(row.try_get("user_id")?),
        product_ids: row
            .try_get::<Vec<i64>, _>("product_ids")?
            .into_iter()
            .map(ProductId::from_i64)
            .collect(),
        total: Money::from_cents(row.try_get("total")?),
        payment: row.try_get("payment")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_review(row: PgRow) -> Result<Review> {
    Ok(Review {
        id: ReviewId::from_i64(row.try_get("id")?),
        user_id: UserId::from_i64(row.try_get("user_id")?),
        product_id: ProductId::from_i64(row.try_get("product_id")?),
        score: row.try_get("score")?,
        content: row.try_get("content")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

const PRODUCT_COLUMNS: &str = "id, name, about, price, review_ids, average_score";
const ORDER_COLUMNS: &str = "id, user_id, product_ids, total, payment, created_at, updated_at";
const REVIEW_COLUMNS: &str = "id, user_id, product_id, score, content, created_at, updated_at";

#[async_trait]
impl Store for PostgresStore {
    async fn insert_product(&self, product: NewProduct) -> Result<Product> {
        let row = sqlx::query(&format!(
            "INSERT INTO products (name, about, price) VALUES ($1, $2, $3) \
             RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(&product.name)
        .bind(&product.about)
        .bind(product.price.cents())
        .fetch_one(&self.pool)
        .await?;

        row_to_product(row)
    }

    async fn list_products(&self, filter: &ProductFilter) -> Result<Vec<Product>> {
        let mut sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE 1=1");
        let mut param_count = 0;

        if filter.name.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND name ILIKE ${param_count}"));
        }
        if filter.about.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND about ILIKE ${param_count}"));
        }
        if filter.max_price.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND price <= ${param_count}"));
        }
        sql.push_str(" ORDER BY id ASC");

        let mut query = sqlx::query(&sql);
        if let Some(name) = &filter.name {
            query = query.bind(format!("%{name}%"));
        }
        if let Some(about) = &filter.about {
            query = query.bind(format!("%{about}%"));
        }
        if let Some(max_price) = filter.max_price {
            query = query.bind(max_price.cents());
        }

        let rows = query.fetch_all(&self.pool).await?;
        rows.into_iter().map(row_to_product).collect()
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>> {
        let row = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
        ))
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        row.map(row_to_product).transpose()
    }

    async fn update_product(&self, id: ProductId, patch: ProductPatch) -> Result<Product> {
        let row = sqlx::query(&format!(
            "UPDATE products \
             SET name = COALESCE($2, name), price = COALESCE($3, price) \
             WHERE id = $1 \
             RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(id.as_i64())
        .bind(patch.name)
        .bind(patch.price.map(|p| p.cents()))
        .fetch_optional(&self.pool)
        .await?;

        row.map(row_to_product).transpose()?.ok_or(StoreError::NotFound)
    }

    async fn delete_product(&self, id: ProductId) -> Result<()> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id.as_i64())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn unit_prices(&self, ids: &[ProductId]) -> Result<HashMap<ProductId, Money>> {
        let keys: Vec<i64> = ids.iter().map(|id| id.as_i64()).collect();
        let rows = sqlx::query("SELECT id, price FROM products WHERE id = ANY($1)")
            .bind(&keys)
            .fetch_all(&self.pool)
            .await?;

        let mut prices = HashMap::with_capacity(rows.len());
        for row in rows {
            prices.insert(
                ProductId::from_i64(row.try_get("id")?),
                Money::from_cents(row.try_get("price")?),
            );
        }
        Ok(prices)
    }

    async fn reviews_for_product(&self, id: ProductId) -> Result<Vec<Review>> {
        let rows = sqlx::query(&format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews WHERE product_id = $1 ORDER BY id ASC"
        ))
        .bind(id.as_i64())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(row_to_review).collect()
    }

    async fn insert_order(&self, order: NewOrder) -> Result<Order> {
        let product_ids: Vec<i64> = order.product_ids.iter().map(|id| id.as_i64()).collect();
        let row = sqlx::query(&format!(
            "INSERT INTO orders (user_id, product_ids, total, payment, created_at, updated_at) \
             VALUES ($1, $2, $3, false, NOW(), NOW()) \
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(order.user_id.as_i64())
        .bind(&product_ids)
        .bind(order.total.cents())
        .fetch_one(&self.pool)
        .await?;

        row_to_order(row)
    }

    async fn list_orders(&self) -> Result<Vec<Order>> {
        let rows = sqlx::query(&format!("SELECT {ORDER_COLUMNS} FROM orders ORDER BY id ASC"))
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(row_to_order).collect()
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>> {
        let row = sqlx::query(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
            .bind(id.as_i64())
            .fetch_optional(&self.pool)
            .await?;

        row.map(row_to_order).transpose()
    }

    async fn update_order(&self, id: OrderId, patch: OrderPatch) -> Result<Order> {
        let row = sqlx::query(&format!(
            "UPDATE orders \
             SET payment = COALESCE($2, payment), updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(id.as_i64())
        .bind(patch.payment)
        .fetch_optional(&self.pool)
        .await?;

        row.map(row_to_order).transpose()?.ok_or(StoreError::NotFound)
    }

    async fn delete_order(&self, id: OrderId) -> Result<()> {
        let result = sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(id.as_i64())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn insert_review(&self, review: NewReview) -> Result<Review> {
        let mut tx = self.pool.begin().await?;

        // The lock doubles as the existence check: a review may only be
        // created against a product that is still there.
        if !aggregate::lock_product(&mut *tx, review.product_id).await? {
            return Err(StoreError::NotFound);
        }

        let row = sqlx::query(&format!(
            "INSERT INTO reviews (user_id, product_id, score, content, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, NOW(), NOW()) \
             RETURNING {REVIEW_COLUMNS}"
        ))
        .bind(review.user_id.as_i64())
        .bind(review.product_id.as_i64())
        .bind(review.score)
        .bind(&review.content)
        .fetch_one(&mut *tx)
        .await?;
        let inserted = row_to_review(row)?;

        aggregate::append_review(&mut *tx, inserted.product_id, inserted.id).await?;

        tx.commit().await?;
        tracing::debug!(
            review = %inserted.id,
            product = %inserted.product_id,
            "review inserted and aggregate recomputed"
        );
        Ok(inserted)
    }

    async fn list_reviews(&self) -> Result<Vec<Review>> {
        let rows = sqlx::query(&format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews ORDER BY id ASC"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(row_to_review).collect()
    }

    async fn get_review(&self, id: ReviewId) -> Result<Option<Review>> {
        let row = sqlx::query(&format!("SELECT {REVIEW_COLUMNS} FROM reviews WHERE id = $1"))
            .bind(id.as_i64())
            .fetch_optional(&self.pool)
            .await?;

        row.map(row_to_review).transpose()
    }

    async fn update_review(&self, id: ReviewId, patch: ReviewPatch) -> Result<Review> {
        let mut tx = self.pool.begin().await?;

        let product_id: Option<i64> =
            sqlx::query_scalar("SELECT product_id FROM reviews WHERE id = $1")
                .bind(id.as_i64())
                .fetch_optional(&mut *tx)
                .await?;
        let product_id = ProductId::from_i64(product_id.ok_or(StoreError::NotFound)?);

        // Lock the product before touching the review so concurrent
        // writers against the same product queue up in one place. The
        // product may have been deleted since the review was written; the
        // orphaned review is still updatable.
        let product_exists = aggregate::lock_product(&mut *tx, product_id).await?;

        let row = sqlx::query(&format!(
            "UPDATE reviews \
             SET score = COALESCE($2, score), content = COALESCE($3, content), \
                 updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {REVIEW_COLUMNS}"
        ))
        .bind(id.as_i64())
        .bind(patch.score)
        .bind(patch.content)
        .fetch_optional(&mut *tx)
        .await?;
        let updated = row.map(row_to_review).transpose()?.ok_or(StoreError::NotFound)?;

        if product_exists {
            aggregate::refresh_average(&mut *tx, product_id).await?;
        }

        tx.commit().await?;
        Ok(updated)
    }

    async fn delete_review(&self, id: ReviewId) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let product_id: Option<i64> =
            sqlx::query_scalar("SELECT product_id FROM reviews WHERE id = $1")
                .bind(id.as_i64())
                .fetch_optional(&mut *tx)
                .await?;
        let product_id = ProductId::from_i64(product_id.ok_or(StoreError::NotFound)?);

        let product_exists = aggregate::lock_product(&mut *tx, product_id).await?;

        let result = sqlx::query("DELETE FROM reviews WHERE id = $1")
            .bind(id.as_i64())
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }

        if product_exists {
            aggregate::remove_review(&mut *tx, product_id, id).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn recompute_aggregate(&self, id: ProductId) -> Result<Product> {
        let mut tx = self.pool.begin().await?;

        if !aggregate::lock_product(&mut *tx, id).await? {
            return Err(StoreError::NotFound);
        }
        let row = aggregate::rebuild(&mut *tx, id).await?;
        let product = row_to_product(row)?;

        tx.commit().await?;
        Ok(product)
    }
}
