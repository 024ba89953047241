use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use common::{Money, OrderId, ProductId, ReviewId};
use tokio::sync::RwLock;

use crate::records::{
    NewOrder, NewProduct, NewReview, Order, OrderPatch, Product, ProductFilter, ProductPatch,
    Review, ReviewPatch,
};
use crate::{Result, Store, StoreError};

/// In-memory storage gateway for testing.
///
/// Provides the same interface and consistency guarantees as the PostgreSQL
/// implementation: each mutation holds the write lock for its whole unit, so
/// a review mutation and its aggregate recomputation are observed atomically.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<RwLock<Inner>>,
}

#[derive(Default)]
struct Inner {
    products: BTreeMap<i64, Product>,
    orders: BTreeMap<i64, Order>,
    reviews: BTreeMap<i64, Review>,
    next_product_id: i64,
    next_order_id: i64,
    next_review_id: i64,
}

impl Inner {
    /// Recomputes a product's average from the full review set, mirroring
    /// the SQL aggregate query.
    fn refresh_average(&mut self, product_id: ProductId) {
        let scores: Vec<i32> = self
            .reviews
            .values()
            .filter(|r| r.product_id == product_id)
            .map(|r| r.score)
            .collect();

        if let Some(product) = self.products.get_mut(&product_id.as_i64()) {
            product.average_score = if scores.is_empty() {
                0.0
            } else {
                scores.iter().sum::<i32>() as f64 / scores.len() as f64
            };
        }
    }
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored products.
    pub async fn product_count(&self) -> usize {
        self.inner.read().await.products.len()
    }
}

fn matches(filter: &ProductFilter, product: &Product) -> bool {
    if let Some(name) = &filter.name
        && !product.name.to_lowercase().contains(&name.to_lowercase())
    {
        return false;
    }
    if let Some(about) = &filter.about
        && !product.about.to_lowercase().contains(&about.to_lowercase())
    {
        return false;
    }
    if let Some(max_price) = filter.max_price
        && product.price > max_price
    {
        return false;
    }
    true
}

#[async_trait]
impl Store for InMemoryStore {
    async fn insert_product(&self, product: NewProduct) -> Result<Product> {
        let mut inner = self.inner.write().await;

        inner.next_product_id += 1;
        let record = Product {
            id: ProductId::from_i64(inner.next_product_id),
            name: product.name,
            about: product.about,
            price: product.price,
            review_ids: Vec::new(),
            average_score: 0.0,
        };
        inner.products.insert(record.id.as_i64(), record.clone());
        Ok(record)
    }

    async fn list_products(&self, filter: &ProductFilter) -> Result<Vec<Product>> {
        let inner = self.inner.read().await;
        Ok(inner
            .products
            .values()
            .filter(|p| matches(filter, p))
            .cloned()
            .collect())
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>> {
        let inner = self.inner.read().await;
        Ok(inner.products.get(&id.as_i64()).cloned())
    }

    async fn update_product(&self, id: ProductId, patch: ProductPatch) -> Result<Product> {
        let mut inner = self.inner.write().await;
        let product = inner
            .products
            .get_mut(&id.as_i64())
            .ok_or(StoreError::NotFound)?;

        if let Some(name) = patch.name {
            product.name = name;
        }
        if let Some(price) = patch.price {
            product.price = price;
        }
        Ok(product.clone())
    }

    async fn delete_product(&self, id: ProductId) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner
            .products
            .remove(&id.as_i64())
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }

    async fn unit_prices(&self, ids: &[ProductId]) -> Result<HashMap<ProductId, Money>> {
        let inner = self.inner.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| inner.products.get(&id.as_i64()).map(|p| (*id, p.price)))
            .collect())
    }

    async fn reviews_for_product(&self, id: ProductId) -> Result<Vec<Review>> {
        let inner = self.inner.read().await;
        Ok(inner
            .reviews
            .values()
            .filter(|r| r.product_id == id)
            .cloned()
            .collect())
    }

    async fn insert_order(&self, order: NewOrder) -> Result<Order> {
        let mut inner = self.inner.write().await;

        inner.next_order_id += 1;
        let now = Utc::now();
        let record = Order {
            id: OrderId::from_i64(inner.next_order_id),
            user_id: order.user_id,
            product_ids: order.product_ids,
            total: order.total,
            payment: false,
            created_at: now,
            updated_at: now,
        };
        inner.orders.insert(record.id.as_i64(), record.clone());
        Ok(record)
    }

    async fn list_orders(&self) -> Result<Vec<Order>> {
        let inner = self.inner.read().await;
        Ok(inner.orders.values().cloned().collect())
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>> {
        let inner = self.inner.read().await;
        Ok(inner.orders.get(&id.as_i64()).cloned())
    }

    async fn update_order(&self, id: OrderId, patch: OrderPatch) -> Result<Order> {
        let mut inner = self.inner.write().await;
        let order = inner
            .orders
            .get_mut(&id.as_i64())
            .ok_or(StoreError::NotFound)?;

        if let Some(payment) = patch.payment {
            order.payment = payment;
        }
        order.updated_at = Utc::now();
        Ok(order.clone())
    }

    async fn delete_order(&self, id: OrderId) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner
            .orders
            .remove(&id.as_i64())
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }

    async fn insert_review(&self, review: NewReview) -> Result<Review> {
        let mut inner = self.inner.write().await;

        if !inner.products.contains_key(&review.product_id.as_i64()) {
            return Err(StoreError::NotFound);
        }
        // Mirror of the schema check constraint on score.
        if !(1..=5).contains(&review.score) {
            return Err(StoreError::ConstraintViolation(
                "reviews_score_check".to_string(),
            ));
        }

        inner.next_review_id += 1;
        let now = Utc::now();
        let record = Review {
            id: ReviewId::from_i64(inner.next_review_id),
            user_id: review.user_id,
            product_id: review.product_id,
            score: review.score,
            content: review.content,
            created_at: now,
            updated_at: now,
        };
        inner.reviews.insert(record.id.as_i64(), record.clone());

        if let Some(product) = inner.products.get_mut(&record.product_id.as_i64()) {
            product.review_ids.push(record.id);
        }
        inner.refresh_average(record.product_id);

        Ok(record)
    }

    async fn list_reviews(&self) -> Result<Vec<Review>> {
        let inner = self.inner.read().await;
        Ok(inner.reviews.values().cloned().collect())
    }

    async fn get_review(&self, id: ReviewId) -> Result<Option<Review>> {
        let inner = self.inner.read().await;
        Ok(inner.reviews.get(&id.as_i64()).cloned())
    }

    async fn update_review(&self, id: ReviewId, patch: ReviewPatch) -> Result<Review> {
        let mut inner = self.inner.write().await;

        let review = inner
            .reviews
            .get_mut(&id.as_i64())
            .ok_or(StoreError::NotFound)?;
        if let Some(score) = patch.score {
            review.score = score;
        }
        if let Some(content) = patch.content {
            review.content = content;
        }
        review.updated_at = Utc::now();
        let product_id = review.product_id;
        let updated = review.clone();

        inner.refresh_average(product_id);
        Ok(updated)
    }

    async fn delete_review(&self, id: ReviewId) -> Result<()> {
        let mut inner = self.inner.write().await;

        let review = inner.reviews.remove(&id.as_i64()).ok_or(StoreError::NotFound)?;

        if let Some(product) = inner.products.get_mut(&review.product_id.as_i64()) {
            if let Some(pos) = product.review_ids.iter().position(|rid| *rid == id) {
                product.review_ids.remove(pos);
            }
        }
        inner.refresh_average(review.product_id);
        Ok(())
    }

    async fn recompute_aggregate(&self, id: ProductId) -> Result<Product> {
        let mut inner = self.inner.write().await;

        let ids: Vec<ReviewId> = inner
            .reviews
            .values()
            .filter(|r| r.product_id == id)
            .map(|r| r.id)
            .collect();

        let product = inner
            .products
            .get_mut(&id.as_i64())
            .ok_or(StoreError::NotFound)?;
        product.review_ids = ids;

        inner.refresh_average(id);
        inner
            .products
            .get(&id.as_i64())
            .cloned()
            .ok_or(StoreError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::UserId;

    fn widget() -> NewProduct {
        NewProduct {
            name: "Widget".to_string(),
            about: "A widget".to_string(),
            price: Money::from_units(10),
        }
    }

    fn review_for(product_id: ProductId, score: i32) -> NewReview {
        NewReview {
            user_id: UserId::from_i64(1),
            product_id,
            score,
            content: "ok".to_string(),
        }
    }

    #[tokio::test]
    async fn insert_review_updates_aggregate() {
        let store = InMemoryStore::new();
        let product = store.insert_product(widget()).await.unwrap();

        let r1 = store.insert_review(review_for(product.id, 4)).await.unwrap();
        let r2 = store.insert_review(review_for(product.id, 2)).await.unwrap();

        let product = store.get_product(product.id).await.unwrap().unwrap();
        assert_eq!(product.review_ids, vec![r1.id, r2.id]);
        assert_eq!(product.average_score, 3.0);
    }

    #[tokio::test]
    async fn insert_review_rejects_unknown_product() {
        let store = InMemoryStore::new();
        let err = store
            .insert_review(review_for(ProductId::from_i64(99), 4))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }

    #[tokio::test]
    async fn delete_review_removes_id_and_refreshes_average() {
        let store = InMemoryStore::new();
        let product = store.insert_product(widget()).await.unwrap();
        let r1 = store.insert_review(review_for(product.id, 5)).await.unwrap();
        let r2 = store.insert_review(review_for(product.id, 1)).await.unwrap();

        store.delete_review(r1.id).await.unwrap();

        let product = store.get_product(product.id).await.unwrap().unwrap();
        assert_eq!(product.review_ids, vec![r2.id]);
        assert_eq!(product.average_score, 1.0);

        store.delete_review(r2.id).await.unwrap();
        let product = store.get_product(product.id).await.unwrap().unwrap();
        assert!(product.review_ids.is_empty());
        assert_eq!(product.average_score, 0.0);
    }

    #[tokio::test]
    async fn update_review_refreshes_average() {
        let store = InMemoryStore::new();
        let product = store.insert_product(widget()).await.unwrap();
        let review = store.insert_review(review_for(product.id, 5)).await.unwrap();

        store
            .update_review(
                review.id,
                ReviewPatch {
                    score: Some(1),
                    content: None,
                },
            )
            .await
            .unwrap();

        let product = store.get_product(product.id).await.unwrap().unwrap();
        assert_eq!(product.average_score, 1.0);
        assert_eq!(product.review_ids, vec![review.id]);
    }

    #[tokio::test]
    async fn orphaned_review_still_mutable() {
        let store = InMemoryStore::new();
        let product = store.insert_product(widget()).await.unwrap();
        let review = store.insert_review(review_for(product.id, 3)).await.unwrap();

        store.delete_product(product.id).await.unwrap();

        let updated = store
            .update_review(
                review.id,
                ReviewPatch {
                    score: Some(4),
                    content: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.score, 4);

        store.delete_review(review.id).await.unwrap();
        assert!(store.get_review(review.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_products_filters_combine() {
        let store = InMemoryStore::new();
        store.insert_product(widget()).await.unwrap();
        store
            .insert_product(NewProduct {
                name: "Gadget".to_string(),
                about: "A shiny gadget".to_string(),
                price: Money::from_units(25),
            })
            .await
            .unwrap();

        let filter = ProductFilter {
            name: Some("gad".to_string()),
            about: Some("SHINY".to_string()),
            max_price: Some(Money::from_units(30)),
        };
        let found = store.list_products(&filter).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Gadget");

        let filter = ProductFilter {
            max_price: Some(Money::from_units(5)),
            ..Default::default()
        };
        assert!(store.list_products(&filter).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn recompute_aggregate_rebuilds_both_fields() {
        let store = InMemoryStore::new();
        let product = store.insert_product(widget()).await.unwrap();
        let r1 = store.insert_review(review_for(product.id, 4)).await.unwrap();
        store.insert_review(review_for(product.id, 2)).await.unwrap();

        // Knock the stored aggregate out of sync on purpose.
        {
            let mut inner = store.inner.write().await;
            let p = inner.products.get_mut(&product.id.as_i64()).unwrap();
            p.average_score = 99.0;
            p.review_ids.clear();
        }

        let repaired = store.recompute_aggregate(product.id).await.unwrap();
        assert_eq!(repaired.average_score, 3.0);
        assert_eq!(repaired.review_ids.len(), 2);
        assert!(repaired.review_ids.contains(&r1.id));
    }
}
