use std::collections::HashMap;

use async_trait::async_trait;
use common::{Money, OrderId, ProductId, ReviewId};

use crate::Result;
use crate::records::{
    NewOrder, NewProduct, NewReview, Order, OrderPatch, Product, ProductFilter, ProductPatch,
    Review, ReviewPatch,
};

/// Storage gateway over the relational store.
///
/// Every statement is parameterized; caller input is never concatenated into
/// SQL. Each method is atomically applied: review mutations run the row
/// change and the owning product's aggregate recomputation as one
/// transaction, serialized per product, so concurrent writers never publish
/// an average computed from a stale review set.
///
/// Failures are always surfaced as a typed [`StoreError`](crate::StoreError):
/// `NotFound` for keyed updates/deletes that matched nothing,
/// `ConstraintViolation` for schema-level rejections, `Unavailable` for
/// transport failures.
#[async_trait]
pub trait Store: Send + Sync {
    // -- Products --

    /// Inserts a product. The review aggregate starts empty (no ids,
    /// average 0.0).
    async fn insert_product(&self, product: NewProduct) -> Result<Product>;

    /// Lists products matching the filter, in insertion order.
    async fn list_products(&self, filter: &ProductFilter) -> Result<Vec<Product>>;

    /// Fetches one product, or `None` if the id is unknown.
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>>;

    /// Applies a partial update. Fails with `NotFound` when the id is
    /// unknown.
    async fn update_product(&self, id: ProductId, patch: ProductPatch) -> Result<Product>;

    /// Deletes a product. Fails with `NotFound` when the id is unknown.
    /// Reviews referencing the product are left in place.
    async fn delete_product(&self, id: ProductId) -> Result<()>;

    /// Returns the current unit price of each requested product that
    /// exists. Unknown ids are simply absent from the map.
    async fn unit_prices(&self, ids: &[ProductId]) -> Result<HashMap<ProductId, Money>>;

    /// Lists the reviews referencing a product, in insertion order.
    async fn reviews_for_product(&self, id: ProductId) -> Result<Vec<Review>>;

    // -- Orders --

    /// Inserts an order with `payment = false` and both timestamps set to
    /// the insertion time.
    async fn insert_order(&self, order: NewOrder) -> Result<Order>;

    /// Lists all orders in insertion order.
    async fn list_orders(&self) -> Result<Vec<Order>>;

    /// Fetches one order, or `None` if the id is unknown.
    async fn get_order(&self, id: OrderId) -> Result<Option<Order>>;

    /// Applies a partial update and refreshes `updated_at`. Fails with
    /// `NotFound` when the id is unknown.
    async fn update_order(&self, id: OrderId, patch: OrderPatch) -> Result<Order>;

    /// Deletes an order. Fails with `NotFound` when the id is unknown.
    async fn delete_order(&self, id: OrderId) -> Result<()>;

    // -- Reviews --

    /// Inserts a review and recomputes the owning product's aggregate in
    /// the same transaction. Fails with `NotFound` when the product does
    /// not exist.
    async fn insert_review(&self, review: NewReview) -> Result<Review>;

    /// Lists all reviews in insertion order.
    async fn list_reviews(&self) -> Result<Vec<Review>>;

    /// Fetches one review, or `None` if the id is unknown.
    async fn get_review(&self, id: ReviewId) -> Result<Option<Review>>;

    /// Applies a partial update and recomputes the owning product's
    /// average score in the same transaction. A review whose product has
    /// since been deleted is updated without an aggregate step.
    async fn update_review(&self, id: ReviewId, patch: ReviewPatch) -> Result<Review>;

    /// Deletes a review, removes its id from the owning product's
    /// `review_ids` and recomputes the average in the same transaction.
    async fn delete_review(&self, id: ReviewId) -> Result<()>;

    /// Rebuilds both aggregate fields of a product from the full review
    /// set. Fails with `NotFound` when the product does not exist.
    async fn recompute_aggregate(&self, id: ProductId) -> Result<Product>;
}
