//! Canonical entity records and the write shapes accepted by the gateway.

use chrono::{DateTime, Utc};
use common::{Money, OrderId, ProductId, ReviewId, UserId};
use serde::{Deserialize, Serialize};

/// A product row, including its derived review aggregate.
///
/// `review_ids` holds the ids of every review referencing this product in
/// insertion order, and `average_score` their arithmetic mean (0.0 when the
/// product has no reviews). Both fields are maintained by the store itself;
/// callers never write them directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub about: String,
    pub price: Money,
    pub review_ids: Vec<ReviewId>,
    pub average_score: f64,
}

/// Fields required to insert a product.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub about: String,
    pub price: Money,
}

/// Partial product update. `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub price: Option<Money>,
}

/// Optional product listing filters, combined with logical AND.
///
/// Text filters match case-insensitively on any substring; `max_price` is an
/// upper bound.
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    pub name: Option<String>,
    pub about: Option<String>,
    pub max_price: Option<Money>,
}

/// An order row.
///
/// `product_ids` may contain the same product several times, one entry per
/// unit. `total` is fixed at creation time and never recomputed from later
/// price changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub product_ids: Vec<ProductId>,
    pub total: Money,
    pub payment: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields required to insert an order. The total has already been computed
/// by the order service.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: UserId,
    pub product_ids: Vec<ProductId>,
    pub total: Money,
}

/// Partial order update.
#[derive(Debug, Clone, Default)]
pub struct OrderPatch {
    pub payment: Option<bool>,
}

/// A review row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub id: ReviewId,
    pub user_id: UserId,
    pub product_id: ProductId,
    pub score: i32,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields required to insert a review.
#[derive(Debug, Clone)]
pub struct NewReview {
    pub user_id: UserId,
    pub product_id: ProductId,
    pub score: i32,
    pub content: String,
}

/// Partial review update. `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct ReviewPatch {
    pub score: Option<i32>,
    pub content: Option<String>,
}
