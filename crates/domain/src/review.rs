//! Review service.
//!
//! Every mutation here runs as one storage transaction together with the
//! owning product's aggregate recomputation, so callers can never observe a
//! review without its effect on the product's average score.

use common::ReviewId;
use store::{NewReview, Review, ReviewPatch, Store};

use crate::error::{DomainError, Entity};
use crate::validation;

/// Service for managing reviews.
pub struct ReviewService<S: Store> {
    store: S,
}

impl<S: Store> ReviewService<S> {
    /// Creates a new review service over the given gateway.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Creates a review against an existing product and folds it into the
    /// product's aggregate.
    #[tracing::instrument(skip(self, review), fields(product_id = %review.product_id))]
    pub async fn create(&self, review: NewReview) -> Result<Review, DomainError> {
        validation::review_create(&review)?;

        // The gateway checks existence under the product lock; a NotFound
        // here always means the product, the review doesn't exist yet.
        let created = self
            .store
            .insert_review(review)
            .await
            .map_err(|e| DomainError::from_store(e, Entity::Product))?;

        metrics::counter!("reviews_created_total").increment(1);
        tracing::info!(id = %created.id, "review created");
        Ok(created)
    }

    /// Lists all reviews.
    #[tracing::instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<Review>, DomainError> {
        self.store.list_reviews().await.map_err(DomainError::storage)
    }

    /// Loads a review by id. Returns `None` if it doesn't exist.
    #[tracing::instrument(skip(self))]
    pub async fn get(&self, id: ReviewId) -> Result<Option<Review>, DomainError> {
        self.store.get_review(id).await.map_err(DomainError::storage)
    }

    /// Applies a partial update to score and/or content, recomputing the
    /// owning product's average in the same unit.
    #[tracing::instrument(skip(self, patch))]
    pub async fn update(&self, id: ReviewId, patch: ReviewPatch) -> Result<Review, DomainError> {
        validation::review_patch(&patch)?;

        self.store
            .update_review(id, patch)
            .await
            .map_err(|e| DomainError::from_store(e, Entity::Review))
    }

    /// Deletes a review and removes it from the owning product's aggregate.
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, id: ReviewId) -> Result<(), DomainError> {
        self.store
            .delete_review(id)
            .await
            .map_err(|e| DomainError::from_store(e, Entity::Review))
    }
}
