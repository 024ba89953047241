//! Review CRUD endpoints. Every mutation here also recomputes the owning
//! product's review aggregate, atomically with the row change.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use common::{ProductId, ReviewId, UserId};
use serde::{Deserialize, Serialize};
use store::{NewReview, Review, ReviewPatch, Store};

use crate::AppState;
use crate::error::{ApiError, invalid_data};

// -- Request types --

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReviewRequest {
    pub user_id: UserId,
    pub product_id: ProductId,
    pub score: i32,
    pub content: String,
}

#[derive(Deserialize)]
pub struct PatchReviewRequest {
    pub score: Option<i32>,
    pub content: Option<String>,
}

// -- Response types --

#[derive(Serialize)]
pub struct ReviewResponse {
    pub id: ReviewId,
    pub user_id: UserId,
    pub product_id: ProductId,
    pub score: i32,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Review> for ReviewResponse {
    fn from(review: Review) -> Self {
        Self {
            id: review.id,
            user_id: review.user_id,
            product_id: review.product_id,
            score: review.score,
            content: review.content,
            created_at: review.created_at,
            updated_at: review.updated_at,
        }
    }
}

// -- Handlers --

/// POST /reviews — create a review for an existing product.
#[tracing::instrument(skip(state, payload))]
pub async fn create<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    payload: Result<Json<CreateReviewRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ReviewResponse>), ApiError> {
    let Json(req) = payload.map_err(invalid_data)?;

    let review = state
        .reviews
        .create(NewReview {
            user_id: req.user_id,
            product_id: req.product_id,
            score: req.score,
            content: req.content,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(review.into())))
}

/// GET /reviews — list all reviews.
#[tracing::instrument(skip(state))]
pub async fn list<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<ReviewResponse>>, ApiError> {
    let reviews = state.reviews.list().await?;
    Ok(Json(reviews.into_iter().map(Into::into).collect()))
}

/// GET /reviews/:id — load a review by id.
#[tracing::instrument(skip(state))]
pub async fn get<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<ReviewResponse>, ApiError> {
    let Path(id) = path.map_err(invalid_data)?;

    let review = state
        .reviews
        .get(ReviewId::from_i64(id))
        .await?
        .ok_or_else(|| {
            ApiError::NotFound(domain::Entity::Review.not_found_message().to_string())
        })?;

    Ok(Json(review.into()))
}

/// PATCH /reviews/:id — update score and/or content.
#[tracing::instrument(skip(state, payload))]
pub async fn update<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    path: Result<Path<i64>, PathRejection>,
    payload: Result<Json<PatchReviewRequest>, JsonRejection>,
) -> Result<Json<ReviewResponse>, ApiError> {
    let Path(id) = path.map_err(invalid_data)?;
    let Json(req) = payload.map_err(invalid_data)?;

    let review = state
        .reviews
        .update(
            ReviewId::from_i64(id),
            ReviewPatch {
                score: req.score,
                content: req.content,
            },
        )
        .await?;

    Ok(Json(review.into()))
}

/// DELETE /reviews/:id — delete a review. Returns 204 with no body.
#[tracing::instrument(skip(state))]
pub async fn delete<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = path.map_err(invalid_data)?;

    state.reviews.delete(ReviewId::from_i64(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
