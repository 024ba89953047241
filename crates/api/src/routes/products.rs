//! Product CRUD endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use common::{Money, ProductId, ReviewId, UserId};
use domain::Entity;
use serde::{Deserialize, Serialize};
use store::{NewProduct, Product, ProductFilter, ProductPatch, Store};

use crate::AppState;
use crate::error::{ApiError, invalid_data};
use crate::routes::reviews::ReviewResponse;

// -- Request types --

#[derive(Deserialize)]
pub struct ListProductsQuery {
    pub name: Option<String>,
    pub about: Option<String>,
    /// Maximum price, in currency units.
    pub price: Option<Money>,
}

#[derive(Deserialize)]
pub struct CreateProductRequest {
    pub name: String,
    pub about: String,
    pub price: Money,
}

#[derive(Deserialize)]
pub struct PatchProductRequest {
    pub name: Option<String>,
    pub price: Option<Money>,
}

// -- Response types --

#[derive(Serialize)]
pub struct ProductResponse {
    pub id: ProductId,
    pub name: String,
    pub about: String,
    pub price: Money,
    pub review_ids: Vec<ReviewId>,
    pub average_score: f64,
}

impl From<Product> for ProductResponse {
    fn from(product: Product) -> Self {
        Self {
            id: product.id,
            name: product.name,
            about: product.about,
            price: product.price,
            review_ids: product.review_ids,
            average_score: product.average_score,
        }
    }
}

/// Product with its reviews and reviewers embedded, for the by-id endpoint.
#[derive(Serialize)]
pub struct ProductDetailResponse {
    #[serde(flatten)]
    pub product: ProductResponse,
    pub reviews: Vec<ReviewResponse>,
    pub reviewers: Vec<UserId>,
}

// -- Handlers --

/// GET /products — list products, with optional combinable filters.
#[tracing::instrument(skip(state, query))]
pub async fn list<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    query: Result<Query<ListProductsQuery>, QueryRejection>,
) -> Result<Json<Vec<ProductResponse>>, ApiError> {
    let Query(query) = query.map_err(invalid_data)?;
    let filter = ProductFilter {
        name: query.name,
        about: query.about,
        max_price: query.price,
    };

    let products = state.products.list(&filter).await?;
    Ok(Json(products.into_iter().map(Into::into).collect()))
}

/// POST /products — create a product.
#[tracing::instrument(skip(state, payload))]
pub async fn create<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    payload: Result<Json<CreateProductRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ProductResponse>), ApiError> {
    let Json(req) = payload.map_err(invalid_data)?;

    let product = state
        .products
        .create(NewProduct {
            name: req.name,
            about: req.about,
            price: req.price,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(product.into())))
}

/// GET /products/:id — load a product with its reviews and reviewers.
#[tracing::instrument(skip(state))]
pub async fn get<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<ProductDetailResponse>, ApiError> {
    let Path(id) = path.map_err(invalid_data)?;

    let details = state
        .products
        .get_detailed(ProductId::from_i64(id))
        .await?
        .ok_or_else(|| ApiError::NotFound(Entity::Product.not_found_message().to_string()))?;

    Ok(Json(ProductDetailResponse {
        product: details.product.into(),
        reviews: details.reviews.into_iter().map(Into::into).collect(),
        reviewers: details.reviewers,
    }))
}

/// PATCH /products/:id — update name and/or price.
#[tracing::instrument(skip(state, payload))]
pub async fn update<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    path: Result<Path<i64>, PathRejection>,
    payload: Result<Json<PatchProductRequest>, JsonRejection>,
) -> Result<Json<ProductResponse>, ApiError> {
    let Path(id) = path.map_err(invalid_data)?;
    let Json(req) = payload.map_err(invalid_data)?;

    let product = state
        .products
        .update(
            ProductId::from_i64(id),
            ProductPatch {
                name: req.name,
                price: req.price,
            },
        )
        .await?;

    Ok(Json(product.into()))
}

/// DELETE /products/:id — delete a product. Returns 204 with no body.
#[tracing::instrument(skip(state))]
pub async fn delete<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = path.map_err(invalid_data)?;

    state.products.delete(ProductId::from_i64(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
