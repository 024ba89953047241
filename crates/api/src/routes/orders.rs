//! Order CRUD endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use common::{Money, OrderId, ProductId, UserId};
use domain::CreateOrder;
use serde::{Deserialize, Serialize};
use store::{Order, OrderPatch, Store};

use crate::AppState;
use crate::error::{ApiError, invalid_data};

// -- Request types --

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub user_id: UserId,
    pub product_ids: Vec<ProductId>,
}

#[derive(Deserialize)]
pub struct PatchOrderRequest {
    pub payment: Option<bool>,
}

// -- Response types --

#[derive(Serialize)]
pub struct OrderResponse {
    pub id: OrderId,
    pub user_id: UserId,
    pub product_ids: Vec<ProductId>,
    pub total: Money,
    pub payment: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        Self {
            id: order.id,
            user_id: order.user_id,
            product_ids: order.product_ids,
            total: order.total,
            payment: order.payment,
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }
}

// -- Handlers --

/// POST /orders — create an order; the total (with VAT) is computed from
/// the current unit prices and never changes afterwards.
#[tracing::instrument(skip(state, payload))]
pub async fn create<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    payload: Result<Json<CreateOrderRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError> {
    let Json(req) = payload.map_err(invalid_data)?;

    let order = state
        .orders
        .create(CreateOrder {
            user_id: req.user_id,
            product_ids: req.product_ids,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(order.into())))
}

/// GET /orders — list all orders.
#[tracing::instrument(skip(state))]
pub async fn list<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let orders = state.orders.list().await?;
    Ok(Json(orders.into_iter().map(Into::into).collect()))
}

/// GET /orders/:id — load an order by id.
#[tracing::instrument(skip(state))]
pub async fn get<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<OrderResponse>, ApiError> {
    let Path(id) = path.map_err(invalid_data)?;

    let order = state
        .orders
        .get(OrderId::from_i64(id))
        .await?
        .ok_or_else(|| ApiError::NotFound(domain::Entity::Order.not_found_message().to_string()))?;

    Ok(Json(order.into()))
}

/// PATCH /orders/:id — update the payment flag.
#[tracing::instrument(skip(state, payload))]
pub async fn update<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    path: Result<Path<i64>, PathRejection>,
    payload: Result<Json<PatchOrderRequest>, JsonRejection>,
) -> Result<Json<OrderResponse>, ApiError> {
    let Path(id) = path.map_err(invalid_data)?;
    let Json(req) = payload.map_err(invalid_data)?;

    let order = state
        .orders
        .update(
            OrderId::from_i64(id),
            OrderPatch {
                payment: req.payment,
            },
        )
        .await?;

    Ok(Json(order.into()))
}

/// DELETE /orders/:id — delete an order. Returns 204 with no body.
#[tracing::instrument(skip(state))]
pub async fn delete<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = path.map_err(invalid_data)?;

    state.orders.delete(OrderId::from_i64(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
