//! Order service.

use common::{Money, OrderId, ProductId, UserId};
use store::{NewOrder, Order, OrderPatch, Store};

use crate::error::{DomainError, Entity};
use crate::validation;

/// Input for order creation. The total is not part of the input; it is
/// derived from the current unit prices.
#[derive(Debug, Clone)]
pub struct CreateOrder {
    pub user_id: UserId,
    /// One entry per unit; the same product may appear several times.
    pub product_ids: Vec<ProductId>,
}

/// Service for managing orders.
pub struct OrderService<S: Store> {
    store: S,
}

impl<S: Store> OrderService<S> {
    /// Creates a new order service over the given gateway.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Creates an order.
    ///
    /// The total is the sum of the current unit price of every entry of
    /// `product_ids`, plus 20% VAT, rounded to the cent. It is computed
    /// exactly once here; later price changes never touch it. Every entry
    /// must reference an existing product.
    #[tracing::instrument(skip(self, order), fields(user_id = %order.user_id))]
    pub async fn create(&self, order: CreateOrder) -> Result<Order, DomainError> {
        validation::order_create(&order)?;

        let prices = self
            .store
            .unit_prices(&order.product_ids)
            .await
            .map_err(DomainError::storage)?;

        let mut subtotal = Money::zero();
        for id in &order.product_ids {
            let price = prices
                .get(id)
                .ok_or(DomainError::NotFound(Entity::Product))?;
            subtotal += *price;
        }

        let created = self
            .store
            .insert_order(NewOrder {
                user_id: order.user_id,
                product_ids: order.product_ids,
                total: subtotal.with_vat(),
            })
            .await
            .map_err(DomainError::storage)?;

        metrics::counter!("orders_created_total").increment(1);
        tracing::info!(id = %created.id, total = %created.total, "order created");
        Ok(created)
    }

    /// Lists all orders.
    #[tracing::instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<Order>, DomainError> {
        self.store.list_orders().await.map_err(DomainError::storage)
    }

    /// Loads an order by id. Returns `None` if it doesn't exist.
    #[tracing::instrument(skip(self))]
    pub async fn get(&self, id: OrderId) -> Result<Option<Order>, DomainError> {
        self.store.get_order(id).await.map_err(DomainError::storage)
    }

    /// Updates the payment flag.
    #[tracing::instrument(skip(self, patch))]
    pub async fn update(&self, id: OrderId, patch: OrderPatch) -> Result<Order, DomainError> {
        validation::order_patch(&patch)?;

        self.store
            .update_order(id, patch)
            .await
            .map_err(|e| DomainError::from_store(e, Entity::Order))
    }

    /// Deletes an order.
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, id: OrderId) -> Result<(), DomainError> {
        self.store
            .delete_order(id)
            .await
            .map_err(|e| DomainError::from_store(e, Entity::Order))
    }
}
