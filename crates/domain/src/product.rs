//! Product service.

use common::{ProductId, UserId};
use store::{NewProduct, Product, ProductFilter, ProductPatch, Review, Store};

use crate::error::{DomainError, Entity};
use crate::validation;

/// A product together with its reviews and the users who wrote them.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductDetails {
    pub product: Product,
    pub reviews: Vec<Review>,
    pub reviewers: Vec<UserId>,
}

/// Service for managing products.
pub struct ProductService<S: Store> {
    store: S,
}

impl<S: Store> ProductService<S> {
    /// Creates a new product service over the given gateway.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Creates a product. The review aggregate starts empty.
    #[tracing::instrument(skip(self, product), fields(name = %product.name))]
    pub async fn create(&self, product: NewProduct) -> Result<Product, DomainError> {
        validation::product_create(&product)?;

        let created = self
            .store
            .insert_product(product)
            .await
            .map_err(DomainError::storage)?;

        metrics::counter!("products_created_total").increment(1);
        tracing::info!(id = %created.id, "product created");
        Ok(created)
    }

    /// Lists products matching the optional filters (ANDed together).
    #[tracing::instrument(skip(self, filter))]
    pub async fn list(&self, filter: &ProductFilter) -> Result<Vec<Product>, DomainError> {
        self.store
            .list_products(filter)
            .await
            .map_err(DomainError::storage)
    }

    /// Loads a product by id. Returns `None` if it doesn't exist.
    #[tracing::instrument(skip(self))]
    pub async fn get(&self, id: ProductId) -> Result<Option<Product>, DomainError> {
        self.store.get_product(id).await.map_err(DomainError::storage)
    }

    /// Loads a product with its reviews and reviewer ids embedded.
    /// Returns `None` if the product doesn't exist.
    #[tracing::instrument(skip(self))]
    pub async fn get_detailed(&self, id: ProductId) -> Result<Option<ProductDetails>, DomainError> {
        let Some(product) = self.get(id).await? else {
            return Ok(None);
        };

        let reviews = self
            .store
            .reviews_for_product(id)
            .await
            .map_err(DomainError::storage)?;

        // Each reviewer listed once, in order of their first review.
        let mut reviewers: Vec<UserId> = Vec::new();
        for review in &reviews {
            if !reviewers.contains(&review.user_id) {
                reviewers.push(review.user_id);
            }
        }

        Ok(Some(ProductDetails {
            product,
            reviews,
            reviewers,
        }))
    }

    /// Applies a partial update to name and/or price.
    #[tracing::instrument(skip(self, patch))]
    pub async fn update(&self, id: ProductId, patch: ProductPatch) -> Result<Product, DomainError> {
        validation::product_patch(&patch)?;

        self.store
            .update_product(id, patch)
            .await
            .map_err(|e| DomainError::from_store(e, Entity::Product))
    }

    /// Deletes a product. Its reviews stay addressable but orphaned.
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, id: ProductId) -> Result<(), DomainError> {
        self.store
            .delete_product(id)
            .await
            .map_err(|e| DomainError::from_store(e, Entity::Product))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::Money;
    use store::InMemoryStore;

    fn service() -> ProductService<InMemoryStore> {
        ProductService::new(InMemoryStore::new())
    }

    fn keyboard() -> NewProduct {
        NewProduct {
            name: "Clavier".to_string(),
            about: "Un clavier mécanique".to_string(),
            price: Money::from_units(80),
        }
    }

    #[tokio::test]
    async fn create_and_get_roundtrip() {
        let service = service();

        let created = service.create(keyboard()).await.unwrap();
        assert_eq!(created.average_score, 0.0);
        assert!(created.review_ids.is_empty());

        let fetched = service.get(created.id).await.unwrap().unwrap();
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn create_rejects_invalid_input() {
        let service = service();

        let mut p = keyboard();
        p.price = Money::zero();
        let err = service.create(p).await.unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        assert_eq!(err.to_string(), "Données invalides");
    }

    #[tokio::test]
    async fn update_requires_a_field_and_an_existing_product() {
        let service = service();
        let product = service.create(keyboard()).await.unwrap();

        let err = service
            .update(product.id, ProductPatch::default())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Aucune donnée à mettre à jour");

        let err = service
            .update(
                ProductId::from_i64(404),
                ProductPatch {
                    name: Some("Souris".to_string()),
                    price: None,
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Produit non trouvé");

        let updated = service
            .update(
                product.id,
                ProductPatch {
                    name: None,
                    price: Some(Money::from_units(90)),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.price, Money::from_units(90));
        assert_eq!(updated.name, "Clavier");
    }

    #[tokio::test]
    async fn delete_then_get_returns_none() {
        let service = service();
        let product = service.create(keyboard()).await.unwrap();

        service.delete(product.id).await.unwrap();
        assert!(service.get(product.id).await.unwrap().is_none());

        let err = service.delete(product.id).await.unwrap_err();
        assert_eq!(err.to_string(), "Produit non trouvé");
    }

    #[tokio::test]
    async fn detailed_view_embeds_reviews_and_reviewers() {
        let store = InMemoryStore::new();
        let service = ProductService::new(store.clone());
        let product = service.create(keyboard()).await.unwrap();

        for (user, score) in [(1, 5), (2, 3), (1, 4)] {
            store
                .insert_review(store::NewReview {
                    user_id: UserId::from_i64(user),
                    product_id: product.id,
                    score,
                    content: "bien".to_string(),
                })
                .await
                .unwrap();
        }

        let details = service.get_detailed(product.id).await.unwrap().unwrap();
        assert_eq!(details.reviews.len(), 3);
        assert_eq!(details.product.average_score, 4.0);
        // user 1 appears once despite two reviews
        assert_eq!(
            details.reviewers,
            vec![UserId::from_i64(1), UserId::from_i64(2)]
        );

        assert!(
            service
                .get_detailed(ProductId::from_i64(404))
                .await
                .unwrap()
                .is_none()
        );
    }
}
