//! Pure validation rules, one function per entity and operation.
//!
//! These functions are side-effect free and never panic on expected input
//! shapes; they either accept or name the violated rule. Referential checks
//! that need storage (does this product exist?) live in the services, not
//! here.

use store::{NewProduct, NewReview, OrderPatch, ProductPatch, ReviewPatch};
use thiserror::Error;

use crate::order::CreateOrder;

/// A violated validation rule. The display form is the client-facing
/// message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is absent or empty.
    #[error("Données invalides")]
    MissingOrEmpty { field: &'static str },

    /// The review score is outside [1, 5].
    #[error("Le score doit être entre 1 et 5")]
    ScoreOutOfRange,

    /// A partial update carried no updatable field.
    #[error("Aucune donnée à mettre à jour")]
    NothingToUpdate,
}

fn required_text(value: &str, field: &'static str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::MissingOrEmpty { field });
    }
    Ok(())
}

fn score_in_range(score: i32) -> Result<(), ValidationError> {
    if !(1..=5).contains(&score) {
        return Err(ValidationError::ScoreOutOfRange);
    }
    Ok(())
}

/// Product creation requires a name, a description and a price.
///
/// A price of exactly zero is rejected like a missing one; zero has never
/// been a valid price on this API.
pub fn product_create(product: &NewProduct) -> Result<(), ValidationError> {
    required_text(&product.name, "name")?;
    required_text(&product.about, "about")?;
    if !product.price.is_positive() {
        return Err(ValidationError::MissingOrEmpty { field: "price" });
    }
    Ok(())
}

/// Product updates must carry at least one of name and price.
pub fn product_patch(patch: &ProductPatch) -> Result<(), ValidationError> {
    if patch.name.is_none() && patch.price.is_none() {
        return Err(ValidationError::NothingToUpdate);
    }
    if let Some(name) = &patch.name {
        required_text(name, "name")?;
    }
    if let Some(price) = patch.price
        && !price.is_positive()
    {
        return Err(ValidationError::MissingOrEmpty { field: "price" });
    }
    Ok(())
}

/// Order creation requires at least one product unit.
pub fn order_create(order: &CreateOrder) -> Result<(), ValidationError> {
    if order.product_ids.is_empty() {
        return Err(ValidationError::MissingOrEmpty {
            field: "productIds",
        });
    }
    Ok(())
}

/// Order updates must carry the payment flag.
pub fn order_patch(patch: &OrderPatch) -> Result<(), ValidationError> {
    if patch.payment.is_none() {
        return Err(ValidationError::MissingOrEmpty { field: "payment" });
    }
    Ok(())
}

/// Review creation requires content and a score within [1, 5].
pub fn review_create(review: &NewReview) -> Result<(), ValidationError> {
    required_text(&review.content, "content")?;
    score_in_range(review.score)
}

/// Review updates must carry at least one of score and content.
pub fn review_patch(patch: &ReviewPatch) -> Result<(), ValidationError> {
    if patch.score.is_none() && patch.content.is_none() {
        return Err(ValidationError::NothingToUpdate);
    }
    if let Some(score) = patch.score {
        score_in_range(score)?;
    }
    if let Some(content) = &patch.content {
        required_text(content, "content")?;
    }
    Ok(())
}
