//! Domain error taxonomy.

use store::StoreError;
use thiserror::Error;

use crate::validation::ValidationError;

/// Entity kind carried by not-found errors, selecting the user-facing
/// message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Product,
    Order,
    Review,
}

impl Entity {
    /// The client-facing message for a missing entity of this kind.
    pub fn not_found_message(&self) -> &'static str {
        match self {
            Entity::Product => "Produit non trouvé",
            Entity::Order => "Commande non trouvée",
            Entity::Review => "Avis non trouvé",
        }
    }
}

/// Errors produced by the entity services.
///
/// The display form of every variant is safe to return to clients; storage
/// detail stays in the error source and is only ever logged.
#[derive(Debug, Error)]
pub enum DomainError {
    /// Malformed, missing or out-of-range input. Always client-caused.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A referenced id is absent.
    #[error("{}", .0.not_found_message())]
    NotFound(Entity),

    /// A storage failure not attributable to caller input.
    #[error("Erreur serveur")]
    Storage(#[source] StoreError),
}

impl DomainError {
    /// Wraps a gateway error, attributing `NotFound` to the given entity.
    pub(crate) fn from_store(err: StoreError, entity: Entity) -> Self {
        match err {
            StoreError::NotFound => DomainError::NotFound(entity),
            other => DomainError::Storage(other),
        }
    }

    /// Wraps a gateway error where `NotFound` cannot legitimately occur.
    pub(crate) fn storage(err: StoreError) -> Self {
        DomainError::Storage(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_messages_are_entity_specific() {
        assert_eq!(
            DomainError::NotFound(Entity::Product).to_string(),
            "Produit non trouvé"
        );
        assert_eq!(
            DomainError::NotFound(Entity::Order).to_string(),
            "Commande non trouvée"
        );
        assert_eq!(
            DomainError::NotFound(Entity::Review).to_string(),
            "Avis non trouvé"
        );
    }

    #[test]
    fn storage_errors_display_a_generic_message() {
        let err = DomainError::Storage(StoreError::NotFound);
        assert_eq!(err.to_string(), "Erreur serveur");
    }
}
