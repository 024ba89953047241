//! Domain layer for the boutique backend.
//!
//! This crate provides:
//! - pure validation functions, one per entity and operation
//! - one service per entity (products, orders, reviews), composing the
//!   validation layer with the storage gateway
//! - the error taxonomy the transport adapters map to wire responses

pub mod error;
pub mod order;
pub mod product;
pub mod review;
pub mod validation;

pub use error::{DomainError, Entity};
pub use order::{CreateOrder, OrderService};
pub use product::{ProductDetails, ProductService};
pub use review::ReviewService;
pub use validation::ValidationError;
