mod aggregate;
pub mod error;
pub mod gateway;
pub mod memory;
pub mod postgres;
pub mod records;

pub use error::{Result, StoreError};
pub use gateway::Store;
pub use memory::InMemoryStore;
pub use postgres::PostgresStore;
pub use records::{
    NewOrder, NewProduct, NewReview, Order, OrderPatch, Product, ProductFilter, ProductPatch,
    Review, ReviewPatch,
};
