// Service exports
pub mod auth;
pub mod cache;
pub mod memory;
pub mod postgres;
pub mod rest;
pub mod store;

pub use auth::{Claims, SessionResolver};
pub use cache::{CacheError, CacheKey, CacheManager};
pub use memory::MemoryStore;
pub use postgres::PostgresStore;
pub use rest::RestStore;
pub use store::{DataStore, Filter, StoreError, StoreResult, Table};
