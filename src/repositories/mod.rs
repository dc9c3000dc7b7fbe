pub mod order_repository;

pub use order_repository::{FileOrderStore, InMemoryOrderStore, OrderRepository, OrderStore};
