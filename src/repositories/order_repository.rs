use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, warn};

use crate::errors::ServiceError;
use crate::models::Order;

/// Well-known name of the persisted order collection.
pub const ORDERS_KEY: &str = "simona_orders";

/// Raw storage backend for the order collection.
///
/// Implementations only append and read back; the collection is never
/// rewritten in place by callers.
#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn append(&self, order: &Order) -> Result<(), ServiceError>;

    async fn load_all(&self) -> Result<Vec<Order>, ServiceError>;
}

/// Process-local order collection, used by tests and the default dev setup.
#[derive(Debug, Default)]
pub struct InMemoryOrderStore {
    orders: RwLock<Vec<Order>>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn append(&self, order: &Order) -> Result<(), ServiceError> {
        self.orders.write().await.push(order.clone());
        Ok(())
    }

    async fn load_all(&self) -> Result<Vec<Order>, ServiceError> {
        Ok(self.orders.read().await.clone())
    }
}

/// Order collection kept as a single JSON array on disk.
///
/// Each append reads the whole file, pushes the record and writes the array
/// back. Writers inside this process are serialized; other processes writing
/// the same file race and the last write wins.
#[derive(Debug)]
pub struct FileOrderStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileOrderStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(format!("{}.json", ORDERS_KEY)),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_collection(&self) -> Result<Vec<Order>, ServiceError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_slice::<Vec<Order>>(&bytes) {
            Ok(orders) => Ok(orders),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Unreadable order collection, treating as empty");
                Ok(Vec::new())
            }
        }
    }
}

#[async_trait]
impl OrderStore for FileOrderStore {
    async fn append(&self, order: &Order) -> Result<(), ServiceError> {
        let _guard = self.write_lock.lock().await;

        let mut orders = self.read_collection().await?;
        orders.push(order.clone());

        let payload = serde_json::to_vec_pretty(&orders)?;
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.path, payload).await?;
        Ok(())
    }

    async fn load_all(&self) -> Result<Vec<Order>, ServiceError> {
        self.read_collection().await
    }
}

/// Storage port for orders.
///
/// Storage failures never reach the checkout flow: writes are logged and
/// dropped, reads fall back to an empty collection.
#[derive(Clone)]
pub struct OrderRepository {
    store: Arc<dyn OrderStore>,
}

impl OrderRepository {
    pub fn new(store: Arc<dyn OrderStore>) -> Self {
        Self { store }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryOrderStore::new()))
    }

    /// Append an order record.
    pub async fn save(&self, order: &Order) {
        match self.store.append(order).await {
            Ok(()) => debug!(order_id = %order.order_id(), status = %order.status, "Order stored"),
            Err(e) => error!(order_id = %order.order_id(), error = %e, "Failed to store order"),
        }
    }

    /// Latest record for an order id, or `None` when no record exists.
    pub async fn find_by_id(&self, order_id: &str) -> Option<Order> {
        self.list()
            .await
            .into_iter()
            .rev()
            .find(|order| order.order_id() == order_id)
    }

    /// Every stored record in append order.
    pub async fn list(&self) -> Vec<Order> {
        match self.store.load_all().await {
            Ok(orders) => orders,
            Err(e) => {
                error!(error = %e, "Failed to read orders");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        CheckoutData, CustomerDetails, OrderStatus, PaymentMethod, ShippingAddress,
    };
    use rust_decimal_macros::dec;
    use tempfile::TempDir;

    fn order(id: &str, status: OrderStatus) -> Order {
        Order::new(
            CheckoutData {
                order_id: id.to_string(),
                items: vec![],
                customer: CustomerDetails {
                    name: "Ani".into(),
                    email: "ani@example.am".into(),
                    phone: "+37491000000".into(),
                },
                shipping: ShippingAddress {
                    country: "Armenia".into(),
                    city: "Yerevan".into(),
                    postal_code: "0010".into(),
                    street_address: "1 Abovyan St".into(),
                },
                shipping_cost: dec!(5),
                total_usd: dec!(45.00),
                total_amd: 17550,
                payment_method: PaymentMethod::DeviceWallet,
            },
            status,
        )
    }

    struct BrokenStore;

    #[async_trait]
    impl OrderStore for BrokenStore {
        async fn append(&self, _order: &Order) -> Result<(), ServiceError> {
            Err(ServiceError::StorageError("quota exceeded".into()))
        }

        async fn load_all(&self) -> Result<Vec<Order>, ServiceError> {
            Err(ServiceError::StorageError("unavailable".into()))
        }
    }

    #[tokio::test]
    async fn in_memory_round_trip() {
        let repo = OrderRepository::in_memory();
        let stored = order("ORD-1-A", OrderStatus::Completed);
        repo.save(&stored).await;

        assert_eq!(repo.find_by_id("ORD-1-A").await, Some(stored));
        assert_eq!(repo.find_by_id("ORD-MISSING").await, None);
    }

    #[tokio::test]
    async fn lookup_returns_latest_record() {
        let repo = OrderRepository::in_memory();
        repo.save(&order("ORD-2-B", OrderStatus::Pending)).await;
        repo.save(&order("ORD-2-B", OrderStatus::Completed)).await;

        let found = repo.find_by_id("ORD-2-B").await.unwrap();
        assert_eq!(found.status, OrderStatus::Completed);
        assert_eq!(repo.list().await.len(), 2);
    }

    #[tokio::test]
    async fn storage_failures_are_swallowed() {
        let repo = OrderRepository::new(Arc::new(BrokenStore));
        repo.save(&order("ORD-3-C", OrderStatus::Completed)).await;
        assert_eq!(repo.find_by_id("ORD-3-C").await, None);
        assert!(repo.list().await.is_empty());
    }

    #[tokio::test]
    async fn file_store_persists_across_instances() {
        let dir = TempDir::new().unwrap();
        let stored = order("ORD-4-D", OrderStatus::Completed);

        OrderRepository::new(Arc::new(FileOrderStore::new(dir.path())))
            .save(&stored)
            .await;

        let reopened = OrderRepository::new(Arc::new(FileOrderStore::new(dir.path())));
        assert_eq!(reopened.find_by_id("ORD-4-D").await, Some(stored));
    }

    #[tokio::test]
    async fn file_store_treats_garbage_as_empty() {
        let dir = TempDir::new().unwrap();
        let store = FileOrderStore::new(dir.path());
        std::fs::write(store.path(), b"{not json").unwrap();

        let repo = OrderRepository::new(Arc::new(store));
        assert!(repo.list().await.is_empty());

        repo.save(&order("ORD-5-E", OrderStatus::Pending)).await;
        assert_eq!(repo.list().await.len(), 1);
    }
}
