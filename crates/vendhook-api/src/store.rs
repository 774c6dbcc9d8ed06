//! Storage abstraction layer for the ingestion endpoint.
//!
//! Provides a trait-based seam over sale persistence so handlers can be
//! tested without a database. Production uses the concrete
//! `vendhook_core::storage::Storage`; tests inject the in-memory mock
//! with controllable failures.

use std::{future::Future, pin::Pin, sync::Arc};

use vendhook_core::{error::Result, models::SaleRecord, storage::Storage};

/// Storage operations required by the ingestion pipeline.
///
/// Abstracts the dedupe lookup, the insert, and the connectivity probe.
/// The separation allows testing validation order, duplicate handling,
/// and failure mapping without database overhead.
pub trait SaleStore: Send + Sync + 'static {
    /// Looks up a sale by its transaction identifier.
    ///
    /// The dedupe check before insertion. `None` means the transaction
    /// has not been recorded yet.
    fn find_by_txn(
        &self,
        txn: String,
    ) -> Pin<Box<dyn Future<Output = Result<Option<SaleRecord>>> + Send + '_>>;

    /// Inserts a sale and returns the stored row.
    ///
    /// Must fail with `CoreError::ConstraintViolation` when a row with
    /// the same `txn` already exists, mirroring the unique constraint on
    /// the production table.
    fn insert_sale(
        &self,
        sale: SaleRecord,
    ) -> Pin<Box<dyn Future<Output = Result<SaleRecord>> + Send + '_>>;

    /// Verifies the backing store is reachable.
    fn ping(&self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Production store implementation using PostgreSQL.
///
/// Wraps the concrete `vendhook_core::storage::Storage` to implement the
/// `SaleStore` trait. All database operations go through the repository
/// pattern for consistency and type safety.
pub struct PostgresSaleStore {
    storage: Arc<Storage>,
}

impl PostgresSaleStore {
    /// Creates a new PostgreSQL store adapter.
    pub fn new(storage: Arc<Storage>) -> Self {
        Self { storage }
    }
}

impl SaleStore for PostgresSaleStore {
    fn find_by_txn(
        &self,
        txn: String,
    ) -> Pin<Box<dyn Future<Output = Result<Option<SaleRecord>>> + Send + '_>> {
        let storage = self.storage.clone();
        Box::pin(async move { storage.sales.find_by_txn(&txn).await })
    }

    fn insert_sale(
        &self,
        sale: SaleRecord,
    ) -> Pin<Box<dyn Future<Output = Result<SaleRecord>> + Send + '_>> {
        let storage = self.storage.clone();
        Box::pin(async move { storage.sales.insert(&sale).await })
    }

    fn ping(&self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let storage = self.storage.clone();
        Box::pin(async move { storage.health_check().await })
    }
}

pub mod mock {
    //! Mock store implementation for testing.
    //!
    //! Provides deterministic, in-memory storage for exercising the
    //! ingestion pipeline without a database. Supports one-shot fault
    //! injection for the lookup, insert, and ping paths, plus panic
    //! injection for validating the panic containment layer.

    use std::{future::Future, pin::Pin, sync::Arc};

    use tokio::sync::RwLock;
    use vendhook_core::error::{CoreError, Result};

    use super::{SaleRecord, SaleStore};

    /// Mock store for testing ingestion logic without a database.
    ///
    /// Stores sales in-memory and enforces the same `txn` uniqueness as
    /// the production table. Injected faults fire once and reset.
    pub struct MockSaleStore {
        sales: Arc<RwLock<Vec<SaleRecord>>>,
        find_error: Arc<RwLock<Option<String>>>,
        insert_error: Arc<RwLock<Option<String>>>,
        ping_error: Arc<RwLock<Option<String>>>,
        find_panic: Arc<RwLock<bool>>,
    }

    impl MockSaleStore {
        /// Creates a new mock store with empty state.
        pub fn new() -> Self {
            Self {
                sales: Arc::new(RwLock::new(Vec::new())),
                find_error: Arc::new(RwLock::new(None)),
                insert_error: Arc::new(RwLock::new(None)),
                ping_error: Arc::new(RwLock::new(None)),
                find_panic: Arc::new(RwLock::new(false)),
            }
        }

        /// Preloads a stored sale, as if it was ingested earlier.
        pub async fn seed_sale(&self, sale: SaleRecord) {
            self.sales.write().await.push(sale);
        }

        /// Injects an error for the next lookup operation.
        pub async fn inject_find_error(&self, error: impl Into<String>) {
            *self.find_error.write().await = Some(error.into());
        }

        /// Injects an error for the next insert operation.
        pub async fn inject_insert_error(&self, error: impl Into<String>) {
            *self.insert_error.write().await = Some(error.into());
        }

        /// Injects an error for the next ping operation.
        pub async fn inject_ping_error(&self, error: impl Into<String>) {
            *self.ping_error.write().await = Some(error.into());
        }

        /// Makes the next lookup panic, simulating a driver bug.
        pub async fn inject_find_panic(&self) {
            *self.find_panic.write().await = true;
        }

        /// Returns the number of stored sales for verification.
        pub async fn sale_count(&self) -> usize {
            self.sales.read().await.len()
        }

        /// Returns the stored sale with the given transaction id, if any.
        pub async fn find_stored(&self, txn: &str) -> Option<SaleRecord> {
            self.sales.read().await.iter().find(|sale| sale.txn == txn).cloned()
        }
    }

    impl Default for MockSaleStore {
        fn default() -> Self {
            Self::new()
        }
    }

    impl SaleStore for MockSaleStore {
        fn find_by_txn(
            &self,
            txn: String,
        ) -> Pin<Box<dyn Future<Output = Result<Option<SaleRecord>>> + Send + '_>> {
            let find_panic = self.find_panic.clone();
            let find_error = self.find_error.clone();
            let sales = self.sales.clone();

            Box::pin(async move {
                let should_panic = std::mem::take(&mut *find_panic.write().await);
                if should_panic {
                    panic!("injected storage panic");
                }

                let error = find_error.write().await.take();
                if let Some(error) = error {
                    return Err(CoreError::Database(error));
                }

                Ok(sales.read().await.iter().find(|sale| sale.txn == txn).cloned())
            })
        }

        fn insert_sale(
            &self,
            sale: SaleRecord,
        ) -> Pin<Box<dyn Future<Output = Result<SaleRecord>> + Send + '_>> {
            let insert_error = self.insert_error.clone();
            let sales = self.sales.clone();

            Box::pin(async move {
                let error = insert_error.write().await.take();
                if let Some(error) = error {
                    return Err(CoreError::Database(error));
                }

                let mut sales = sales.write().await;
                if sales.iter().any(|stored| stored.txn == sale.txn) {
                    return Err(CoreError::ConstraintViolation(format!(
                        "unique constraint violation: duplicate key value violates unique \
                         constraint \"sales_txn_key\" (txn={})",
                        sale.txn
                    )));
                }

                sales.push(sale.clone());
                Ok(sale)
            })
        }

        fn ping(&self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
            let ping_error = self.ping_error.clone();

            Box::pin(async move {
                let error = ping_error.write().await.take();
                if let Some(error) = error {
                    return Err(CoreError::Database(error));
                }

                Ok(())
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::{mock::MockSaleStore, SaleRecord, SaleStore};

    fn sample_sale(txn: &str) -> SaleRecord {
        SaleRecord::new(None, "V1".to_string(), 25.0, txn.to_string(), Utc::now())
    }

    #[tokio::test]
    async fn insert_then_find_returns_the_stored_row() {
        let store = MockSaleStore::new();
        let stored = store.insert_sale(sample_sale("T1")).await.expect("insert succeeds");

        let found = store.find_by_txn("T1".to_string()).await.expect("lookup succeeds");
        assert_eq!(found.map(|sale| sale.id), Some(stored.id));
        assert!(store.find_by_txn("T2".to_string()).await.expect("lookup succeeds").is_none());
    }

    #[tokio::test]
    async fn duplicate_insert_hits_the_unique_constraint() {
        let store = MockSaleStore::new();
        store.insert_sale(sample_sale("T1")).await.expect("first insert succeeds");

        let err = store.insert_sale(sample_sale("T1")).await.expect_err("duplicate rejected");
        assert!(err.is_duplicate());
        assert_eq!(store.sale_count().await, 1);
    }

    #[tokio::test]
    async fn injected_errors_fire_once() {
        let store = MockSaleStore::new();
        store.inject_find_error("read timeout").await;

        assert!(store.find_by_txn("T1".to_string()).await.is_err());
        assert!(store.find_by_txn("T1".to_string()).await.expect("second lookup").is_none());
    }
}
