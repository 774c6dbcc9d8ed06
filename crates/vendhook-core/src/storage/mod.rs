//! Database access layer implementing the repository pattern for sale
//! persistence.
//!
//! The repository layer translates between domain models and the database
//! schema. All database operations go through these repositories; direct
//! SQL queries outside this module are forbidden to keep the query
//! surface auditable.

use std::sync::Arc;

use sqlx::PgPool;

pub mod sales;

use crate::error::Result;

/// Container for repository instances providing unified database access.
///
/// The `Storage` struct is the entry point for all database operations in
/// vendhook. It manages a shared connection pool and provides type-safe
/// access to each repository.
#[derive(Clone)]
pub struct Storage {
    /// Repository for sale row operations.
    pub sales: Arc<sales::Repository>,
}

impl Storage {
    /// Creates a new storage instance with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        let pool = Arc::new(pool);

        Self { sales: Arc::new(sales::Repository::new(pool)) }
    }

    /// Performs a health check on the database connection.
    ///
    /// Executes a simple query to verify database connectivity. Used by
    /// the readiness and health endpoints.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Database` if the connection is unhealthy or
    /// the query times out.
    pub async fn health_check(&self) -> Result<()> {
        let _: (i32,) = sqlx::query_as("SELECT 1").fetch_one(&*self.sales.pool()).await?;

        Ok(())
    }
}
