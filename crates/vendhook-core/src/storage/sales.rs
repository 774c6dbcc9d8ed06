//! Repository for sale row database operations.
//!
//! Provides the dedupe lookup and single-row insert backing the ingestion
//! endpoint. The table is tenant-less: deduplication is global on the
//! `txn` column.

use std::sync::Arc;

use sqlx::PgPool;

use crate::{error::Result, models::SaleRecord};

/// Repository for sale database operations.
pub struct Repository {
    pool: Arc<PgPool>,
}

impl Repository {
    /// Creates a new repository instance.
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    /// Returns a reference to the database pool.
    pub fn pool(&self) -> Arc<PgPool> {
        self.pool.clone()
    }

    /// Finds a sale by its transaction identifier.
    ///
    /// The dedupe lookup that runs before insertion. Limited to one row
    /// since any match means the transaction was already recorded.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    pub async fn find_by_txn(&self, txn: &str) -> Result<Option<SaleRecord>> {
        let sale = sqlx::query_as::<_, SaleRecord>(
            r#"
            SELECT id, device, vendo, amount, txn, ts
            FROM sales
            WHERE txn = $1
            LIMIT 1
            "#,
        )
        .bind(txn)
        .fetch_optional(&*self.pool)
        .await?;

        Ok(sale)
    }

    /// Inserts a sale and returns the stored row.
    ///
    /// `RETURNING` echoes the row as written so the ingestion response
    /// reflects database state rather than request state. A duplicate
    /// `txn` trips the unique constraint and maps to
    /// `CoreError::ConstraintViolation`.
    ///
    /// # Errors
    ///
    /// Returns error if the insert fails or the `txn` unique constraint
    /// is violated.
    pub async fn insert(&self, sale: &SaleRecord) -> Result<SaleRecord> {
        tracing::debug!(
            sale_id = %sale.id,
            txn = %sale.txn,
            vendo = %sale.vendo,
            "Inserting sale row"
        );

        let stored = sqlx::query_as::<_, SaleRecord>(
            r#"
            INSERT INTO sales (id, device, vendo, amount, txn, ts)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, device, vendo, amount, txn, ts
            "#,
        )
        .bind(sale.id)
        .bind(&sale.device)
        .bind(&sale.vendo)
        .bind(sale.amount)
        .bind(&sale.txn)
        .bind(sale.ts)
        .fetch_one(&*self.pool)
        .await?;

        Ok(stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn repository_can_be_created() {
        let pool = sqlx::PgPool::connect_lazy("postgresql://test").unwrap();
        let _repo = Repository::new(Arc::new(pool));
    }
}
