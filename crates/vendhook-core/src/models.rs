//! Core domain models and strongly-typed identifiers.
//!
//! Defines the persisted sale record and its newtype ID wrapper for
//! compile-time type safety, along with the database serialization traits
//! that let them flow through sqlx queries directly.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

type PgDb = sqlx::Postgres;
type PgValueRef<'r> = sqlx::postgres::PgValueRef<'r>;
type PgTypeInfo = sqlx::postgres::PgTypeInfo;
type PgArgumentBuffer = sqlx::postgres::PgArgumentBuffer;
type EncodeResult =
    Result<sqlx::encode::IsNull, Box<dyn std::error::Error + Send + Sync + 'static>>;
type BoxDynError = sqlx::error::BoxDynError;

/// Strongly-typed sale identifier.
///
/// Wraps a UUID to prevent mixing with other ID types. Assigned when a
/// sale is ingested and immutable afterwards.
///
/// # Example
///
/// ```
/// use vendhook_core::models::SaleId;
/// let sale_id = SaleId::new();
/// println!("Recording sale: {}", sale_id);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SaleId(pub Uuid);

impl SaleId {
    /// Creates a new random sale ID.
    ///
    /// Uses UUID v4 for globally unique identifiers without coordination.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SaleId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SaleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for SaleId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl sqlx::Type<PgDb> for SaleId {
    fn type_info() -> PgTypeInfo {
        <Uuid as sqlx::Type<PgDb>>::type_info()
    }
}

impl<'r> sqlx::Decode<'r, PgDb> for SaleId {
    fn decode(value: PgValueRef<'r>) -> Result<Self, BoxDynError> {
        let uuid = <Uuid as sqlx::Decode<PgDb>>::decode(value)?;
        Ok(Self(uuid))
    }
}

impl sqlx::Encode<'_, PgDb> for SaleId {
    fn encode_by_ref(&self, buf: &mut PgArgumentBuffer) -> EncodeResult {
        <Uuid as sqlx::Encode<PgDb>>::encode_by_ref(&self.0, buf)
    }
}

/// A point-of-sale transaction as stored in the `sales` table.
///
/// The same shape is echoed back to the reporting device on successful
/// ingestion, so the response always mirrors what was written rather than
/// what was sent.
///
/// # Idempotency
///
/// Sales deduplicate on `txn`. The column carries a unique constraint, so
/// a raced duplicate insert fails with a constraint violation instead of
/// writing a second row.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SaleRecord {
    /// Unique identifier for this sale row.
    pub id: SaleId,

    /// Device that reported the sale, when the payload names one.
    pub device: Option<String>,

    /// Vending machine identifier.
    pub vendo: String,

    /// Sale amount. Zero is a valid amount (free vend).
    pub amount: f64,

    /// Transaction identifier from the device. The idempotency key.
    pub txn: String,

    /// When the sale happened. Falls back to receipt time when the device
    /// does not report one.
    pub ts: DateTime<Utc>,
}

impl SaleRecord {
    /// Creates a sale record with a fresh ID, ready for insertion.
    pub fn new(
        device: Option<String>,
        vendo: String,
        amount: f64,
        txn: String,
        ts: DateTime<Utc>,
    ) -> Self {
        Self { id: SaleId::new(), device, vendo, amount, txn, ts }
    }
}
