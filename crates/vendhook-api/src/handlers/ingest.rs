//! Sale ingestion handler with staged validation and idempotent
//! persistence.
//!
//! Accepts point-of-sale webhooks, verifies the shared secret, validates
//! the payload in stages, and persists one row per transaction with
//! duplicate detection on `txn`.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, warn};
use vendhook_core::models::SaleRecord;

use crate::{auth, error::IngestError, server::AppState};

/// Raw request payload with every field optional.
///
/// Parsing and required-field validation are separate stages with
/// distinct error responses, so the payload type cannot enforce presence
/// itself.
#[derive(Debug, Default, Deserialize)]
pub struct SalePayload {
    /// Reporting device, stored as-is when present.
    pub device: Option<String>,
    /// Vending machine identifier. Required, non-empty.
    pub vendo: Option<String>,
    /// Sale amount. Required. Zero is valid, null is not.
    pub amount: Option<f64>,
    /// Transaction identifier, the idempotency key. Required, non-empty.
    pub txn: Option<String>,
    /// Sale timestamp. Receipt time is used when absent.
    pub ts: Option<DateTime<Utc>>,
}

impl SalePayload {
    /// Validates required fields, producing the draft ready for storage.
    ///
    /// # Errors
    ///
    /// Returns `IngestError::MissingFields` when `vendo` or `txn` is
    /// absent or empty, or `amount` is absent. The message names all
    /// three fields regardless of which check failed, matching the wire
    /// contract devices already parse.
    pub fn validate(self) -> Result<SaleDraft, IngestError> {
        let vendo = match self.vendo {
            Some(vendo) if !vendo.is_empty() => vendo,
            _ => return Err(IngestError::MissingFields),
        };

        let txn = match self.txn {
            Some(txn) if !txn.is_empty() => txn,
            _ => return Err(IngestError::MissingFields),
        };

        let amount = self.amount.ok_or(IngestError::MissingFields)?;

        Ok(SaleDraft { device: self.device, vendo, amount, txn, ts: self.ts })
    }
}

/// Validated sale fields awaiting ID assignment and timestamp
/// defaulting.
#[derive(Debug)]
pub struct SaleDraft {
    /// Reporting device, if any.
    pub device: Option<String>,
    /// Vending machine identifier, known non-empty.
    pub vendo: String,
    /// Sale amount.
    pub amount: f64,
    /// Transaction identifier, known non-empty.
    pub txn: String,
    /// Device-reported timestamp, if any.
    pub ts: Option<DateTime<Utc>>,
}

/// Response for a newly persisted sale.
#[derive(Debug, Serialize)]
pub struct InsertedResponse {
    /// Always true on success.
    pub ok: bool,
    /// Rows written by this request, echoed as stored.
    pub inserted: Vec<SaleRecord>,
}

/// Response acknowledging an already-recorded transaction.
#[derive(Debug, Serialize)]
pub struct DuplicateResponse {
    /// Always true. Duplicates are an acknowledged no-op, not an error.
    pub ok: bool,
    /// Fixed duplicate notice.
    pub message: String,
    /// The transaction identifier that was ignored.
    pub txn: String,
}

/// Ingests a point-of-sale webhook.
///
/// Validation stages run in order and the first failure wins: shared
/// secret, JSON shape, required fields, duplicate check, insert. The
/// duplicate lookup is best-effort: when it fails the request proceeds
/// to the insert and the unique constraint on `txn` has the final word.
///
/// # Errors
///
/// Returns appropriate HTTP status codes:
/// - 401: Shared secret missing or wrong
/// - 400: Unparseable JSON, or required fields absent
/// - 502: Insert failed upstream
#[instrument(
    name = "ingest_sale",
    skip(state, headers, body),
    fields(content_length = body.len())
)]
pub async fn ingest_sale(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, IngestError> {
    info!("Processing sale webhook");

    if let Err(e) = auth::verify_secret(&headers, state.webhook_secret()) {
        warn!("Rejected sale webhook with missing or invalid secret");
        return Err(e);
    }

    let payload = match parse_payload(&body) {
        Ok(payload) => payload,
        Err(e) => {
            warn!(body_len = body.len(), "Rejected sale webhook with unparseable body");
            return Err(e);
        },
    };

    let draft = match payload.validate() {
        Ok(draft) => draft,
        Err(e) => {
            warn!("Rejected sale webhook with missing required fields");
            return Err(e);
        },
    };

    debug!(txn = %draft.txn, vendo = %draft.vendo, "Sale payload validated");

    match state.store.find_by_txn(draft.txn.clone()).await {
        Ok(Some(existing)) => {
            info!(txn = %existing.txn, "Duplicate txn ignored");
            return Ok(duplicate_response(existing.txn));
        },
        Ok(None) => {
            debug!("No duplicate found, proceeding with insert");
        },
        Err(e) => {
            // Best-effort lookup: the unique constraint still guards the
            // insert, so a failed check must not drop the sale.
            error!(error = %e, txn = %draft.txn, "Dedupe lookup failed, proceeding to insert");
        },
    }

    let received_at = DateTime::<Utc>::from(state.clock.now_system());
    let sale = SaleRecord::new(
        draft.device,
        draft.vendo,
        draft.amount,
        draft.txn,
        draft.ts.unwrap_or(received_at),
    );

    let txn = sale.txn.clone();
    match state.store.insert_sale(sale).await {
        Ok(stored) => {
            info!(txn = %stored.txn, sale_id = %stored.id, "Sale ingested");
            Ok((StatusCode::OK, Json(InsertedResponse { ok: true, inserted: vec![stored] }))
                .into_response())
        },
        Err(e) if e.is_duplicate() => {
            // Lost the race to a concurrent request with the same txn.
            info!(txn = %txn, "Duplicate txn ignored after insert conflict");
            Ok(duplicate_response(txn))
        },
        Err(e) => {
            error!(error = %e, txn = %txn, "Sale insert failed");
            Err(IngestError::WriteFailed { detail: e.to_string() })
        },
    }
}

/// Fallback for non-POST requests to the ingestion route.
///
/// Runs before authentication: a GET with a bad secret is a method
/// problem, not a credential problem.
pub async fn method_not_allowed() -> IngestError {
    warn!("Rejected sale webhook with unsupported method");
    IngestError::MethodNotAllowed
}

/// Parses the request body, treating an empty body as an empty payload.
///
/// Devices that post nothing at all still get the missing-fields
/// response rather than a parse error. The payload must be a JSON
/// object; arrays and scalars are parse errors even when their elements
/// would line up with the payload fields.
fn parse_payload(body: &[u8]) -> Result<SalePayload, IngestError> {
    if body.is_empty() {
        return Ok(SalePayload::default());
    }

    let value: serde_json::Value =
        serde_json::from_slice(body).map_err(|_| IngestError::InvalidJson)?;
    if !value.is_object() {
        return Err(IngestError::InvalidJson);
    }

    serde_json::from_value(value).map_err(|_| IngestError::InvalidJson)
}

/// Builds the acknowledged-duplicate response.
fn duplicate_response(txn: String) -> Response {
    let body = DuplicateResponse { ok: true, message: "Duplicate txn ignored".to_string(), txn };

    (StatusCode::OK, Json(body)).into_response()
}
