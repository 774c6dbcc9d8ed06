//! Shared-secret verification for the ingestion endpoint.
//!
//! Devices authenticate by presenting a static secret in the
//! `x-webhook-secret` header. Comparison is constant-time so a mismatch
//! never leaks prefix information through timing.

use axum::http::HeaderMap;

use crate::error::IngestError;

/// Header carrying the shared secret. Header name lookup is
/// case-insensitive, so devices may send any casing.
pub const SECRET_HEADER: &str = "x-webhook-secret";

/// Verifies the request carries the expected shared secret.
///
/// # Errors
///
/// Returns `IngestError::Unauthorized` when the header is missing, not
/// valid UTF-8, or does not match the configured secret exactly.
pub fn verify_secret(headers: &HeaderMap, expected: &str) -> Result<(), IngestError> {
    let presented = extract_secret(headers).ok_or(IngestError::Unauthorized)?;

    if timing_safe_eq(presented, expected) {
        Ok(())
    } else {
        Err(IngestError::Unauthorized)
    }
}

/// Extracts the shared secret from request headers.
fn extract_secret(headers: &HeaderMap) -> Option<&str> {
    headers.get(SECRET_HEADER).and_then(|value| value.to_str().ok())
}

/// Timing-safe string comparison to prevent timing attacks.
///
/// Uses constant-time comparison to avoid leaking information about the
/// expected secret through timing analysis.
fn timing_safe_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let a_bytes = a.as_bytes();
    let b_bytes = b.as_bytes();

    let mut result = 0u8;
    for (a_byte, b_byte) in a_bytes.iter().zip(b_bytes.iter()) {
        result |= a_byte ^ b_byte;
    }

    result == 0
}

#[cfg(test)]
mod tests {
    use axum::http::{HeaderName, HeaderValue};

    use super::*;

    fn headers_with(name: &'static str, value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(name, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn accepts_exact_match() {
        let headers = headers_with("x-webhook-secret", "s3cret");
        assert!(verify_secret(&headers, "s3cret").is_ok());
    }

    #[test]
    fn rejects_missing_header() {
        let headers = HeaderMap::new();
        assert!(matches!(
            verify_secret(&headers, "s3cret"),
            Err(IngestError::Unauthorized)
        ));
    }

    #[test]
    fn rejects_wrong_value() {
        let headers = headers_with("x-webhook-secret", "nope");
        assert!(verify_secret(&headers, "s3cret").is_err());
    }

    #[test]
    fn rejects_case_variant_value() {
        // Header names are case-insensitive, values are not
        let headers = headers_with("x-webhook-secret", "S3CRET");
        assert!(verify_secret(&headers, "s3cret").is_err());
    }

    #[test]
    fn header_name_lookup_is_case_insensitive() {
        let name = HeaderName::from_bytes(b"X-Webhook-Secret").expect("valid header name");
        let mut headers = HeaderMap::new();
        headers.insert(name, HeaderValue::from_static("s3cret"));

        assert!(verify_secret(&headers, "s3cret").is_ok());
    }

    #[test]
    fn timing_safe_eq_handles_all_cases() {
        assert!(timing_safe_eq("same", "same"));
        assert!(!timing_safe_eq("same", "diff"));
        assert!(!timing_safe_eq("short", "longer string"));
        assert!(timing_safe_eq("", ""));
    }
}
