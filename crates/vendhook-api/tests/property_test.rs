//! Property-based tests for sale payload validation invariants.
//!
//! Uses randomly generated inputs to verify that validation accepts
//! exactly the payloads carrying all required fields and preserves every
//! field on the way through.

use proptest::{prelude::*, test_runner::Config as ProptestConfig};
use vendhook_api::{handlers::ingest::SalePayload, IngestError};

/// Creates property test configuration based on environment.
///
/// Uses environment variables:
/// - `PROPTEST_CASES`: Number of test cases (default: 50 for dev, 100 for CI)
/// - `CI`: If set to "true", uses CI configuration
fn proptest_config() -> ProptestConfig {
    let is_ci = std::env::var("CI").unwrap_or_default() == "true";
    let default_cases = if is_ci { 100 } else { 50 };

    let cases =
        std::env::var("PROPTEST_CASES").ok().and_then(|s| s.parse().ok()).unwrap_or(default_cases);

    ProptestConfig::with_cases(cases)
}

proptest! {
    #![proptest_config(proptest_config())]

    /// Verifies complete payloads always validate and no field is mangled.
    #[test]
    fn complete_payloads_validate_and_preserve_fields(
        vendo in "[A-Za-z0-9_-]{1,16}",
        amount in -1.0e9..1.0e9f64,
        txn in "[A-Za-z0-9_-]{1,24}",
        device in prop::option::of("[a-z0-9-]{1,12}"),
    ) {
        let payload = SalePayload {
            device: device.clone(),
            vendo: Some(vendo.clone()),
            amount: Some(amount),
            txn: Some(txn.clone()),
            ts: None,
        };

        let draft = payload.validate();
        prop_assert!(draft.is_ok(), "complete payload must validate");

        let draft = draft.unwrap();
        prop_assert_eq!(draft.device, device);
        prop_assert_eq!(draft.vendo, vendo);
        prop_assert_eq!(draft.amount, amount);
        prop_assert_eq!(draft.txn, txn);
    }

    /// Verifies payloads missing any required field are rejected.
    ///
    /// Absence and empty strings both count as missing, and the rejection
    /// is always the fixed field-list error.
    #[test]
    fn payloads_missing_any_required_field_are_rejected(
        vendo in "[A-Za-z0-9_-]{1,16}",
        amount in -1.0e9..1.0e9f64,
        txn in "[A-Za-z0-9_-]{1,24}",
        gap in 0..5usize,
    ) {
        let payload = SalePayload {
            device: None,
            vendo: match gap {
                0 => None,
                3 => Some(String::new()),
                _ => Some(vendo),
            },
            amount: if gap == 1 { None } else { Some(amount) },
            txn: match gap {
                2 => None,
                4 => Some(String::new()),
                _ => Some(txn),
            },
            ts: None,
        };

        let result = payload.validate();
        prop_assert!(
            matches!(result, Err(IngestError::MissingFields)),
            "incomplete payload must map to the missing-fields error"
        );
    }
}
