//! HTTP request handlers for the vendhook API.
//!
//! This module contains all HTTP endpoint handlers following a consistent
//! pattern:
//! - Staged validation with exact wire-contract error bodies
//! - Tracing for observability
//! - Persistence through the `SaleStore` seam
//!
//! # Handler Organization
//!
//! Handlers are grouped by functionality:
//! - `ingest` - Sale webhook ingestion
//! - `health` - Health check and readiness probes

pub mod health;
pub mod ingest;

// Re-export handlers for convenient access
pub use health::{health_check, liveness_check, readiness_check};
pub use ingest::{ingest_sale, method_not_allowed};
