//! Core domain types and persistence for the vendhook sale ingestion
//! service.
//!
//! Provides the strongly-typed sale model, error classification for
//! storage failures, a clock abstraction for deterministic time in
//! tests, and the Postgres repository layer. The API crate builds its
//! HTTP surface on top of these types.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod models;
pub mod storage;
pub mod time;

pub use error::{CoreError, Result};
pub use models::{SaleId, SaleRecord};
pub use time::{Clock, RealClock, TestClock};
