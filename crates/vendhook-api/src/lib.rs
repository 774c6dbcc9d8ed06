//! HTTP ingestion surface for the vendhook sale service.
//!
//! Accepts point-of-sale webhooks from vending devices, authenticates
//! them with a shared secret, validates the payload in stages with exact
//! wire-contract error bodies, and persists one row per transaction.
//!
//! The crate wires configuration loading, router assembly, the secret
//! gate, and the ingestion and health handlers around the storage seam
//! defined in [`store`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod server;
pub mod store;

pub use config::Config;
pub use error::IngestError;
pub use server::{create_router, start_server, AppState};
pub use store::{PostgresSaleStore, SaleStore};
