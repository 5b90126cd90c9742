//! Credcheck - certificate and credential verification registry
//!
//! REST backend for a certificate verification demo: four registries over a
//! shared SQLite store.
//!
//! - **Institution registry** - issuing institutions with unique name/code
//!   and per-read aggregate counts
//! - **Certificate registry** - certificates with a globally unique serial
//! - **Verification ledger** - append-only verification attempts, with
//!   find-or-create certificate resolution by serial
//! - **Flag workflow** - review flags whose only mutable state is a
//!   resolved bit
//!
//! Sessions are issued by an external identity provider; this crate only
//! validates presented tokens against the sessions table.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod routes;

// Re-exports
pub use config::Config;
pub use db::RegistryDb;
pub use error::ApiError;
pub use routes::{create_router, AppState};
