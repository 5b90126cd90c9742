//! SQLite database module for the verification registry
//!
//! All four registries share one relational store. Each request issues
//! standalone statements; the connection mutex is the only coordination
//! between concurrent requests, with SQLite's UNIQUE constraints as the
//! safety net behind the pre-insert existence checks.
//!
//! ## Tables
//!
//! - `institutions` - issuing institutions (unique name/code)
//! - `certificates` - certificates under verification (unique serial)
//! - `verifications` - append-only verification attempts
//! - `flags` - review flags with a mutable resolved bit
//! - `users` / `sessions` - externally-issued sessions, validated here only

pub mod certificates;
pub mod flags;
pub mod institutions;
pub mod schema;
pub mod sessions;
pub mod verifications;

use std::path::Path;
use std::sync::Mutex;

use chrono::Utc;
use rusqlite::Connection;
use tracing::{debug, info};

use crate::error::ApiError;

/// Server-stamped timestamp used for created_at/updated_at columns
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339()
}

/// SQLite database for the verification registry
pub struct RegistryDb {
    conn: Mutex<Connection>,
}

impl RegistryDb {
    /// Open or create the registry database
    pub fn open(db_path: &Path) -> Result<Self, ApiError> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ApiError::Internal(format!("Failed to create data dir: {}", e)))?;
        }

        info!("Opening SQLite database at {:?}", db_path);

        let conn = Connection::open(db_path)
            .map_err(|e| ApiError::Internal(format!("Failed to open SQLite: {}", e)))?;

        // WAL for concurrent reads; FK enforcement backs the referential checks
        conn.execute_batch(
            "PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL; PRAGMA foreign_keys=ON;",
        )
        .map_err(|e| ApiError::Internal(format!("Failed to set PRAGMA: {}", e)))?;

        let db = Self {
            conn: Mutex::new(conn),
        };

        db.init_schema()?;

        Ok(db)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self, ApiError> {
        debug!("Opening in-memory SQLite database");

        let conn = Connection::open_in_memory()
            .map_err(|e| ApiError::Internal(format!("Failed to open in-memory SQLite: {}", e)))?;

        conn.execute_batch("PRAGMA foreign_keys=ON;")
            .map_err(|e| ApiError::Internal(format!("Failed to set PRAGMA: {}", e)))?;

        let db = Self {
            conn: Mutex::new(conn),
        };

        db.init_schema()?;

        Ok(db)
    }

    /// Initialize database schema
    fn init_schema(&self) -> Result<(), ApiError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| ApiError::Internal(format!("Lock poisoned: {}", e)))?;

        schema::init_schema(&conn)?;

        Ok(())
    }

    /// Run a read operation against the connection
    pub fn with_conn<F, T>(&self, f: F) -> Result<T, ApiError>
    where
        F: FnOnce(&Connection) -> Result<T, ApiError>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| ApiError::Internal(format!("Lock poisoned: {}", e)))?;
        f(&conn)
    }

    /// Run a write operation with exclusive access
    pub fn with_conn_mut<F, T>(&self, f: F) -> Result<T, ApiError>
    where
        F: FnOnce(&mut Connection) -> Result<T, ApiError>,
    {
        let mut conn = self
            .conn
            .lock()
            .map_err(|e| ApiError::Internal(format!("Lock poisoned: {}", e)))?;
        f(&mut conn)
    }

    /// Get database statistics
    pub fn stats(&self) -> Result<DbStats, ApiError> {
        self.with_conn(|conn| {
            let count = |table: &str| -> Result<u64, ApiError> {
                let n: i64 = conn
                    .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
                        row.get(0)
                    })
                    .map_err(|e| ApiError::Internal(format!("Query failed: {}", e)))?;
                Ok(n as u64)
            };

            Ok(DbStats {
                institution_count: count("institutions")?,
                certificate_count: count("certificates")?,
                verification_count: count("verifications")?,
                flag_count: count("flags")?,
            })
        })
    }
}

/// Database statistics
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DbStats {
    pub institution_count: u64,
    pub certificate_count: u64,
    pub verification_count: u64,
    pub flag_count: u64,
}

// Re-exports
pub use certificates::{CertificateChanges, CertificateRow, CertificateSummary, NewCertificate};
pub use flags::{FlagRow, FlagSummary};
pub use institutions::{InstitutionChanges, InstitutionCounts, InstitutionQuery, InstitutionRow, NewInstitution};
pub use sessions::SessionRow;
pub use verifications::{NewVerification, RecentVerification, VerificationRow};
