//! Append-only verification ledger
//!
//! Rows are inserted once and never updated or deleted individually; they
//! accumulate per certificate and feed the aggregate counts elsewhere.

use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Verification row from database
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationRow {
    pub id: i64,
    pub certificate_id: i64,
    pub status: String,
    pub confidence: f64,
    pub checked_by: Option<String>,
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl VerificationRow {
    fn from_row(row: &Row) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            certificate_id: row.get("certificate_id")?,
            status: row.get("status")?,
            confidence: row.get("confidence")?,
            checked_by: row.get("checked_by")?,
            notes: row.get("notes")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

/// Input for appending a verification
#[derive(Debug, Clone)]
pub struct NewVerification {
    pub certificate_id: i64,
    pub status: String,
    pub confidence: f64,
    pub checked_by: Option<String>,
    pub notes: Option<String>,
}

/// Recent-feed row enriched with the owning certificate
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentVerification {
    pub id: i64,
    pub status: String,
    pub confidence: f64,
    pub checked_by: Option<String>,
    pub notes: Option<String>,
    pub created_at: String,
    pub serial: Option<String>,
    pub holder_name: Option<String>,
}

/// Append a verification row
pub fn insert_verification(
    conn: &Connection,
    input: &NewVerification,
    now: &str,
) -> Result<VerificationRow, ApiError> {
    conn.execute(
        "INSERT INTO verifications (
            certificate_id, status, confidence, checked_by, notes, created_at, updated_at
         ) VALUES (?, ?, ?, ?, ?, ?, ?)",
        params![
            input.certificate_id,
            input.status,
            input.confidence,
            input.checked_by,
            input.notes,
            now,
            now
        ],
    )
    .map_err(|e| ApiError::Internal(format!("Insert failed: {}", e)))?;

    let id = conn.last_insert_rowid();
    let mut stmt = conn
        .prepare("SELECT * FROM verifications WHERE id = ?")
        .map_err(|e| ApiError::Internal(format!("Prepare failed: {}", e)))?;

    stmt.query_row(params![id], |row| VerificationRow::from_row(row))
        .map_err(|e| ApiError::Internal(format!("Verification not found after insert: {}", e)))
}

/// Newest verifications for one certificate, capped
pub fn list_for_certificate(
    conn: &Connection,
    certificate_id: i64,
    limit: u32,
) -> Result<Vec<VerificationRow>, ApiError> {
    let mut stmt = conn
        .prepare(
            "SELECT * FROM verifications WHERE certificate_id = ?
             ORDER BY created_at DESC, id DESC LIMIT ?",
        )
        .map_err(|e| ApiError::Internal(format!("Prepare failed: {}", e)))?;

    let rows = stmt
        .query_map(params![certificate_id, limit as i64], |row| {
            VerificationRow::from_row(row)
        })
        .map_err(|e| ApiError::Internal(format!("Query failed: {}", e)))?;

    rows.collect::<Result<Vec<_>, _>>()
        .map_err(|e| ApiError::Internal(format!("Row parse failed: {}", e)))
}

/// Newest verifications across all certificates, joined to serial/holder
pub fn recent(conn: &Connection, limit: u32) -> Result<Vec<RecentVerification>, ApiError> {
    let mut stmt = conn
        .prepare(
            "SELECT v.id, v.status, v.confidence, v.checked_by, v.notes, v.created_at,
                    c.serial, c.holder_name
             FROM verifications v
             LEFT JOIN certificates c ON v.certificate_id = c.id
             ORDER BY v.created_at DESC, v.id DESC LIMIT ?",
        )
        .map_err(|e| ApiError::Internal(format!("Prepare failed: {}", e)))?;

    let rows = stmt
        .query_map(params![limit as i64], |row| {
            Ok(RecentVerification {
                id: row.get("id")?,
                status: row.get("status")?,
                confidence: row.get("confidence")?,
                checked_by: row.get("checked_by")?,
                notes: row.get("notes")?,
                created_at: row.get("created_at")?,
                serial: row.get("serial")?,
                holder_name: row.get("holder_name")?,
            })
        })
        .map_err(|e| ApiError::Internal(format!("Query failed: {}", e)))?;

    rows.collect::<Result<Vec<_>, _>>()
        .map_err(|e| ApiError::Internal(format!("Row parse failed: {}", e)))
}
