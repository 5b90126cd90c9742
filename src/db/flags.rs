//! Review flags with a mutable resolved bit

use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Flag row from database
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlagRow {
    pub id: i64,
    pub certificate_id: i64,
    pub reason: String,
    pub resolved: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl FlagRow {
    fn from_row(row: &Row) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            certificate_id: row.get("certificate_id")?,
            reason: row.get("reason")?,
            resolved: row.get("resolved")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

/// List row enriched with the flagged certificate
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlagSummary {
    pub id: i64,
    pub reason: String,
    pub resolved: bool,
    pub created_at: String,
    pub serial: Option<String>,
    pub holder_name: Option<String>,
}

/// Get flag by ID
pub fn get_flag(conn: &Connection, id: i64) -> Result<Option<FlagRow>, ApiError> {
    let mut stmt = conn
        .prepare("SELECT * FROM flags WHERE id = ?")
        .map_err(|e| ApiError::Internal(format!("Prepare failed: {}", e)))?;

    let mut rows = stmt
        .query(params![id])
        .map_err(|e| ApiError::Internal(format!("Query failed: {}", e)))?;

    match rows
        .next()
        .map_err(|e| ApiError::Internal(format!("Row fetch failed: {}", e)))?
    {
        Some(row) => Ok(Some(FlagRow::from_row(row).map_err(|e| {
            ApiError::Internal(format!("Row parse failed: {}", e))
        })?)),
        None => Ok(None),
    }
}

/// Insert a new unresolved flag
pub fn insert_flag(
    conn: &Connection,
    certificate_id: i64,
    reason: &str,
    now: &str,
) -> Result<FlagRow, ApiError> {
    conn.execute(
        "INSERT INTO flags (certificate_id, reason, resolved, created_at, updated_at)
         VALUES (?, ?, 0, ?, ?)",
        params![certificate_id, reason, now, now],
    )
    .map_err(|e| ApiError::Internal(format!("Insert failed: {}", e)))?;

    let id = conn.last_insert_rowid();
    get_flag(conn, id)?.ok_or_else(|| ApiError::Internal("Flag not found after insert".to_string()))
}

/// Flip the resolved bit; refreshes updated_at on every transition
pub fn set_resolved(
    conn: &Connection,
    id: i64,
    resolved: bool,
    now: &str,
) -> Result<FlagRow, ApiError> {
    conn.execute(
        "UPDATE flags SET resolved = ?, updated_at = ? WHERE id = ?",
        params![resolved, now, id],
    )
    .map_err(|e| ApiError::Internal(format!("Update failed: {}", e)))?;

    get_flag(conn, id)?.ok_or_else(|| ApiError::Internal("Flag not found after update".to_string()))
}

/// Summary of one flag with its certificate joined in
pub fn flag_summary(conn: &Connection, id: i64) -> Result<Option<FlagSummary>, ApiError> {
    let mut stmt = conn
        .prepare(
            "SELECT f.id, f.reason, f.resolved, f.created_at, c.serial, c.holder_name
             FROM flags f
             LEFT JOIN certificates c ON f.certificate_id = c.id
             WHERE f.id = ?",
        )
        .map_err(|e| ApiError::Internal(format!("Prepare failed: {}", e)))?;

    let mut rows = stmt
        .query(params![id])
        .map_err(|e| ApiError::Internal(format!("Query failed: {}", e)))?;

    match rows
        .next()
        .map_err(|e| ApiError::Internal(format!("Row fetch failed: {}", e)))?
    {
        Some(row) => Ok(Some(summary_from_row(row).map_err(|e| {
            ApiError::Internal(format!("Row parse failed: {}", e))
        })?)),
        None => Ok(None),
    }
}

/// List flags newest first, optionally filtered by resolved state
pub fn list_flags(
    conn: &Connection,
    resolved: Option<bool>,
) -> Result<Vec<FlagSummary>, ApiError> {
    let mut sql = String::from(
        "SELECT f.id, f.reason, f.resolved, f.created_at, c.serial, c.holder_name
         FROM flags f
         LEFT JOIN certificates c ON f.certificate_id = c.id",
    );
    if resolved.is_some() {
        sql.push_str(" WHERE f.resolved = ?");
    }
    sql.push_str(" ORDER BY f.created_at DESC, f.id DESC");

    let mut stmt = conn
        .prepare(&sql)
        .map_err(|e| ApiError::Internal(format!("Prepare failed: {}", e)))?;

    let rows = match resolved {
        Some(resolved) => stmt.query_map(params![resolved], summary_from_row),
        None => stmt.query_map([], summary_from_row),
    }
    .map_err(|e| ApiError::Internal(format!("Query failed: {}", e)))?;

    rows.collect::<Result<Vec<_>, _>>()
        .map_err(|e| ApiError::Internal(format!("Row parse failed: {}", e)))
}

fn summary_from_row(row: &Row) -> Result<FlagSummary, rusqlite::Error> {
    Ok(FlagSummary {
        id: row.get("id")?,
        reason: row.get("reason")?,
        resolved: row.get("resolved")?,
        created_at: row.get("created_at")?,
        serial: row.get("serial")?,
        holder_name: row.get("holder_name")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{certificates, now_timestamp, RegistryDb};

    fn seed_certificate(db: &RegistryDb, serial: &str) -> i64 {
        let now = now_timestamp();
        db.with_conn(|conn| {
            certificates::create_certificate(
                conn,
                &certificates::NewCertificate::unknown_holder(serial),
                &now,
            )
        })
        .unwrap()
        .id
    }

    #[test]
    fn test_insert_starts_unresolved() {
        let db = RegistryDb::open_in_memory().unwrap();
        let cert_id = seed_certificate(&db, "F-1");
        let now = now_timestamp();

        let flag = db
            .with_conn(|conn| insert_flag(conn, cert_id, "suspicious QR hash", &now))
            .unwrap();
        assert!(!flag.resolved);
        assert_eq!(flag.reason, "suspicious QR hash");
    }

    #[test]
    fn test_resolved_flips_both_ways_and_touches_updated_at() {
        let db = RegistryDb::open_in_memory().unwrap();
        let cert_id = seed_certificate(&db, "F-2");

        let flag = db
            .with_conn(|conn| insert_flag(conn, cert_id, "name mismatch", "2024-01-01T00:00:00+00:00"))
            .unwrap();

        let resolved = db
            .with_conn(|conn| set_resolved(conn, flag.id, true, "2024-01-02T00:00:00+00:00"))
            .unwrap();
        assert!(resolved.resolved);
        assert_eq!(resolved.updated_at, "2024-01-02T00:00:00+00:00");

        let reopened = db
            .with_conn(|conn| set_resolved(conn, flag.id, false, "2024-01-03T00:00:00+00:00"))
            .unwrap();
        assert!(!reopened.resolved);
        assert_eq!(reopened.updated_at, "2024-01-03T00:00:00+00:00");
        assert_eq!(reopened.created_at, "2024-01-01T00:00:00+00:00");
    }

    #[test]
    fn test_list_filters_by_resolved() {
        let db = RegistryDb::open_in_memory().unwrap();
        let cert_id = seed_certificate(&db, "F-3");
        let now = now_timestamp();

        db.with_conn(|conn| {
            let open = insert_flag(conn, cert_id, "first", &now)?;
            let closed = insert_flag(conn, cert_id, "second", &now)?;
            set_resolved(conn, closed.id, true, &now)?;

            let all = list_flags(conn, None)?;
            assert_eq!(all.len(), 2);
            assert_eq!(all[0].serial.as_deref(), Some("F-3"));

            let unresolved = list_flags(conn, Some(false))?;
            assert_eq!(unresolved.len(), 1);
            assert_eq!(unresolved[0].id, open.id);

            let resolved = list_flags(conn, Some(true))?;
            assert_eq!(resolved.len(), 1);
            assert_eq!(resolved[0].id, closed.id);
            Ok(())
        })
        .unwrap();
    }
}
