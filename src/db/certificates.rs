//! Certificate CRUD and search

use rusqlite::{params, Connection, Row, ToSql};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ApiError;

/// Certificate row from database
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateRow {
    pub id: i64,
    pub serial: String,
    pub holder_name: String,
    pub program: Option<String>,
    pub issued_on: Option<String>,
    pub institution_id: Option<i64>,
    pub qr_hash: Option<String>,
    pub metadata: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl CertificateRow {
    fn from_row(row: &Row) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            serial: row.get("serial")?,
            holder_name: row.get("holder_name")?,
            program: row.get("program")?,
            issued_on: row.get("issued_on")?,
            institution_id: row.get("institution_id")?,
            qr_hash: row.get("qr_hash")?,
            metadata: row.get("metadata")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

/// Input for creating a certificate
#[derive(Debug, Clone)]
pub struct NewCertificate {
    pub serial: String,
    pub holder_name: String,
    pub program: Option<String>,
    pub issued_on: Option<String>,
    pub institution_id: Option<i64>,
    pub qr_hash: Option<String>,
    pub metadata: Option<String>,
}

impl NewCertificate {
    /// Minimal certificate created implicitly when a verification arrives
    /// for a serial the registry has never seen
    pub fn unknown_holder(serial: &str) -> Self {
        Self {
            serial: serial.to_string(),
            holder_name: "Unknown".to_string(),
            program: None,
            issued_on: None,
            institution_id: None,
            qr_hash: None,
            metadata: None,
        }
    }
}

/// Partial update; outer None = field untouched, inner None = cleared
#[derive(Debug, Clone, Default)]
pub struct CertificateChanges {
    pub serial: Option<String>,
    pub holder_name: Option<String>,
    pub program: Option<Option<String>>,
    pub issued_on: Option<Option<String>>,
    pub institution_id: Option<Option<i64>>,
    pub qr_hash: Option<Option<String>>,
    pub metadata: Option<Option<String>>,
}

/// Search result row enriched with the owning institution's name
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateSummary {
    pub id: i64,
    pub serial: String,
    pub holder_name: String,
    pub program: Option<String>,
    pub issued_on: Option<String>,
    pub institution_id: Option<i64>,
    pub institution_name: Option<String>,
    pub created_at: String,
}

/// Get certificate by ID
pub fn get_certificate(conn: &Connection, id: i64) -> Result<Option<CertificateRow>, ApiError> {
    fetch_one(conn, "SELECT * FROM certificates WHERE id = ?", &[&id])
}

/// Get certificate by serial (exact match)
pub fn find_by_serial(conn: &Connection, serial: &str) -> Result<Option<CertificateRow>, ApiError> {
    fetch_one(
        conn,
        "SELECT * FROM certificates WHERE serial = ?",
        &[&serial],
    )
}

fn fetch_one(
    conn: &Connection,
    sql: &str,
    params: &[&dyn ToSql],
) -> Result<Option<CertificateRow>, ApiError> {
    let mut stmt = conn
        .prepare(sql)
        .map_err(|e| ApiError::Internal(format!("Prepare failed: {}", e)))?;

    let mut rows = stmt
        .query(params)
        .map_err(|e| ApiError::Internal(format!("Query failed: {}", e)))?;

    match rows
        .next()
        .map_err(|e| ApiError::Internal(format!("Row fetch failed: {}", e)))?
    {
        Some(row) => Ok(Some(CertificateRow::from_row(row).map_err(|e| {
            ApiError::Internal(format!("Row parse failed: {}", e))
        })?)),
        None => Ok(None),
    }
}

/// Check whether a serial is already taken, optionally excluding one id
pub fn serial_taken(conn: &Connection, serial: &str, exclude: Option<i64>) -> Result<bool, ApiError> {
    let result = match exclude {
        Some(id) => conn.query_row(
            "SELECT 1 FROM certificates WHERE serial = ?1 AND id != ?2 LIMIT 1",
            params![serial, id],
            |_| Ok(()),
        ),
        None => conn.query_row(
            "SELECT 1 FROM certificates WHERE serial = ?1 LIMIT 1",
            params![serial],
            |_| Ok(()),
        ),
    };

    match result {
        Ok(()) => Ok(true),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(false),
        Err(e) => Err(ApiError::Internal(format!("Query failed: {}", e))),
    }
}

/// Insert a new certificate
pub fn create_certificate(
    conn: &Connection,
    input: &NewCertificate,
    now: &str,
) -> Result<CertificateRow, ApiError> {
    conn.execute(
        "INSERT INTO certificates (
            serial, holder_name, program, issued_on, institution_id,
            qr_hash, metadata, created_at, updated_at
         ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        params![
            input.serial,
            input.holder_name,
            input.program,
            input.issued_on,
            input.institution_id,
            input.qr_hash,
            input.metadata,
            now,
            now
        ],
    )
    .map_err(|e| ApiError::Internal(format!("Insert failed: {}", e)))?;

    let id = conn.last_insert_rowid();
    get_certificate(conn, id)?
        .ok_or_else(|| ApiError::Internal("Certificate not found after insert".to_string()))
}

/// Apply a partial update; always refreshes updated_at
pub fn update_certificate(
    conn: &Connection,
    id: i64,
    changes: &CertificateChanges,
    now: &str,
) -> Result<CertificateRow, ApiError> {
    let mut sets = vec!["updated_at = ?".to_string()];
    let mut params: Vec<Box<dyn ToSql>> = vec![Box::new(now.to_string())];

    if let Some(ref serial) = changes.serial {
        sets.push("serial = ?".to_string());
        params.push(Box::new(serial.clone()));
    }
    if let Some(ref holder_name) = changes.holder_name {
        sets.push("holder_name = ?".to_string());
        params.push(Box::new(holder_name.clone()));
    }
    if let Some(ref program) = changes.program {
        sets.push("program = ?".to_string());
        params.push(Box::new(program.clone()));
    }
    if let Some(ref issued_on) = changes.issued_on {
        sets.push("issued_on = ?".to_string());
        params.push(Box::new(issued_on.clone()));
    }
    if let Some(ref institution_id) = changes.institution_id {
        sets.push("institution_id = ?".to_string());
        params.push(Box::new(*institution_id));
    }
    if let Some(ref qr_hash) = changes.qr_hash {
        sets.push("qr_hash = ?".to_string());
        params.push(Box::new(qr_hash.clone()));
    }
    if let Some(ref metadata) = changes.metadata {
        sets.push("metadata = ?".to_string());
        params.push(Box::new(metadata.clone()));
    }

    let sql = format!("UPDATE certificates SET {} WHERE id = ?", sets.join(", "));
    params.push(Box::new(id));

    let param_refs: Vec<&dyn ToSql> = params.iter().map(|p| p.as_ref()).collect();
    conn.execute(&sql, param_refs.as_slice())
        .map_err(|e| ApiError::Internal(format!("Update failed: {}", e)))?;

    get_certificate(conn, id)?
        .ok_or_else(|| ApiError::Internal("Certificate not found after update".to_string()))
}

/// Substring search over serial OR holder name, institution name joined in
pub fn search_certificates(
    conn: &Connection,
    query: Option<&str>,
    limit: u32,
) -> Result<Vec<CertificateSummary>, ApiError> {
    let mut sql = String::from(
        "SELECT c.id, c.serial, c.holder_name, c.program, c.issued_on,
                c.institution_id, i.name AS institution_name, c.created_at
         FROM certificates c
         LEFT JOIN institutions i ON c.institution_id = i.id",
    );
    let mut params: Vec<Box<dyn ToSql>> = vec![];

    if let Some(query) = query {
        sql.push_str(" WHERE c.serial LIKE ? OR c.holder_name LIKE ?");
        let pattern = format!("%{}%", query);
        params.push(Box::new(pattern.clone()));
        params.push(Box::new(pattern));
    }

    sql.push_str(" LIMIT ?");
    params.push(Box::new(limit as i64));

    debug!("Executing search: {}", sql);

    let mut stmt = conn
        .prepare(&sql)
        .map_err(|e| ApiError::Internal(format!("Prepare failed: {}", e)))?;

    let param_refs: Vec<&dyn ToSql> = params.iter().map(|p| p.as_ref()).collect();

    let rows = stmt
        .query_map(param_refs.as_slice(), |row| {
            Ok(CertificateSummary {
                id: row.get("id")?,
                serial: row.get("serial")?,
                holder_name: row.get("holder_name")?,
                program: row.get("program")?,
                issued_on: row.get("issued_on")?,
                institution_id: row.get("institution_id")?,
                institution_name: row.get("institution_name")?,
                created_at: row.get("created_at")?,
            })
        })
        .map_err(|e| ApiError::Internal(format!("Query failed: {}", e)))?;

    rows.collect::<Result<Vec<_>, _>>()
        .map_err(|e| ApiError::Internal(format!("Row parse failed: {}", e)))
}
