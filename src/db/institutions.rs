//! Institution CRUD and aggregate counts

use rusqlite::{params, Connection, Row, ToSql};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Institution row from database
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstitutionRow {
    pub id: i64,
    pub name: String,
    pub code: String,
    pub contact_email: Option<String>,
    pub trusted: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl InstitutionRow {
    fn from_row(row: &Row) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            code: row.get("code")?,
            contact_email: row.get("contact_email")?,
            trusted: row.get("trusted")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

/// Input for creating an institution
#[derive(Debug, Clone)]
pub struct NewInstitution {
    pub name: String,
    pub code: String,
    pub contact_email: Option<String>,
    pub trusted: bool,
}

/// Partial update; outer None = field untouched, inner None = cleared
#[derive(Debug, Clone, Default)]
pub struct InstitutionChanges {
    pub name: Option<String>,
    pub code: Option<String>,
    pub contact_email: Option<Option<String>>,
    pub trusted: Option<bool>,
}

/// List query parameters
#[derive(Debug, Clone)]
pub struct InstitutionQuery {
    pub search: Option<String>,
    pub sort: String,
    pub order: String,
    pub limit: u32,
    pub offset: u32,
}

impl Default for InstitutionQuery {
    fn default() -> Self {
        Self {
            search: None,
            sort: "createdAt".to_string(),
            order: "desc".to_string(),
            limit: 10,
            offset: 0,
        }
    }
}

/// Aggregate counts over a single institution's certificates
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstitutionCounts {
    pub certificate_count: i64,
    pub flag_count: i64,
    pub verification_count: i64,
}

impl InstitutionCounts {
    pub fn zero() -> Self {
        Self {
            certificate_count: 0,
            flag_count: 0,
            verification_count: 0,
        }
    }
}

fn row_exists(conn: &Connection, sql: &str, params: &[&dyn ToSql]) -> Result<bool, ApiError> {
    match conn.query_row(sql, params, |_| Ok(())) {
        Ok(()) => Ok(true),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(false),
        Err(e) => Err(ApiError::Internal(format!("Query failed: {}", e))),
    }
}

/// Get institution by ID
pub fn get_institution(conn: &Connection, id: i64) -> Result<Option<InstitutionRow>, ApiError> {
    let mut stmt = conn
        .prepare("SELECT * FROM institutions WHERE id = ?")
        .map_err(|e| ApiError::Internal(format!("Prepare failed: {}", e)))?;

    let mut rows = stmt
        .query(params![id])
        .map_err(|e| ApiError::Internal(format!("Query failed: {}", e)))?;

    match rows
        .next()
        .map_err(|e| ApiError::Internal(format!("Row fetch failed: {}", e)))?
    {
        Some(row) => Ok(Some(InstitutionRow::from_row(row).map_err(|e| {
            ApiError::Internal(format!("Row parse failed: {}", e))
        })?)),
        None => Ok(None),
    }
}

/// Check whether an institution name is already taken, optionally excluding one id
pub fn name_taken(conn: &Connection, name: &str, exclude: Option<i64>) -> Result<bool, ApiError> {
    match exclude {
        Some(id) => row_exists(
            conn,
            "SELECT 1 FROM institutions WHERE name = ?1 AND id != ?2 LIMIT 1",
            &[&name, &id],
        ),
        None => row_exists(
            conn,
            "SELECT 1 FROM institutions WHERE name = ?1 LIMIT 1",
            &[&name],
        ),
    }
}

/// Check whether an institution code is already taken, optionally excluding one id
pub fn code_taken(conn: &Connection, code: &str, exclude: Option<i64>) -> Result<bool, ApiError> {
    match exclude {
        Some(id) => row_exists(
            conn,
            "SELECT 1 FROM institutions WHERE code = ?1 AND id != ?2 LIMIT 1",
            &[&code, &id],
        ),
        None => row_exists(
            conn,
            "SELECT 1 FROM institutions WHERE code = ?1 LIMIT 1",
            &[&code],
        ),
    }
}

/// Insert a new institution
pub fn create_institution(
    conn: &Connection,
    input: &NewInstitution,
    now: &str,
) -> Result<InstitutionRow, ApiError> {
    conn.execute(
        "INSERT INTO institutions (name, code, contact_email, trusted, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?)",
        params![
            input.name,
            input.code,
            input.contact_email,
            input.trusted,
            now,
            now
        ],
    )
    .map_err(|e| ApiError::Internal(format!("Insert failed: {}", e)))?;

    let id = conn.last_insert_rowid();
    get_institution(conn, id)?
        .ok_or_else(|| ApiError::Internal("Institution not found after insert".to_string()))
}

/// Apply a partial update; always refreshes updated_at
pub fn update_institution(
    conn: &Connection,
    id: i64,
    changes: &InstitutionChanges,
    now: &str,
) -> Result<InstitutionRow, ApiError> {
    let mut sets = vec!["updated_at = ?".to_string()];
    let mut params: Vec<Box<dyn ToSql>> = vec![Box::new(now.to_string())];

    if let Some(ref name) = changes.name {
        sets.push("name = ?".to_string());
        params.push(Box::new(name.clone()));
    }
    if let Some(ref code) = changes.code {
        sets.push("code = ?".to_string());
        params.push(Box::new(code.clone()));
    }
    if let Some(ref contact_email) = changes.contact_email {
        sets.push("contact_email = ?".to_string());
        params.push(Box::new(contact_email.clone()));
    }
    if let Some(trusted) = changes.trusted {
        sets.push("trusted = ?".to_string());
        params.push(Box::new(trusted));
    }

    let sql = format!("UPDATE institutions SET {} WHERE id = ?", sets.join(", "));
    params.push(Box::new(id));

    let param_refs: Vec<&dyn ToSql> = params.iter().map(|p| p.as_ref()).collect();
    conn.execute(&sql, param_refs.as_slice())
        .map_err(|e| ApiError::Internal(format!("Update failed: {}", e)))?;

    get_institution(conn, id)?
        .ok_or_else(|| ApiError::Internal("Institution not found after update".to_string()))
}

/// List institutions with search, sort and pagination
pub fn list_institutions(
    conn: &Connection,
    query: &InstitutionQuery,
) -> Result<Vec<InstitutionRow>, ApiError> {
    let mut sql = String::from("SELECT * FROM institutions");
    let mut params: Vec<Box<dyn ToSql>> = vec![];

    if let Some(ref search) = query.search {
        sql.push_str(" WHERE name LIKE ? OR code LIKE ? OR contact_email LIKE ?");
        let pattern = format!("%{}%", search);
        params.push(Box::new(pattern.clone()));
        params.push(Box::new(pattern.clone()));
        params.push(Box::new(pattern));
    }

    // Sort column comes from a whitelist, never from the raw parameter
    let column = match query.sort.as_str() {
        "name" => "name",
        "code" => "code",
        "contactEmail" => "contact_email",
        "trusted" => "trusted",
        _ => "created_at",
    };
    let direction = if query.order == "asc" { "ASC" } else { "DESC" };
    sql.push_str(&format!(" ORDER BY {} {}", column, direction));

    sql.push_str(" LIMIT ? OFFSET ?");
    params.push(Box::new(query.limit as i64));
    params.push(Box::new(query.offset as i64));

    let mut stmt = conn
        .prepare(&sql)
        .map_err(|e| ApiError::Internal(format!("Prepare failed: {}", e)))?;

    let param_refs: Vec<&dyn ToSql> = params.iter().map(|p| p.as_ref()).collect();

    let rows = stmt
        .query_map(param_refs.as_slice(), InstitutionRow::from_row)
        .map_err(|e| ApiError::Internal(format!("Query failed: {}", e)))?;

    rows.collect::<Result<Vec<_>, _>>()
        .map_err(|e| ApiError::Internal(format!("Row parse failed: {}", e)))
}

/// Aggregate counts, recomputed per read rather than cached
pub fn institution_counts(conn: &Connection, id: i64) -> Result<InstitutionCounts, ApiError> {
    let certificate_count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM certificates WHERE institution_id = ?",
            params![id],
            |row| row.get(0),
        )
        .map_err(|e| ApiError::Internal(format!("Query failed: {}", e)))?;

    let flag_count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM flags f
             INNER JOIN certificates c ON f.certificate_id = c.id
             WHERE c.institution_id = ?",
            params![id],
            |row| row.get(0),
        )
        .map_err(|e| ApiError::Internal(format!("Query failed: {}", e)))?;

    let verification_count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM verifications v
             INNER JOIN certificates c ON v.certificate_id = c.id
             WHERE c.institution_id = ?",
            params![id],
            |row| row.get(0),
        )
        .map_err(|e| ApiError::Internal(format!("Query failed: {}", e)))?;

    Ok(InstitutionCounts {
        certificate_count,
        flag_count,
        verification_count,
    })
}
