//! Session lookup against externally-issued credentials
//!
//! Login and token issuance live in the identity provider; this module only
//! checks that a presented token matches an unexpired row. The insert
//! helpers exist for seeding and tests.

use rusqlite::{params, Connection, Row};

use crate::error::ApiError;

/// Session row from database
#[derive(Debug, Clone)]
pub struct SessionRow {
    pub id: String,
    pub token: String,
    pub user_id: String,
    pub expires_at: String,
    pub created_at: String,
    pub updated_at: String,
}

impl SessionRow {
    fn from_row(row: &Row) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            token: row.get("token")?,
            user_id: row.get("user_id")?,
            expires_at: row.get("expires_at")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

/// Generate a fresh opaque session token
pub fn new_session_token() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Look up an unexpired session by token
pub fn find_valid_session(
    conn: &Connection,
    token: &str,
    now: &str,
) -> Result<Option<SessionRow>, ApiError> {
    let mut stmt = conn
        .prepare("SELECT * FROM sessions WHERE token = ? AND expires_at > ?")
        .map_err(|e| ApiError::Internal(format!("Prepare failed: {}", e)))?;

    let mut rows = stmt
        .query(params![token, now])
        .map_err(|e| ApiError::Internal(format!("Query failed: {}", e)))?;

    match rows
        .next()
        .map_err(|e| ApiError::Internal(format!("Row fetch failed: {}", e)))?
    {
        Some(row) => Ok(Some(SessionRow::from_row(row).map_err(|e| {
            ApiError::Internal(format!("Row parse failed: {}", e))
        })?)),
        None => Ok(None),
    }
}

/// Insert a user (seeding/tests)
pub fn insert_user(
    conn: &Connection,
    id: &str,
    name: &str,
    email: &str,
    now: &str,
) -> Result<(), ApiError> {
    conn.execute(
        "INSERT INTO users (id, name, email, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
        params![id, name, email, now, now],
    )
    .map_err(|e| ApiError::Internal(format!("Insert failed: {}", e)))?;
    Ok(())
}

/// Insert a session (seeding/tests)
pub fn insert_session(
    conn: &Connection,
    id: &str,
    token: &str,
    user_id: &str,
    expires_at: &str,
    now: &str,
) -> Result<(), ApiError> {
    conn.execute(
        "INSERT INTO sessions (id, token, user_id, expires_at, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?)",
        params![id, token, user_id, expires_at, now, now],
    )
    .map_err(|e| ApiError::Internal(format!("Insert failed: {}", e)))?;
    Ok(())
}
