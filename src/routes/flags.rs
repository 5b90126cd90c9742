//! Flag workflow endpoints
//!
//! All three handlers require a session; the acting identity comes only from
//! the session, never from the payload. Bodies carrying identity override
//! keys are rejected before any other validation.

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{parse_id, AppState};
use crate::auth;
use crate::db::{certificates, flags, institutions, now_timestamp, FlagSummary};
use crate::error::ApiError;

const IDENTITY_OVERRIDE_KEYS: [&str; 3] = ["userId", "user_id", "authorId"];

/// Reject payloads that try to name the acting user, null values included
fn reject_identity_override(body: &Value) -> Result<(), ApiError> {
    if let Some(obj) = body.as_object() {
        for key in IDENTITY_OVERRIDE_KEYS {
            if obj.contains_key(key) {
                return Err(ApiError::validation(
                    "USER_ID_NOT_ALLOWED",
                    "User ID cannot be provided in request body",
                ));
            }
        }
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub resolved: Option<String>,
}

/// GET /flags?resolved=
pub async fn list(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<FlagSummary>>, ApiError> {
    auth::require_session(&state.db, &headers)?;

    let resolved = params.resolved.as_deref().map(|raw| raw == "true");

    let results = state
        .db
        .with_conn(|conn| flags::list_flags(conn, resolved))?;

    Ok(Json(results))
}

/// POST /flags
pub async fn create(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<FlagSummary>), ApiError> {
    auth::require_session(&state.db, &headers)?;
    reject_identity_override(&body)?;

    let obj = body.as_object().ok_or_else(|| {
        ApiError::validation("INVALID_BODY", "Request body must be a JSON object")
    })?;

    let certificate_id = match obj.get("certificateId") {
        None | Some(Value::Null) => {
            return Err(ApiError::validation(
                "MISSING_CERTIFICATE_ID",
                "Certificate ID is required",
            ))
        }
        Some(value) => value
            .as_i64()
            .or_else(|| value.as_str().and_then(|s| s.parse::<i64>().ok()))
            .ok_or_else(|| {
                ApiError::validation(
                    "INVALID_CERTIFICATE_ID",
                    "Certificate ID must be a valid number",
                )
            })?,
    };

    let reason = obj
        .get("reason")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::validation("MISSING_REASON", "Reason is required"))?
        .to_string();

    let created = state.db.with_conn_mut(|conn| {
        if certificates::get_certificate(conn, certificate_id)?.is_none() {
            return Err(ApiError::reference(
                "CERTIFICATE_NOT_FOUND",
                "Certificate not found",
            ));
        }

        let now = now_timestamp();
        let flag = flags::insert_flag(conn, certificate_id, &reason, &now)?;
        flags::flag_summary(conn, flag.id)?
            .ok_or_else(|| ApiError::Internal("Flag not found after insert".to_string()))
    })?;

    Ok((StatusCode::CREATED, Json(created)))
}

/// Full certificate joined onto a resolved flag
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlagDetail {
    pub id: i64,
    pub certificate_id: i64,
    pub reason: String,
    pub resolved: bool,
    pub created_at: String,
    pub updated_at: String,
    pub certificate: Option<FlagCertificate>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlagCertificate {
    pub id: i64,
    pub serial: String,
    pub holder_name: String,
    pub program: Option<String>,
    pub issued_on: Option<String>,
    pub qr_hash: Option<String>,
    pub metadata: Option<String>,
    pub institution: Option<FlagInstitution>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlagInstitution {
    pub id: i64,
    pub name: String,
    pub code: String,
    pub contact_email: Option<String>,
    pub trusted: bool,
}

/// PATCH /flags/{id}
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<Json<FlagDetail>, ApiError> {
    auth::require_session(&state.db, &headers)?;
    let id = parse_id(&id)?;
    reject_identity_override(&body)?;

    let resolved = body
        .get("resolved")
        .and_then(Value::as_bool)
        .ok_or_else(|| {
            ApiError::validation("INVALID_RESOLVED_TYPE", "Resolved field must be a boolean")
        })?;

    let detail = state.db.with_conn_mut(|conn| {
        if flags::get_flag(conn, id)?.is_none() {
            return Err(ApiError::NotFound("Flag not found".to_string()));
        }

        let now = now_timestamp();
        let flag = flags::set_resolved(conn, id, resolved, &now)?;

        let certificate = certificates::get_certificate(conn, flag.certificate_id)?;
        let certificate = match certificate {
            Some(cert) => {
                let institution = match cert.institution_id {
                    Some(institution_id) => institutions::get_institution(conn, institution_id)?
                        .map(|i| FlagInstitution {
                            id: i.id,
                            name: i.name,
                            code: i.code,
                            contact_email: i.contact_email,
                            trusted: i.trusted,
                        }),
                    None => None,
                };
                Some(FlagCertificate {
                    id: cert.id,
                    serial: cert.serial,
                    holder_name: cert.holder_name,
                    program: cert.program,
                    issued_on: cert.issued_on,
                    qr_hash: cert.qr_hash,
                    metadata: cert.metadata,
                    institution,
                })
            }
            None => None,
        };

        Ok(FlagDetail {
            id: flag.id,
            certificate_id: flag.certificate_id,
            reason: flag.reason,
            resolved: flag.resolved,
            created_at: flag.created_at,
            updated_at: flag.updated_at,
            certificate,
        })
    })?;

    Ok(Json(detail))
}
