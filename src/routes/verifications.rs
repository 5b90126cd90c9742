//! Verification ledger endpoints

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::AppState;
use crate::auth;
use crate::db::{
    certificates, now_timestamp, verifications, CertificateRow, NewCertificate, NewVerification,
    RecentVerification, VerificationRow,
};
use crate::error::ApiError;

const VALID_STATUSES: [&str; 3] = ["valid", "invalid", "suspect"];

/// Verification joined with the certificate it resolved to
#[derive(Debug, Serialize)]
pub struct VerificationWithCertificate {
    #[serde(flatten)]
    pub verification: VerificationRow,
    pub certificate: CertificateRow,
}

/// POST /verifications
///
/// The write itself needs no credential; a bearer token, when present, is
/// stored verbatim as the checking actor. Resolution prefers certificateId;
/// a serial falls back to find-or-create with an "Unknown" holder.
pub async fn record(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<VerificationWithCertificate>), ApiError> {
    let checked_by = auth::bearer_token(&headers).map(String::from);

    let obj = body.as_object().ok_or_else(|| {
        ApiError::validation("INVALID_BODY", "Request body must be a JSON object")
    })?;

    // Presence checks first, then value checks
    let raw_status = match obj.get("status") {
        None | Some(Value::Null) => {
            return Err(ApiError::validation(
                "MISSING_REQUIRED_FIELD",
                "Status is required",
            ))
        }
        Some(value) => value,
    };
    let raw_confidence = match obj.get("confidence") {
        None | Some(Value::Null) => {
            return Err(ApiError::validation(
                "MISSING_REQUIRED_FIELD",
                "Confidence is required",
            ))
        }
        Some(value) => value,
    };

    let status = raw_status
        .as_str()
        .filter(|s| VALID_STATUSES.contains(s))
        .ok_or_else(|| {
            ApiError::validation(
                "INVALID_STATUS",
                "Status must be one of: valid, invalid, suspect",
            )
        })?;

    let confidence = raw_confidence
        .as_f64()
        .filter(|c| c.is_finite())
        .ok_or_else(|| {
            ApiError::validation("INVALID_CONFIDENCE", "Confidence must be a valid number")
        })?;

    let serial = obj
        .get("serial")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty());
    let certificate_id = obj.get("certificateId").and_then(Value::as_i64);

    if serial.is_none() && certificate_id.is_none() {
        return Err(ApiError::validation(
            "MISSING_CERTIFICATE_IDENTIFIER",
            "Either serial or certificateId must be provided",
        ));
    }

    let notes = obj.get("notes").and_then(Value::as_str).map(String::from);

    let response = state.db.with_conn_mut(|conn| {
        let now = now_timestamp();

        // Step one: resolve or create the certificate
        let certificate = match (certificate_id, serial) {
            (Some(id), _) => certificates::get_certificate(conn, id)?.ok_or_else(|| {
                ApiError::reference("CERTIFICATE_NOT_FOUND", "Certificate not found")
            })?,
            (None, Some(serial)) => match certificates::find_by_serial(conn, serial)? {
                Some(existing) => existing,
                None => certificates::create_certificate(
                    conn,
                    &NewCertificate::unknown_holder(serial),
                    &now,
                )?,
            },
            (None, None) => {
                return Err(ApiError::validation(
                    "MISSING_CERTIFICATE_IDENTIFIER",
                    "Either serial or certificateId must be provided",
                ))
            }
        };

        // Step two: append the immutable verification row
        let verification = verifications::insert_verification(
            conn,
            &NewVerification {
                certificate_id: certificate.id,
                status: status.to_string(),
                confidence,
                checked_by: checked_by.clone(),
                notes: notes.clone(),
            },
            &now,
        )?;

        Ok(VerificationWithCertificate {
            verification,
            certificate,
        })
    })?;

    Ok((StatusCode::CREATED, Json(response)))
}

#[derive(Debug, Deserialize)]
pub struct RecentParams {
    pub limit: Option<String>,
}

/// GET /verifications/recent?limit=
///
/// An invalid token is tolerated here; the call degrades to an
/// unauthenticated request instead of failing.
pub async fn recent(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<RecentParams>,
) -> Result<Json<Vec<RecentVerification>>, ApiError> {
    if let Some(session) = auth::optional_session(&state.db, &headers) {
        debug!("recent verifications requested by user {}", session.user_id);
    }

    let limit = match params.limit.as_deref() {
        Some(raw) => {
            let parsed = raw
                .parse::<i64>()
                .ok()
                .filter(|n| *n >= 1)
                .ok_or_else(|| {
                    ApiError::validation("INVALID_LIMIT", "Limit must be a positive number")
                })?;
            parsed.min(50) as u32
        }
        None => 10,
    };

    let results = state
        .db
        .with_conn(|conn| verifications::recent(conn, limit))?;

    Ok(Json(results))
}
