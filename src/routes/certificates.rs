//! Certificate registry endpoints

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{parse_id, AppState};
use crate::auth;
use crate::db::{
    certificates, institutions, now_timestamp, verifications, CertificateChanges, CertificateRow,
    CertificateSummary, NewCertificate, VerificationRow,
};
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub query: Option<String>,
    pub limit: Option<String>,
}

/// GET /certificates?query=&limit=
pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<CertificateSummary>>, ApiError> {
    let limit = params
        .limit
        .as_deref()
        .and_then(|raw| raw.parse::<u32>().ok())
        .unwrap_or(20)
        .min(100);

    let results = state
        .db
        .with_conn(|conn| certificates::search_certificates(conn, params.query.as_deref(), limit))?;

    Ok(Json(results))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCertificateRequest {
    pub serial: Option<String>,
    pub holder_name: Option<String>,
    pub program: Option<String>,
    pub issued_on: Option<String>,
    pub institution_id: Option<i64>,
    pub qr_hash: Option<String>,
    pub metadata: Option<String>,
}

/// POST /certificates
pub async fn create(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CreateCertificateRequest>,
) -> Result<(StatusCode, Json<CertificateRow>), ApiError> {
    auth::require_bearer(&headers)?;

    let serial = req
        .serial
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());
    let holder_name = req
        .holder_name
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());

    let (Some(serial), Some(holder_name)) = (serial, holder_name) else {
        return Err(ApiError::validation(
            "MISSING_REQUIRED_FIELDS",
            "Required fields are missing: serial and holderName are required",
        ));
    };

    let input = NewCertificate {
        serial: serial.to_string(),
        holder_name: holder_name.to_string(),
        program: req
            .program
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from),
        issued_on: req.issued_on.clone(),
        institution_id: req.institution_id,
        qr_hash: req
            .qr_hash
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from),
        metadata: req.metadata.clone(),
    };

    let created = state.db.with_conn_mut(|conn| {
        if certificates::serial_taken(conn, &input.serial, None)? {
            return Err(ApiError::conflict(
                "DUPLICATE_SERIAL",
                "Certificate with this serial number already exists",
            ));
        }

        if let Some(institution_id) = input.institution_id {
            if institutions::get_institution(conn, institution_id)?.is_none() {
                return Err(ApiError::reference(
                    "INSTITUTION_NOT_FOUND",
                    "Institution not found",
                ));
            }
        }

        let now = now_timestamp();
        certificates::create_certificate(conn, &input, &now)
    })?;

    Ok((StatusCode::CREATED, Json(created)))
}

#[derive(Debug, Serialize)]
pub struct InstitutionRef {
    pub name: String,
    pub code: String,
}

#[derive(Debug, Serialize)]
pub struct CertificateDetail {
    #[serde(flatten)]
    pub certificate: CertificateRow,
    pub institution: Option<InstitutionRef>,
    pub verifications: Vec<VerificationRow>,
}

/// GET /certificates/{id}
pub async fn get_one(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CertificateDetail>, ApiError> {
    let id = parse_id(&id)?;

    let detail = state.db.with_conn(|conn| {
        let certificate = certificates::get_certificate(conn, id)?
            .ok_or_else(|| ApiError::NotFound("Certificate not found".to_string()))?;

        let institution = match certificate.institution_id {
            Some(institution_id) => institutions::get_institution(conn, institution_id)?
                .map(|i| InstitutionRef {
                    name: i.name,
                    code: i.code,
                }),
            None => None,
        };

        let verifications = verifications::list_for_certificate(conn, id, 10)?;

        Ok(CertificateDetail {
            certificate,
            institution,
            verifications,
        })
    })?;

    Ok(Json(detail))
}

/// PATCH /certificates/{id}
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<Json<CertificateRow>, ApiError> {
    let id = parse_id(&id)?;
    auth::require_bearer(&headers)?;

    let changes = parse_changes(&body)?;

    let updated = state.db.with_conn_mut(|conn| {
        let existing = certificates::get_certificate(conn, id)?
            .ok_or_else(|| ApiError::NotFound("Certificate not found".to_string()))?;

        if let Some(ref serial) = changes.serial {
            if *serial != existing.serial && certificates::serial_taken(conn, serial, Some(id))? {
                return Err(ApiError::conflict(
                    "SERIAL_NOT_UNIQUE",
                    "Serial number must be unique",
                ));
            }
        }

        if let Some(Some(institution_id)) = changes.institution_id {
            if institutions::get_institution(conn, institution_id)?.is_none() {
                return Err(ApiError::reference(
                    "INSTITUTION_NOT_FOUND",
                    "Institution not found",
                ));
            }
        }

        let now = now_timestamp();
        certificates::update_certificate(conn, id, &changes, &now)
    })?;

    Ok(Json(updated))
}

/// Collect provided fields only; absent keys stay untouched
fn parse_changes(body: &Value) -> Result<CertificateChanges, ApiError> {
    let obj = body.as_object().ok_or_else(|| {
        ApiError::validation("INVALID_BODY", "Request body must be a JSON object")
    })?;

    let mut changes = CertificateChanges::default();

    if let Some(value) = obj.get("serial") {
        changes.serial = Some(required_string(value, "serial")?);
    }
    if let Some(value) = obj.get("holderName") {
        changes.holder_name = Some(required_string(value, "holderName")?);
    }
    if let Some(value) = obj.get("program") {
        changes.program = Some(nullable_string(value, "program")?);
    }
    if let Some(value) = obj.get("issuedOn") {
        changes.issued_on = Some(nullable_string(value, "issuedOn")?);
    }
    if let Some(value) = obj.get("institutionId") {
        changes.institution_id = Some(match value {
            Value::Null => None,
            Value::Number(n) => Some(n.as_i64().ok_or_else(|| {
                ApiError::validation("INVALID_FIELD", "institutionId must be an integer")
            })?),
            _ => {
                return Err(ApiError::validation(
                    "INVALID_FIELD",
                    "institutionId must be an integer",
                ))
            }
        });
    }
    if let Some(value) = obj.get("qrHash") {
        changes.qr_hash = Some(nullable_string(value, "qrHash")?);
    }
    if let Some(value) = obj.get("metadata") {
        changes.metadata = Some(nullable_string(value, "metadata")?);
    }

    Ok(changes)
}

fn required_string(value: &Value, field: &str) -> Result<String, ApiError> {
    value
        .as_str()
        .map(String::from)
        .ok_or_else(|| ApiError::validation("INVALID_FIELD", format!("{} must be a string", field)))
}

fn nullable_string(value: &Value, field: &str) -> Result<Option<String>, ApiError> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s.clone())),
        _ => Err(ApiError::validation(
            "INVALID_FIELD",
            format!("{} must be a string or null", field),
        )),
    }
}
