//! Institution registry endpoints

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{parse_id, AppState};
use crate::auth;
use crate::db::{
    institutions, now_timestamp, InstitutionChanges, InstitutionCounts, InstitutionQuery,
    InstitutionRow, NewInstitution,
};
use crate::error::ApiError;

/// Institution enriched with per-read aggregate counts
#[derive(Debug, Serialize)]
pub struct InstitutionWithCounts {
    #[serde(flatten)]
    pub institution: InstitutionRow,
    #[serde(flatten)]
    pub counts: InstitutionCounts,
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub id: Option<String>,
    pub search: Option<String>,
    pub sort: Option<String>,
    pub order: Option<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
}

/// GET /institutions - single lookup via ?id=, otherwise a sorted list
pub async fn list_or_get(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Response, ApiError> {
    if let Some(raw_id) = params.id {
        let id = parse_id(&raw_id)?;

        let enriched = state.db.with_conn(|conn| {
            let institution = institutions::get_institution(conn, id)?
                .ok_or_else(|| ApiError::NotFound("Institution not found".to_string()))?;
            let counts = institutions::institution_counts(conn, id)?;
            Ok(InstitutionWithCounts {
                institution,
                counts,
            })
        })?;

        return Ok(Json(enriched).into_response());
    }

    let query = InstitutionQuery {
        search: params.search,
        sort: params.sort.unwrap_or_else(|| "createdAt".to_string()),
        order: params.order.unwrap_or_else(|| "desc".to_string()),
        limit: params
            .limit
            .as_deref()
            .and_then(|raw| raw.parse::<u32>().ok())
            .unwrap_or(10)
            .min(100),
        offset: params
            .offset
            .as_deref()
            .and_then(|raw| raw.parse::<u32>().ok())
            .unwrap_or(0),
    };

    // Counts are recomputed per row; fine at this entity's scale
    let enriched = state.db.with_conn(|conn| {
        let rows = institutions::list_institutions(conn, &query)?;
        rows.into_iter()
            .map(|institution| {
                let counts = institutions::institution_counts(conn, institution.id)?;
                Ok(InstitutionWithCounts {
                    institution,
                    counts,
                })
            })
            .collect::<Result<Vec<_>, ApiError>>()
    })?;

    Ok(Json(enriched).into_response())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInstitutionRequest {
    pub name: Option<String>,
    pub code: Option<String>,
    pub contact_email: Option<String>,
    pub trusted: Option<bool>,
}

/// POST /institutions
pub async fn create(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CreateInstitutionRequest>,
) -> Result<(StatusCode, Json<InstitutionWithCounts>), ApiError> {
    auth::require_bearer(&headers)?;

    let name = req
        .name
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::validation("MISSING_REQUIRED_FIELD", "Name is required"))?;
    let code = req
        .code
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::validation("MISSING_REQUIRED_FIELD", "Code is required"))?;

    let input = NewInstitution {
        name: name.to_string(),
        code: code.to_string(),
        contact_email: req
            .contact_email
            .as_deref()
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty()),
        trusted: req.trusted.unwrap_or(true),
    };

    let created = state.db.with_conn_mut(|conn| {
        if institutions::name_taken(conn, &input.name, None)? {
            return Err(ApiError::conflict(
                "DUPLICATE_NAME",
                "Institution name already exists",
            ));
        }
        if institutions::code_taken(conn, &input.code, None)? {
            return Err(ApiError::conflict(
                "DUPLICATE_CODE",
                "Institution code already exists",
            ));
        }

        let now = now_timestamp();
        institutions::create_institution(conn, &input, &now)
    })?;

    Ok((
        StatusCode::CREATED,
        Json(InstitutionWithCounts {
            institution: created,
            counts: InstitutionCounts::zero(),
        }),
    ))
}

/// PATCH /institutions/{id}
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<Json<InstitutionRow>, ApiError> {
    auth::require_bearer(&headers)?;
    let id = parse_id(&id)?;

    let updated = state.db.with_conn_mut(|conn| {
        if institutions::get_institution(conn, id)?.is_none() {
            return Err(ApiError::NotFound("Institution not found".to_string()));
        }

        let changes = parse_changes(conn, &body, id)?;
        let now = now_timestamp();
        institutions::update_institution(conn, id, &changes, &now)
    })?;

    Ok(Json(updated))
}

fn parse_changes(
    conn: &rusqlite::Connection,
    body: &Value,
    id: i64,
) -> Result<InstitutionChanges, ApiError> {
    let obj = body.as_object().ok_or_else(|| {
        ApiError::validation("INVALID_BODY", "Request body must be a JSON object")
    })?;

    let mut changes = InstitutionChanges::default();

    if let Some(value) = obj.get("name") {
        let name = value
            .as_str()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                ApiError::validation(
                    "INVALID_NAME",
                    "Name is required and must be a non-empty string",
                )
            })?;
        if institutions::name_taken(conn, name, Some(id))? {
            return Err(ApiError::conflict(
                "NAME_ALREADY_EXISTS",
                "Institution name must be unique",
            ));
        }
        changes.name = Some(name.to_string());
    }

    if let Some(value) = obj.get("code") {
        let code = value
            .as_str()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                ApiError::validation(
                    "INVALID_CODE",
                    "Code is required and must be a non-empty string",
                )
            })?;
        if institutions::code_taken(conn, code, Some(id))? {
            return Err(ApiError::conflict(
                "CODE_ALREADY_EXISTS",
                "Institution code must be unique",
            ));
        }
        changes.code = Some(code.to_string());
    }

    if let Some(value) = obj.get("contactEmail") {
        changes.contact_email = Some(match value {
            Value::Null => None,
            Value::String(s) if s.is_empty() => None,
            Value::String(s) => Some(s.trim().to_lowercase()),
            _ => {
                return Err(ApiError::validation(
                    "INVALID_CONTACT_EMAIL",
                    "Contact email must be a string",
                ))
            }
        });
    }

    if let Some(value) = obj.get("trusted") {
        changes.trusted = Some(value.as_bool().ok_or_else(|| {
            ApiError::validation("INVALID_TRUSTED", "Trusted must be a boolean value")
        })?);
    }

    Ok(changes)
}
