//! HTTP routes for the verification registry
//!
//! Each handler is a standalone unit of work: validate input, check
//! constraints, perform one mutation or query, return an enriched JSON
//! projection. No cross-registry orchestration.

pub mod certificates;
pub mod flags;
pub mod institutions;
pub mod verifications;

use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, patch, post};
use axum::{Json, Router};

use crate::db::{DbStats, RegistryDb};
use crate::error::ApiError;

/// State shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<RegistryDb>,
}

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/stats", get(stats))
        .route(
            "/certificates",
            get(certificates::search).post(certificates::create),
        )
        .route(
            "/certificates/:id",
            get(certificates::get_one).patch(certificates::update),
        )
        .route(
            "/institutions",
            get(institutions::list_or_get).post(institutions::create),
        )
        .route("/institutions/:id", patch(institutions::update))
        .route("/verifications", post(verifications::record))
        .route("/verifications/recent", get(verifications::recent))
        .route("/flags", get(flags::list).post(flags::create))
        .route("/flags/:id", patch(flags::update))
        .with_state(state)
}

/// Health check endpoint
async fn health() -> &'static str {
    "OK"
}

/// GET /stats - row counts per registry table
async fn stats(State(state): State<AppState>) -> Result<Json<DbStats>, ApiError> {
    Ok(Json(state.db.stats()?))
}

/// Parse a path id, rejecting anything non-numeric
pub(crate) fn parse_id(raw: &str) -> Result<i64, ApiError> {
    raw.parse::<i64>()
        .map_err(|_| ApiError::validation("INVALID_ID", "Valid ID is required"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_id() {
        assert_eq!(parse_id("42").unwrap(), 42);
        assert!(parse_id("abc").is_err());
        assert!(parse_id("1.5").is_err());
    }
}
