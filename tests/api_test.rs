//! End-to-end API tests driven through the router with in-memory SQLite.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use credcheck::db::{certificates, now_timestamp, sessions, verifications, NewVerification};
use credcheck::{create_router, AppState, RegistryDb};

fn test_app() -> (Router, Arc<RegistryDb>) {
    let db = Arc::new(RegistryDb::open_in_memory().unwrap());
    let app = create_router(AppState { db: db.clone() });
    (app, db)
}

/// Seed a user plus an unexpired session, returning the token
fn seed_session(db: &RegistryDb) -> String {
    let now = now_timestamp();
    let token = sessions::new_session_token();
    let expires = (chrono::Utc::now() + chrono::Duration::hours(1)).to_rfc3339();

    db.with_conn(|conn| {
        sessions::insert_user(conn, "user-1", "Reviewer", "reviewer@example.com", &now)?;
        sessions::insert_session(conn, "session-1", &token, "user-1", &expires, &now)
    })
    .unwrap();

    token
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn json_request(method: &str, uri: &str, bearer: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = bearer {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn create_institution(app: &Router, name: &str, code: &str) -> i64 {
    let (status, body) = send(
        app,
        json_request(
            "POST",
            "/institutions",
            Some("admin-token"),
            json!({ "name": name, "code": code }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "institution create: {}", body);
    body["id"].as_i64().unwrap()
}

async fn create_certificate(app: &Router, serial: &str, holder: &str) -> i64 {
    let (status, body) = send(
        app,
        json_request(
            "POST",
            "/certificates",
            Some("admin-token"),
            json!({ "serial": serial, "holderName": holder }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "certificate create: {}", body);
    body["id"].as_i64().unwrap()
}

#[tokio::test]
async fn test_health_and_stats() {
    let (app, _db) = test_app();

    let response = app.clone().oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let (status, body) = send(&app, get("/stats")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["institutionCount"], 0);
    assert_eq!(body["certificateCount"], 0);
}

#[tokio::test]
async fn test_certificate_create_requires_bearer() {
    let (app, _db) = test_app();

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/certificates",
            None,
            json!({ "serial": "CERT-1", "holderName": "Ada" }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Authorization Bearer token required");
}

#[tokio::test]
async fn test_certificate_duplicate_serial_rejected() {
    let (app, _db) = test_app();

    create_certificate(&app, "CERT-1", "Ada").await;

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/certificates",
            Some("admin-token"),
            json!({ "serial": "CERT-1", "holderName": "Grace" }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "DUPLICATE_SERIAL");
}

#[tokio::test]
async fn test_certificate_create_validates_fields() {
    let (app, _db) = test_app();

    // Whitespace-only serial counts as missing
    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/certificates",
            Some("admin-token"),
            json!({ "serial": "   ", "holderName": "Ada" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "MISSING_REQUIRED_FIELDS");

    // Dangling institution reference
    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/certificates",
            Some("admin-token"),
            json!({ "serial": "CERT-9", "holderName": "Ada", "institutionId": 999 }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INSTITUTION_NOT_FOUND");
}

#[tokio::test]
async fn test_certificate_detail_enriched() {
    let (app, _db) = test_app();

    let institution_id = create_institution(&app, "Acme University", "ACME").await;

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/certificates",
            Some("admin-token"),
            json!({
                "serial": "CERT-D",
                "holderName": "Ada",
                "institutionId": institution_id,
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let cert_id = body["id"].as_i64().unwrap();

    send(
        &app,
        json_request(
            "POST",
            "/verifications",
            None,
            json!({ "certificateId": cert_id, "status": "valid", "confidence": 0.95 }),
        ),
    )
    .await;

    let (status, body) = send(&app, get(&format!("/certificates/{}", cert_id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["serial"], "CERT-D");
    assert_eq!(body["institution"]["name"], "Acme University");
    assert_eq!(body["institution"]["code"], "ACME");
    assert_eq!(body["verifications"].as_array().unwrap().len(), 1);
    assert_eq!(body["verifications"][0]["status"], "valid");
}

#[tokio::test]
async fn test_certificate_lookup_rejects_bad_id() {
    let (app, _db) = test_app();

    let (status, body) = send(&app, get("/certificates/abc")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_ID");

    let (status, _body) = send(&app, get("/certificates/9999")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_certificate_patch_serial_uniqueness() {
    let (app, _db) = test_app();

    let first = create_certificate(&app, "CERT-A", "Ada").await;
    create_certificate(&app, "CERT-B", "Grace").await;

    // Taking another certificate's serial fails
    let (status, body) = send(
        &app,
        json_request(
            "PATCH",
            &format!("/certificates/{}", first),
            Some("admin-token"),
            json!({ "serial": "CERT-B" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "SERIAL_NOT_UNIQUE");

    // Re-submitting its own serial is a no-op, not a conflict
    let (status, body) = send(
        &app,
        json_request(
            "PATCH",
            &format!("/certificates/{}", first),
            Some("admin-token"),
            json!({ "serial": "CERT-A", "program": "CS" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["program"], "CS");
}

#[tokio::test]
async fn test_certificate_patch_rejects_dangling_institution() {
    let (app, _db) = test_app();

    let cert_id = create_certificate(&app, "CERT-P", "Ada").await;

    let (status, body) = send(
        &app,
        json_request(
            "PATCH",
            &format!("/certificates/{}", cert_id),
            Some("admin-token"),
            json!({ "institutionId": 999 }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INSTITUTION_NOT_FOUND");

    // A real institution links; null unlinks
    let institution_id = create_institution(&app, "Acme University", "ACME").await;

    let (status, body) = send(
        &app,
        json_request(
            "PATCH",
            &format!("/certificates/{}", cert_id),
            Some("admin-token"),
            json!({ "institutionId": institution_id }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["institutionId"].as_i64().unwrap(), institution_id);

    let (status, body) = send(
        &app,
        json_request(
            "PATCH",
            &format!("/certificates/{}", cert_id),
            Some("admin-token"),
            json!({ "institutionId": null }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["institutionId"], Value::Null);
}

#[tokio::test]
async fn test_institution_uniqueness() {
    let (app, _db) = test_app();

    create_institution(&app, "Acme University", "ACME").await;

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/institutions",
            Some("admin-token"),
            json!({ "name": "Acme University", "code": "OTHER" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "DUPLICATE_NAME");

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/institutions",
            Some("admin-token"),
            json!({ "name": "Other University", "code": "ACME" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "DUPLICATE_CODE");
}

#[tokio::test]
async fn test_institution_patch_excludes_own_row_from_uniqueness() {
    let (app, _db) = test_app();

    let id = create_institution(&app, "Acme University", "ACME").await;
    create_institution(&app, "Beta College", "BETA").await;

    // Keeping its own name is fine
    let (status, _body) = send(
        &app,
        json_request(
            "PATCH",
            &format!("/institutions/{}", id),
            Some("admin-token"),
            json!({ "name": "Acme University", "trusted": false }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // Taking another institution's code is not
    let (status, body) = send(
        &app,
        json_request(
            "PATCH",
            &format!("/institutions/{}", id),
            Some("admin-token"),
            json!({ "code": "BETA" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "CODE_ALREADY_EXISTS");
}

#[tokio::test]
async fn test_institution_empty_patch_touches_only_updated_at() {
    let (app, _db) = test_app();

    let id = create_institution(&app, "Acme University", "ACME").await;

    let (status, before) = send(&app, get(&format!("/institutions?id={}", id))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &app,
        json_request(
            "PATCH",
            &format!("/institutions/{}", id),
            Some("admin-token"),
            json!({}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], before["name"]);
    assert_eq!(body["code"], before["code"]);
    assert_eq!(body["contactEmail"], before["contactEmail"]);
    assert_eq!(body["trusted"], before["trusted"]);
    assert_eq!(body["createdAt"], before["createdAt"]);
    assert_ne!(body["updatedAt"], before["updatedAt"]);
}

#[tokio::test]
async fn test_institution_contact_email_normalized_and_clearable() {
    let (app, _db) = test_app();

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/institutions",
            Some("admin-token"),
            json!({
                "name": "Acme University",
                "code": "ACME",
                "contactEmail": "  Registrar@ACME.example  ",
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["contactEmail"], "registrar@acme.example");
    let id = body["id"].as_i64().unwrap();

    let (status, body) = send(
        &app,
        json_request(
            "PATCH",
            &format!("/institutions/{}", id),
            Some("admin-token"),
            json!({ "contactEmail": null }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["contactEmail"], Value::Null);
}

#[tokio::test]
async fn test_institution_single_lookup_includes_counts() {
    let (app, _db) = test_app();

    let institution_id = create_institution(&app, "Acme University", "ACME").await;

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/certificates",
            Some("admin-token"),
            json!({
                "serial": "CERT-C",
                "holderName": "Ada",
                "institutionId": institution_id,
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let cert_id = body["id"].as_i64().unwrap();

    send(
        &app,
        json_request(
            "POST",
            "/verifications",
            None,
            json!({ "certificateId": cert_id, "status": "valid", "confidence": 1.0 }),
        ),
    )
    .await;

    let (status, body) = send(&app, get(&format!("/institutions?id={}", institution_id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["certificateCount"], 1);
    assert_eq!(body["verificationCount"], 1);
    assert_eq!(body["flagCount"], 0);
}

#[tokio::test]
async fn test_verification_by_serial_creates_unknown_certificate_once() {
    let (app, db) = test_app();

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/verifications",
            None,
            json!({ "serial": "UNSEEN-1", "status": "suspect", "confidence": 0.4 }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["certificate"]["serial"], "UNSEEN-1");
    assert_eq!(body["certificate"]["holderName"], "Unknown");
    let first_cert = body["certificate"]["id"].as_i64().unwrap();

    // Same serial again resolves to the same certificate
    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/verifications",
            None,
            json!({ "serial": "UNSEEN-1", "status": "valid", "confidence": 0.9 }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["certificate"]["id"].as_i64().unwrap(), first_cert);

    let stats = db.stats().unwrap();
    assert_eq!(stats.certificate_count, 1);
    assert_eq!(stats.verification_count, 2);
}

#[tokio::test]
async fn test_verification_records_bearer_verbatim() {
    let (app, _db) = test_app();

    let cert_id = create_certificate(&app, "CERT-V", "Ada").await;

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/verifications",
            Some("auditor-token"),
            json!({ "certificateId": cert_id, "status": "invalid", "confidence": 0.1 }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["checkedBy"], "auditor-token");
    assert_eq!(body["status"], "invalid");
}

#[tokio::test]
async fn test_verification_validation_codes() {
    let (app, _db) = test_app();

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/verifications",
            None,
            json!({ "serial": "X", "confidence": 0.5 }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "MISSING_REQUIRED_FIELD");

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/verifications",
            None,
            json!({ "serial": "X", "status": "maybe", "confidence": 0.5 }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_STATUS");

    // Missing confidence wins over a bad status value
    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/verifications",
            None,
            json!({ "serial": "X", "status": "maybe" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "MISSING_REQUIRED_FIELD");

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/verifications",
            None,
            json!({ "serial": "X", "status": "valid", "confidence": "high" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_CONFIDENCE");

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/verifications",
            None,
            json!({ "status": "valid", "confidence": 0.5 }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "MISSING_CERTIFICATE_IDENTIFIER");

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/verifications",
            None,
            json!({ "certificateId": 404, "status": "valid", "confidence": 0.5 }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "CERTIFICATE_NOT_FOUND");
}

#[tokio::test]
async fn test_recent_limit_validation_and_clamp() {
    let (app, db) = test_app();

    // Seed straight through the db layer; one certificate, many verifications
    db.with_conn_mut(|conn| {
        let now = now_timestamp();
        let cert = certificates::create_certificate(
            conn,
            &certificates::NewCertificate::unknown_holder("SEED-1"),
            &now,
        )?;
        for _ in 0..55 {
            verifications::insert_verification(
                conn,
                &NewVerification {
                    certificate_id: cert.id,
                    status: "valid".to_string(),
                    confidence: 0.7,
                    checked_by: None,
                    notes: None,
                },
                &now,
            )?;
        }
        Ok(())
    })
    .unwrap();

    let (status, body) = send(&app, get("/verifications/recent?limit=0")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_LIMIT");

    let (status, body) = send(&app, get("/verifications/recent?limit=abc")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_LIMIT");

    let (status, body) = send(&app, get("/verifications/recent?limit=200")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 50);

    let (status, body) = send(&app, get("/verifications/recent")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 10);
}

#[tokio::test]
async fn test_recent_tolerates_invalid_token() {
    let (app, _db) = test_app();

    let req = Request::builder()
        .uri("/verifications/recent")
        .header("authorization", "Bearer never-issued")
        .body(Body::empty())
        .unwrap();

    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_flags_require_valid_session() {
    let (app, _db) = test_app();

    let (status, _body) = send(&app, get("/flags")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // A bearer header alone is not enough here
    let req = Request::builder()
        .uri("/flags")
        .header("authorization", "Bearer never-issued")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Authentication required");
}

#[tokio::test]
async fn test_flag_rejects_identity_override() {
    let (app, db) = test_app();
    let token = seed_session(&db);

    let cert_id = create_certificate(&app, "CERT-F", "Ada").await;

    for payload in [
        json!({ "certificateId": cert_id, "reason": "odd", "userId": "someone-else" }),
        json!({ "certificateId": cert_id, "reason": "odd", "user_id": null }),
        json!({ "certificateId": cert_id, "reason": "odd", "authorId": 7 }),
    ] {
        let (status, body) =
            send(&app, json_request("POST", "/flags", Some(&token), payload)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "USER_ID_NOT_ALLOWED");
    }

    // Same denylist on resolve
    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/flags",
            Some(&token),
            json!({ "certificateId": cert_id, "reason": "odd serial format" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let flag_id = body["id"].as_i64().unwrap();

    let (status, body) = send(
        &app,
        json_request(
            "PATCH",
            &format!("/flags/{}", flag_id),
            Some(&token),
            json!({ "resolved": true, "userId": "someone-else" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "USER_ID_NOT_ALLOWED");
}

#[tokio::test]
async fn test_flag_create_validation() {
    let (app, db) = test_app();
    let token = seed_session(&db);

    let (status, body) = send(
        &app,
        json_request("POST", "/flags", Some(&token), json!({ "reason": "odd" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "MISSING_CERTIFICATE_ID");

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/flags",
            Some(&token),
            json!({ "certificateId": "not-a-number", "reason": "odd" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_CERTIFICATE_ID");

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/flags",
            Some(&token),
            json!({ "certificateId": 1, "reason": "   " }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "MISSING_REASON");

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/flags",
            Some(&token),
            json!({ "certificateId": 999, "reason": "odd" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "CERTIFICATE_NOT_FOUND");
}

#[tokio::test]
async fn test_flag_resolve_roundtrip() {
    let (app, db) = test_app();
    let token = seed_session(&db);

    let cert_id = create_certificate(&app, "CERT-R", "Ada").await;

    // Numeric-string certificateId is accepted
    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/flags",
            Some(&token),
            json!({ "certificateId": cert_id.to_string(), "reason": "checking" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["resolved"], false);
    let flag_id = body["id"].as_i64().unwrap();

    let (status, body) = send(
        &app,
        json_request(
            "PATCH",
            &format!("/flags/{}", flag_id),
            Some(&token),
            json!({ "resolved": "yes" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_RESOLVED_TYPE");

    let (status, body) = send(
        &app,
        json_request(
            "PATCH",
            &format!("/flags/{}", flag_id),
            Some(&token),
            json!({ "resolved": true }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["resolved"], true);
    assert_eq!(body["certificate"]["serial"], "CERT-R");

    // Filterable list views
    let (status, body) = send(
        &app,
        Request::builder()
            .uri("/flags?resolved=true")
            .header("authorization", format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (status, _body) = send(
        &app,
        json_request(
            "PATCH",
            "/flags/9999",
            Some(&token),
            json!({ "resolved": true }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_certificate_search() {
    let (app, _db) = test_app();

    create_certificate(&app, "CERT-100", "Ada Lovelace").await;
    create_certificate(&app, "CERT-200", "Grace Hopper").await;

    let (status, body) = send(&app, get("/certificates?query=Lovelace")).await;
    assert_eq!(status, StatusCode::OK);
    let results = body.as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["serial"], "CERT-100");

    // Serial fragment matches too
    let (status, body) = send(&app, get("/certificates?query=CERT-2")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
}
