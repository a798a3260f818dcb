use std::time::Duration;

use serde_json::json;

use super::*;
use crate::net::envelope::ApiRequest;
use crate::net::testing::{FakeTransport, client_with, json, path_of, signed_in, text};

/// `/api/me` accepts only `valid`; refresh hands out `refreshed` (if any).
fn token_gate(valid: &'static str, refreshed: Option<&'static str>) -> FakeTransport {
    FakeTransport::new(move |envelope| match path_of(&envelope.url) {
        "/api/auth/refresh" => match refreshed {
            Some(token) => json(200, json!({ "access_token": token })),
            None => json(401, json!({ "error": "refresh token expired" })),
        },
        "/api/me" if envelope.bearer.as_deref() == Some(valid) => json(200, json!({ "id": 1 })),
        "/api/me" => json(401, json!({ "error": "token expired" })),
        _ => text(404, "no route"),
    })
}

// =============================================================================
// HAPPY PATH
// =============================================================================

#[tokio::test]
async fn success_needs_one_attempt() {
    let transport = Arc::new(token_gate("T1", Some("T2")));
    let client = signed_in(&transport, "T1");

    let body: Value = client.call_json(ApiRequest::get("/api/me")).await.unwrap();
    assert_eq!(body, json!({ "id": 1 }));
    assert_eq!(transport.sent().len(), 1);
    assert_eq!(transport.sent()[0].bearer.as_deref(), Some("T1"));
}

#[tokio::test]
async fn signed_out_call_sends_no_bearer() {
    let transport = Arc::new(FakeTransport::new(|_| json(200, json!([]))));
    let client = client_with(&transport);
    client.call(ApiRequest::get("/api/countries/KE/reports")).await.unwrap();
    assert_eq!(transport.sent()[0].bearer, None);
}

// =============================================================================
// REFRESH AND RETRY
// =============================================================================

#[tokio::test]
async fn unauthorized_then_refresh_then_success() {
    let transport = Arc::new(token_gate("T2", Some("T2")));
    let client = signed_in(&transport, "T1");

    let body: Value = client.call_json(ApiRequest::get("/api/me")).await.unwrap();

    assert_eq!(body, json!({ "id": 1 }));
    assert_eq!(client.session().token().as_deref(), Some("T2"));
    let bearers: Vec<_> = transport.sent().iter().map(|e| e.bearer.clone()).collect();
    assert_eq!(bearers, vec![Some("T1".to_owned()), None, Some("T2".to_owned())]);
}

#[tokio::test]
async fn forbidden_and_419_also_trigger_refresh() {
    for status in [403_u16, 419] {
        let transport = Arc::new(FakeTransport::new(move |envelope| match path_of(&envelope.url) {
            "/api/auth/refresh" => json(200, json!({ "token": "T2" })),
            _ if envelope.bearer.as_deref() == Some("T2") => json(200, json!({ "ok": true })),
            _ => text(status, "stale"),
        }));
        let client = signed_in(&transport, "T1");
        client.call(ApiRequest::get("/api/me/reports")).await.unwrap();
        assert_eq!(transport.count("/api/auth/refresh"), 1, "status {status}");
    }
}

#[tokio::test]
async fn failed_refresh_retries_with_prior_token_and_surfaces_expiry() {
    let transport = Arc::new(token_gate("T-never", None));
    let client = signed_in(&transport, "T1");

    let err = client.call(ApiRequest::get("/api/me")).await.unwrap_err();

    assert!(matches!(err, ApiError::SessionExpired { status: 401, .. }));
    let sent = transport.sent();
    assert_eq!(sent.len(), 3);
    assert_eq!(sent[2].bearer.as_deref(), Some("T1"));
    assert!(client.refresh().session_expired());
    assert!(!client.session().is_authenticated());
}

#[tokio::test]
async fn refresh_network_failure_keeps_session() {
    let transport = Arc::new(FakeTransport::new(|envelope| match path_of(&envelope.url) {
        "/api/auth/refresh" => Err(ApiError::Network("connection reset".to_owned())),
        _ => text(401, "stale"),
    }));
    let client = signed_in(&transport, "T1");

    let err = client.call(ApiRequest::get("/api/me")).await.unwrap_err();
    assert!(err.is_session_expired());
    assert_eq!(client.session().token().as_deref(), Some("T1"));
    assert!(!client.refresh().session_expired());
}

#[tokio::test]
async fn other_failures_are_not_retried() {
    let transport = Arc::new(FakeTransport::new(|_| json(422, json!({ "error": "countries must be an array" }))));
    let client = signed_in(&transport, "T1");

    let err = client.call(ApiRequest::put("/api/me/assignments")).await.unwrap_err();

    assert_eq!(err.status(), Some(422));
    assert_eq!(err.user_message(), "countries must be an array");
    assert_eq!(transport.sent().len(), 1);
}

#[tokio::test]
async fn retry_failing_with_other_status_is_returned_unchanged() {
    let transport = Arc::new(FakeTransport::new(|envelope| match path_of(&envelope.url) {
        "/api/auth/refresh" => json(200, json!({ "access_token": "T2" })),
        _ if envelope.bearer.as_deref() == Some("T2") => text(500, "boom"),
        _ => text(401, "stale"),
    }));
    let client = signed_in(&transport, "T1");

    let err = client.call(ApiRequest::get("/api/me")).await.unwrap_err();
    assert!(matches!(err, ApiError::Http { status: 500, .. }));
    assert_eq!(transport.sent().len(), 3);
}

#[tokio::test]
async fn anonymous_calls_never_refresh() {
    let transport = Arc::new(FakeTransport::new(|_| json(401, json!({ "error": "invalid credentials" }))));
    let client = client_with(&transport);

    let err = client.call(ApiRequest::post("/api/auth/login").anonymous()).await.unwrap_err();
    assert!(matches!(err, ApiError::Http { status: 401, .. }));
    assert_eq!(transport.count("/api/auth/refresh"), 0);
}

#[tokio::test]
async fn network_failure_is_not_retried() {
    let transport = Arc::new(FakeTransport::new(|_| Err(ApiError::Network("dns".to_owned()))));
    let client = signed_in(&transport, "T1");
    let err = client.call(ApiRequest::get("/api/me")).await.unwrap_err();
    assert!(matches!(err, ApiError::Network(_)));
    assert_eq!(transport.sent().len(), 1);
}

// =============================================================================
// CONCURRENCY
// =============================================================================

#[tokio::test]
async fn concurrent_unauthorized_calls_share_one_refresh() {
    let transport = Arc::new(token_gate("T2", Some("T2")).with_refresh_delay(Duration::from_millis(20)));
    let client = signed_in(&transport, "T1");

    let calls = (0..5).map(|_| client.call(ApiRequest::get("/api/me")));
    let results = futures::future::join_all(calls).await;

    assert!(results.iter().all(Result::is_ok));
    assert_eq!(transport.count("/api/auth/refresh"), 1);
    let retries: Vec<_> = transport
        .sent()
        .into_iter()
        .filter(|e| path_of(&e.url) == "/api/me" && e.bearer.as_deref() == Some("T2"))
        .collect();
    assert_eq!(retries.len(), 5);
}

#[tokio::test]
async fn concurrent_calls_after_failed_refresh_all_use_prior_token() {
    let transport = Arc::new(token_gate("T-never", None).with_refresh_delay(Duration::from_millis(20)));
    let client = signed_in(&transport, "T1");

    let calls = (0..4).map(|_| client.call(ApiRequest::get("/api/me")));
    let results = futures::future::join_all(calls).await;

    assert!(results.iter().all(|r| matches!(r, Err(ApiError::SessionExpired { .. }))));
    assert_eq!(transport.count("/api/auth/refresh"), 1);
    let me_calls: Vec<_> = transport.sent().into_iter().filter(|e| path_of(&e.url) == "/api/me").collect();
    assert_eq!(me_calls.len(), 8);
    assert!(me_calls.iter().all(|e| e.bearer.as_deref() == Some("T1")));
}

// =============================================================================
// DECODING / FILE URLS
// =============================================================================

#[tokio::test]
async fn decode_failure_names_the_path() {
    let transport = Arc::new(FakeTransport::new(|_| text(200, "<html>")));
    let client = client_with(&transport);
    let err = client.call_json::<Vec<String>>(ApiRequest::get("/api/me/assignments")).await.unwrap_err();
    match err {
        ApiError::Decode(detail) => assert!(detail.starts_with("/api/me/assignments")),
        other => panic!("expected decode error, got {other:?}"),
    }
}

#[tokio::test]
async fn empty_body_decodes_as_null() {
    let transport = Arc::new(FakeTransport::new(|_| text(200, "")));
    let client = client_with(&transport);
    let value: Option<Value> = client.call_json(ApiRequest::delete("/api/me/reports/1")).await.unwrap();
    assert_eq!(value, None);
}

#[test]
fn file_url_uses_client_base() {
    let transport = Arc::new(FakeTransport::new(|_| text(200, "")));
    let client = client_with(&transport);
    assert_eq!(client.file_url("/uploads/a.png"), "http://api.test/api/files/a.png");
}
