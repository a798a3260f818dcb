use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use serde_json::json;

use super::*;
use crate::net::testing::{FakeTransport, client_with, json, path_of, text};

// =============================================================================
// LISTS
// =============================================================================

#[tokio::test]
async fn lists_accept_bare_and_wrapped_arrays() {
    let transport = Arc::new(FakeTransport::new(|envelope| match path_of(&envelope.url) {
        "/api/countries/KE/missionaries" => json(200, json!({ "missionaries": [{ "id": 1, "email": "a@x.org" }] })),
        "/api/countries/KE/reports" => json(200, json!([{ "id": 5, "title": "Clinic", "missionary": "A" }])),
        _ => text(404, ""),
    }));
    let client = client_with(&transport);

    assert_eq!(country_missionaries(&client, "KE").await.unwrap().len(), 1);
    let reports = country_reports(&client, "KE").await.unwrap();
    assert_eq!(reports[0].title, "Clinic");
}

#[tokio::test]
async fn malformed_report_entries_are_a_decode_error() {
    let transport = Arc::new(FakeTransport::new(|_| json(200, json!([{ "id": "not-a-number" }]))));
    let client = client_with(&transport);
    assert!(matches!(country_reports(&client, "KE").await, Err(ApiError::Decode(_))));
}

// =============================================================================
// HYDRATION
// =============================================================================

#[tokio::test]
async fn hydration_fills_missing_contacts_only() {
    let transport = Arc::new(FakeTransport::new(|envelope| match path_of(&envelope.url) {
        "/api/missionaries/2" => json(200, json!({ "user": { "email": "b@x.org" }, "profile": { "website": "b.org" } })),
        _ => text(404, "not found"),
    }));
    let client = client_with(&transport);
    let list = vec![json!({ "id": 1, "email": "a@x.org" }), json!({ "id": 2, "display_name": "B" })];

    let hydrated = hydrate_contacts(&client, list).await;

    assert_eq!(hydrated[0], json!({ "id": 1, "email": "a@x.org" }));
    assert_eq!(hydrated[1]["email"], "b@x.org");
    assert_eq!(hydrated[1]["website"], "https://b.org");
    assert!(hydrated[1].get("_detail").is_some());
    assert_eq!(transport.sent().len(), 1);
}

#[tokio::test]
async fn hydration_uses_user_endpoint_and_ignores_failures() {
    let transport = Arc::new(FakeTransport::new(|envelope| match path_of(&envelope.url) {
        "/api/users/9" => Err(ApiError::Network("reset".to_owned())),
        _ => text(404, ""),
    }));
    let client = client_with(&transport);
    let list = vec![json!({ "user_id": 9, "display_name": "C" })];

    let hydrated = hydrate_contacts(&client, list.clone()).await;

    assert_eq!(hydrated, list);
    assert_eq!(path_of(&transport.sent()[0].url), "/api/users/9");
}

#[tokio::test]
async fn hydration_results_are_cached_per_client() {
    let transport = Arc::new(FakeTransport::new(|_| json(200, json!({ "email": "d@x.org" }))));
    let client = client_with(&transport);
    let list = vec![json!({ "id": 4 })];

    hydrate_contacts(&client, list.clone()).await;
    let again = hydrate_contacts(&client, list).await;

    assert_eq!(again[0]["email"], "d@x.org");
    assert_eq!(transport.sent().len(), 1);
}

/// Counts lookups in flight to check the fan-out bound.
struct Gauge {
    current: AtomicUsize,
    peak: AtomicUsize,
}

#[tokio::test]
async fn hydration_fan_out_is_bounded() {
    let gauge = Arc::new(Gauge { current: AtomicUsize::new(0), peak: AtomicUsize::new(0) });
    let transport = Arc::new(SlowTransport { gauge: Arc::clone(&gauge) });
    let client = ApiClient::with_transport(
        "http://api.test",
        transport as Arc<dyn crate::net::Transport>,
        Arc::new(crate::session::MemoryStorage::new()),
    );
    let list: Vec<Value> = (0..10).map(|id| json!({ "id": id })).collect();

    let hydrated = hydrate_contacts(&client, list).await;

    assert_eq!(hydrated.len(), 10);
    assert!(hydrated.iter().all(|m| m["email"] == "z@x.org"));
    assert_eq!(gauge.peak.load(Ordering::SeqCst), HYDRATION_CONCURRENCY);
}

struct SlowTransport {
    gauge: Arc<Gauge>,
}

#[async_trait::async_trait]
impl crate::net::Transport for SlowTransport {
    async fn send(&self, _envelope: crate::net::envelope::Envelope) -> Result<crate::net::RawResponse, ApiError> {
        let now = self.gauge.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.gauge.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(10)).await;
        self.gauge.current.fetch_sub(1, Ordering::SeqCst);
        json(200, json!({ "email": "z@x.org" }))
    }
}

// =============================================================================
// PANEL
// =============================================================================

#[tokio::test]
async fn invalid_code_fails_before_any_request() {
    let transport = Arc::new(FakeTransport::new(|_| json(200, json!([]))));
    let client = client_with(&transport);
    let err = load_country_panel(&client, "-99", |_| {}).await.unwrap_err();
    assert_eq!(err.user_message(), "Unknown country code.");
    assert!(transport.sent().is_empty());
}

#[tokio::test]
async fn one_failing_section_does_not_fail_the_other() {
    let transport = Arc::new(FakeTransport::new(|envelope| match path_of(&envelope.url) {
        "/api/countries/KE/missionaries" => json(200, json!([{ "id": 1, "display_name": "A", "email": "a@x.org" }])),
        _ => json(500, json!({ "error": "database unavailable" })),
    }));
    let client = client_with(&transport);
    let mut updates = Vec::new();

    let panel = load_country_panel(&client, "ke", |panel| updates.push(panel.clone())).await.unwrap();

    assert_eq!(panel.name, "Kenya");
    assert_eq!(panel.iso2, "KE");
    assert_eq!(panel.missionaries.items()[0].display_name, "A");
    assert_eq!(panel.reports, Section::Failed("database unavailable".to_owned()));
    assert!(panel.is_settled());
    assert_eq!(updates.len(), 3);
    assert!(!updates[0].missionaries.is_settled() && !updates[0].reports.is_settled());
}

#[tokio::test]
async fn panel_hydrates_missing_emails() {
    let transport = Arc::new(FakeTransport::new(|envelope| match path_of(&envelope.url) {
        "/api/countries/UG/missionaries" => json(200, json!([{ "id": 3, "display_name": "C", "email": null }])),
        "/api/countries/UG/reports" => json(200, json!({ "reports": [] })),
        "/api/missionaries/3" => json(200, json!({ "contact_email": "c@x.org" })),
        _ => text(404, ""),
    }));
    let client = client_with(&transport);
    let mut saw_hydrating = false;

    let panel = load_country_panel(&client, "UG", |panel| saw_hydrating |= panel.hydrating).await.unwrap();

    assert!(saw_hydrating);
    assert!(!panel.hydrating);
    assert_eq!(panel.missionaries.items()[0].email.as_deref(), Some("c@x.org"));
    assert_eq!(panel.reports, Section::Ready(vec![]));
}
