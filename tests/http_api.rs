//! Integration tests for the HTTP transport using wiremock.
//!
//! These tests run the reconcilers against a mock Switchcloud API and
//! check the wire format, bearer authentication and error mapping.

use std::net::TcpListener;
use std::sync::Arc;

use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use switchcloud::config::ProviderSettings;
use switchcloud::error::{DiagnosticKind, ReconcileError, SwitchcloudError};
use switchcloud::model::{MEMBER, Object, Value};
use switchcloud::provider::ProviderContext;
use switchcloud::reconciler::{DeleteOutcome, ObjectReconciler, ReadOutcome};
use switchcloud::remote::{AuthenticatedTransport, HttpTransport, Transport, TransportRequest};

// =============================================================================
// Test Helpers
// =============================================================================

const PROJECT_ID: &str = "0faaecfb-d154-4f8f-bdc8-fccd630ddb39";
const MEMBER_ID: &str = "7c1f0a52-9f0e-4bde-a0f5-2f1c3b7f9e11";

fn provider(server: &MockServer, api_key: Option<&str>) -> ProviderContext {
    let settings = ProviderSettings {
        endpoint: server.uri(),
        api_key: api_key.map(String::from),
        ..ProviderSettings::default()
    };
    ProviderContext::connect(&settings).unwrap()
}

fn project_json(name: &str) -> serde_json::Value {
    json!({
        "id": PROJECT_ID,
        "name": name,
        "description": null,
        "organisation_id": "org-1",
        "archived": false,
        "archived_at": "",
        "created_at": "2024-05-01T10:00:00Z",
        "updated_at": "2024-05-01T10:00:00Z"
    })
}

fn member_json() -> serde_json::Value {
    json!({
        "id": MEMBER_ID,
        "project_id": PROJECT_ID,
        "user_id": "user-1",
        "created_at": "2024-05-01T10:00:00Z",
        "updated_at": "2024-05-01T10:00:00Z",
        "links": { "project": format!("/api/v1/projects/{PROJECT_ID}") },
        "user": {
            "id": "user-1",
            "email": "alice@example.com",
            "display_name": "Alice"
        }
    })
}

fn member_identity() -> Object {
    Object::new()
        .with("project_id", PROJECT_ID)
        .with("id", MEMBER_ID)
}

// =============================================================================
// Authentication Tests
// =============================================================================

#[tokio::test]
async fn test_bearer_token_sent_when_configured() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("/api/v1/projects/{PROJECT_ID}")))
        .and(header("Authorization", "Bearer test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(project_json("web")))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = provider(&server, Some("test-key"))
        .projects()
        .read(&Object::new().with("id", PROJECT_ID))
        .await
        .unwrap();

    assert!(matches!(outcome, ReadOutcome::Present(_)));
}

#[tokio::test]
async fn test_no_authorization_header_without_key() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/projects"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let transport = AuthenticatedTransport::new(HttpTransport::new(&server.uri()).unwrap(), None);
    let response = transport
        .send(TransportRequest::get("/api/v1/projects"))
        .await
        .unwrap();
    assert_eq!(response.status, 200);

    let received = server.received_requests().await.unwrap();
    assert_eq!(received.len(), 1);
    assert!(!received[0].headers.contains_key("authorization"));
}

#[tokio::test]
async fn test_unauthorized_is_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("/api/v1/projects/{PROJECT_ID}")))
        .respond_with(ResponseTemplate::new(401).set_body_string("Unauthorized\n"))
        .expect(1)
        .mount(&server)
        .await;

    let err = provider(&server, Some("wrong"))
        .projects()
        .read(&Object::new().with("id", PROJECT_ID))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        SwitchcloudError::Reconcile(ReconcileError::RemoteRejected { status: 401, .. })
    ));
}

// =============================================================================
// Project Tests
// =============================================================================

#[tokio::test]
async fn test_create_project_over_http() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/projects"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({ "name": "web" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(project_json("web")))
        .expect(1)
        .mount(&server)
        .await;

    let created = provider(&server, Some("test-key"))
        .projects()
        .create(&Object::new().with("name", "web").with("description", Value::Null))
        .await
        .unwrap();

    assert_eq!(created.get_str("id"), Some(PROJECT_ID));
    assert_eq!(created.get_str("organisation_id"), Some("org-1"));
    assert_eq!(created.get_bool("archived"), Some(false));
    assert!(created.get("archived_at").is_null());
    assert!(created.get("description").is_null());
    assert!(!created.has_unknown());
}

#[tokio::test]
async fn test_server_error_carries_status_and_body() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/projects"))
        .respond_with(ResponseTemplate::new(500).set_body_string("database unavailable"))
        .mount(&server)
        .await;

    let err = provider(&server, None)
        .projects()
        .create(&Object::new().with("name", "web"))
        .await
        .unwrap_err();

    match err {
        SwitchcloudError::Reconcile(ReconcileError::RemoteRejected { status, body }) => {
            assert_eq!(status, 500);
            assert_eq!(body, "database unavailable");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_unparseable_body_is_decode_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/projects"))
        .respond_with(ResponseTemplate::new(201).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let err = provider(&server, None)
        .projects()
        .create(&Object::new().with("name", "web"))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), DiagnosticKind::DecodeError);
}

#[tokio::test]
async fn test_lookup_by_name() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/projects"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([project_json("api"), project_json("web")])),
        )
        .mount(&server)
        .await;

    let lookup = provider(&server, None).project_lookup();
    let found = lookup.find_by_name("web").await.unwrap();
    assert_eq!(found.get_str("name"), Some("web"));

    let err = lookup.find_by_name("missing").await.unwrap_err();
    assert_eq!(err.kind(), DiagnosticKind::NotFound);
}

// =============================================================================
// Member Tests
// =============================================================================

#[tokio::test]
async fn test_member_lifecycle_over_http() {
    let server = MockServer::start().await;
    let member_path = format!("/api/v1/projects/{PROJECT_ID}/members/{MEMBER_ID}");

    Mock::given(method("POST"))
        .and(path(format!("/api/v1/projects/{PROJECT_ID}/members")))
        .and(body_json(json!({ "email": "alice@example.com" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(member_json()))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path(member_path.as_str()))
        .respond_with(ResponseTemplate::new(204))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path(member_path.as_str()))
        .respond_with(ResponseTemplate::new(404).set_body_string("Project member not found\n"))
        .mount(&server)
        .await;

    let members = provider(&server, Some("test-key")).members();
    let desired = Object::new()
        .with("project_id", PROJECT_ID)
        .with("email", "alice@example.com")
        .with("user_id", Value::Null);

    let created = members.create(&desired).await.unwrap();
    assert_eq!(created.get_str("id"), Some(MEMBER_ID));
    assert_eq!(created.get_str("user_id"), Some("user-1"));
    assert_eq!(created.get_str("display_name"), Some("Alice"));
    assert_eq!(MEMBER.identity_of(&created), member_identity());

    let first = members.delete(&member_identity()).await.unwrap();
    let second = members.delete(&member_identity()).await.unwrap();
    assert_eq!(first, DeleteOutcome::Deleted);
    assert_eq!(second, DeleteOutcome::AlreadyAbsent);
}

#[tokio::test]
async fn test_import_member_reads_nested_path() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!(
            "/api/v1/projects/{PROJECT_ID}/members/{MEMBER_ID}"
        )))
        .respond_with(ResponseTemplate::new(200).set_body_json(member_json()))
        .expect(1)
        .mount(&server)
        .await;

    let imported = provider(&server, None)
        .members()
        .import(&format!("{PROJECT_ID}/{MEMBER_ID}"))
        .await
        .unwrap()
        .into_object()
        .unwrap();

    assert_eq!(imported.get_str("email"), Some("alice@example.com"));
    assert_eq!(imported.get_str("project_id"), Some(PROJECT_ID));
}

// =============================================================================
// Transport Failure Tests
// =============================================================================

#[tokio::test]
async fn test_unreachable_endpoint_is_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let uri = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let transport: Arc<dyn Transport> = Arc::new(HttpTransport::with_timeout(&uri, 2).unwrap());
    let err = ProviderContext::with_transport(uri, transport)
        .projects()
        .read(&Object::new().with("id", PROJECT_ID))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), DiagnosticKind::TransportError);
    assert!(err.is_retryable());
}
