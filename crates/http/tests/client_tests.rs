//! Integration tests for the Keystone HTTP client

use std::time::Duration;

use keystone_core::{Credential, LoginRequest, RegisterRequest};
use keystone_http::{ClientError, SessionClient};
use serde_json::{Value, json};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn auth_body(token: &str) -> Value {
    json!({
        "accessToken": token,
        "email": "a@b.com",
        "firstName": "Ann"
    })
}

fn unauthorized() -> ResponseTemplate {
    ResponseTemplate::new(401).set_body_json(json!({
        "status": 401,
        "error": "Unauthorized",
        "message": "Token expired"
    }))
}

async fn mount_refresh(server: &MockServer, response: ResponseTemplate, times: u64) {
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .respond_with(response)
        .expect(times)
        .mount(server)
        .await;
}

fn client_with(server: &MockServer, token: &str) -> SessionClient {
    let client = SessionClient::new(server.uri()).unwrap();
    client.credentials().set(Some(Credential::new(token)));
    client
}

#[tokio::test]
async fn test_client_builder_requires_base_url() {
    let result = SessionClient::builder().build();
    assert!(matches!(result, Err(ClientError::Configuration(_))));
}

#[tokio::test]
async fn test_client_builder_trims_trailing_slash() {
    let client = SessionClient::builder()
        .base_url("http://localhost:8443/")
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap();
    assert_eq!(client.base_url(), "http://localhost:8443");
    assert_eq!(client.endpoints().login, "/api/auth/login");
}

#[tokio::test]
async fn test_attaches_current_credential() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/items"))
        .and(header("authorization", "Bearer tok1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": []})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_with(&server, "tok1");
    let body: Value = client.get("/api/items").await.unwrap();
    assert_eq!(body, json!({"items": []}));
}

#[tokio::test]
async fn test_no_authorization_header_without_credential() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/public"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let client = SessionClient::new(server.uri()).unwrap();
    let _: Value = client.get("/api/public").await.unwrap();

    let received = server.received_requests().await.unwrap();
    assert_eq!(received.len(), 1);
    assert!(received[0].headers.get("authorization").is_none());
}

#[tokio::test]
async fn test_unauthorized_request_is_renewed_and_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/items"))
        .and(header("authorization", "Bearer tok2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/items"))
        .respond_with(unauthorized())
        .expect(1)
        .mount(&server)
        .await;
    mount_refresh(
        &server,
        ResponseTemplate::new(200).set_body_json(auth_body("tok2")),
        1,
    )
    .await;

    let client = client_with(&server, "tok1");
    let body: Value = client.get("/api/items").await.unwrap();

    assert_eq!(body, json!({"ok": true}));
    assert_eq!(client.credentials().get(), Some(Credential::new("tok2")));
    assert!(!client.is_renewing());
}

#[tokio::test]
async fn test_concurrent_failures_share_one_renewal() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/items"))
        .and(header("authorization", "Bearer tok2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .with_priority(1)
        .expect(5)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/items"))
        .respond_with(unauthorized())
        .expect(5)
        .mount(&server)
        .await;
    mount_refresh(
        &server,
        ResponseTemplate::new(200)
            .set_body_json(auth_body("tok2"))
            .set_delay(Duration::from_millis(200)),
        1,
    )
    .await;

    let client = client_with(&server, "tok1");
    let results =
        futures::future::join_all((0..5).map(|_| client.get::<Value>("/api/items"))).await;

    assert!(results.iter().all(Result::is_ok));
    assert_eq!(client.credentials().get(), Some(Credential::new("tok2")));
}

#[tokio::test]
async fn test_concurrent_failures_all_see_failed_renewal() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/items"))
        .respond_with(unauthorized())
        .expect(3)
        .mount(&server)
        .await;
    mount_refresh(
        &server,
        unauthorized().set_delay(Duration::from_millis(200)),
        1,
    )
    .await;

    let client = client_with(&server, "tok1");
    let results =
        futures::future::join_all((0..3).map(|_| client.get::<Value>("/api/items"))).await;

    assert!(
        results
            .iter()
            .all(|r| matches!(r, Err(e) if e.is_auth_expired()))
    );
    assert!(client.credentials().get().is_none());
}

#[tokio::test]
async fn test_retried_request_is_not_retried_again() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/items"))
        .respond_with(unauthorized())
        .expect(2)
        .mount(&server)
        .await;
    mount_refresh(
        &server,
        ResponseTemplate::new(200).set_body_json(auth_body("tok2")),
        1,
    )
    .await;

    let client = client_with(&server, "tok1");
    let result = client.get::<Value>("/api/items").await;

    assert!(matches!(result, Err(ClientError::AuthenticationFailed(_))));
    // the renewal itself succeeded
    assert_eq!(client.credentials().get(), Some(Credential::new("tok2")));
}

#[tokio::test]
async fn test_failed_renewal_clears_credential_and_propagates() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/items"))
        .respond_with(unauthorized())
        .expect(1)
        .mount(&server)
        .await;
    mount_refresh(
        &server,
        ResponseTemplate::new(401).set_body_json(json!({
            "status": 401,
            "error": "Unauthorized",
            "message": "Invalid or expired refresh token"
        })),
        1,
    )
    .await;

    let client = client_with(&server, "tok1");
    let result = client.get::<Value>("/api/items").await;

    // the caller sees the original failure, not the renewal's
    assert!(matches!(result, Err(ClientError::AuthenticationFailed(ref m)) if m == "Token expired"));
    assert!(client.credentials().get().is_none());
}

#[tokio::test]
async fn test_failing_refresh_never_renews_itself() {
    let server = MockServer::start().await;
    mount_refresh(&server, unauthorized(), 1).await;

    let client = client_with(&server, "tok1");
    assert!(client.refresh().await.unwrap_err().is_auth_expired());

    // the coordinated path issues exactly one more call and gives up
    let server = MockServer::start().await;
    mount_refresh(&server, unauthorized(), 1).await;
    let client = client_with(&server, "tok1");
    assert!(client.acquire_fresh_credential().await.is_none());
    assert!(client.credentials().get().is_none());
}

#[tokio::test]
async fn test_failing_login_never_renews() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "status": 401,
            "error": "Unauthorized",
            "message": "Invalid email or password"
        })))
        .expect(1)
        .mount(&server)
        .await;
    mount_refresh(
        &server,
        ResponseTemplate::new(200).set_body_json(auth_body("tok2")),
        0,
    )
    .await;

    let client = SessionClient::new(server.uri()).unwrap();
    let result = client
        .login(&LoginRequest {
            email: "a@b.com".to_string(),
            password: "wrong-password".to_string(),
        })
        .await;

    assert!(
        matches!(result, Err(ClientError::AuthenticationFailed(ref m)) if m == "Invalid email or password")
    );
}

#[tokio::test]
async fn test_non_authorization_errors_pass_through() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/items"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "status": 500,
            "error": "Internal server error"
        })))
        .expect(1)
        .mount(&server)
        .await;
    mount_refresh(
        &server,
        ResponseTemplate::new(200).set_body_json(auth_body("tok2")),
        0,
    )
    .await;

    let client = client_with(&server, "tok1");
    let result = client.get::<Value>("/api/items").await;

    assert!(matches!(
        result,
        Err(ClientError::ServerError { status: 500, .. })
    ));
    assert_eq!(client.credentials().get(), Some(Credential::new("tok1")));
}

#[tokio::test]
async fn test_replay_keeps_request_body() {
    let server = MockServer::start().await;
    let payload = json!({"name": "widget"});
    Mock::given(method("POST"))
        .and(path("/api/items"))
        .and(header("authorization", "Bearer tok2"))
        .and(body_json(&payload))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 7})))
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/items"))
        .respond_with(unauthorized())
        .mount(&server)
        .await;
    mount_refresh(
        &server,
        ResponseTemplate::new(200).set_body_json(auth_body("tok2")),
        1,
    )
    .await;

    let client = client_with(&server, "tok1");
    let created: Value = client.post("/api/items", &payload).await.unwrap();
    assert_eq!(created["id"], 7);
}

#[tokio::test]
async fn test_login_returns_grant() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .and(body_json(json!({"email": "a@b.com", "password": "secret123"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(auth_body("tok1")))
        .expect(1)
        .mount(&server)
        .await;

    let client = SessionClient::new(server.uri()).unwrap();
    let grant = client
        .login(&LoginRequest {
            email: "a@b.com".to_string(),
            password: "secret123".to_string(),
        })
        .await
        .unwrap();

    assert_eq!(grant.credential, Credential::new("tok1"));
    assert_eq!(grant.profile.first_name, "Ann");
    // storing the credential is the session's job
    assert!(client.credentials().get().is_none());
}

#[tokio::test]
async fn test_register_conflict_and_validation() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/register"))
        .and(body_json(json!({
            "email": "taken@b.com",
            "password": "secret123",
            "firstName": "Ann",
            "lastName": "Lee"
        })))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "status": 409,
            "error": "Conflict",
            "message": "Email already registered: taken@b.com"
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/register"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "status": 400,
            "error": "Validation failed",
            "fieldErrors": {"email": "must be a well-formed email address"}
        })))
        .mount(&server)
        .await;

    let client = SessionClient::new(server.uri()).unwrap();
    let mut request = RegisterRequest {
        email: "taken@b.com".to_string(),
        password: "secret123".to_string(),
        first_name: "Ann".to_string(),
        last_name: "Lee".to_string(),
    };
    let err = client.register(&request).await.unwrap_err();
    assert!(matches!(err, ClientError::Conflict(_)));

    request.email = "nope".to_string();
    let err = client.register(&request).await.unwrap_err();
    assert_eq!(
        err.field_errors().unwrap()["email"],
        "must be a well-formed email address"
    );
}

#[tokio::test]
async fn test_logout_expects_no_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/logout"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_with(&server, "tok1");
    client.logout().await.unwrap();
}

fn with_session_cookie(token: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_json(auth_body(token))
        .insert_header("set-cookie", "refresh_token=r1; Path=/api/auth; HttpOnly")
}

fn login_request() -> LoginRequest {
    LoginRequest {
        email: "a@b.com".to_string(),
        password: "secret123".to_string(),
    }
}

#[tokio::test]
async fn test_session_proof_carries_over_to_new_client() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(with_session_cookie("tok1"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .and(header("cookie", "refresh_token=r1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(auth_body("tok2")))
        .expect(1)
        .mount(&server)
        .await;

    let first = SessionClient::new(server.uri()).unwrap();
    assert!(first.session_proof().is_none());
    first.login(&login_request()).await.unwrap();
    let proof = first.session_proof().unwrap();
    assert_eq!(proof, "refresh_token=r1");

    let second = SessionClient::new(server.uri()).unwrap();
    second.restore_session_proof(&proof);
    assert_eq!(second.session_proof().as_deref(), Some("refresh_token=r1"));

    let grant = second.acquire_fresh_credential().await.unwrap();
    assert_eq!(grant.credential, Credential::new("tok2"));
    assert_eq!(second.credentials().get(), Some(Credential::new("tok2")));
}

#[tokio::test]
async fn test_session_proof_can_be_cleared() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(with_session_cookie("tok1"))
        .mount(&server)
        .await;

    let client = SessionClient::new(server.uri()).unwrap();
    client.login(&login_request()).await.unwrap();
    assert!(client.session_proof().is_some());

    client.clear_session_proof();
    assert!(client.session_proof().is_none());
}
