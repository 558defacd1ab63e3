//! Request pipeline tests against a mock upstream.
//!
//! wiremock stands in for the REST API so the refresh and retry behaviour
//! can be observed from the outside: how many calls reached each endpoint and
//! which credentials they carried.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use gatehouse_core::error::{AuthError, NetworkError};
use gatehouse_core::{
    AccessToken, Api, ApiUrl, Credentials, Error, MemoryTokenStore, NewUser, PageRequest,
    RefreshToken, TokenPair, TokenStore, UserId,
};
use gatehouse_http::{AuthEvent, ClientConfig, HttpApi, HttpClient, RetryPolicy};
use serde_json::{Value, json};
use tokio::io::AsyncReadExt;
use tokio::net::TcpListener;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config(server: &MockServer) -> ClientConfig {
    ClientConfig {
        api_url: ApiUrl::new(server.uri()).unwrap(),
        ..ClientConfig::default()
    }
    .with_retry(RetryPolicy::default().without_backoff())
}

fn store_with(access: &str, refresh: &str) -> Arc<MemoryTokenStore> {
    Arc::new(MemoryTokenStore::with_pair(TokenPair::new(
        AccessToken::new(access),
        RefreshToken::new(refresh),
        3600,
    )))
}

fn tokens_body(access: &str, refresh: &str) -> Value {
    json!({
        "status": "success",
        "message": "Token refreshed",
        "data": {
            "access_token": access,
            "refresh_token": refresh,
            "expires_in": 3600
        }
    })
}

fn user_body(id: &str) -> Value {
    json!({
        "status": "success",
        "message": "OK",
        "data": {
            "id": id,
            "email": "admin@example.com",
            "username": "admin",
            "first_name": "Admin",
            "last_name": "User",
            "role": "admin",
            "status": "active",
            "email_verified": true
        }
    })
}

async fn mount_refresh(server: &MockServer, access: &str, refresh: &str, calls: u64) {
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/refresh"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(tokens_body(access, refresh))
                .set_delay(Duration::from_millis(200)),
        )
        .expect(calls)
        .mount(server)
        .await;
}

// ============================================================================
// Authentication
// ============================================================================

#[tokio::test]
async fn login_stores_issued_tokens() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/auth/login"))
        .and(body_json(json!({
            "email": "admin@example.com",
            "password": "admin123"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "message": "Login successful",
            "data": {
                "access_token": "access-1",
                "refresh_token": "refresh-1",
                "expires_in": 3600
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryTokenStore::new());
    let api = HttpApi::new(store.clone(), config(&server)).unwrap();

    let response = api
        .login(&Credentials::new("admin@example.com", "admin123"))
        .await
        .unwrap();

    assert_eq!(response.message, "Login successful");
    let pair = store.get().unwrap().unwrap();
    assert_eq!(pair.access_token.as_str(), "access-1");
    assert_eq!(pair.refresh_token.as_str(), "refresh-1");
}

#[tokio::test]
async fn login_with_bad_password_does_not_refresh() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/auth/login"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "status": "error",
            "code": "INVALID_CREDENTIALS",
            "message": "Invalid email or password"
        })))
        .expect(1)
        .mount(&server)
        .await;
    mount_refresh(&server, "unused", "unused", 0).await;

    let store = Arc::new(MemoryTokenStore::new());
    let api = HttpApi::new(store.clone(), config(&server)).unwrap();

    let err = api
        .login(&Credentials::new("admin@example.com", "wrong"))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Auth(AuthError::InvalidCredentials(ref m)) if m == "Invalid email or password"));
    assert!(store.get().unwrap().is_none());
}

#[tokio::test]
async fn login_then_unauthorized_refreshes_once_and_retries_with_new_token() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(tokens_body("old-access", "old-refresh")))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/v1/auth/refresh"))
        .and(header("authorization", "Bearer old-refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(tokens_body("new-access", "new-refresh")))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v1/auth/me"))
        .and(header("authorization", "Bearer old-access"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v1/auth/me"))
        .and(header("authorization", "Bearer new-access"))
        .respond_with(ResponseTemplate::new(200).set_body_json(user_body("u-1")))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryTokenStore::new());
    let api = HttpApi::new(store.clone(), config(&server)).unwrap();
    let mut events = api.auth_events();

    api.login(&Credentials::new("admin@example.com", "admin123"))
        .await
        .unwrap();
    let me = api.me().await.unwrap();

    assert_eq!(me.data.username, "admin");
    assert_eq!(store.get().unwrap().unwrap().refresh_token.as_str(), "new-refresh");
    assert_eq!(events.recv().await.unwrap(), AuthEvent::SessionRefreshed);
}

// ============================================================================
// Single-flight refresh
// ============================================================================

#[tokio::test]
async fn concurrent_unauthorized_requests_share_one_refresh() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/users/u-1"))
        .and(header("authorization", "Bearer stale"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v1/users/u-1"))
        .and(header("authorization", "Bearer fresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(user_body("u-1")))
        .expect(6)
        .mount(&server)
        .await;

    mount_refresh(&server, "fresh", "fresh-refresh", 1).await;

    let store = store_with("stale", "stale-refresh");
    let api = HttpApi::new(store.clone(), config(&server)).unwrap();
    let id = UserId::new("u-1").unwrap();

    let mut handles = Vec::new();
    for _ in 0..6 {
        let api = api.clone();
        let id = id.clone();
        handles.push(tokio::spawn(async move { api.get_user(&id).await }));
    }

    for handle in handles {
        let user = handle.await.unwrap().unwrap();
        assert_eq!(user.data.id, id);
    }

    assert_eq!(store.get().unwrap().unwrap().access_token.as_str(), "fresh");
}

#[tokio::test]
async fn failed_refresh_clears_session_without_retrying() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/users/u-1"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/v1/auth/refresh"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "status": "error",
            "code": "INVALID_TOKEN",
            "message": "Refresh token expired"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let store = store_with("stale", "expired");
    let api = HttpApi::new(store.clone(), config(&server)).unwrap();
    let mut events = api.auth_events();

    let err = api
        .get_user(&UserId::new("u-1").unwrap())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Auth(AuthError::RefreshRejected { .. })));
    assert!(err.is_login_required());
    assert!(store.get().unwrap().is_none());
    assert_eq!(events.recv().await.unwrap(), AuthEvent::LoginRequired);
}

#[tokio::test]
async fn unauthorized_after_every_refresh_requires_login() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/auth/me"))
        .respond_with(ResponseTemplate::new(401))
        .expect(3)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/v1/auth/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(tokens_body("fresh", "fresh-refresh")))
        .expect(2)
        .mount(&server)
        .await;

    let store = store_with("stale", "stale-refresh");
    let api = HttpApi::new(store.clone(), config(&server)).unwrap();
    let mut events = api.auth_events();

    let err = api.me().await.unwrap_err();
    assert!(matches!(err, Error::Auth(AuthError::LoginRequired)));

    let mut last = None;
    while let Ok(event) = events.try_recv() {
        last = Some(event);
    }
    assert_eq!(last, Some(AuthEvent::LoginRequired));
}

// ============================================================================
// Plain retries
// ============================================================================

#[tokio::test]
async fn server_error_is_attempted_three_times() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/users"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "status": "error",
            "code": "INTERNAL_ERROR",
            "message": "boom"
        })))
        .expect(3)
        .mount(&server)
        .await;

    let api = HttpApi::new(store_with("a", "r"), config(&server)).unwrap();
    let err = api.list_users(PageRequest::default()).await.unwrap_err();

    assert_eq!(err.status(), Some(500));
}

#[tokio::test]
async fn server_error_then_success_returns_success() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/users"))
        .and(query_param("page", "2"))
        .and(query_param("per_page", "10"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v1/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "message": "OK",
            "data": {
                "data": [],
                "pagination": {
                    "total": 12,
                    "page": 2,
                    "per_page": 10,
                    "total_pages": 2,
                    "has_next": false,
                    "has_prev": true,
                    "prev_page": 1
                }
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let api = HttpApi::new(store_with("a", "r"), config(&server)).unwrap();
    let page = api
        .list_users(PageRequest {
            page: 2,
            per_page: 10,
        })
        .await
        .unwrap();

    assert_eq!(page.data.pagination.total, 12);
    assert_eq!(page.data.pagination.prev_page, Some(1));
}

#[tokio::test]
async fn retried_post_reuses_idempotency_key() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/users"))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(2)
        .with_priority(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/v1/users"))
        .respond_with(ResponseTemplate::new(201).set_body_json(user_body("u-2")))
        .mount(&server)
        .await;

    let api = HttpApi::new(store_with("a", "r"), config(&server)).unwrap();
    let created = api
        .create_user(&NewUser {
            email: "new@example.com".to_string(),
            username: "newbie".to_string(),
            password: "secret123".to_string(),
            first_name: None,
            last_name: None,
            role: None,
        })
        .await
        .unwrap();
    assert_eq!(created.data.id.as_str(), "u-2");

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 3);

    let keys: Vec<_> = requests
        .iter()
        .map(|r| {
            r.headers
                .get("idempotency-key")
                .map(|v| v.to_str().unwrap().to_string())
        })
        .collect();
    assert!(keys[0].is_some());
    assert!(keys.iter().all(|k| k == &keys[0]));
}

#[tokio::test]
async fn client_errors_are_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/users/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "status": "error",
            "code": "USER_NOT_FOUND",
            "message": "User not found"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let api = HttpApi::new(store_with("a", "r"), config(&server)).unwrap();
    let err = api
        .get_user(&UserId::new("missing").unwrap())
        .await
        .unwrap_err();

    match err {
        Error::Http(e) => {
            assert_eq!(e.status, 404);
            assert_eq!(e.code.as_deref(), Some("USER_NOT_FOUND"));
        }
        other => panic!("expected HTTP error, got {other:?}"),
    }
}

#[tokio::test]
async fn field_errors_become_validation_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/users"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({
            "status": "error",
            "code": "VALIDATION_FAILED",
            "message": "Request validation failed",
            "errors": [
                { "field": "email", "message": "Email is required", "code": "REQUIRED" }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let api = HttpApi::new(store_with("a", "r"), config(&server)).unwrap();
    let err = api
        .create_user(&NewUser {
            email: String::new(),
            username: "x".to_string(),
            password: "secret123".to_string(),
            first_name: None,
            last_name: None,
            role: None,
        })
        .await
        .unwrap_err();

    match err {
        Error::Validation(e) => {
            assert_eq!(e.status, 422);
            assert_eq!(e.errors.len(), 1);
            assert_eq!(e.errors[0].field, "email");
        }
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[tokio::test]
async fn slow_response_times_out() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/auth/me"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(user_body("u-1"))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let config = config(&server)
        .with_timeout(Duration::from_millis(100))
        .with_retry(RetryPolicy::new(0));
    let client = HttpClient::new(store_with("a", "r"), config).unwrap();

    let err = client.get::<Value>("/auth/me").await.unwrap_err();
    assert!(matches!(
        err,
        Error::Network(NetworkError::Timeout { duration_ms: 100 })
    ));
}

#[tokio::test]
async fn timeout_is_attempted_three_times() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/auth/me"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(user_body("u-1"))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let config = config(&server).with_timeout(Duration::from_millis(100));
    let client = HttpClient::new(store_with("a", "r"), config).unwrap();

    let err = client.get::<Value>("/auth/me").await.unwrap_err();
    assert!(matches!(
        err,
        Error::Network(NetworkError::Timeout { duration_ms: 100 })
    ));
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
}

/// Accepts connections, reads the request and hangs up without answering.
async fn hang_up_server() -> (String, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let accepted = Arc::new(AtomicUsize::new(0));

    let counter = accepted.clone();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            counter.fetch_add(1, Ordering::SeqCst);
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await;
            drop(socket);
        }
    });

    (format!("http://{}", addr), accepted)
}

#[tokio::test]
async fn dropped_connection_is_attempted_three_times() {
    let (url, accepted) = hang_up_server().await;

    let config = ClientConfig {
        api_url: ApiUrl::new(url).unwrap(),
        ..ClientConfig::default()
    }
    .with_retry(RetryPolicy::default().without_backoff());
    let client = HttpClient::new(store_with("a", "r"), config).unwrap();

    let err = client.get::<Value>("/users").await.unwrap_err();
    assert!(
        matches!(err, Error::Network(NetworkError::Connection { .. })),
        "unexpected error: {err:?}"
    );
    assert_eq!(accepted.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn dropped_connection_then_success_returns_success() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/auth/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(user_body("u-1")))
        .expect(1)
        .mount(&server)
        .await;

    // First connection is hung up on; the second is proxied to wiremock.
    let upstream = server.address().to_owned();
    tokio::spawn(async move {
        if let Ok((mut socket, _)) = listener.accept().await {
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await;
            drop(socket);
        }
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                if let Ok(mut backend) = tokio::net::TcpStream::connect(upstream).await {
                    let _ = tokio::io::copy_bidirectional(&mut socket, &mut backend).await;
                }
            });
        }
    });

    let config = ClientConfig {
        api_url: ApiUrl::new(format!("http://{}", addr)).unwrap(),
        ..ClientConfig::default()
    }
    .with_retry(RetryPolicy::default().without_backoff());
    let client = HttpClient::new(store_with("a", "r"), config).unwrap();

    let body: Value = client.get("/auth/me").await.unwrap();
    assert_eq!(body["data"]["id"], "u-1");
}

// ============================================================================
// Logout
// ============================================================================

#[tokio::test]
async fn logout_clears_tokens_even_when_call_fails() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/auth/logout"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let store = store_with("a", "r");
    let api = HttpApi::new(store.clone(), config(&server)).unwrap();

    assert!(api.logout().await.is_err());
    assert!(store.get().unwrap().is_none());
}

#[tokio::test]
async fn delete_sends_bearer_token() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/api/v1/users/u-9"))
        .and(header("authorization", "Bearer a"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "message": "User deleted",
            "data": null
        })))
        .expect(1)
        .mount(&server)
        .await;

    let api = HttpApi::new(store_with("a", "r"), config(&server)).unwrap();
    api.delete_user(&UserId::new("u-9").unwrap()).await.unwrap();
}
