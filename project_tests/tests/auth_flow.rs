use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use serde_json::{json, Value};
use tempfile::tempdir;

use lib_sentinel::api::{ApiClient, ApiConfig, ClientError, FileTokenStore, TokenStore, User};
use lib_sentinel::auth::{AuthStore, Navigator, Route};
use project_tests::{api_base, serve};

const VALID_TOKEN: &str = "token-for-ana";

async fn login(Form(fields): Form<HashMap<String, String>>) -> (StatusCode, Json<Value>) {
    let username = fields.get("username").map(String::as_str);
    let password = fields.get("password").map(String::as_str);
    if username == Some("ana@example.com") && password == Some("s3cret") {
        (
            StatusCode::OK,
            Json(json!({ "access_token": VALID_TOKEN, "token_type": "bearer" })),
        )
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "detail": "Incorrect email or password" })),
        )
    }
}

async fn me(headers: HeaderMap) -> (StatusCode, Json<Value>) {
    let expected = format!("Bearer {}", VALID_TOKEN);
    match headers.get("authorization").and_then(|v| v.to_str().ok()) {
        Some(value) if value == expected => (
            StatusCode::OK,
            Json(json!({
                "id": 1,
                "email": "ana@example.com",
                "full_name": "Ana Lima",
                "organization_id": 3
            })),
        ),
        _ => (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "detail": "Could not validate credentials" })),
        ),
    }
}

async fn register(Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    if body["email"] == "taken@example.com" {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "detail": "Email already registered" })),
        );
    }
    (
        StatusCode::OK,
        Json(json!({ "id": 2, "email": body["email"], "full_name": body["full_name"] })),
    )
}

async fn backend() -> String {
    let router = Router::new()
        .route("/api/auth/login/access-token", post(login))
        .route("/api/auth/register", post(register))
        .route("/api/users/me", get(me));
    api_base(serve(router).await.unwrap())
}

fn stack(base: String, tokens: Arc<dyn TokenStore>) -> (AuthStore, Navigator) {
    let api = ApiClient::new(ApiConfig::new(base), tokens).unwrap();
    let auth = AuthStore::new(api);
    let navigator = Navigator::new(auth.clone());
    (auth, navigator)
}

#[tokio::test]
async fn valid_login_persists_the_token_and_opens_protected_routes() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("session.json");
    let tokens: Arc<dyn TokenStore> = Arc::new(FileTokenStore::new(&path));
    let (auth, navigator) = stack(backend().await, tokens.clone());

    assert_eq!(navigator.navigate(Route::Dashboard), Route::Login);

    let user = auth.login("ana@example.com", "s3cret").await.unwrap();
    assert_eq!(user.email, "ana@example.com");
    assert_eq!(user.organization_id.as_deref(), Some("3"));

    let state = auth.state();
    assert!(state.is_authenticated);
    assert!(!state.is_loading);
    assert_eq!(state.token.as_deref(), Some(VALID_TOKEN));
    assert_eq!(state.error, None);

    let saved: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(saved["token"], VALID_TOKEN);
    assert_eq!(navigator.navigate(Route::Events), Route::Events);

    // A new process picks the session up from disk.
    let (reloaded, _) = stack(backend().await, Arc::new(FileTokenStore::new(&path)));
    assert!(reloaded.is_authenticated());

    auth.logout();
    assert!(!auth.is_authenticated());
    assert!(tokens.get().is_none());
    assert_eq!(navigator.navigate(Route::Events), Route::Login);
}

#[tokio::test]
async fn invalid_login_reports_and_stores_nothing() {
    let dir = tempdir().unwrap();
    let tokens: Arc<dyn TokenStore> = Arc::new(FileTokenStore::new(dir.path().join("session.json")));
    let (auth, navigator) = stack(backend().await, tokens.clone());

    let err = auth.login("ana@example.com", "wrong").await.unwrap_err();
    assert_eq!(err.message, "Invalid username or password");
    assert_eq!(err.status, Some(401));

    let state = auth.state();
    assert!(!state.is_authenticated);
    assert!(!state.is_loading);
    assert_eq!(
        state.error.as_ref().map(|e| e.message.as_str()),
        Some("Invalid username or password")
    );
    assert!(tokens.get().is_none());
    assert_eq!(navigator.navigate(Route::Team), Route::Login);

    auth.clear_error();
    assert_eq!(auth.state().error, None);
}

#[tokio::test]
async fn register_checks_confirmation_before_calling_the_backend() {
    let (auth, _) = stack(
        backend().await,
        Arc::new(lib_sentinel::api::MemoryTokenStore::new()),
    );
    let mut data = lib_sentinel::api::RegisterData {
        email: "new@example.com".to_string(),
        password: "pw-one".to_string(),
        full_name: "New User".to_string(),
        organization_id: "3".to_string(),
    };

    let err = auth.register(&data, "pw-two").await.unwrap_err();
    assert_eq!(err.message, "Passwords do not match");
    assert_eq!(err.status, None);

    let user = auth.register(&data, "pw-one").await.unwrap();
    assert_eq!(user.email, "new@example.com");
    assert!(!auth.is_authenticated());

    data.email = "taken@example.com".to_string();
    let err = auth.register(&data, "pw-one").await.unwrap_err();
    assert_eq!(err.message, "Email already registered");
}

#[tokio::test]
async fn expired_session_sends_the_user_to_login() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("session.json");
    std::fs::write(&path, r#"{"token":"revoked","theme":"dark"}"#).unwrap();
    let tokens: Arc<dyn TokenStore> = Arc::new(FileTokenStore::new(&path));
    let (auth, navigator) = stack(backend().await, tokens.clone());
    let watcher = navigator.watch_sessions();

    assert!(auth.is_authenticated());
    assert_eq!(navigator.navigate(Route::Settings), Route::Settings);

    let mut route = navigator.watch_route();
    let err = auth.api().get::<User>("/users/me").await.unwrap_err();
    assert!(matches!(err, ClientError::SessionExpired));

    tokio::time::timeout(Duration::from_secs(2), route.wait_for(|r| *r == Route::Login))
        .await
        .expect("navigator returns to login")
        .unwrap();
    assert!(!auth.is_authenticated());
    assert!(tokens.get().is_none());

    // Other keys in the session file survive.
    let saved: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(saved, json!({"theme": "dark"}));

    watcher.abort();
}
