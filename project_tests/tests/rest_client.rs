use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::http::{HeaderMap, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};

use lib_sentinel::api::{
    ApiClient, ApiConfig, ClientError, MemoryTokenStore, SessionEvent, TokenStore, User,
};
use project_tests::{api_base, serve};

fn client(base: String, tokens: Arc<dyn TokenStore>) -> ApiClient {
    let mut config = ApiConfig::new(base);
    config.retry_min_delay = Duration::from_millis(10);
    config.retry_max_delay = Duration::from_millis(20);
    ApiClient::new(config, tokens).unwrap()
}

async fn echo_auth(headers: HeaderMap) -> Json<Value> {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    Json(json!({ "authorization": auth }))
}

#[tokio::test]
async fn bearer_token_is_attached_when_present() {
    let addr = serve(Router::new().route("/api/echo", get(echo_auth)))
        .await
        .unwrap();

    let anonymous = client(api_base(addr), Arc::new(MemoryTokenStore::new()));
    let body: Value = anonymous.get("/echo").await.unwrap();
    assert_eq!(body["authorization"], "");

    let signed_in = client(api_base(addr), Arc::new(MemoryTokenStore::with_token("abc123")));
    let response = signed_in.fetch::<Value>("echo").await.unwrap();
    assert_eq!(response.status, 200);
    assert_eq!(response.data["authorization"], "Bearer abc123");
    assert!(response.headers.contains_key("content-type"));
}

#[tokio::test]
async fn reads_are_retried_once_and_writes_are_not() {
    let hits = Arc::new(AtomicUsize::new(0));
    let get_hits = hits.clone();
    let post_hits = hits.clone();
    let router = Router::new().route(
        "/api/flaky",
        get(move || {
            let hits = get_hits.clone();
            async move {
                hits.fetch_add(1, Ordering::SeqCst);
                (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"detail": "boom"})))
            }
        })
        .post(move || {
            let hits = post_hits.clone();
            async move {
                hits.fetch_add(1, Ordering::SeqCst);
                (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"detail": "boom"})))
            }
        }),
    );
    let addr = serve(router).await.unwrap();
    let api = client(api_base(addr), Arc::new(MemoryTokenStore::new()));

    let err = api.get::<Value>("/flaky").await.unwrap_err();
    assert_eq!(err.status(), Some(500));
    assert_eq!(err.to_string(), "boom");
    assert_eq!(hits.load(Ordering::SeqCst), 2);

    hits.store(0, Ordering::SeqCst);
    let err = api.post_json::<Value, _>("/flaky", &json!({})).await.unwrap_err();
    assert_eq!(err.status(), Some(500));
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn missing_detail_uses_the_status_message() {
    let router = Router::new().route("/api/gone", get(|| async { StatusCode::NOT_FOUND }));
    let addr = serve(router).await.unwrap();
    let api = client(api_base(addr), Arc::new(MemoryTokenStore::new()));

    let err = api.get::<Value>("/gone").await.unwrap_err();
    assert_eq!(err.status(), Some(404));
    assert_eq!(err.to_string(), "Request failed with status code 404");
    assert_eq!(err.detail(), None);
}

#[tokio::test]
async fn rejected_token_expires_the_session() {
    let router = Router::new().route(
        "/api/users/me",
        get(|| async { (StatusCode::UNAUTHORIZED, Json(json!({"detail": "Could not validate credentials"}))) }),
    );
    let addr = serve(router).await.unwrap();
    let tokens: Arc<dyn TokenStore> = Arc::new(MemoryTokenStore::with_token("stale"));
    let api = client(api_base(addr), tokens.clone());
    let mut sessions = api.session_events();

    let err = api.get::<User>("/users/me").await.unwrap_err();
    assert!(matches!(err, ClientError::SessionExpired));
    assert_eq!(err.status(), Some(401));
    assert!(tokens.get().is_none());
    let event = tokio::time::timeout(Duration::from_secs(1), sessions.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(event, SessionEvent::Expired);

    // Without a token a 401 is an ordinary failure.
    let err = api.get::<User>("/users/me").await.unwrap_err();
    assert!(matches!(err, ClientError::Http { status: 401, .. }));
    assert!(sessions.try_recv().is_err());
}

#[tokio::test]
async fn slow_responses_time_out() {
    let router = Router::new().route(
        "/api/slow",
        get(|| async {
            tokio::time::sleep(Duration::from_millis(500)).await;
            Json(json!({}))
        }),
    );
    let addr = serve(router).await.unwrap();
    let mut config = ApiConfig::new(api_base(addr));
    config.timeout = Duration::from_millis(100);
    config.read_retries = 0;
    let api = ApiClient::new(config, Arc::new(MemoryTokenStore::new())).unwrap();

    let err = api.get::<Value>("/slow").await.unwrap_err();
    assert!(matches!(err, ClientError::Timeout), "got {:?}", err);
}

#[tokio::test]
async fn empty_success_bodies_decode_as_unit() {
    let router = Router::new().route(
        "/api/users/{id}",
        axum::routing::delete(|| async { StatusCode::NO_CONTENT }),
    );
    let addr = serve(router).await.unwrap();
    let api = client(api_base(addr), Arc::new(MemoryTokenStore::with_token("t")));

    api.team().remove("42").await.unwrap();
}
