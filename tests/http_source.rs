// tests/http_source.rs
//
// reqwest-backed SampleSource against a throwaway local axum server:
// bearer header, status classification, malformed bodies, timeouts,
// and connection failures.

use std::net::SocketAddr;
use std::time::Duration;

use axum::{
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::get,
    Router,
};
use serde_json::json;

use quotation_notify::source::{FetchError, HttpSampleSource, SampleSource};

async fn listing(headers: HeaderMap) -> impl IntoResponse {
    let auth = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if auth != "Bearer secret" {
        return (StatusCode::UNAUTHORIZED, "no").into_response();
    }
    axum::Json(json!({
        "data": { "muestras": [ { "id": 11, "estado": "En Cotización" } ] }
    }))
    .into_response()
}

async fn slow() -> &'static str {
    tokio::time::sleep(Duration::from_secs(2)).await;
    "[]"
}

async fn spawn_server() -> SocketAddr {
    let app = Router::new()
        .route("/muestras", get(listing))
        .route("/forbidden", get(|| async { StatusCode::FORBIDDEN }))
        .route("/boom", get(|| async { StatusCode::INTERNAL_SERVER_ERROR }))
        .route("/html", get(|| async { "<html>login</html>" }))
        .route("/slow", get(slow));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("test server");
    });
    addr
}

fn source(addr: SocketAddr, path: &str) -> HttpSampleSource {
    HttpSampleSource::new(format!("http://{addr}{path}")).expect("client")
}

#[tokio::test]
async fn sends_bearer_token_and_returns_json() {
    let addr = spawn_server().await;
    let body = source(addr, "/muestras").fetch("secret").await.expect("ok");
    assert_eq!(body["data"]["muestras"][0]["id"], json!(11));
}

#[tokio::test]
async fn wrong_token_is_unauthorized() {
    let addr = spawn_server().await;
    let err = source(addr, "/muestras").fetch("stale").await.unwrap_err();
    assert!(matches!(err, FetchError::Unauthorized), "{err:?}");
}

#[tokio::test]
async fn status_codes_are_classified() {
    let addr = spawn_server().await;
    let err = source(addr, "/forbidden").fetch("secret").await.unwrap_err();
    assert!(matches!(err, FetchError::Forbidden), "{err:?}");

    let err = source(addr, "/boom").fetch("secret").await.unwrap_err();
    assert!(matches!(err, FetchError::Http(500)), "{err:?}");
    assert!(!err.is_transient());
}

#[tokio::test]
async fn non_json_body_is_malformed() {
    let addr = spawn_server().await;
    let err = source(addr, "/html").fetch("secret").await.unwrap_err();
    assert!(matches!(err, FetchError::Malformed(_)), "{err:?}");
}

#[tokio::test]
async fn slow_endpoint_times_out() {
    let addr = spawn_server().await;
    let err = source(addr, "/slow")
        .with_timeout(Duration::from_millis(200))
        .fetch("secret")
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::Timeout), "{err:?}");
    assert!(err.is_transient());
}

#[tokio::test]
async fn refused_connection_is_network_failure() {
    // Grab a free port, then close it again.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = source(addr, "/muestras").fetch("secret").await.unwrap_err();
    assert!(matches!(err, FetchError::Network(_)), "{err:?}");
    assert_eq!(err.kind(), "network");
}
