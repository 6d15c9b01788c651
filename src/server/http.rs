//! HTTP writer endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/set` | Write `{"key", "value"}` and notify subscribers |
//! | `GET` | `/get/{key}` | Read the latest value of a key |
//! | `GET` | `/stats` | Broker statistics |

use std::future::Future;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;

use crate::error::Result;
use crate::registry::Broker;

/// Application state shared across all handlers
pub type AppState = Arc<Broker>;

/// Create the writer router
pub fn writer_router(broker: AppState) -> Router {
    Router::new()
        .route("/set", post(set_value))
        .route("/get/{key}", get(get_value))
        .route("/stats", get(broker_stats))
        .with_state(broker)
}

/// Serve the writer router on an already bound listener until `shutdown`
/// resolves
pub async fn serve<F>(listener: TcpListener, broker: AppState, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    tracing::info!(addr = %listener.local_addr()?, "HTTP writer listening");

    axum::serve(listener, writer_router(broker))
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

/// Body of `POST /set`
#[derive(Debug, Deserialize)]
struct SetRequest {
    #[serde(default)]
    key: String,
    #[serde(default)]
    value: String,
}

#[derive(Debug, Serialize)]
struct StatusResponse {
    status: &'static str,
}

#[derive(Debug, Serialize)]
struct ValueResponse {
    key: String,
    value: String,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn text_error(status: StatusCode, msg: impl Into<String>) -> Response {
    let mut body = msg.into();
    body.push('\n');
    (status, body).into_response()
}

/// `POST /set`: commit a value and fan it out
async fn set_value(State(broker): State<AppState>, body: Bytes) -> Response {
    let Ok(request) = serde_json::from_slice::<SetRequest>(&body) else {
        return text_error(StatusCode::BAD_REQUEST, "invalid JSON");
    };
    if request.key.is_empty() {
        return text_error(StatusCode::BAD_REQUEST, "missing key");
    }

    match broker.set(request.key, request.value).await {
        Ok(()) => Json(StatusResponse { status: "ok" }).into_response(),
        Err(e) => text_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

/// `GET /get/{key}`: read the latest committed value
async fn get_value(State(broker): State<AppState>, Path(key): Path<String>) -> Response {
    match broker.get(key.clone()).await {
        Ok(value) => Json(ValueResponse {
            key,
            value: String::from_utf8_lossy(&value).into_owned(),
        })
        .into_response(),
        Err(e) if e.is_not_found() => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: e.to_string(),
            }),
        )
            .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: e.to_string(),
            }),
        )
            .into_response(),
    }
}

/// `GET /stats`: broker statistics
async fn broker_stats(State(broker): State<AppState>) -> impl IntoResponse {
    Json(broker.stats().await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    use crate::storage::RedbStore;

    fn test_state() -> (AppState, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = RedbStore::open(dir.path()).unwrap();
        (Arc::new(Broker::new(store)), dir)
    }

    fn post_set(body: &'static str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/set")
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    async fn body_string(resp: Response) -> String {
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(body.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_set_ok() {
        let (broker, _dir) = test_state();
        let app = writer_router(Arc::clone(&broker));

        let resp = app
            .oneshot(post_set(r#"{"key":"k","value":"v"}"#))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let body: serde_json::Value = serde_json::from_str(&body_string(resp).await).unwrap();
        assert_eq!(body["status"], "ok");
        assert_eq!(broker.get("k").await.unwrap(), Bytes::from_static(b"v"));
    }

    #[tokio::test]
    async fn test_set_missing_value_defaults_empty() {
        let (broker, _dir) = test_state();
        let app = writer_router(Arc::clone(&broker));

        let resp = app.oneshot(post_set(r#"{"key":"k"}"#)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(broker.get("k").await.unwrap(), Bytes::new());
    }

    #[tokio::test]
    async fn test_set_missing_key() {
        let (broker, _dir) = test_state();
        let app = writer_router(broker);

        let resp = app.oneshot(post_set(r#"{"value":"v"}"#)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_string(resp).await, "missing key\n");
    }

    #[tokio::test]
    async fn test_set_invalid_json() {
        let (broker, _dir) = test_state();
        let app = writer_router(broker);

        let resp = app.oneshot(post_set("{not json")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_string(resp).await, "invalid JSON\n");
    }

    #[tokio::test]
    async fn test_set_requires_post() {
        let (broker, _dir) = test_state();
        let app = writer_router(broker);

        let req = Request::builder().uri("/set").body(Body::empty()).unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_get_found_and_missing() {
        let (broker, _dir) = test_state();
        broker.set("k", "v").await.unwrap();

        let req = Request::builder().uri("/get/k").body(Body::empty()).unwrap();
        let resp = writer_router(Arc::clone(&broker)).oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body: serde_json::Value = serde_json::from_str(&body_string(resp).await).unwrap();
        assert_eq!(body["value"], "v");

        let req = Request::builder()
            .uri("/get/absent")
            .body(Body::empty())
            .unwrap();
        let resp = writer_router(broker).oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_set_notifies_subscriber() {
        let (broker, _dir) = test_state();
        let mut client = broker.register_client().await;
        broker.subscribe(client.id, "k").await;

        let resp = writer_router(Arc::clone(&broker))
            .oneshot(post_set(r#"{"key":"k","value":"fresh"}"#))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let update = client.try_recv().unwrap();
        assert_eq!(update.value, Bytes::from_static(b"fresh"));
    }

    #[tokio::test]
    async fn test_stats() {
        let (broker, _dir) = test_state();
        broker.set("k", "v").await.unwrap();

        let req = Request::builder().uri("/stats").body(Body::empty()).unwrap();
        let resp = writer_router(broker).oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let body: serde_json::Value = serde_json::from_str(&body_string(resp).await).unwrap();
        assert_eq!(body["writes_committed"], 1);
    }
}
