// API request handlers

use axum::{
    body::Bytes,
    extract::{
        rejection::{BytesRejection, PathRejection},
        Path, State,
    },
    http::{Method, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde_json::{json, Value};
use tracing::Instrument;
use uuid::Uuid;

use super::AppState;
use crate::proxy::{ActionKind, ActionOutput, CallOptions, ProxyError};

const FALLBACK_ERROR: &str = "OpenRouter proxy request failed";

/// Failure surfaced to the browser as `{"error": "..."}`.
#[derive(Debug)]
pub enum ApiError {
    MethodNotAllowed,
    MissingAction,
    /// The request could not be extracted; keeps axum's status and message.
    Rejected(StatusCode, String),
    Proxy(ProxyError),
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::Rejected(rejection.status(), rejection.body_text())
    }
}

impl From<BytesRejection> for ApiError {
    fn from(rejection: BytesRejection) -> Self {
        ApiError::Rejected(rejection.status(), rejection.body_text())
    }
}

impl From<ProxyError> for ApiError {
    fn from(err: ProxyError) -> Self {
        ApiError::Proxy(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::MethodNotAllowed => {
                (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed".to_string())
            }
            ApiError::MissingAction => {
                (StatusCode::BAD_REQUEST, "Missing OpenRouter action".to_string())
            }
            ApiError::Rejected(status, message) => {
                tracing::debug!("Request rejected ({}): {}", status, message);
                (status, message)
            }
            ApiError::Proxy(err @ ProxyError::UnknownAction(_)) => {
                (StatusCode::BAD_REQUEST, err.to_string())
            }
            ApiError::Proxy(err) => {
                tracing::warn!("Action failed: {}", err);
                let message = err.to_string();
                let message = if message.is_empty() {
                    FALLBACK_ERROR.to_string()
                } else {
                    message
                };
                (StatusCode::INTERNAL_SERVER_ERROR, message)
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

// Root endpoint
pub async fn root() -> Json<Value> {
    let endpoints: Vec<String> = ActionKind::ALL
        .iter()
        .map(|kind| format!("POST /api/openrouter/{}", kind))
        .collect();

    Json(json!({
        "message": "Chronicle Quest OpenRouter proxy",
        "endpoints": endpoints
    }))
}

pub async fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "Not found" }))).into_response()
}

pub async fn missing_action(method: Method) -> ApiError {
    if method != Method::POST {
        return ApiError::MethodNotAllowed;
    }
    ApiError::MissingAction
}

pub async fn openrouter_action(
    State(state): State<AppState>,
    method: Method,
    path: Result<Path<String>, PathRejection>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<ActionOutput>, ApiError> {
    if method != Method::POST {
        return Err(ApiError::MethodNotAllowed);
    }

    let Path(action) = path?;
    let action: ActionKind = action.parse()?;
    let body = body?;
    let request_id = Uuid::new_v4();
    let span = tracing::info_span!("openrouter_action", %request_id, %action);

    async move {
        let input = parse_body(&body)?;
        let options = CallOptions::new(state.upstream_timeout, state.shutdown.child_token());
        let output = state
            .dispatcher
            .execute(action, &input, state.env.as_ref(), &options)
            .await?;
        tracing::info!("Action completed");
        Ok::<_, ApiError>(Json(output))
    }
    .instrument(span)
    .await
}

/// An empty body is treated as `{}`.
fn parse_body(body: &[u8]) -> Result<Value, ProxyError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(json!({}));
    }
    serde_json::from_slice(body).map_err(ProxyError::MalformedBody)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::router;
    use crate::proxy::request::ChatRequest;
    use crate::proxy::{ChatCompletions, Dispatcher, EnvMap, RuntimeConfig, UpstreamError};
    use async_trait::async_trait;
    use axum::{body::Body, http::Request, Router};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;
    use tower::ServiceExt;

    struct StubClient {
        payload: Value,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ChatCompletions for StubClient {
        async fn complete(
            &self,
            _config: &RuntimeConfig,
            _request: &ChatRequest,
            _options: &CallOptions,
        ) -> Result<Value, UpstreamError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.payload.clone())
        }
    }

    fn app_with(payload: Value, env: EnvMap) -> (Router, Arc<StubClient>) {
        let client = Arc::new(StubClient {
            payload,
            calls: AtomicUsize::new(0),
        });
        let state = AppState {
            dispatcher: Dispatcher::new(client.clone()),
            env: Arc::new(env),
            upstream_timeout: Duration::from_secs(5),
            shutdown: CancellationToken::new(),
        };
        (router(state), client)
    }

    fn app(payload: Value) -> (Router, Arc<StubClient>) {
        app_with(payload, EnvMap::from_pairs([("OPENROUTER_API_KEY", "sk-test")]))
    }

    fn post(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn read_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_character_reply_success() {
        let (app, client) = app(json!({
            "choices": [{ "message": { "content": " 璧有瑕，請指示王。 " } }]
        }));
        let body = json!({
            "currentNode": "court",
            "discoveredClues": [],
            "history": [],
            "prompt": "如何?",
            "systemPrompt": "You are Lin Xiangru."
        });

        let response = app
            .oneshot(post("/api/openrouter/character-reply", &body.to_string()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(read_json(response).await, json!({ "reply": "璧有瑕，請指示王。" }));
        assert_eq!(client.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_non_post_is_405() {
        let (app, client) = app(json!({}));
        let request = Request::builder()
            .method("GET")
            .uri("/api/openrouter/clue-image")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(read_json(response).await, json!({ "error": "Method not allowed" }));
        assert_eq!(client.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unknown_action_is_400() {
        let (app, client) = app(json!({}));
        let response = app
            .oneshot(post("/api/openrouter/unknown-action", "{}"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            read_json(response).await,
            json!({ "error": "Unknown OpenRouter action: unknown-action" })
        );
        assert_eq!(client.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_missing_action_is_400() {
        let (app, _) = app(json!({}));
        let response = app.oneshot(post("/api/openrouter", "{}")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_missing_action_with_trailing_slash_is_400() {
        let (app, client) = app(json!({}));
        let response = app.oneshot(post("/api/openrouter/", "{}")).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            read_json(response).await,
            json!({ "error": "Missing OpenRouter action" })
        );
        assert_eq!(client.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_undecodable_action_is_json_400() {
        let (app, client) = app(json!({}));
        let response = app
            .oneshot(post("/api/openrouter/%FF", "{}"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = read_json(response).await;
        assert!(body["error"].as_str().unwrap().contains("Invalid UTF-8"));
        assert_eq!(client.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_oversized_body_is_json_413() {
        let (app, client) = app(json!({}));
        let prompt = "x".repeat(3 * 1024 * 1024);
        let body = json!({ "prompt": prompt }).to_string();
        let response = app
            .oneshot(post("/api/openrouter/clue-image", &body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        let body = read_json(response).await;
        assert!(!body["error"].as_str().unwrap().is_empty());
        assert_eq!(client.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_validation_failure_is_500_envelope() {
        let (app, client) = app(json!({}));
        let response = app
            .oneshot(post("/api/openrouter/clue-image", r#"{"prompt":"  "}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(read_json(response).await, json!({ "error": "Invalid prompt" }));
        assert_eq!(client.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_empty_body_is_treated_as_empty_object() {
        let (app, _) = app(json!({}));
        let response = app
            .oneshot(post("/api/openrouter/clue-image", ""))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(read_json(response).await, json!({ "error": "Invalid prompt" }));
    }

    #[tokio::test]
    async fn test_malformed_json_body_is_500() {
        let (app, _) = app(json!({}));
        let response = app
            .oneshot(post("/api/openrouter/clue-image", "{not json"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = read_json(response).await;
        assert!(body["error"].as_str().unwrap().starts_with("Invalid JSON body"));
    }

    #[tokio::test]
    async fn test_missing_api_key_is_500() {
        let (app, client) = app_with(json!({}), EnvMap::default());
        let response = app
            .oneshot(post("/api/openrouter/clue-image", r#"{"prompt":"P"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            read_json(response).await,
            json!({ "error": "Server is missing OPENROUTER_API_KEY" })
        );
        assert_eq!(client.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_root_lists_actions() {
        let (app, _) = app(json!({}));
        let request = Request::builder().uri("/").body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json(response).await;
        assert_eq!(body["endpoints"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_unknown_path_is_json_404() {
        let (app, _) = app(json!({}));
        let request = Request::builder().uri("/nope").body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(read_json(response).await, json!({ "error": "Not found" }));
    }

    #[test]
    fn test_parse_body_whitespace_is_empty_object() {
        assert_eq!(parse_body(b"  \n").unwrap(), json!({}));
        assert_eq!(parse_body(br#"{"a":1}"#).unwrap(), json!({ "a": 1 }));
        assert!(parse_body(b"[").is_err());
    }
}
