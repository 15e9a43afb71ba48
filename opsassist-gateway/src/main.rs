use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::env;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

// --- Shared State ---
struct AppState {
    chat_api_url: String, // e.g., http://localhost:8000
    action_endpoint: String,
    http_client: reqwest::Client,
}

// --- Protocol Types (matching frontend) ---
#[derive(Debug, Deserialize)]
struct ActionRequest {
    action: Value,
}

/// Upstream chat replies escape newlines as literal `\n` sequences.
fn format_response(text: &str) -> String {
    text.replace("\\n", "\n").trim().to_string()
}

fn plain_response(status: StatusCode, body: String) -> Response {
    let mut resp = Response::new(Body::from(body));
    *resp.status_mut() = status;
    resp.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    resp
}

// --- Chat Proxy Handler ---
async fn chat_proxy_handler(State(state): State<Arc<AppState>>, body: String) -> Response {
    let payload: Value = match serde_json::from_str(&body) {
        Ok(v) => v,
        Err(e) => {
            error!(error = %e, "Invalid chat request JSON");
            return plain_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal Server Error".to_string(),
            );
        }
    };

    let chat_endpoint = format!("{}/api/chat/sync", state.chat_api_url.trim_end_matches('/'));
    info!(endpoint = %chat_endpoint, "Proxying chat request");

    match state
        .http_client
        .post(&chat_endpoint)
        .json(&payload)
        .send()
        .await
    {
        Ok(response) => {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            if !status.is_success() {
                error!(status = %status, "Chat upstream returned error");
                // Relay the upstream error body and status untouched, so
                // clients can show messages like "overloaded" verbatim.
                return plain_response(status, text);
            }
            plain_response(StatusCode::OK, format_response(&text))
        }
        Err(e) => {
            error!(error = %e, endpoint = %chat_endpoint, "Chat upstream request failed");
            plain_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal Server Error".to_string(),
            )
        }
    }
}

// --- Action Proxy Handler ---
async fn action_proxy_handler(State(state): State<Arc<AppState>>, body: String) -> Response {
    let request: ActionRequest = match serde_json::from_str(&body) {
        Ok(r) => r,
        Err(e) => {
            error!(error = %e, "Invalid action request JSON");
            return action_error_response();
        }
    };

    info!(endpoint = %state.action_endpoint, "Proxying action request");

    match state
        .http_client
        .post(&state.action_endpoint)
        .json(&json!({ "action": request.action }))
        .send()
        .await
    {
        Ok(response) if response.status().is_success() => match response.json::<Value>().await {
            Ok(data) => Json(data).into_response(),
            Err(e) => {
                error!(error = %e, "Action upstream returned unparseable JSON");
                action_error_response()
            }
        },
        Ok(response) => {
            error!(status = %response.status(), "Action upstream returned error");
            action_error_response()
        }
        Err(e) => {
            error!(error = %e, endpoint = %state.action_endpoint, "Action upstream request failed");
            action_error_response()
        }
    }
}

/// Action failures all collapse to the same opaque JSON error.
fn action_error_response() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "An error occurred while processing your request" })),
    )
        .into_response()
}

// --- Health Check ---
async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "Gateway operational")
}

fn router(state: Arc<AppState>) -> Router {
    // The web UI dev server runs on a different origin, so we enable CORS.
    // In production this should be tightened to known origins.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(health_check))
        .route("/api/chat", post(chat_proxy_handler))
        .route("/api/action", post(action_proxy_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "opsassist_gateway=info,axum=info".into()),
        )
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();

    let chat_api_url =
        env::var("API_BASE_URL").unwrap_or_else(|_| "http://localhost:8000".to_string());
    // Env vars set by hand easily pick up trailing whitespace.
    let chat_api_url = chat_api_url.trim().to_string();

    let action_endpoint = env::var("ACTION_ENDPOINT")
        .unwrap_or_else(|_| "https://your-api-endpoint.com/action".to_string());
    let action_endpoint = action_endpoint.trim().to_string();

    let gateway_port = env::var("GATEWAY_PORT")
        .unwrap_or_else(|_| "8181".to_string())
        .parse::<u16>()
        .expect("GATEWAY_PORT must be a valid port number");

    info!(
        chat_api_url = %chat_api_url,
        action_endpoint = %action_endpoint,
        gateway_port = gateway_port,
        "Initializing API Gateway"
    );

    let http_client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(60))
        .build()
        .expect("Failed to create HTTP client");

    let app_state = Arc::new(AppState {
        chat_api_url,
        action_endpoint,
        http_client,
    });

    let app = router(app_state);
    let addr = SocketAddr::from(([0, 0, 0, 0], gateway_port));
    info!(addr = %addr, "Starting API Gateway server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    /// Serves `app` on an ephemeral loopback port, returning its base URL.
    async fn spawn_upstream(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind upstream listener");
        let addr = listener.local_addr().expect("upstream addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve upstream");
        });
        format!("http://{}", addr)
    }

    fn test_state(chat_api_url: &str, action_endpoint: &str) -> Arc<AppState> {
        Arc::new(AppState {
            chat_api_url: chat_api_url.to_string(),
            action_endpoint: action_endpoint.to_string(),
            http_client: reqwest::Client::new(),
        })
    }

    async fn body_string(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        String::from_utf8(bytes.to_vec()).expect("utf8 body")
    }

    #[test]
    fn test_format_response_unescapes_and_trims() {
        assert_eq!(format_response("  hello\\nworld \n"), "hello\nworld");
        assert_eq!(format_response("plain"), "plain");
    }

    #[tokio::test]
    async fn test_chat_proxy_relays_upstream_errors_verbatim() {
        let upstream = Router::new().route(
            "/api/chat/sync",
            post(|| async { (StatusCode::SERVICE_UNAVAILABLE, "overloaded") }),
        );
        let base_url = spawn_upstream(upstream).await;
        let state = test_state(&base_url, "http://unused.invalid");

        let response = chat_proxy_handler(
            State(state),
            r#"{"sessionId":"s-1","userId":"tester","prompt":"hi"}"#.to_string(),
        )
        .await;

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body_string(response).await, "overloaded");
    }

    #[tokio::test]
    async fn test_chat_proxy_formats_successful_replies() {
        let upstream = Router::new().route(
            "/api/chat/sync",
            post(|| async { "  Hello\\nthere " }),
        );
        let base_url = spawn_upstream(upstream).await;
        let state = test_state(&base_url, "http://unused.invalid");

        let response = chat_proxy_handler(State(state), r#"{"prompt":"hi"}"#.to_string()).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response
                .headers()
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok()),
            Some("text/plain; charset=utf-8")
        );
        assert_eq!(body_string(response).await, "Hello\nthere");
    }

    #[tokio::test]
    async fn test_chat_proxy_masks_malformed_bodies_and_dead_upstreams() {
        // Malformed request body never reaches the upstream.
        let state = test_state("http://127.0.0.1:1", "http://unused.invalid");
        let response = chat_proxy_handler(State(state.clone()), "{not json".to_string()).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_string(response).await, "Internal Server Error");

        // An unreachable upstream collapses to the same opaque error.
        let response = chat_proxy_handler(State(state), r#"{"prompt":"hi"}"#.to_string()).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_string(response).await, "Internal Server Error");
    }

    #[tokio::test]
    async fn test_action_proxy_wraps_payload_and_returns_upstream_json() {
        // Echo upstream, so the response proves how the payload was wrapped.
        let upstream = Router::new().route(
            "/action",
            post(|Json(value): Json<Value>| async move { Json(value) }),
        );
        let base_url = spawn_upstream(upstream).await;
        let state = test_state("http://unused.invalid", &format!("{}/action", base_url));

        let response = action_proxy_handler(
            State(state),
            r#"{"action":{"type":"start","vmName":"web-01"}}"#.to_string(),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = serde_json::from_str(&body_string(response).await).expect("json body");
        assert_eq!(body["action"]["type"], "start");
        assert_eq!(body["action"]["vmName"], "web-01");
    }

    #[tokio::test]
    async fn test_action_proxy_collapses_failures_to_one_error_shape() {
        let upstream = Router::new().route(
            "/action",
            post(|| async { (StatusCode::BAD_GATEWAY, "upstream broke") }),
        );
        let base_url = spawn_upstream(upstream).await;

        let failing_inputs = vec![
            // Upstream non-success status
            (
                test_state("http://unused.invalid", &format!("{}/action", base_url)),
                r#"{"action":{"type":"start"}}"#,
            ),
            // Unreachable endpoint
            (
                test_state("http://unused.invalid", "http://127.0.0.1:1/action"),
                r#"{"action":{"type":"start"}}"#,
            ),
            // Malformed request body
            (
                test_state("http://unused.invalid", &format!("{}/action", base_url)),
                "{not json",
            ),
        ];

        for (state, body) in failing_inputs {
            let response = action_proxy_handler(State(state), body.to_string()).await;
            assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
            let body: Value =
                serde_json::from_str(&body_string(response).await).expect("json error body");
            assert_eq!(
                body["error"],
                "An error occurred while processing your request"
            );
        }
    }
}
