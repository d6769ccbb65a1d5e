//! HTTP runtime endpoint for coppertail.
//!
//! - `POST /invocations` — run one invocation, streaming newline-delimited
//!   JSON `{"event": ..., "data": ...}` objects as the model produces them.
//! - `GET /ping` — liveness probe, kept out of the request trace log.
//!
//! Built on Axum. A fatal pre-run error (session binding) maps to a JSON
//! error response; a mid-stream fatal error terminates the stream with a
//! final `{"error": ...}` line, since the status line is long gone by then.

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use futures::StreamExt;
use std::convert::Infallible;
use std::sync::Arc;
use tracing::{error, info};

use coppertail_agent::AgentService;
use coppertail_config::GatewayConfig;
use coppertail_core::error::Error;
use coppertail_core::event::ResponseEvent;
use coppertail_core::session::InvocationRequest;

/// Build the gateway router.
///
/// The trace layer is attached before `/ping` is added, so liveness probes
/// stay out of the access log.
pub fn build_router(service: Arc<AgentService>) -> Router {
    Router::new()
        .route("/invocations", post(invoke_handler))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .route("/ping", get(ping_handler))
        .with_state(service)
}

/// Start the gateway HTTP server.
pub async fn start(
    config: &GatewayConfig,
    service: Arc<AgentService>,
) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(addr = %addr, "Gateway listening");
    axum::serve(listener, build_router(service)).await?;
    Ok(())
}

async fn ping_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "Healthy"}))
}

async fn invoke_handler(
    State(service): State<Arc<AgentService>>,
    Json(request): Json<InvocationRequest>,
) -> Response {
    match service.invoke(request).await {
        Ok(stream) => {
            let invocation_id = stream.invocation_id.clone();
            let body = Body::from_stream(
                stream.map(|item| Ok::<_, Infallible>(render_line(item))),
            );
            let mut response =
                ([(header::CONTENT_TYPE, "application/x-ndjson")], body).into_response();
            if let Ok(value) = header::HeaderValue::from_str(&invocation_id) {
                response
                    .headers_mut()
                    .insert(header::HeaderName::from_static("x-invocation-id"), value);
            }
            response
        }
        Err(e) => {
            error!(error = %e, "Invocation rejected");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"message": e.to_string()})),
            )
                .into_response()
        }
    }
}

fn render_line(item: Result<ResponseEvent, Error>) -> String {
    let mut line = match item {
        Ok(event) => serde_json::to_string(&event)
            .unwrap_or_else(|e| serde_json::json!({"error": e.to_string()}).to_string()),
        Err(e) => serde_json::json!({"error": e.to_string()}).to_string(),
    };
    line.push('\n');
    line
}
