use std::sync::Arc;

use axum::{
    extract::Request,
    http::StatusCode,
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;
use tracing::Instrument;

use crate::middleware::auth_gate;
use crate::AppState;

pub mod handlers;

/// Build the full HTTP surface.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        // Liveness (no token needed)
        .route("/", get(handlers::liveness))
        .nest("/group", group_router(state.clone()))
        .with_state(state)
        .fallback(fallback_404)
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(request_id_middleware))
}

/// Group routes. Every route passes the auth gate first.
fn group_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/security", get(handlers::list_security_groups))
        .route("/security/sync", post(handlers::sync_security_groups))
        .route("/security/:id", get(handlers::get_security_group))
        .route_layer(middleware::from_fn_with_state(state, auth_gate::require_token))
}

async fn fallback_404() -> StatusCode {
    StatusCode::NOT_FOUND
}

/// Middleware: injects a unique X-Request-Id into every response.
/// This allows clients to correlate errors with service logs.
async fn request_id_middleware(req: Request, next: Next) -> Response {
    let req_id = uuid::Uuid::new_v4().to_string();
    let span = tracing::info_span!("request", request_id = %req_id);

    let mut resp = next.run(req).instrument(span).await;
    if let Ok(val) = axum::http::HeaderValue::from_str(&req_id) {
        resp.headers_mut().insert("x-request-id", val);
    }
    resp
}
