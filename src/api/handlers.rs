use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;

use crate::errors::SyncError;
use crate::models::SecurityGroup;
use crate::AppState;

// ── Request DTOs ─────────────────────────────────────────────

#[derive(Deserialize)]
pub struct PaginationParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

// ── Handlers ─────────────────────────────────────────────────

/// GET / — liveness
pub async fn liveness() -> &'static str {
    "Hello World!"
}

/// POST /group/security/sync — reconcile directory security groups into storage
pub async fn sync_security_groups(
    State(state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, SyncError> {
    let report = state.reconciler.sync().await?;

    tracing::info!(
        fetched = report.fetched,
        created = report.created.len(),
        updated = report.updated,
        "sync request completed"
    );

    Ok(Json(json!({ "message": "Security groups synced successfully." })))
}

/// GET /group/security — stored security groups, ordered by id
pub async fn list_security_groups(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PaginationParams>,
) -> Result<Json<Vec<SecurityGroup>>, StatusCode> {
    let limit = params.limit.unwrap_or(100).clamp(1, 1000);
    let offset = params.offset.unwrap_or(0).max(0);

    let groups = state.store.list_groups(limit, offset).await.map_err(|e| {
        tracing::error!("list_security_groups failed: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    Ok(Json(groups))
}

/// GET /group/security/:id — one stored security group
pub async fn get_security_group(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Response {
    match state.store.get_group(&id).await {
        Ok(Some(group)) => Json(group).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "message": "Not found" })),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("get_security_group failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
