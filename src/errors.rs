use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Failure of the client-credentials grant against the identity provider.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("token request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("identity provider rejected the grant (HTTP {status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("malformed token response: {0}")]
    Decode(String),

    #[error("identity provider returned an empty access token")]
    EmptyToken,
}

/// Raised by the auth gate when no valid token can be installed.
///
/// The cause is shared: every caller that queued behind a failed grant gets
/// the same error instead of issuing its own request.
#[derive(Debug, Clone, Error)]
pub enum GateError {
    #[error("access token acquisition failed: {0}")]
    AcquisitionFailed(#[source] Arc<AuthError>),
}

impl From<AuthError> for GateError {
    fn from(e: AuthError) -> Self {
        GateError::AcquisitionFailed(Arc::new(e))
    }
}

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("directory rejected the token (401)")]
    Unauthorized,

    #[error("directory denied access (403)")]
    Forbidden,

    #[error("no access token available: {0}")]
    TokenUnavailable(#[from] GateError),

    #[error("directory request failed: {0}")]
    Generic(String),
}

impl From<reqwest::Error> for DirectoryError {
    fn from(e: reqwest::Error) -> Self {
        DirectoryError::Generic(e.to_string())
    }
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("unauthorized")]
    Unauthorized,

    #[error("forbidden")]
    Forbidden,

    #[error("no access token available: {0}")]
    TokenUnavailable(GateError),

    #[error("storage failure: {0}")]
    StorageFailure(#[source] anyhow::Error),

    #[error("sync failed: {0}")]
    Generic(String),
}

impl From<DirectoryError> for SyncError {
    fn from(e: DirectoryError) -> Self {
        match e {
            DirectoryError::Unauthorized => SyncError::Unauthorized,
            DirectoryError::Forbidden => SyncError::Forbidden,
            DirectoryError::TokenUnavailable(g) => SyncError::TokenUnavailable(g),
            DirectoryError::Generic(msg) => SyncError::Generic(msg),
        }
    }
}

impl SyncError {
    pub fn status(&self) -> StatusCode {
        match self {
            SyncError::Unauthorized => StatusCode::UNAUTHORIZED,
            SyncError::Forbidden => StatusCode::FORBIDDEN,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for SyncError {
    fn into_response(self) -> Response {
        let msg = match &self {
            SyncError::Unauthorized => "Unauthorized",
            SyncError::Forbidden => "Forbidden",
            other => {
                // Internal detail stays in the logs, never on the wire.
                tracing::error!("security group sync failed: {}", other);
                "Error syncing security groups."
            }
        };

        (self.status(), Json(json!({ "message": msg }))).into_response()
    }
}
