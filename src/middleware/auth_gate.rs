//! Auth gate — makes sure a valid directory token is cached before any
//! authenticated work runs.
//!
//! Refresh is single-flight: callers that observe a stale token queue on one
//! mutex, the first performs the grant, and the rest reuse its result. That
//! holds for failures too: a caller that waited on a grant which then failed
//! returns the same error without asking again. One expiry event costs one
//! grant request per process.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde_json::json;
use tokio::sync::Mutex;

use crate::errors::GateError;
use crate::identity::{Token, TokenProvider};
use crate::AppState;

/// Outcome of the most recent grant attempt, guarded by the refresh lock.
#[derive(Default)]
struct RefreshState {
    attempt: u64,
    last_failure: Option<GateError>,
}

pub struct AuthGate {
    provider: Arc<TokenProvider>,
    refresh: Mutex<RefreshState>,
    /// Mirrors `RefreshState::attempt` so callers can read it before queueing.
    attempts: AtomicU64,
}

impl AuthGate {
    pub fn new(provider: Arc<TokenProvider>) -> Self {
        Self {
            provider,
            refresh: Mutex::new(RefreshState::default()),
            attempts: AtomicU64::new(0),
        }
    }

    pub fn provider(&self) -> &Arc<TokenProvider> {
        &self.provider
    }

    fn valid_cached(&self) -> Option<Token> {
        self.provider
            .current()
            .filter(|t| t.is_valid_at(Utc::now()))
    }

    /// Returns once the cache holds a valid token, acquiring one if needed.
    pub async fn ensure_valid(&self) -> Result<(), GateError> {
        self.valid_token().await.map(|_| ())
    }

    /// A currently valid token, refreshing synchronously when the cache is
    /// empty or expired.
    pub async fn valid_token(&self) -> Result<Token, GateError> {
        if let Some(token) = self.valid_cached() {
            return Ok(token);
        }

        let seen = self.attempts.load(Ordering::Acquire);
        let mut state = self.refresh.lock().await;

        // Another caller may have refreshed while we waited.
        if let Some(token) = self.valid_cached() {
            return Ok(token);
        }
        if state.attempt != seen {
            if let Some(err) = &state.last_failure {
                tracing::debug!("grant attempted while waiting failed, sharing its error");
                return Err(err.clone());
            }
        }

        tracing::info!("access token expired or missing, requesting a new one");
        let result = self.provider.acquire().await.map_err(GateError::from);

        state.attempt += 1;
        state.last_failure = result.as_ref().err().cloned();
        self.attempts.store(state.attempt, Ordering::Release);
        result
    }
}

/// Middleware: short-circuits with 500 when no token can be obtained.
pub async fn require_token(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Response {
    match state.gate.ensure_valid().await {
        Ok(()) => next.run(req).await,
        Err(e) => {
            tracing::error!("auth gate: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "message": "Error obtaining new access token." })),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::Credentials;
    use chrono::Duration;
    use zeroize::Zeroizing;

    fn unreachable_provider() -> Arc<TokenProvider> {
        // Port 9 (discard) on loopback: any grant attempt fails fast.
        Arc::new(TokenProvider::new(
            reqwest::Client::new(),
            "http://127.0.0.1:9/tenant/oauth2/v2.0/token",
            Credentials {
                client_id: "id".into(),
                client_secret: Zeroizing::new("secret".into()),
                scope: "scope".into(),
            },
        ))
    }

    #[tokio::test]
    async fn test_valid_cached_token_skips_acquisition() {
        let provider = unreachable_provider();
        provider.install(Token::new("cached", Utc::now() + Duration::minutes(30)));
        let gate = AuthGate::new(provider.clone());

        let token = gate.valid_token().await.unwrap();
        assert_eq!(token.value(), "cached");
        assert_eq!(provider.acquisitions(), 0);
    }

    #[tokio::test]
    async fn test_failed_acquisition_keeps_stale_token() {
        let provider = unreachable_provider();
        let stale = Token::new("stale", Utc::now() - Duration::seconds(1));
        provider.install(stale.clone());
        let gate = AuthGate::new(provider.clone());

        let err = gate.ensure_valid().await.unwrap_err();
        assert!(matches!(err, GateError::AcquisitionFailed(_)));
        assert_eq!(provider.acquisitions(), 1);
        assert_eq!(provider.current(), Some(stale));
    }

    #[tokio::test]
    async fn test_later_caller_retries_after_failed_grant() {
        let provider = unreachable_provider();
        let gate = AuthGate::new(provider.clone());

        // Sequential callers did not wait on the failed attempt, so each asks again.
        assert!(gate.ensure_valid().await.is_err());
        assert!(gate.ensure_valid().await.is_err());
        assert_eq!(provider.acquisitions(), 2);
    }
}
