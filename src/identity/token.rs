//! Client-credentials token acquisition and the process-wide token cache.
//!
//! The provider performs `grant_type=client_credentials` against the
//! tenant's v2.0 token endpoint and installs the result as a single value:
//! bearer and expiry are always replaced together, so no reader can observe
//! a new value paired with an old expiry. A failed acquisition leaves the
//! cached token untouched.

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use zeroize::Zeroizing;

use crate::config::Config;
use crate::errors::AuthError;

/// A bearer token and the instant it stops being usable.
#[derive(Clone, PartialEq, Eq)]
pub struct Token {
    value: String,
    expires_at: DateTime<Utc>,
}

impl Token {
    pub fn new(value: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            value: value.into(),
            expires_at,
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Valid iff `now < expires_at` and the value is non-empty.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        !self.value.is_empty() && now < self.expires_at
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Utc::now())
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("value", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Client id / secret pair presented to the identity provider.
pub struct Credentials {
    pub client_id: String,
    pub client_secret: Zeroizing<String>,
    pub scope: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("scope", &self.scope)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    /// v2.0 endpoints send a number; some v1-compatible proxies send a string.
    expires_in: serde_json::Value,
}

/// Upper bound on the lifetime we honour. Longer values are clamped, not
/// rejected, so the expiry arithmetic cannot overflow.
const MAX_EXPIRES_IN_SECS: i64 = 30 * 24 * 60 * 60;

/// Decodes `expires_in` as any positive finite number of seconds, truncating
/// fractions and never going below one second.
fn parse_expires_in(raw: &serde_json::Value) -> Result<i64, AuthError> {
    let secs = match raw {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|secs| secs.is_finite() && *secs > 0.0)
    .ok_or_else(|| AuthError::Decode(format!("invalid expires_in: {}", raw)))?;

    // `as` saturates for floats beyond i64.
    Ok((secs.trunc() as i64).clamp(1, MAX_EXPIRES_IN_SECS))
}

/// Acquires bearer tokens and owns the cached one.
pub struct TokenProvider {
    http: reqwest::Client,
    token_url: String,
    credentials: Credentials,
    cached: RwLock<Option<Token>>,
    acquisitions: AtomicU64,
}

impl TokenProvider {
    pub fn new(http: reqwest::Client, token_url: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            http,
            token_url: token_url.into(),
            credentials,
            cached: RwLock::new(None),
            acquisitions: AtomicU64::new(0),
        }
    }

    pub fn from_config(http: reqwest::Client, cfg: &Config) -> Self {
        Self::new(
            http,
            cfg.token_url(),
            Credentials {
                client_id: cfg.client_id.clone(),
                client_secret: Zeroizing::new(cfg.client_secret.clone()),
                scope: cfg.graph_scope.clone(),
            },
        )
    }

    /// Snapshot of the cached token, if one has been installed.
    pub fn current(&self) -> Option<Token> {
        match self.cached.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Replaces the cached token wholesale.
    pub fn install(&self, token: Token) {
        match self.cached.write() {
            Ok(mut guard) => *guard = Some(token),
            Err(poisoned) => *poisoned.into_inner() = Some(token),
        }
    }

    /// Number of grant requests issued since construction.
    pub fn acquisitions(&self) -> u64 {
        self.acquisitions.load(Ordering::Relaxed)
    }

    /// Performs the client-credentials grant and installs the resulting token.
    pub async fn acquire(&self) -> Result<Token, AuthError> {
        self.acquisitions.fetch_add(1, Ordering::Relaxed);
        let requested_at = Utc::now();

        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("scope", self.credentials.scope.as_str()),
        ];

        let resp = self
            .http
            .post(&self.token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!("token request failed: {}", e);
                AuthError::Transport(e)
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            tracing::warn!(status = %status, "identity provider rejected client-credentials grant");
            return Err(AuthError::Rejected {
                status: status.as_u16(),
                body: body.chars().take(512).collect(),
            });
        }

        let body = resp.text().await?;
        let parsed: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| AuthError::Decode(e.to_string()))?;

        if parsed.access_token.is_empty() {
            return Err(AuthError::EmptyToken);
        }
        let expires_in = parse_expires_in(&parsed.expires_in)?;

        let token = Token::new(
            parsed.access_token,
            requested_at + Duration::seconds(expires_in),
        );
        self.install(token.clone());

        tracing::info!(expires_at = %token.expires_at(), "access token acquired");
        Ok(token)
    }
}
