//! Directory client — lists security groups from the Graph-style REST API.
//!
//! Every page request is a single authenticated GET with the token taken
//! from the auth gate. No retries: 401 and 403 map to their own variants,
//! everything else (other statuses, transport errors, timeouts, bad JSON)
//! is `DirectoryError::Generic`.

use std::sync::Arc;

use reqwest::{Client, StatusCode};

use crate::errors::DirectoryError;
use crate::middleware::auth_gate::AuthGate;
use crate::models::{GroupListResponse, SecurityGroup};

/// Server-side filter selecting security groups only.
pub const SECURITY_GROUP_FILTER: &str = "mailEnabled eq false and securityEnabled eq true";

/// Guard against a provider that keeps handing out nextLinks.
const MAX_PAGES: usize = 1000;

pub struct DirectoryClient {
    http: Client,
    base_url: String,
    gate: Arc<AuthGate>,
}

impl DirectoryClient {
    pub fn new(http: Client, base_url: impl Into<String>, gate: Arc<AuthGate>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            gate,
        }
    }

    /// Fetches every security group, following `@odata.nextLink` paging.
    pub async fn list_security_groups(&self) -> Result<Vec<SecurityGroup>, DirectoryError> {
        let mut groups = Vec::new();
        let mut page = self.fetch_page(None).await?;

        for _ in 0..MAX_PAGES {
            groups.extend(page.value.into_iter().map(SecurityGroup::strip_annotations));
            match page.next_link {
                Some(link) => page = self.fetch_page(Some(&link)).await?,
                None => {
                    tracing::debug!(groups = groups.len(), "listed security groups");
                    return Ok(groups);
                }
            }
        }

        Err(DirectoryError::Generic(format!(
            "group listing exceeded {} pages",
            MAX_PAGES
        )))
    }

    /// Whether `link` points under the configured API base. The bearer is
    /// only ever sent there.
    fn is_under_base(&self, link: &str) -> bool {
        link.strip_prefix(self.base_url.as_str())
            .is_some_and(|rest| rest.is_empty() || rest.starts_with(['/', '?']))
    }

    async fn fetch_page(&self, next_link: Option<&str>) -> Result<GroupListResponse, DirectoryError> {
        if let Some(link) = next_link {
            if !self.is_under_base(link) {
                tracing::warn!(next_link = %link, "refusing nextLink outside the directory base URL");
                return Err(DirectoryError::Generic(format!(
                    "nextLink outside {}: {}",
                    self.base_url, link
                )));
            }
        }

        let token = self.gate.valid_token().await?;

        let req = match next_link {
            // nextLink already carries the filter and skip token.
            Some(link) => self.http.get(link),
            None => self
                .http
                .get(format!("{}/groups", self.base_url))
                .query(&[("$filter", SECURITY_GROUP_FILTER)]),
        };

        let resp = req
            .bearer_auth(token.value())
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| {
                tracing::warn!("directory request failed: {}", e);
                DirectoryError::from(e)
            })?;

        let status = resp.status();
        match status {
            StatusCode::UNAUTHORIZED => return Err(DirectoryError::Unauthorized),
            StatusCode::FORBIDDEN => return Err(DirectoryError::Forbidden),
            s if !s.is_success() => {
                let body = resp.text().await.unwrap_or_default();
                return Err(DirectoryError::Generic(format!(
                    "directory returned {}: {}",
                    s,
                    body.chars().take(200).collect::<String>()
                )));
            }
            _ => {}
        }

        let body = resp.text().await?;
        serde_json::from_str(&body)
            .map_err(|e| DirectoryError::Generic(format!("invalid group list response: {}", e)))
    }
}
