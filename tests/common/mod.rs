//! Shared harness: a wiremock server standing in for both the identity
//! provider and the directory API, plus storage doubles.

#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use groupsync::config::Config;
use groupsync::directory::SECURITY_GROUP_FILTER;
use groupsync::models::SecurityGroup;
use groupsync::store::{GroupStore, UpsertOutcome};
use groupsync::AppState;

pub const TENANT: &str = "tenant-1";
pub const ACCESS_TOKEN: &str = "tok-1";

pub fn token_path() -> String {
    format!("/{}/oauth2/v2.0/token", TENANT)
}

pub fn test_config(server: &MockServer) -> Config {
    Config {
        tenant_id: TENANT.into(),
        client_id: "client-1".into(),
        client_secret: "secret-1".into(),
        authority_host: server.uri(),
        graph_base_url: format!("{}/v1.0", server.uri()),
        http_timeout_secs: 5,
        ..Config::default()
    }
}

pub fn test_state(server: &MockServer, store: Arc<dyn GroupStore>) -> Arc<AppState> {
    Arc::new(AppState::new(test_config(server), store).expect("state builds"))
}

/// Identity provider answering the client-credentials grant.
pub fn token_mock(expires_in: i64) -> Mock {
    Mock::given(method("POST"))
        .and(path(token_path()))
        .and(body_string_contains("grant_type=client_credentials"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token_type": "Bearer",
            "expires_in": expires_in,
            "ext_expires_in": expires_in,
            "access_token": ACCESS_TOKEN
        })))
}

/// `GET /v1.0/groups` with the security-group filter and the expected bearer.
pub fn groups_mock(template: ResponseTemplate) -> Mock {
    Mock::given(method("GET"))
        .and(path("/v1.0/groups"))
        .and(query_param("$filter", SECURITY_GROUP_FILTER))
        .and(header("authorization", format!("Bearer {}", ACCESS_TOKEN).as_str()))
        .respond_with(template)
}

pub fn groups_page(groups: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "@odata.context": "https://graph.microsoft.com/v1.0/$metadata#groups",
        "value": groups
    }))
}

pub fn group_json(id: &str, name: &str) -> Value {
    json!({
        "id": id,
        "displayName": name,
        "description": format!("{} description", name),
        "mailEnabled": false,
        "securityEnabled": true,
        "createdDateTime": "2023-03-01T10:00:00Z",
        "mailNickname": format!("nick-{}", id),
        "groupTypes": [],
        "visibility": "Private"
    })
}

/// Sends one request through the full router.
pub async fn call(state: Arc<AppState>, method: &str, uri: &str) -> (StatusCode, Value) {
    let resp = groupsync::app(state)
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
    (status, body)
}

/// Store whose bulk upsert always fails.
pub struct FailingStore;

#[async_trait]
impl GroupStore for FailingStore {
    async fn upsert_groups(&self, _groups: &[SecurityGroup]) -> anyhow::Result<UpsertOutcome> {
        Err(anyhow::anyhow!("bulk write failed: connection reset"))
    }

    async fn list_groups(&self, _limit: i64, _offset: i64) -> anyhow::Result<Vec<SecurityGroup>> {
        Err(anyhow::anyhow!("read failed"))
    }

    async fn get_group(&self, _id: &str) -> anyhow::Result<Option<SecurityGroup>> {
        Err(anyhow::anyhow!("read failed"))
    }
}
