use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A directory security group (`mailEnabled == false && securityEnabled == true`).
///
/// `id` is the identity; every other field is overwritten on each sync.
/// Attributes the provider adds beyond the modelled ones are kept verbatim in
/// `extensions`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityGroup {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub mail_enabled: bool,
    #[serde(default)]
    pub security_enabled: bool,
    #[serde(default)]
    pub created_date_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub mail_nickname: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub group_types: Vec<String>,
    #[serde(flatten)]
    pub extensions: BTreeMap<String, Value>,
}

fn null_as_empty<'de, D>(de: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(de)?.unwrap_or_default())
}

impl SecurityGroup {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: None,
            description: None,
            mail_enabled: false,
            security_enabled: true,
            created_date_time: None,
            mail_nickname: None,
            group_types: Vec::new(),
            extensions: BTreeMap::new(),
        }
    }

    /// Drops OData annotations (`@odata.type`, `@odata.etag`, ...) picked up
    /// by the flattened extension map. They describe the response, not the group.
    pub fn strip_annotations(mut self) -> Self {
        self.extensions.retain(|k, _| !k.starts_with("@odata."));
        self
    }
}

/// One page of `GET /groups`.
#[derive(Debug, Deserialize)]
pub struct GroupListResponse {
    #[serde(default)]
    pub value: Vec<SecurityGroup>,
    #[serde(rename = "@odata.nextLink")]
    pub next_link: Option<String>,
}
