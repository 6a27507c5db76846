use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{GroupStore, UpsertOutcome};
use crate::models::SecurityGroup;

/// In-process group store keyed by id. Content is lost on restart.
#[derive(Default)]
pub struct MemoryStore {
    groups: RwLock<BTreeMap<String, SecurityGroup>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.groups.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.groups.read().await.is_empty()
    }
}

#[async_trait]
impl GroupStore for MemoryStore {
    async fn upsert_groups(&self, groups: &[SecurityGroup]) -> anyhow::Result<UpsertOutcome> {
        let mut map = self.groups.write().await;
        let mut outcome = UpsertOutcome::default();
        for group in groups {
            match map.insert(group.id.clone(), group.clone()) {
                Some(_) => outcome.updated += 1,
                None => outcome.created.push(group.id.clone()),
            }
        }
        Ok(outcome)
    }

    async fn list_groups(&self, limit: i64, offset: i64) -> anyhow::Result<Vec<SecurityGroup>> {
        let limit = usize::try_from(limit).unwrap_or(0);
        let offset = usize::try_from(offset).unwrap_or(0);
        Ok(self
            .groups
            .read()
            .await
            .values()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn get_group(&self, id: &str) -> anyhow::Result<Option<SecurityGroup>> {
        Ok(self.groups.read().await.get(id).cloned())
    }
}
