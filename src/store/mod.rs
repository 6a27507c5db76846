pub mod memory;
pub mod postgres;

use async_trait::async_trait;

use crate::models::SecurityGroup;

/// Outcome of one bulk upsert.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpsertOutcome {
    /// Ids that did not exist before this upsert.
    pub created: Vec<String>,
    /// Number of existing records overwritten.
    pub updated: usize,
}

/// Abstraction over the local group mirror.
/// Implementations: PgStore (PostgreSQL), MemoryStore (in-process).
#[async_trait]
pub trait GroupStore: Send + Sync {
    /// Insert-or-overwrite every group keyed by `id`, as one bulk operation.
    /// Ids must be unique within `groups`.
    async fn upsert_groups(&self, groups: &[SecurityGroup]) -> anyhow::Result<UpsertOutcome>;

    /// One page of stored groups in ascending id order.
    async fn list_groups(&self, limit: i64, offset: i64) -> anyhow::Result<Vec<SecurityGroup>>;

    async fn get_group(&self, id: &str) -> anyhow::Result<Option<SecurityGroup>>;
}
