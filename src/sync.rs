//! Reconciliation of the remote security-group collection into local storage.
//!
//! One pass: list every security group from the directory, collapse
//! duplicate ids (last occurrence wins), then upsert the batch by id.
//! Local records missing from the remote listing are left alone; the store
//! is an additive mirror.

use std::collections::HashMap;
use std::sync::Arc;

use crate::directory::DirectoryClient;
use crate::errors::SyncError;
use crate::models::SecurityGroup;
use crate::store::GroupStore;

/// Success value of one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Groups returned by the directory (after de-duplication).
    pub fetched: usize,
    /// Ids newly inserted by this pass.
    pub created: Vec<String>,
    /// Existing records overwritten by this pass.
    pub updated: usize,
}

#[derive(Clone)]
pub struct Reconciler {
    directory: Arc<DirectoryClient>,
    store: Arc<dyn GroupStore>,
}

impl Reconciler {
    pub fn new(directory: Arc<DirectoryClient>, store: Arc<dyn GroupStore>) -> Self {
        Self { directory, store }
    }

    pub async fn sync(&self) -> Result<SyncReport, SyncError> {
        let remote = self.directory.list_security_groups().await?;
        if remote.is_empty() {
            tracing::info!("directory returned no security groups, nothing to sync");
            return Ok(SyncReport::default());
        }

        let batch = dedupe_by_id(remote);
        let fetched = batch.len();

        let outcome = self
            .store
            .upsert_groups(&batch)
            .await
            .map_err(SyncError::StorageFailure)?;

        tracing::info!(
            fetched,
            created = outcome.created.len(),
            updated = outcome.updated,
            "security groups reconciled"
        );

        Ok(SyncReport {
            fetched,
            created: outcome.created,
            updated: outcome.updated,
        })
    }
}

/// Keeps the last occurrence of each id, in first-seen order.
fn dedupe_by_id(groups: Vec<SecurityGroup>) -> Vec<SecurityGroup> {
    let mut index: HashMap<String, usize> = HashMap::with_capacity(groups.len());
    let mut out: Vec<SecurityGroup> = Vec::with_capacity(groups.len());
    for group in groups {
        match index.get(&group.id) {
            Some(&i) => out[i] = group,
            None => {
                index.insert(group.id.clone(), out.len());
                out.push(group);
            }
        }
    }
    out
}
