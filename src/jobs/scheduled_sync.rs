//! Background job: periodic security group reconciliation.
//!
//! Enabled by `SYNC_INTERVAL_SECS`. The first pass runs immediately at
//! startup; a slow pass delays the next tick instead of bunching them.

use std::time::Duration;
use tokio::time::{self, MissedTickBehavior};

use crate::sync::Reconciler;

/// Spawn the periodic sync task. Call this once at startup.
pub fn spawn(reconciler: Reconciler, every: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = time::interval(every);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            match reconciler.sync().await {
                Ok(report) => tracing::debug!(
                    created = report.created.len(),
                    updated = report.updated,
                    "scheduled sync finished"
                ),
                Err(e) => tracing::error!("scheduled sync failed: {}", e),
            }
        }
    })
}
