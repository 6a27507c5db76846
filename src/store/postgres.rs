use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder};

use super::{GroupStore, UpsertOutcome};
use crate::models::SecurityGroup;

/// Rows per INSERT statement; 9 binds each keeps us far below the 65535
/// parameter limit.
const UPSERT_CHUNK: usize = 1000;

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPool::connect(database_url).await?;
        Ok(Self { pool })
    }

    /// Run pending migrations from the migrations/ directory.
    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl GroupStore for PgStore {
    async fn upsert_groups(&self, groups: &[SecurityGroup]) -> anyhow::Result<UpsertOutcome> {
        let mut outcome = UpsertOutcome::default();
        if groups.is_empty() {
            return Ok(outcome);
        }

        let mut tx = self.pool.begin().await?;

        for chunk in groups.chunks(UPSERT_CHUNK) {
            let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(
                "INSERT INTO security_groups (id, display_name, description, mail_enabled, \
                 security_enabled, created_date_time, mail_nickname, group_types, extensions) ",
            );
            qb.push_values(chunk, |mut row, g| {
                row.push_bind(&g.id)
                    .push_bind(&g.display_name)
                    .push_bind(&g.description)
                    .push_bind(g.mail_enabled)
                    .push_bind(g.security_enabled)
                    .push_bind(g.created_date_time)
                    .push_bind(&g.mail_nickname)
                    .push_bind(&g.group_types)
                    .push_bind(Json(&g.extensions));
            });
            // xmax = 0 only for rows this statement inserted.
            qb.push(
                r#" ON CONFLICT (id) DO UPDATE SET
                    display_name = EXCLUDED.display_name,
                    description = EXCLUDED.description,
                    mail_enabled = EXCLUDED.mail_enabled,
                    security_enabled = EXCLUDED.security_enabled,
                    created_date_time = EXCLUDED.created_date_time,
                    mail_nickname = EXCLUDED.mail_nickname,
                    group_types = EXCLUDED.group_types,
                    extensions = EXCLUDED.extensions,
                    synced_at = NOW()
                RETURNING id, (xmax = 0) AS inserted"#,
            );

            let rows: Vec<(String, bool)> = qb.build_query_as().fetch_all(&mut *tx).await?;
            for (id, inserted) in rows {
                if inserted {
                    outcome.created.push(id);
                } else {
                    outcome.updated += 1;
                }
            }
        }

        tx.commit().await?;
        Ok(outcome)
    }

    async fn list_groups(&self, limit: i64, offset: i64) -> anyhow::Result<Vec<SecurityGroup>> {
        let rows = sqlx::query_as::<_, GroupRow>(
            "SELECT id, display_name, description, mail_enabled, security_enabled, created_date_time, mail_nickname, group_types, extensions, synced_at FROM security_groups ORDER BY id ASC LIMIT $1 OFFSET $2"
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(SecurityGroup::from).collect())
    }

    async fn get_group(&self, id: &str) -> anyhow::Result<Option<SecurityGroup>> {
        let row = sqlx::query_as::<_, GroupRow>(
            "SELECT id, display_name, description, mail_enabled, security_enabled, created_date_time, mail_nickname, group_types, extensions, synced_at FROM security_groups WHERE id = $1"
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(SecurityGroup::from))
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct GroupRow {
    pub id: String,
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub mail_enabled: bool,
    pub security_enabled: bool,
    pub created_date_time: Option<DateTime<Utc>>,
    pub mail_nickname: Option<String>,
    pub group_types: Vec<String>,
    pub extensions: Json<BTreeMap<String, Value>>,
    pub synced_at: DateTime<Utc>,
}

impl From<GroupRow> for SecurityGroup {
    fn from(row: GroupRow) -> Self {
        SecurityGroup {
            id: row.id,
            display_name: row.display_name,
            description: row.description,
            mail_enabled: row.mail_enabled,
            security_enabled: row.security_enabled,
            created_date_time: row.created_date_time,
            mail_nickname: row.mail_nickname,
            group_types: row.group_types,
            extensions: row.extensions.0,
        }
    }
}
