//! `PgStore` against a live PostgreSQL.
//!
//! Requires DATABASE_URL (e.g. `docker run -e POSTGRES_PASSWORD=pg -p 5432:5432 postgres`
//! then `DATABASE_URL=postgres://postgres:pg@localhost/postgres cargo test --test pg_store`).
//! Each test is skipped when it is unset. Ids are prefixed with a fresh uuid so
//! runs never collide with each other or with existing rows.

use chrono::{TimeZone, Utc};
use serde_json::json;

use groupsync::models::SecurityGroup;
use groupsync::store::postgres::PgStore;
use groupsync::store::GroupStore;

async fn store() -> Option<PgStore> {
    let Ok(url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set, skipping PgStore test");
        return None;
    };
    let store = PgStore::connect(&url).await.expect("connect to DATABASE_URL");
    store.migrate().await.expect("run migrations");
    Some(store)
}

fn run_prefix() -> String {
    format!("test-{}-", uuid::Uuid::new_v4())
}

fn group(id: String, name: &str) -> SecurityGroup {
    let mut g = SecurityGroup::new(id);
    g.display_name = Some(name.to_string());
    g.description = Some(format!("{} description", name));
    g.security_enabled = true;
    g.mail_nickname = Some(name.to_lowercase());
    g.group_types = vec!["Unified".into()];
    g.created_date_time = Some(Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap());
    g.extensions.insert("visibility".into(), json!("Private"));
    g
}

#[tokio::test]
async fn test_upsert_twice_reports_created_then_updated() {
    let Some(store) = store().await else { return };
    let prefix = run_prefix();
    let groups = vec![
        group(format!("{prefix}a"), "Alpha"),
        group(format!("{prefix}b"), "Beta"),
    ];

    let first = store.upsert_groups(&groups).await.unwrap();
    let mut created = first.created.clone();
    created.sort();
    assert_eq!(created, vec![format!("{prefix}a"), format!("{prefix}b")]);
    assert_eq!(first.updated, 0);

    let second = store.upsert_groups(&groups).await.unwrap();
    assert!(second.created.is_empty());
    assert_eq!(second.updated, 2);

    let stored = store.get_group(&format!("{prefix}a")).await.unwrap().unwrap();
    assert_eq!(stored, groups[0]);
}

#[tokio::test]
async fn test_upsert_overwrites_fields_of_existing_row() {
    let Some(store) = store().await else { return };
    let id = format!("{}x", run_prefix());

    store.upsert_groups(&[group(id.clone(), "Original")]).await.unwrap();

    let mut renamed = SecurityGroup::new(id.clone());
    renamed.display_name = Some("Renamed".into());
    renamed.mail_enabled = true;
    renamed.extensions.insert("classification".into(), json!("High"));
    let outcome = store.upsert_groups(&[renamed]).await.unwrap();
    assert!(outcome.created.is_empty());
    assert_eq!(outcome.updated, 1);

    let stored = store.get_group(&id).await.unwrap().unwrap();
    assert_eq!(stored.display_name.as_deref(), Some("Renamed"));
    assert!(stored.mail_enabled);
    assert!(!stored.security_enabled);
    assert_eq!(stored.description, None);
    assert_eq!(stored.mail_nickname, None);
    assert!(stored.group_types.is_empty());
    assert_eq!(stored.created_date_time, None);
    // Attributes are replaced wholesale, not merged.
    assert_eq!(stored.extensions.get("visibility"), None);
    assert_eq!(stored.extensions["classification"], "High");
}

#[tokio::test]
async fn test_upsert_spanning_several_chunks() {
    let Some(store) = store().await else { return };
    let prefix = run_prefix();
    let groups: Vec<_> = (0..2_500)
        .map(|i| group(format!("{prefix}{i:05}"), &format!("Group {i}")))
        .collect();

    let first = store.upsert_groups(&groups).await.unwrap();
    assert_eq!(first.created.len(), 2_500);
    assert_eq!(first.updated, 0);

    let second = store.upsert_groups(&groups).await.unwrap();
    assert!(second.created.is_empty());
    assert_eq!(second.updated, 2_500);

    let last = store.get_group(&format!("{prefix}02499")).await.unwrap().unwrap();
    assert_eq!(last.display_name.as_deref(), Some("Group 2499"));
}

#[tokio::test]
async fn test_empty_upsert_is_noop() {
    let Some(store) = store().await else { return };
    let outcome = store.upsert_groups(&[]).await.unwrap();
    assert!(outcome.created.is_empty());
    assert_eq!(outcome.updated, 0);
}

#[tokio::test]
async fn test_list_pages_with_limit_and_offset() {
    let Some(store) = store().await else { return };
    store
        .upsert_groups(&[
            group(format!("{}page", run_prefix()), "One"),
            group(format!("{}page", run_prefix()), "Two"),
            group(format!("{}page", run_prefix()), "Three"),
        ])
        .await
        .unwrap();

    // Other tests write concurrently, so only the page size is stable.
    for offset in [0, 1] {
        let page = store.list_groups(2, offset).await.unwrap();
        assert_eq!(page.len(), 2);
        assert_ne!(page[0].id, page[1].id);
    }
    assert!(store.list_groups(0, 0).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_get_missing_group_returns_none() {
    let Some(store) = store().await else { return };
    let missing = format!("{}missing", run_prefix());
    assert!(store.get_group(&missing).await.unwrap().is_none());
}
