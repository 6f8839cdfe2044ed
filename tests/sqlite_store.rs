//! SQLite record store and the archive engine running on top of it.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tempfile::TempDir;

use article_vault::config::Config;
use article_vault::db;
use article_vault::migrate;
use article_vault::sqlite_store::SqliteRecordStore;
use article_vault_core::articles::ArticleRepository;
use article_vault_core::models::{ArticleDraft, Highlight, SaveAction, SyncStatus};
use article_vault_core::reconcile::Reconciler;
use article_vault_core::store::RecordStore;
use article_vault_core::VaultError;

fn test_config(tmp: &TempDir) -> Config {
    let config_content = format!(
        r#"[db]
path = "{}/data/vault.sqlite"

[server]
bind = "127.0.0.1:0"
"#,
        tmp.path().display()
    );
    toml::from_str(&config_content).unwrap()
}

async fn open_store(tmp: &TempDir) -> SqliteRecordStore {
    let cfg = test_config(tmp);
    migrate::run_migrations(&cfg).await.unwrap();
    SqliteRecordStore::new(db::connect(&cfg).await.unwrap())
}

fn draft(url: &str) -> ArticleDraft {
    ArticleDraft {
        title: "Notes on slow software".into(),
        url: url.into(),
        website: "essays.example".into(),
        content: "Software gets slower faster than hardware gets faster. ".repeat(4),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_migrations_are_idempotent() {
    let tmp = TempDir::new().unwrap();
    let cfg = test_config(&tmp);
    migrate::run_migrations(&cfg).await.unwrap();
    migrate::run_migrations(&cfg).await.unwrap();
    assert!(tmp.path().join("data/vault.sqlite").exists());
}

#[tokio::test]
async fn test_set_get_delete() {
    let tmp = TempDir::new().unwrap();
    let store = open_store(&tmp).await;
    let ttl = Duration::from_secs(60);

    assert!(store.get("k").await.unwrap().is_none());
    store.set("k", json!({"a": 1}), ttl).await.unwrap();
    assert_eq!(store.get("k").await.unwrap(), Some(json!({"a": 1})));

    store.set("k", json!({"a": 2}), ttl).await.unwrap();
    assert_eq!(store.get("k").await.unwrap(), Some(json!({"a": 2})));

    assert!(store.delete("k").await.unwrap());
    assert!(!store.delete("k").await.unwrap());
    assert!(store.get("k").await.unwrap().is_none());
}

#[tokio::test]
async fn test_expired_records_are_invisible_and_purged() {
    let tmp = TempDir::new().unwrap();
    let store = open_store(&tmp).await;

    store.set("short", json!(1), Duration::ZERO).await.unwrap();
    store.set("long", json!(2), Duration::from_secs(60)).await.unwrap();

    assert!(store.get("short").await.unwrap().is_none());
    assert_eq!(store.purge_expired().await.unwrap(), 1);
    assert_eq!(store.get("long").await.unwrap(), Some(json!(2)));
}

#[tokio::test]
async fn test_compare_and_swap() {
    let tmp = TempDir::new().unwrap();
    let store = open_store(&tmp).await;
    let ttl = Duration::from_secs(60);

    // Absent key: only the first writer wins.
    assert!(store.compare_and_swap("idx", None, json!(["a"]), ttl).await.unwrap());
    assert!(!store.compare_and_swap("idx", None, json!(["b"]), ttl).await.unwrap());

    // Present key: stale expectation is rejected.
    assert!(!store
        .compare_and_swap("idx", Some(&json!(["x"])), json!(["c"]), ttl)
        .await
        .unwrap());
    assert!(store
        .compare_and_swap("idx", Some(&json!(["a"])), json!(["a", "c"]), ttl)
        .await
        .unwrap());
    assert_eq!(store.get("idx").await.unwrap(), Some(json!(["a", "c"])));

    // An expired row counts as absent.
    store.set("old", json!(1), Duration::ZERO).await.unwrap();
    assert!(store.compare_and_swap("old", None, json!(2), ttl).await.unwrap());
    assert_eq!(store.get("old").await.unwrap(), Some(json!(2)));
}

/// Walk one user through the quota lifecycle on a real database file.
#[tokio::test]
async fn test_archive_lifecycle_on_sqlite() {
    let tmp = TempDir::new().unwrap();
    let cfg = test_config(&tmp);
    let store: Arc<dyn RecordStore> = Arc::new(open_store(&tmp).await);
    let engine = Reconciler::new(Arc::new(ArticleRepository::new(
        store,
        cfg.limits.to_limits(),
        cfg.cache.to_ttls(),
    )));

    let created = engine.save("u1", draft("https://essays.example/1")).await.unwrap();
    assert_eq!(created.action, SaveAction::Created);

    let mut again = draft("https://essays.example/1");
    again.highlights = vec![Highlight(json!({"text": "slower faster"}))];
    let merged = engine.save("u1", again).await.unwrap();
    assert_eq!(merged.action, SaveAction::Updated);
    assert_eq!(merged.article.id, created.article.id);
    assert_eq!(merged.article.highlight_count, 1);

    engine.save("u1", draft("https://essays.example/2")).await.unwrap();
    engine.save("u1", draft("https://essays.example/3")).await.unwrap();
    let err = engine
        .save("u1", draft("https://essays.example/4"))
        .await
        .unwrap_err();
    assert!(matches!(err, VaultError::QuotaExceeded { limit: 3 }));

    // Another user cannot delete it.
    assert!(!engine
        .articles()
        .delete("u2", &created.article.id)
        .await
        .unwrap());
    assert!(engine
        .articles()
        .delete("u1", &created.article.id)
        .await
        .unwrap());

    // One free slot: the held URL is filtered, the first new one is
    // synced, the rest are skipped.
    let report = engine
        .sync(
            "u1",
            vec![
                draft("https://essays.example/2"),
                draft("https://essays.example/5"),
                draft("https://essays.example/6"),
                draft("https://essays.example/7"),
            ],
        )
        .await
        .unwrap();
    assert_eq!(report.results.len(), 1);
    assert_eq!(report.results[0].url, "https://essays.example/5");
    assert!(matches!(report.results[0].status, SyncStatus::Synced { .. }));
    assert_eq!(report.skipped_count, 2);
    assert_eq!(report.server_index.len(), 3);
}
