//! HTTP round trips through the real server, with the identity provider
//! replaced by a stub.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tempfile::TempDir;

use article_vault::app::Vault;
use article_vault::auth::TokenService;
use article_vault::config::Config;
use article_vault::db;
use article_vault::migrate;
use article_vault::server::run_server_with_vault;
use article_vault::sqlite_store::SqliteRecordStore;
use article_vault_core::identity::IdentityProvider;
use article_vault_core::models::Identity;
use article_vault_core::{VaultError, VaultResult};

/// Accepts exactly one access token.
struct StubGoogle;

#[async_trait]
impl IdentityProvider for StubGoogle {
    async fn verify(&self, access_token: &str) -> VaultResult<Identity> {
        if access_token != "good-token" {
            return Err(VaultError::Unauthorized(
                "Invalid Google access token".to_string(),
            ));
        }
        Ok(Identity {
            external_id: "g-1001".into(),
            email: "reader@example.com".into(),
            name: "Reader".into(),
            picture: None,
        })
    }
}

fn test_config(tmp: &TempDir, port: u16, extra: &str) -> Config {
    let config_content = format!(
        r#"[db]
path = "{}/data/vault.sqlite"

[server]
bind = "127.0.0.1:{}"

{}
"#,
        tmp.path().display(),
        port,
        extra
    );
    toml::from_str(&config_content).unwrap()
}

fn find_free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

async fn wait_for_server(port: u16) {
    let client = reqwest::Client::new();
    let url = format!("http://127.0.0.1:{}/health", port);
    for _ in 0..50 {
        tokio::time::sleep(Duration::from_millis(100)).await;
        if let Ok(resp) = client.get(&url).send().await {
            if resp.status().is_success() {
                return;
            }
        }
    }
    panic!("Server did not become ready within 5 seconds");
}

/// Start a server on a free port and return its base URL.
async fn start_server(tmp: &TempDir, extra: &str) -> (String, tokio::task::JoinHandle<()>) {
    let port = find_free_port();
    let cfg = test_config(tmp, port, extra);
    migrate::run_migrations(&cfg).await.unwrap();

    let store = Arc::new(SqliteRecordStore::new(db::connect(&cfg).await.unwrap()));
    let tokens = TokenService::new("integration-test-secret", Duration::from_secs(600));
    let vault = Arc::new(Vault::new(&cfg, store, tokens, Arc::new(StubGoogle), None));

    let handle = tokio::spawn(async move {
        run_server_with_vault(&cfg, vault).await.ok();
    });
    wait_for_server(port).await;
    (format!("http://127.0.0.1:{}", port), handle)
}

async fn sign_in(client: &reqwest::Client, base: &str) -> String {
    let resp = client
        .post(format!("{}/auth/google", base))
        .json(&json!({
            "accessToken": "good-token",
            "userInfo": { "email": "reader@example.com", "name": "Reader" }
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["user"]["email"], "reader@example.com");
    body["token"].as_str().unwrap().to_string()
}

fn article(url: &str) -> Value {
    json!({
        "title": "Why the web is slow",
        "url": url,
        "website": "perf.example",
        "content": "Pages ship megabytes of script to render a paragraph of text. ".repeat(3),
    })
}

#[tokio::test]
async fn test_health() {
    let tmp = TempDir::new().unwrap();
    let (base, server) = start_server(&tmp, "").await;

    let body: Value = reqwest::get(format!("{}/health", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));

    server.abort();
}

#[tokio::test]
async fn test_sign_in_rejections() {
    let tmp = TempDir::new().unwrap();
    let (base, server) = start_server(&tmp, "").await;
    let client = reqwest::Client::new();
    let url = format!("{}/auth/google", base);

    let resp = client
        .post(&url)
        .json(&json!({ "accessToken": "bad-token", "userInfo": { "email": "reader@example.com" } }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    let resp = client
        .post(&url)
        .json(&json!({ "accessToken": "good-token", "userInfo": { "email": "someone@else.example" } }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "unauthorized");

    let resp = client.post(&url).json(&json!({})).send().await.unwrap();
    assert_eq!(resp.status(), 400);

    let resp = client
        .get(format!("{}/articles", base))
        .bearer_auth("not-a-token")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    server.abort();
}

#[tokio::test]
async fn test_article_lifecycle_over_http() {
    let tmp = TempDir::new().unwrap();
    let (base, server) = start_server(&tmp, "").await;
    let client = reqwest::Client::new();
    let token = sign_in(&client, &base).await;
    let articles_url = format!("{}/articles", base);

    // Create, then merge highlights into the same URL.
    let resp = client
        .post(&articles_url)
        .bearer_auth(&token)
        .json(&article("https://perf.example/1"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    let created: Value = resp.json().await.unwrap();
    assert_eq!(created["action"], "created");
    let first_id = created["article"]["id"].as_str().unwrap().to_string();

    let mut with_highlights = article("https://perf.example/1");
    with_highlights["highlights"] = json!([{ "text": "megabytes of script" }]);
    let resp = client
        .post(&articles_url)
        .bearer_auth(&token)
        .json(&with_highlights)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let updated: Value = resp.json().await.unwrap();
    assert_eq!(updated["action"], "updated");
    assert_eq!(updated["article"]["id"], first_id.as_str());
    assert_eq!(updated["article"]["highlight_count"], 1);

    // Every violation is reported.
    let resp = client
        .post(&articles_url)
        .bearer_auth(&token)
        .json(&json!({ "url": "ftp://nope" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "invalid_input");
    let details = body["error"]["details"].as_array().unwrap();
    assert!(details.iter().any(|d| d == "Title is required"));
    assert!(details.iter().any(|d| d == "Valid URL is required"));

    // Fill the quota.
    for n in 2..=3 {
        let resp = client
            .post(&articles_url)
            .bearer_auth(&token)
            .json(&article(&format!("https://perf.example/{}", n)))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 201);
    }
    let resp = client
        .post(&articles_url)
        .bearer_auth(&token)
        .json(&article("https://perf.example/4"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 409);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "quota_exceeded");

    // Listings.
    let list: Value = client
        .get(&articles_url)
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(list["count"], 3);
    assert_eq!(list["max_articles"], 3);
    assert!(list["articles"][0].get("content").is_none());

    let detailed: Value = client
        .get(format!("{}?detailed=true", articles_url))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(detailed["articles"][0]["id"], first_id.as_str());
    assert_eq!(detailed["articles"][0]["highlight_count"], 1);
    assert_eq!(detailed["articles"][0]["has_summary"], false);

    // Delete.
    let resp = client
        .delete(format!("{}/missing-id", articles_url))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
    let resp = client
        .delete(format!("{}/{}", articles_url, first_id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    // Sync into the freed slot.
    let resp = client
        .post(format!("{}/sync", articles_url))
        .bearer_auth(&token)
        .json(&json!({
            "localArticles": [
                article("https://perf.example/2"),
                article("https://perf.example/8"),
                article("https://perf.example/9"),
            ]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["skipped_count"], 1);
    assert_eq!(body["cloud_articles"].as_array().unwrap().len(), 3);
    let results = body["sync_results"].as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["url"], "https://perf.example/8");
    assert_eq!(results[0]["status"], "synced");

    server.abort();
}

#[tokio::test]
async fn test_rate_limited_sign_in() {
    let tmp = TempDir::new().unwrap();
    let (base, server) = start_server(&tmp, "[rate_limit]\nmax_requests_per_minute = 2\n").await;
    let client = reqwest::Client::new();
    let url = format!("{}/auth/google", base);

    let mut statuses = Vec::new();
    for _ in 0..3 {
        let resp = client
            .post(&url)
            .header("x-forwarded-for", "198.51.100.4")
            .json(&json!({ "accessToken": "bad-token", "userInfo": { "email": "a@b.example" } }))
            .send()
            .await
            .unwrap();
        statuses.push(resp.status().as_u16());
    }
    assert_eq!(statuses, vec![401, 401, 429]);

    // A different caller has its own window.
    let resp = client
        .post(&url)
        .header("x-forwarded-for", "198.51.100.5")
        .json(&json!({ "accessToken": "bad-token", "userInfo": { "email": "a@b.example" } }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    server.abort();
}
