//! End-to-end tests of the `vault` binary.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn vault_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("vault");
    path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();
    fs::create_dir_all(root.join("config")).unwrap();

    let config_content = format!(
        r#"[db]
path = "{}/data/vault.sqlite"

[server]
bind = "127.0.0.1:7331"
"#,
        root.display()
    );
    let config_path = root.join("config/vault.toml");
    fs::write(&config_path, config_content).unwrap();
    (tmp, config_path)
}

fn run_vault(config_path: &Path, args: &[&str]) -> std::process::Output {
    Command::new(vault_binary())
        .arg("--config")
        .arg(config_path)
        .args(args)
        .env("VAULT_TOKEN_SECRET", "cli-test-secret-value")
        .output()
        .expect("failed to run vault binary")
}

#[test]
fn test_init_is_idempotent() {
    let (tmp, config_path) = setup_test_env();

    let output = run_vault(&config_path, &["init"]);
    assert!(output.status.success(), "init failed: {:?}", output);
    assert!(String::from_utf8_lossy(&output.stdout).contains("Database initialized successfully"));
    assert!(tmp.path().join("data/vault.sqlite").exists());

    let output = run_vault(&config_path, &["init"]);
    assert!(output.status.success());
}

#[test]
fn test_purge_on_fresh_database() {
    let (_tmp, config_path) = setup_test_env();
    assert!(run_vault(&config_path, &["init"]).status.success());

    let output = run_vault(&config_path, &["purge"]);
    assert!(output.status.success(), "purge failed: {:?}", output);
    assert!(String::from_utf8_lossy(&output.stdout).contains("Purged 0 expired records."));
}

#[test]
fn test_token_for_unknown_user_fails() {
    let (_tmp, config_path) = setup_test_env();
    assert!(run_vault(&config_path, &["init"]).status.success());

    let output = run_vault(&config_path, &["token", "g-unknown"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("No user with external id g-unknown"));
}

#[test]
fn test_missing_config_fails() {
    let tmp = TempDir::new().unwrap();
    let output = run_vault(&tmp.path().join("nope.toml"), &["init"]);
    assert!(!output.status.success());
}
