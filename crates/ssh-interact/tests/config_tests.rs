//! Integration tests for configuration loading through the public API.

use std::path::PathBuf;
use std::time::Duration;

use ssh_interact::{ClientConfig, Error, HostKeyPolicy};

fn scratch_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("ssh-interact-{}-{name}", std::process::id()))
}

#[tokio::test]
async fn load_reads_a_file_from_disk() {
    let path = scratch_path("load.toml");
    tokio::fs::write(
        &path,
        r#"
        [ssh]
        host = "db-01.internal"
        port = 2022
        username = "ops"
        password = "pw"

        [interact]
        expect_timeout_ms = 15000
        "#,
    )
    .await
    .unwrap();

    let config = ClientConfig::load(&path).await.unwrap();
    tokio::fs::remove_file(&path).await.unwrap();

    assert_eq!(config.ssh.host, "db-01.internal");
    assert_eq!(config.ssh.port, 2022);
    assert_eq!(config.ssh.credentials.username, "ops");
    assert_eq!(config.interact.expect_timeout, Some(Duration::from_secs(15)));
}

#[tokio::test]
async fn load_reports_missing_files_as_config_errors() {
    let err = ClientConfig::load("/nonexistent/ssh-interact.toml")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Config { .. }));
    assert!(err.to_string().contains("/nonexistent/ssh-interact.toml"));
}

#[test]
fn from_toml_str_applies_security_defaults() {
    let config = ClientConfig::from_toml_str("[ssh]\nhost = \"h\"\n").unwrap();
    // Unknown host keys are rejected unless a policy is chosen explicitly.
    assert_eq!(config.ssh.host_key_policy, HostKeyPolicy::RejectUnknown);
}

#[test]
fn from_toml_str_rejects_garbage() {
    let err = ClientConfig::from_toml_str("]]not toml[[").unwrap_err();
    assert!(matches!(err, Error::Config { .. }));
}
