//! Round-trip tests against a live SSH server.
//!
//! Ignored by default: they need a reachable server and credentials. Point
//! them at one with the crate's standard environment overrides and opt in:
//!
//! ```bash
//! export SSH_INTERACT_HOST=localhost
//! export SSH_INTERACT_USERNAME=testuser
//! export SSH_INTERACT_PASSWORD=testpass    # or SSH_INTERACT_KEY_FILE
//! cargo test --test live_server_tests -- --ignored --nocapture
//! ```
//!
//! Host keys are accepted without verification here; only run these against
//! a throwaway test server.

use std::path::PathBuf;
use std::time::Duration;

use ssh_interact::{
    CancelToken, ClientConfig, HostKeyPolicy, InteractConfig, SshConfig, SshInteraction,
};

/// Build a client config from the environment, or `None` to skip.
fn live_config() -> Option<ClientConfig> {
    let host = std::env::var("SSH_INTERACT_HOST").ok()?;
    let ssh = SshConfig::new(host)
        .host_key_policy(HostKeyPolicy::AcceptAll)
        .connect_timeout(Duration::from_secs(10));
    let mut config = ClientConfig::new(ssh)
        .interact(InteractConfig::new().expect_timeout(Duration::from_secs(10)));
    config.apply_env();
    Some(config)
}

fn scratch_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("ssh-interact-live-{}-{name}", std::process::id()))
}

fn remote_path(name: &str) -> String {
    format!("/tmp/ssh-interact-live-{}-{name}", std::process::id())
}

macro_rules! connect_or_skip {
    () => {
        match live_config() {
            Some(config) => {
                let mut client = SshInteraction::new(config);
                client.connect().await.expect("connect to live server");
                client
            }
            None => {
                eprintln!("skipping: SSH_INTERACT_HOST not set");
                return;
            }
        }
    };
}

#[tokio::test]
#[ignore]
async fn shell_echo_round_trip() {
    let client = connect_or_skip!();

    client.send("echo live-marker-$((20 + 3))").await.unwrap();
    let outcome = client.expect("live-marker-23").await.unwrap();
    assert!(outcome.is_match());
    assert!(outcome.text().contains("live-marker-23"));

    client.close().await;
}

#[tokio::test]
#[ignore]
async fn upload_download_is_byte_identical() {
    let client = connect_or_skip!();

    let local_src = scratch_path("src.dat");
    let local_back = scratch_path("back.dat");
    let remote = remote_path("roundtrip.dat");
    let payload: Vec<u8> = (0u32..4096).flat_map(u32::to_le_bytes).collect();
    tokio::fs::write(&local_src, &payload).await.unwrap();

    client.upload(&local_src, &remote).await.unwrap();
    client.download(&remote, &local_back).await.unwrap();

    let returned = tokio::fs::read(&local_back).await.unwrap();
    assert_eq!(returned, payload);

    client.send(&format!("rm -f {remote}")).await.unwrap();
    client.close().await;
    let _ = tokio::fs::remove_file(&local_src).await;
    let _ = tokio::fs::remove_file(&local_back).await;
}

#[tokio::test]
#[ignore]
async fn empty_file_round_trips() {
    let client = connect_or_skip!();

    let local_src = scratch_path("empty-src");
    let local_back = scratch_path("empty-back");
    let remote = remote_path("empty");
    tokio::fs::write(&local_src, b"").await.unwrap();

    client.upload(&local_src, &remote).await.unwrap();
    client.download(&remote, &local_back).await.unwrap();

    let returned = tokio::fs::read(&local_back).await.unwrap();
    assert!(returned.is_empty());

    client.send(&format!("rm -f {remote}")).await.unwrap();
    client.close().await;
    let _ = tokio::fs::remove_file(&local_src).await;
    let _ = tokio::fs::remove_file(&local_back).await;
}

#[tokio::test]
#[ignore]
async fn tail_relays_remote_lines_in_order() {
    let client = connect_or_skip!();

    let mut lines = Vec::new();
    let end = client
        .tail(
            "printf 'one\\ntwo\\nthree\\n'",
            CancelToken::new(),
            |line| lines.push(line.to_string()),
        )
        .await
        .unwrap();

    assert_eq!(lines, ["one", "two", "three"]);
    assert!(!end.was_cancelled());

    client.close().await;
}
