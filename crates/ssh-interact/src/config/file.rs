//! TOML configuration files.
//!
//! ```toml
//! [ssh]
//! host = "build-1.internal"
//! port = 22
//! username = "deploy"
//! password = "hunter2"              # and/or key_file + key_passphrase
//! key_file = "/home/deploy/.ssh/id_ed25519"
//! connect_timeout_ms = 30000
//! host_key = "known-hosts"          # accept-all | known-hosts | reject
//! known_hosts_file = "/home/deploy/.ssh/known_hosts"
//!
//! [interact]
//! poll_interval_ms = 100
//! expect_timeout_ms = 30000         # 0 removes the deadline
//! read_chunk_size = 8192
//! max_buffer = 1048576              # omit for unbounded
//! ```
//!
//! Missing fields fall back to the defaults in [`super`] and
//! [`crate::transport`]; only `ssh.host` is required.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use super::{ClientConfig, InteractConfig};
use crate::error::{Error, Result};
use crate::transport::{Credentials, HostKeyPolicy, SshConfig};

#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    #[serde(default)]
    ssh: SshSection,
    #[serde(default)]
    interact: InteractSection,
}

#[derive(Debug, Default, Deserialize)]
struct SshSection {
    host: Option<String>,
    port: Option<u16>,
    username: Option<String>,
    password: Option<String>,
    key_file: Option<PathBuf>,
    key_passphrase: Option<String>,
    connect_timeout_ms: Option<u64>,
    host_key: Option<HostKeyMode>,
    known_hosts_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum HostKeyMode {
    AcceptAll,
    KnownHosts,
    Reject,
}

#[derive(Debug, Default, Deserialize)]
struct InteractSection {
    poll_interval_ms: Option<u64>,
    expect_timeout_ms: Option<u64>,
    read_chunk_size: Option<usize>,
    max_buffer: Option<usize>,
}

/// Read and parse a configuration file.
pub(super) async fn load(path: &Path) -> Result<ClientConfig> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| Error::config(format!("cannot read '{}': {e}", path.display())))?;
    from_toml_str(&text)
}

/// Parse configuration from TOML text.
pub(super) fn from_toml_str(text: &str) -> Result<ClientConfig> {
    let parsed: FileConfig =
        toml::from_str(text).map_err(|e| Error::config(format!("invalid TOML: {e}")))?;
    build(parsed)
}

fn build(parsed: FileConfig) -> Result<ClientConfig> {
    let host = parsed
        .ssh
        .host
        .ok_or_else(|| Error::config("missing required field 'ssh.host'"))?;

    let mut credentials = match parsed.ssh.username {
        Some(username) => Credentials::new(username),
        None => Credentials::default(),
    };
    // Key-based auth is attempted before password when both are present.
    if let Some(path) = parsed.ssh.key_file {
        credentials = match parsed.ssh.key_passphrase {
            Some(phrase) => credentials.with_key_file_passphrase(path, phrase),
            None => credentials.with_key_file(path),
        };
    }
    if let Some(password) = parsed.ssh.password {
        credentials = credentials.with_password(password);
    }

    let mut ssh = SshConfig::new(host).credentials(credentials);
    if let Some(port) = parsed.ssh.port {
        ssh = ssh.port(port);
    }
    if let Some(ms) = parsed.ssh.connect_timeout_ms {
        ssh = ssh.connect_timeout(Duration::from_millis(ms));
    }
    match parsed.ssh.host_key {
        Some(HostKeyMode::AcceptAll) => {
            ssh = ssh.host_key_policy(HostKeyPolicy::AcceptAll);
        }
        Some(HostKeyMode::KnownHosts) => {
            ssh = ssh.host_key_policy(HostKeyPolicy::KnownHosts {
                path: parsed.ssh.known_hosts_file,
            });
        }
        Some(HostKeyMode::Reject) => {
            ssh = ssh.host_key_policy(HostKeyPolicy::RejectUnknown);
        }
        // A bare known_hosts_file implies the known-hosts policy.
        None => {
            if let Some(path) = parsed.ssh.known_hosts_file {
                ssh = ssh.host_key_policy(HostKeyPolicy::KnownHosts { path: Some(path) });
            }
        }
    }

    let mut interact = InteractConfig::new();
    if let Some(ms) = parsed.interact.poll_interval_ms {
        interact = interact.poll_interval(Duration::from_millis(ms));
    }
    match parsed.interact.expect_timeout_ms {
        Some(0) => interact = interact.no_expect_timeout(),
        Some(ms) => interact = interact.expect_timeout(Duration::from_millis(ms)),
        None => {}
    }
    if let Some(size) = parsed.interact.read_chunk_size {
        interact = interact.read_chunk_size(size);
    }
    if let Some(limit) = parsed.interact.max_buffer {
        interact = interact.max_buffer(limit);
    }

    Ok(ClientConfig::new(ssh).interact(interact))
}
