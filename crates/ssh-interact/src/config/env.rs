//! Environment variable overrides.
//!
//! Overrides are applied only when the caller asks for them
//! ([`ClientConfig::apply_env`](super::ClientConfig::apply_env)); nothing in
//! this crate reads the environment implicitly.

use std::time::Duration;

use super::ClientConfig;
use crate::transport::AuthMethod;

/// Default variable prefix: `SSH_INTERACT_HOST`, `SSH_INTERACT_PORT`, ...
const DEFAULT_PREFIX: &str = "SSH_INTERACT";

/// Applies `{PREFIX}_*` environment variables onto a [`ClientConfig`].
///
/// Recognized names: `HOST`, `PORT`, `USERNAME`, `PASSWORD`, `KEY_FILE`,
/// `CONNECT_TIMEOUT_MS`, `POLL_INTERVAL_MS`, `EXPECT_TIMEOUT_MS`
/// (`0` removes the deadline). Unparseable values are ignored.
#[derive(Debug, Clone)]
pub struct EnvOverrides {
    prefix: String,
}

impl EnvOverrides {
    /// Overrides with the default `SSH_INTERACT` prefix.
    #[must_use]
    pub fn new() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
        }
    }

    /// Overrides with a custom prefix.
    #[must_use]
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    fn var_name(&self, name: &str) -> String {
        format!("{}_{name}", self.prefix)
    }

    /// Apply overrides from the process environment.
    pub fn apply(&self, config: &mut ClientConfig) {
        Self::apply_from(config, |name| std::env::var(self.var_name(name)).ok());
    }

    /// Apply overrides from an arbitrary lookup. Separated out so tests can
    /// drive it without mutating process-global state.
    fn apply_from(config: &mut ClientConfig, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(host) = lookup("HOST") {
            config.ssh.host = host;
        }
        if let Some(port) = lookup("PORT").and_then(|v| v.parse().ok()) {
            config.ssh.port = port;
        }
        if let Some(username) = lookup("USERNAME") {
            config.ssh.credentials.username = username;
        }
        if let Some(password) = lookup("PASSWORD") {
            // An override replaces any configured password outright.
            let methods = &mut config.ssh.credentials.auth_methods;
            methods.retain(|m| !m.is_password());
            methods.insert(0, AuthMethod::password(password));
        }
        if let Some(path) = lookup("KEY_FILE") {
            let methods = &mut config.ssh.credentials.auth_methods;
            methods.retain(|m| !m.is_public_key());
            methods.insert(0, AuthMethod::key_file(path));
        }
        if let Some(ms) = lookup("CONNECT_TIMEOUT_MS").and_then(|v| v.parse::<u64>().ok()) {
            config.ssh.connect_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = lookup("POLL_INTERVAL_MS").and_then(|v| v.parse::<u64>().ok()) {
            config.interact.poll_interval = Duration::from_millis(ms);
        }
        if let Some(ms) = lookup("EXPECT_TIMEOUT_MS").and_then(|v| v.parse::<u64>().ok()) {
            config.interact.expect_timeout = if ms == 0 {
                None
            } else {
                Some(Duration::from_millis(ms))
            };
        }
    }
}

impl Default for EnvOverrides {
    fn default() -> Self {
        Self::new()
    }
}
