//! Client configuration.
//!
//! Configuration is an explicit value handed to [`SshInteraction::new`];
//! there are no global settings. [`ClientConfig`] composes the transport
//! side ([`SshConfig`]) with the interaction tuning ([`InteractConfig`]),
//! and can be built in code, loaded from a TOML file, or adjusted from
//! `SSH_INTERACT_*` environment variables on request.
//!
//! [`SshInteraction::new`]: crate::SshInteraction::new

pub mod env;
pub mod file;

use std::time::Duration;

use crate::error::Result;
use crate::transport::SshConfig;

/// Default interval between availability polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Default deadline for an expect call.
pub const DEFAULT_EXPECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default read chunk size in bytes.
pub const DEFAULT_READ_CHUNK_SIZE: usize = 8192;

/// Tuning for the expect engine and the tailer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InteractConfig {
    /// How long a single read waits before re-checking deadline and
    /// cancellation. Also bounds tail cancellation latency.
    pub poll_interval: Duration,
    /// Deadline for expect calls. `None` polls forever; that is an explicit
    /// opt-in via [`no_expect_timeout`](Self::no_expect_timeout), never the
    /// default.
    pub expect_timeout: Option<Duration>,
    /// Size of the per-read chunk buffer.
    pub read_chunk_size: usize,
    /// Optional cap on the accumulation buffer. Exceeding it fails the
    /// expect call with a buffer overflow error. `None` (the default) grows
    /// without bound.
    pub max_buffer: Option<usize>,
}

impl Default for InteractConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            expect_timeout: Some(DEFAULT_EXPECT_TIMEOUT),
            read_chunk_size: DEFAULT_READ_CHUNK_SIZE,
            max_buffer: None,
        }
    }
}

impl InteractConfig {
    /// Create a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the poll interval.
    #[must_use]
    pub const fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the expect deadline.
    #[must_use]
    pub const fn expect_timeout(mut self, timeout: Duration) -> Self {
        self.expect_timeout = Some(timeout);
        self
    }

    /// Remove the expect deadline entirely. Expect calls will poll until
    /// they match or the channel closes.
    #[must_use]
    pub const fn no_expect_timeout(mut self) -> Self {
        self.expect_timeout = None;
        self
    }

    /// Set the per-read chunk size.
    #[must_use]
    pub const fn read_chunk_size(mut self, size: usize) -> Self {
        self.read_chunk_size = size;
        self
    }

    /// Cap the accumulation buffer at `limit` bytes.
    #[must_use]
    pub const fn max_buffer(mut self, limit: usize) -> Self {
        self.max_buffer = Some(limit);
        self
    }
}

/// Complete client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Transport: endpoint, credentials, host key policy.
    pub ssh: SshConfig,
    /// Interaction tuning.
    pub interact: InteractConfig,
}

impl ClientConfig {
    /// Create a configuration with default interaction tuning.
    pub fn new(ssh: SshConfig) -> Self {
        Self {
            ssh,
            interact: InteractConfig::default(),
        }
    }

    /// Replace the interaction tuning.
    #[must_use]
    pub fn interact(mut self, interact: InteractConfig) -> Self {
        self.interact = interact;
        self
    }

    /// Load a configuration from a TOML file.
    pub async fn load(path: impl AsRef<std::path::Path>) -> Result<Self> {
        file::load(path.as_ref()).await
    }

    /// Parse a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        file::from_toml_str(text)
    }

    /// Apply `SSH_INTERACT_*` environment variable overrides in place.
    pub fn apply_env(&mut self) {
        env::EnvOverrides::new().apply(self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interact_defaults() {
        let config = InteractConfig::default();
        assert_eq!(config.poll_interval, Duration::from_millis(100));
        assert_eq!(config.expect_timeout, Some(Duration::from_secs(30)));
        assert_eq!(config.read_chunk_size, 8192);
        assert!(config.max_buffer.is_none());
    }

    #[test]
    fn interact_builder() {
        let config = InteractConfig::new()
            .poll_interval(Duration::from_millis(250))
            .expect_timeout(Duration::from_secs(5))
            .read_chunk_size(1024)
            .max_buffer(64 * 1024);
        assert_eq!(config.poll_interval, Duration::from_millis(250));
        assert_eq!(config.expect_timeout, Some(Duration::from_secs(5)));
        assert_eq!(config.read_chunk_size, 1024);
        assert_eq!(config.max_buffer, Some(64 * 1024));
    }

    #[test]
    fn unbounded_expect_is_explicit() {
        let config = InteractConfig::new().no_expect_timeout();
        assert!(config.expect_timeout.is_none());
    }
}
