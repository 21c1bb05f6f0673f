//! Error types for ssh-interact.
//!
//! One enum covers the whole client surface. Errors that interrupt an
//! expect or tail loop carry the output accumulated so far, so callers can
//! log or inspect partial results instead of losing them.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::types::TransferDirection;

/// Maximum length of buffer content to display in error messages.
const MAX_BUFFER_DISPLAY: usize = 500;

/// Trailing lines to keep when a buffer is truncated for display.
const TAIL_LINES: usize = 6;

/// Format buffer content for display, truncating if necessary.
fn format_buffer_snippet(buffer: &str) -> String {
    if buffer.is_empty() {
        return "(empty buffer)".to_string();
    }

    let lines: Vec<&str> = buffer.lines().collect();

    if buffer.len() <= MAX_BUFFER_DISPLAY && lines.len() <= TAIL_LINES {
        return format!(
            "┌─ captured output ({} bytes)\n│ {}\n└─",
            buffer.len(),
            lines.join("\n│ ")
        );
    }

    // Large buffer: the tail is what expect callers care about.
    let tail = &lines[lines.len().saturating_sub(TAIL_LINES)..];
    let hidden = lines.len() - tail.len();

    format!(
        "┌─ captured output ({} bytes, {} lines)\n│ … ({hidden} lines hidden)\n│ {}\n└─",
        buffer.len(),
        lines.len(),
        tail.join("\n│ ")
    )
}

/// Format a timeout error message with the partial buffer attached.
fn format_timeout_error(duration: Duration, pattern: &str, buffer: &str) -> String {
    format!(
        "timed out after {duration:?} waiting for pattern '{pattern}'\n{}",
        format_buffer_snippet(buffer)
    )
}

/// The error type for all ssh-interact operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Transport establishment, authentication, or connect-time channel
    /// setup failed.
    #[error("failed to establish SSH session with {host}:{port}: {reason}")]
    Transport {
        /// The host that could not be reached or authenticated against.
        host: String,
        /// The port the connection was attempted on.
        port: u16,
        /// The reason for the failure.
        reason: String,
    },

    /// A channel could not be opened or configured.
    #[error("SSH channel error: {reason}")]
    Channel {
        /// The reason for the channel failure.
        reason: String,
    },

    /// An I/O error occurred with additional context.
    #[error("{context}: {source}")]
    Io {
        /// What operation was being performed.
        context: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Timeout waiting for a pattern match.
    #[error("{}", format_timeout_error(*duration, pattern, buffer))]
    Timeout {
        /// The timeout duration that elapsed.
        duration: Duration,
        /// The pattern that was being waited for.
        pattern: String,
        /// Output accumulated before the deadline.
        buffer: String,
    },

    /// A file transfer failed.
    #[error("{direction} failed (local '{}', remote '{remote}'): {reason}", local.display())]
    Transfer {
        /// Which way the transfer was going.
        direction: TransferDirection,
        /// The local file path.
        local: PathBuf,
        /// The remote file path.
        remote: String,
        /// The reason for the failure.
        reason: String,
    },

    /// Invalid regex pattern.
    #[error("invalid regex pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// Configuration error.
    #[error("configuration error: {message}")]
    Config {
        /// Description of the configuration problem.
        message: String,
    },

    /// The accumulation buffer exceeded its configured cap.
    #[error("buffer overflow: maximum size of {max_size} bytes exceeded")]
    BufferOverflow {
        /// The maximum buffer size that was exceeded.
        max_size: usize,
    },

    /// An interactive operation was attempted before `connect()`.
    #[error("session is not connected")]
    NotConnected,

    /// An operation was attempted after `close()`.
    #[error("session is closed")]
    Closed,
}

/// Result type alias for ssh-interact operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a transport error.
    pub fn transport(host: impl Into<String>, port: u16, reason: impl Into<String>) -> Self {
        Self::Transport {
            host: host.into(),
            port,
            reason: reason.into(),
        }
    }

    /// Create a channel error.
    pub fn channel(reason: impl Into<String>) -> Self {
        Self::Channel {
            reason: reason.into(),
        }
    }

    /// Create an I/O error with context.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a timeout error carrying the partial buffer.
    pub fn timeout(
        duration: Duration,
        pattern: impl Into<String>,
        buffer: impl Into<String>,
    ) -> Self {
        Self::Timeout {
            duration,
            pattern: pattern.into(),
            buffer: buffer.into(),
        }
    }

    /// Create a transfer error.
    pub fn transfer(
        direction: TransferDirection,
        local: impl Into<PathBuf>,
        remote: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Transfer {
            direction,
            local: local.into(),
            remote: remote.into(),
            reason: reason.into(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a buffer overflow error.
    #[must_use]
    pub const fn buffer_overflow(max_size: usize) -> Self {
        Self::BufferOverflow { max_size }
    }

    /// Check if this is a timeout error.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Check if this error means the session cannot be used any more.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }

    /// Get the accumulated output if this error carries it.
    #[must_use]
    pub fn buffer(&self) -> Option<&str> {
        match self {
            Self::Timeout { buffer, .. } => Some(buffer),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_display_includes_pattern_and_buffer() {
        let err = Error::timeout(
            Duration::from_secs(5),
            "password:",
            "Enter username: admin\n",
        );
        let msg = err.to_string();
        assert!(msg.contains("timed out"));
        assert!(msg.contains("password:"));
        assert!(msg.contains("admin"));
        assert!(msg.contains("captured output"));
    }

    #[test]
    fn timeout_display_empty_buffer() {
        let err = Error::timeout(Duration::from_secs(1), "x", "");
        assert!(err.to_string().contains("empty buffer"));
    }

    #[test]
    fn large_buffer_is_truncated_to_tail() {
        let large: String = (0..50).fold(String::new(), |mut acc, i| {
            use std::fmt::Write;
            let _ = writeln!(acc, "line {i}: some content here");
            acc
        });

        let msg = Error::timeout(Duration::from_secs(1), "p", &large).to_string();
        assert!(msg.contains("lines hidden"));
        // The tail survives, the head does not.
        assert!(msg.contains("line 49"));
        assert!(!msg.contains("line 0:"));
    }

    #[test]
    fn transfer_display_names_both_paths() {
        let err = Error::transfer(
            TransferDirection::Upload,
            "/tmp/local.txt",
            "/srv/remote.txt",
            "permission denied",
        );
        let msg = err.to_string();
        assert!(msg.contains("upload"));
        assert!(msg.contains("/tmp/local.txt"));
        assert!(msg.contains("/srv/remote.txt"));
    }

    #[test]
    fn predicates() {
        let timeout = Error::timeout(Duration::from_secs(1), "p", "b");
        assert!(timeout.is_timeout());
        assert!(!timeout.is_closed());
        assert!(Error::Closed.is_closed());
        assert!(!Error::NotConnected.is_timeout());
    }

    #[test]
    fn buffer_accessor() {
        let err = Error::timeout(Duration::from_secs(1), "p", "the partial output");
        assert_eq!(err.buffer(), Some("the partial output"));

        let io = Error::io("writing to shell channel", std::io::Error::other("x"));
        assert!(io.buffer().is_none());
    }

    #[test]
    fn pattern_error_from_regex() {
        let bad = regex::Regex::new("(").unwrap_err();
        let err = Error::from(bad);
        assert!(matches!(err, Error::Pattern(_)));
        assert!(err.to_string().contains("invalid regex pattern"));
    }
}
