//! Core result and state types shared across the client.

use std::fmt;

/// Lifecycle state of a client session.
///
/// A session moves `Disconnected -> Connected` through `connect()` and ends
/// in `Closed` through `close()`. `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Created but not yet connected, or a failed `connect()` was reported.
    Disconnected,
    /// Transport authenticated and the shell channel is open.
    Connected,
    /// Torn down by `close()`; no further operations are possible.
    Closed,
}

impl SessionState {
    /// Check if interactive operations are possible in this state.
    #[must_use]
    pub const fn is_connected(self) -> bool {
        matches!(self, Self::Connected)
    }

    /// Check if the session has been closed.
    #[must_use]
    pub const fn is_closed(self) -> bool {
        matches!(self, Self::Closed)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Disconnected => "disconnected",
            Self::Connected => "connected",
            Self::Closed => "closed",
        };
        f.write_str(s)
    }
}

/// The outcome of an `expect` call that did not error.
///
/// Both variants carry the full accumulated output of the call, not just a
/// matched span. A timed-out expect is reported as [`Error::Timeout`] with
/// the partial buffer instead.
///
/// [`Error::Timeout`]: crate::Error::Timeout
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpectOutcome {
    /// The pattern matched somewhere in the accumulated output.
    Matched {
        /// Everything received since the expect call began.
        text: String,
    },
    /// The channel closed before the pattern matched.
    ///
    /// This is a successful return: the remote side finishing its output is
    /// a normal way for an interaction to end. The text may be empty.
    ClosedWithoutMatch {
        /// Everything received since the expect call began.
        text: String,
    },
}

impl ExpectOutcome {
    /// Check whether the pattern matched.
    #[must_use]
    pub const fn is_match(&self) -> bool {
        matches!(self, Self::Matched { .. })
    }

    /// The accumulated output, whichever way the call ended.
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::Matched { text } | Self::ClosedWithoutMatch { text } => text,
        }
    }

    /// Consume the outcome, returning the accumulated output.
    #[must_use]
    pub fn into_text(self) -> String {
        match self {
            Self::Matched { text } | Self::ClosedWithoutMatch { text } => text,
        }
    }
}

/// Which way a file transfer moves data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferDirection {
    /// Local file to remote path.
    Upload,
    /// Remote file to local path.
    Download,
}

impl fmt::Display for TransferDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Upload => "upload",
            Self::Download => "download",
        };
        f.write_str(s)
    }
}

/// How a tail operation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TailEnd {
    /// The remote stream closed. Carries the command's exit status if the
    /// remote reported one before the channel went down.
    StreamClosed {
        /// Exit status of the tailed command, when reported.
        exit_status: Option<u32>,
    },
    /// The cancellation token was observed between reads or line deliveries.
    Cancelled,
}

impl TailEnd {
    /// Check whether the tail ended through cancellation.
    #[must_use]
    pub const fn was_cancelled(self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Exit status of the tailed command, if the stream closed and the
    /// remote reported one.
    #[must_use]
    pub const fn exit_status(self) -> Option<u32> {
        match self {
            Self::StreamClosed { exit_status } => exit_status,
            Self::Cancelled => None,
        }
    }
}
