//! Cancellable line-by-line stream tailing.
//!
//! [`Tailer::run`] executes a streaming command (typically `tail -f`) on its
//! own exec channel and hands each output line to a callback until the
//! stream closes or a [`CancelToken`] fires. The relay never blocks
//! indefinitely: reads are sliced by the poll interval, and the token is
//! checked between slices and between line deliveries, so cancellation is
//! observed within one interval.
//!
//! Line handling follows the usual terminal conventions. Lines are split on
//! `\n` with a trailing `\r` stripped, a partial line still pending when the
//! stream closes is delivered as a final line, and a partial line pending
//! at cancellation is discarded.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::{Error, Result};
use crate::transport::{ChannelOpener, StderrSink};
use crate::types::TailEnd;

const TAIL_READ_CHUNK: usize = 8192;

/// Cooperative cancellation flag for a running tail.
///
/// Clones share the flag. Cancelling is idempotent and cannot be undone.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create a token in the not-cancelled state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    /// Check whether cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Relay lines from `reader` to `on_line` until EOF or cancellation.
///
/// Split out from [`Tailer`] so it can run against any stream; the engine
/// tests drive it with an in-memory double.
///
/// # Errors
///
/// Returns an I/O error if a read fails. EOF and cancellation are normal
/// completions, reported through [`TailEnd`].
pub async fn relay_lines<R, F>(
    reader: &mut R,
    poll_interval: Duration,
    token: &CancelToken,
    mut on_line: F,
) -> Result<TailEnd>
where
    R: AsyncRead + Unpin,
    F: FnMut(&str),
{
    let mut chunk = vec![0u8; TAIL_READ_CHUNK];
    let mut pending: Vec<u8> = Vec::new();

    loop {
        if token.is_cancelled() {
            return Ok(TailEnd::Cancelled);
        }

        match tokio::time::timeout(poll_interval, reader.read(&mut chunk)).await {
            Ok(Ok(0)) => {
                if !pending.is_empty() {
                    let line = finish_line(&mut pending);
                    on_line(&line);
                }
                return Ok(TailEnd::StreamClosed { exit_status: None });
            }
            Ok(Ok(n)) => {
                pending.extend_from_slice(&chunk[..n]);
                while let Some(pos) = pending.iter().position(|&b| b == b'\n') {
                    let mut line_bytes: Vec<u8> = pending.drain(..=pos).collect();
                    line_bytes.pop();
                    if line_bytes.last() == Some(&b'\r') {
                        line_bytes.pop();
                    }
                    let line = String::from_utf8_lossy(&line_bytes);
                    on_line(&line);
                    if token.is_cancelled() {
                        return Ok(TailEnd::Cancelled);
                    }
                }
            }
            Ok(Err(e)) => return Err(Error::io("reading stream", e)),
            Err(_) => {
                // Poll slice elapsed with no data. Loop to re-check the
                // token.
            }
        }
    }
}

/// Consume `pending` as a final line, stripping a trailing `\r`.
fn finish_line(pending: &mut Vec<u8>) -> String {
    if pending.last() == Some(&b'\r') {
        pending.pop();
    }
    let line = String::from_utf8_lossy(pending).into_owned();
    pending.clear();
    line
}

/// Runs a streaming command on its own channel and relays its output.
///
/// Obtained from a connected client. Owns a clone of the connection handle,
/// so it is freely movable into a spawned task while the session continues
/// to serve send/expect calls.
#[derive(Debug)]
pub struct Tailer {
    opener: ChannelOpener,
    poll_interval: Duration,
}

impl Tailer {
    pub(crate) const fn new(opener: ChannelOpener, poll_interval: Duration) -> Self {
        Self {
            opener,
            poll_interval,
        }
    }

    /// Run `command` on a fresh exec channel, feeding each output line to
    /// `on_line` until the stream closes or `token` is cancelled.
    ///
    /// Remote stderr is logged rather than mixed into the line stream. The
    /// channel is closed before returning in every case.
    ///
    /// # Errors
    ///
    /// Returns a channel error if the exec channel cannot be opened, or an
    /// I/O error if reading the stream fails.
    pub async fn run<F>(self, command: &str, token: CancelToken, on_line: F) -> Result<TailEnd>
    where
        F: FnMut(&str),
    {
        tracing::info!(command, "starting tail");
        let mut stream = self.opener.open_exec(command, StderrSink::Log).await?;

        let relayed = relay_lines(&mut stream, self.poll_interval, &token, on_line).await;

        let exit_status = stream.exit_status();
        if let Err(e) = stream.close().await {
            tracing::debug!(error = %e, "tail channel close failed");
        }

        match relayed {
            Ok(TailEnd::StreamClosed { .. }) => {
                tracing::debug!(?exit_status, "tail stream closed");
                Ok(TailEnd::StreamClosed { exit_status })
            }
            Ok(TailEnd::Cancelled) => {
                tracing::debug!("tail cancelled");
                Ok(TailEnd::Cancelled)
            }
            Err(e) => Err(e),
        }
    }
}
