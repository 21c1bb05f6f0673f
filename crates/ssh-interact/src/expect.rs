//! Send/expect engine over an async byte stream.
//!
//! [`Interaction`] drives a command/response dialogue: [`send`] writes a
//! command line, [`expect`] reads until a regex matches the output
//! accumulated since the call started. The engine is generic over the
//! stream, so it runs against a live SSH shell channel or an in-memory
//! test double alike.
//!
//! Matching works on the whole buffer accumulated by the current call, and
//! the first match attempt happens only after the first read completes. A
//! successful match returns the entire accumulated text, not just the
//! matched portion, so callers see everything the remote printed. A stream
//! that closes before the pattern appears is a normal outcome
//! ([`ExpectOutcome::ClosedWithoutMatch`]), not an error; only running out
//! of time is.
//!
//! [`send`]: Interaction::send
//! [`expect`]: Interaction::expect

use std::time::Duration;

use regex::Regex;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::config::InteractConfig;
use crate::error::{Error, Result};
use crate::types::ExpectOutcome;
use crate::util::Deadline;

/// A send/expect dialogue over a bidirectional stream.
#[derive(Debug)]
pub struct Interaction<T> {
    stream: T,
    config: InteractConfig,
    eof: bool,
}

impl<T> Interaction<T> {
    /// Wrap a stream with the given interaction settings.
    pub fn new(stream: T, config: InteractConfig) -> Self {
        Self {
            stream,
            config,
            eof: false,
        }
    }

    /// Whether the stream has reached end of input.
    #[must_use]
    pub const fn is_eof(&self) -> bool {
        self.eof
    }

    /// The interaction settings in use.
    #[must_use]
    pub const fn config(&self) -> &InteractConfig {
        &self.config
    }

    /// Shared access to the underlying stream.
    pub const fn get_ref(&self) -> &T {
        &self.stream
    }

    /// Mutable access to the underlying stream.
    pub const fn get_mut(&mut self) -> &mut T {
        &mut self.stream
    }

    /// Consume the engine and return the stream.
    pub fn into_inner(self) -> T {
        self.stream
    }
}

impl<T: AsyncRead + AsyncWrite + Unpin> Interaction<T> {
    /// Send a command, terminated with a newline.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the write or flush fails.
    pub async fn send(&mut self, command: &str) -> Result<()> {
        tracing::debug!(command, "sending command");
        let line = format!("{command}\n");
        self.send_raw(line.as_bytes()).await
    }

    /// Send bytes exactly as given, with no terminator added.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the write or flush fails.
    pub async fn send_raw(&mut self, data: &[u8]) -> Result<()> {
        self.stream
            .write_all(data)
            .await
            .map_err(|e| Error::io("writing to channel", e))?;
        self.stream
            .flush()
            .await
            .map_err(|e| Error::io("flushing channel", e))?;
        Ok(())
    }

    /// Read until `pattern` matches, using the configured expect timeout.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Pattern`] if the regex does not compile,
    /// [`Error::Timeout`] (carrying the partial buffer) if time runs out,
    /// [`Error::BufferOverflow`] if a configured cap is exceeded, or an I/O
    /// error if a read fails.
    pub async fn expect(&mut self, pattern: &str) -> Result<ExpectOutcome> {
        self.expect_inner(pattern, self.config.expect_timeout).await
    }

    /// Read until `pattern` matches, bounded by `timeout` instead of the
    /// configured default.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`expect`](Interaction::expect).
    pub async fn expect_timeout(
        &mut self,
        pattern: &str,
        timeout: Duration,
    ) -> Result<ExpectOutcome> {
        self.expect_inner(pattern, Some(timeout)).await
    }

    async fn expect_inner(
        &mut self,
        pattern: &str,
        timeout: Option<Duration>,
    ) -> Result<ExpectOutcome> {
        let regex = Regex::new(pattern)?;
        let deadline = Deadline::from_now(timeout);
        let chunk_size = self.config.read_chunk_size.max(1);
        let mut chunk = vec![0u8; chunk_size];
        let mut accumulated: Vec<u8> = Vec::new();

        loop {
            if self.eof {
                let text = String::from_utf8_lossy(&accumulated).into_owned();
                tracing::debug!(pattern, bytes = accumulated.len(), "channel closed before match");
                return Ok(ExpectOutcome::ClosedWithoutMatch { text });
            }

            if deadline.is_expired() {
                tracing::debug!(pattern, bytes = accumulated.len(), "expect timed out");
                return Err(Error::timeout(
                    timeout.unwrap_or_default(),
                    pattern,
                    String::from_utf8_lossy(&accumulated).into_owned(),
                ));
            }

            // Clamp each read slice so the loop observes the deadline no
            // later than one poll interval after it passes.
            let slice = deadline.clamp(self.config.poll_interval);
            match tokio::time::timeout(slice, self.stream.read(&mut chunk)).await {
                Ok(Ok(0)) => {
                    self.eof = true;
                }
                Ok(Ok(n)) => {
                    accumulated.extend_from_slice(&chunk[..n]);
                    tracing::trace!(read = n, total = accumulated.len(), "channel data");
                    if let Some(max) = self.config.max_buffer {
                        if accumulated.len() > max {
                            return Err(Error::buffer_overflow(max));
                        }
                    }
                    let text = String::from_utf8_lossy(&accumulated);
                    if regex.is_match(&text) {
                        tracing::debug!(pattern, bytes = accumulated.len(), "pattern matched");
                        return Ok(ExpectOutcome::Matched {
                            text: text.into_owned(),
                        });
                    }
                }
                Ok(Err(e)) => return Err(Error::io("reading from channel", e)),
                Err(_) => {
                    // Poll slice elapsed with no data. Loop to re-check the
                    // deadline.
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockStream;
    use std::time::Instant;

    fn interaction(stream: MockStream) -> Interaction<MockStream> {
        let config = InteractConfig::new().poll_interval(Duration::from_millis(20));
        Interaction::new(stream, config)
    }

    #[tokio::test]
    async fn send_appends_newline() {
        let remote = MockStream::new();
        let mut engine = interaction(remote.clone());

        engine.send("ls -la").await.unwrap();
        assert_eq!(remote.take_input_str(), "ls -la\n");
    }

    #[tokio::test]
    async fn send_raw_sends_bytes_verbatim() {
        let remote = MockStream::new();
        let mut engine = interaction(remote.clone());

        engine.send_raw(b"\x03").await.unwrap();
        assert_eq!(remote.take_input(), b"\x03");
    }

    #[tokio::test]
    async fn match_happens_after_first_read() {
        let remote = MockStream::new();
        let mut engine = interaction(remote.clone());
        remote.queue_output_str("x");

        // ".*" matches the empty string, but the engine reads before it
        // matches, so the queued byte must be in the result.
        let outcome = engine.expect(".*").await.unwrap();
        assert_eq!(outcome.text(), "x");
    }

    #[tokio::test]
    async fn match_returns_full_accumulated_buffer() {
        let remote = MockStream::new();
        let mut engine = interaction(remote.clone());

        let feeder = remote.clone();
        let task = tokio::spawn(async move {
            feeder.queue_output_str("boot messages\n");
            tokio::time::sleep(Duration::from_millis(30)).await;
            feeder.queue_output_str("login: ");
        });

        let outcome = engine.expect("login:").await.unwrap();
        assert!(outcome.is_match());
        assert_eq!(outcome.text(), "boot messages\nlogin: ");
        task.await.unwrap();
    }

    #[tokio::test]
    async fn closed_stream_returns_partial_text() {
        let remote = MockStream::new();
        let mut engine = interaction(remote.clone());
        remote.queue_output_str("partial output");
        remote.signal_eof();

        let outcome = engine.expect("never-appears").await.unwrap();
        assert!(!outcome.is_match());
        assert_eq!(outcome.text(), "partial output");
        assert!(engine.is_eof());
    }

    #[tokio::test]
    async fn expect_after_eof_returns_empty_closed() {
        let remote = MockStream::new();
        let mut engine = interaction(remote.clone());
        remote.signal_eof();

        let first = engine.expect("a").await.unwrap();
        assert_eq!(first.text(), "");
        let second = engine.expect("b").await.unwrap();
        assert!(matches!(second, ExpectOutcome::ClosedWithoutMatch { .. }));
    }

    #[tokio::test]
    async fn timeout_error_carries_partial_buffer() {
        let remote = MockStream::new();
        let mut engine = interaction(remote.clone());
        remote.queue_output_str("incomplete");

        let err = engine
            .expect_timeout("never-appears", Duration::from_millis(60))
            .await
            .unwrap_err();
        assert!(err.is_timeout());
        assert_eq!(err.buffer(), Some("incomplete"));
    }

    #[tokio::test]
    async fn timeout_is_bounded_by_poll_interval() {
        let remote = MockStream::new();
        let mut engine = interaction(remote);

        let start = Instant::now();
        let err = engine
            .expect_timeout("never", Duration::from_millis(80))
            .await
            .unwrap_err();
        let elapsed = start.elapsed();

        assert!(err.is_timeout());
        assert!(elapsed >= Duration::from_millis(80));
        // Deadline plus one 20ms poll slice, with scheduling slack.
        assert!(elapsed < Duration::from_millis(400), "took {elapsed:?}");
    }

    #[tokio::test]
    async fn invalid_pattern_is_reported() {
        let remote = MockStream::new();
        let mut engine = interaction(remote);

        let err = engine.expect("(unclosed").await.unwrap_err();
        assert!(matches!(err, Error::Pattern(_)));
    }

    #[tokio::test]
    async fn buffer_cap_is_enforced() {
        let remote = MockStream::new();
        let config = InteractConfig::new()
            .poll_interval(Duration::from_millis(20))
            .max_buffer(8);
        let mut engine = Interaction::new(remote.clone(), config);
        remote.queue_output_str("far more than eight bytes");

        let err = engine.expect("never-appears").await.unwrap_err();
        assert!(matches!(err, Error::BufferOverflow { max_size: 8 }));
    }

    #[tokio::test]
    async fn read_errors_surface_as_io() {
        let remote = MockStream::new();
        let mut engine = interaction(remote.clone());
        remote.set_error("connection reset");

        let err = engine.expect("prompt").await.unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
        assert!(err.to_string().contains("reading from channel"));
    }
}
