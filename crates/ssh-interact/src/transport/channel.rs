//! SSH channel streams.
//!
//! [`ChannelStream`] wraps a russh channel as `AsyncRead + AsyncWrite` so
//! the expect engine and the tailer can treat remote channels like any
//! other byte stream. Data messages land in an internal buffer, extended
//! data (stderr) is routed according to [`StderrSink`], and the remote exit
//! status is retained for callers that want it after the stream ends.

use std::collections::VecDeque;
use std::fmt;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

use crate::error::{Error, Result};

/// What a channel is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    /// Long-lived interactive shell with a PTY.
    Shell,
    /// Single remote command, no PTY.
    Exec,
    /// SFTP subsystem channel.
    FileTransfer,
}

impl ChannelKind {
    /// Short name used in log fields.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Shell => "shell",
            Self::Exec => "exec",
            Self::FileTransfer => "file-transfer",
        }
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// PTY settings for shell channels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelOptions {
    /// Terminal type requested with the PTY.
    pub term: String,
    /// Terminal width in columns.
    pub cols: u16,
    /// Terminal height in rows.
    pub rows: u16,
    /// Whether to request a PTY at all.
    pub pty: bool,
}

impl Default for ChannelOptions {
    fn default() -> Self {
        Self {
            term: "xterm-256color".to_string(),
            cols: 80,
            rows: 24,
            pty: true,
        }
    }
}

impl ChannelOptions {
    /// Create options with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the terminal type.
    #[must_use]
    pub fn term(mut self, term: impl Into<String>) -> Self {
        self.term = term.into();
        self
    }

    /// Set the terminal dimensions.
    #[must_use]
    pub const fn dimensions(mut self, cols: u16, rows: u16) -> Self {
        self.cols = cols;
        self.rows = rows;
        self
    }

    /// Disable the PTY request.
    #[must_use]
    pub const fn no_pty(mut self) -> Self {
        self.pty = false;
        self
    }
}

/// Channel lifecycle as seen by the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    /// Open and exchanging data.
    Open,
    /// Remote sent EOF; no more data will arrive.
    Eof,
    /// Channel fully closed.
    Closed,
}

/// Where extended data (stderr) goes.
///
/// A PTY shell merges stderr remotely, so shell channels use `Inline`.
/// Exec channels keep the streams apart: by default stderr becomes debug
/// log events, or the caller supplies a handler.
pub enum StderrSink {
    /// Append stderr bytes to the data stream.
    Inline,
    /// Emit stderr as `tracing` debug events.
    Log,
    /// Hand stderr chunks to a callback.
    Handler(Box<dyn FnMut(&[u8]) + Send>),
}

impl fmt::Debug for StderrSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Inline => "Inline",
            Self::Log => "Log",
            Self::Handler(_) => "Handler(..)",
        };
        f.write_str(s)
    }
}

impl StderrSink {
    /// Route one stderr chunk. Only `Inline` touches the data buffer.
    fn consume(&mut self, kind: ChannelKind, chunk: &[u8], data_buffer: &mut VecDeque<u8>) {
        match self {
            Self::Inline => data_buffer.extend(chunk),
            Self::Log => {
                tracing::debug!(
                    kind = %kind,
                    text = %String::from_utf8_lossy(chunk),
                    "remote stderr"
                );
            }
            Self::Handler(handler) => handler(chunk),
        }
    }
}

/// A russh channel adapted to `AsyncRead + AsyncWrite`.
pub struct ChannelStream {
    /// The underlying russh channel.
    channel: russh::Channel<russh::client::Msg>,
    /// What this channel is used for.
    kind: ChannelKind,
    /// Current state.
    state: ChannelState,
    /// Data received but not yet read by the caller.
    read_buffer: VecDeque<u8>,
    /// Stderr routing.
    stderr: StderrSink,
    /// Exit status when the remote reports one.
    exit_status: Option<u32>,
    /// Whether EOF has been received.
    eof_received: bool,
}

impl fmt::Debug for ChannelStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelStream")
            .field("kind", &self.kind)
            .field("state", &self.state)
            .field("read_buffer_len", &self.read_buffer.len())
            .field("stderr", &self.stderr)
            .field("exit_status", &self.exit_status)
            .field("eof_received", &self.eof_received)
            .finish()
    }
}

impl ChannelStream {
    /// Wrap an opened russh channel.
    #[must_use]
    pub fn new(
        channel: russh::Channel<russh::client::Msg>,
        kind: ChannelKind,
        stderr: StderrSink,
    ) -> Self {
        Self {
            channel,
            kind,
            state: ChannelState::Open,
            read_buffer: VecDeque::with_capacity(8192),
            stderr,
            exit_status: None,
            eof_received: false,
        }
    }

    /// What this channel is used for.
    #[must_use]
    pub const fn kind(&self) -> ChannelKind {
        self.kind
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> ChannelState {
        self.state
    }

    /// Check if the channel is still open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.state == ChannelState::Open
    }

    /// Check if EOF has been received.
    #[must_use]
    pub const fn is_eof(&self) -> bool {
        self.eof_received
    }

    /// Exit status of the remote command, if reported.
    #[must_use]
    pub const fn exit_status(&self) -> Option<u32> {
        self.exit_status
    }

    /// Request a PTY on this channel.
    ///
    /// # Errors
    ///
    /// Fails with a channel error if the remote rejects the request.
    pub async fn request_pty(&mut self, options: &ChannelOptions) -> Result<()> {
        self.channel
            .request_pty(
                false, // want_reply
                &options.term,
                options.cols.into(),
                options.rows.into(),
                0,   // pixel width
                0,   // pixel height
                &[], // terminal modes
            )
            .await
            .map_err(|e| Error::channel(format!("PTY request failed: {e}")))
    }

    /// Start the remote shell.
    ///
    /// # Errors
    ///
    /// Fails with a channel error if the remote rejects the request.
    pub async fn request_shell(&mut self) -> Result<()> {
        self.channel
            .request_shell(false)
            .await
            .map_err(|e| Error::channel(format!("shell request failed: {e}")))
    }

    /// Run a command on this channel.
    ///
    /// # Errors
    ///
    /// Fails with a channel error if the remote rejects the request.
    pub async fn exec(&mut self, command: &str) -> Result<()> {
        self.channel
            .exec(true, command)
            .await
            .map_err(|e| Error::channel(format!("exec request failed: {e}")))
    }

    /// Send data over the channel.
    pub async fn send_data(&mut self, data: &[u8]) -> Result<()> {
        self.channel
            .data(data)
            .await
            .map_err(|e| Error::channel(format!("data send failed: {e}")))
    }

    /// Send EOF, telling the remote no more input will come.
    pub async fn send_eof(&mut self) -> Result<()> {
        self.channel
            .eof()
            .await
            .map_err(|e| Error::channel(format!("EOF send failed: {e}")))
    }

    /// Close the channel. Safe to call when already closed.
    pub async fn close(&mut self) -> Result<()> {
        if self.state == ChannelState::Closed {
            return Ok(());
        }
        self.state = ChannelState::Closed;
        self.channel
            .close()
            .await
            .map_err(|e| Error::channel(format!("channel close failed: {e}")))
    }

    /// Fold one channel message into the stream state.
    fn handle_msg(&mut self, msg: russh::ChannelMsg) {
        match msg {
            russh::ChannelMsg::Data { data } => {
                self.read_buffer.extend(data.as_ref());
            }
            russh::ChannelMsg::ExtendedData { data, ext } => {
                // ext 1 is stderr
                if ext == 1 {
                    self.stderr
                        .consume(self.kind, data.as_ref(), &mut self.read_buffer);
                }
            }
            russh::ChannelMsg::ExitStatus { exit_status } => {
                self.exit_status = Some(exit_status);
            }
            russh::ChannelMsg::Eof => {
                self.eof_received = true;
                self.state = ChannelState::Eof;
            }
            russh::ChannelMsg::Close => {
                self.state = ChannelState::Closed;
            }
            _ => {}
        }
    }
}

impl AsyncRead for ChannelStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();

        loop {
            if !this.read_buffer.is_empty() {
                let len = buf.remaining().min(this.read_buffer.len());
                let data: Vec<u8> = this.read_buffer.drain(..len).collect();
                buf.put_slice(&data);
                return Poll::Ready(Ok(()));
            }

            // Zero bytes written signals EOF to the caller.
            if this.eof_received || this.state == ChannelState::Closed {
                return Poll::Ready(Ok(()));
            }

            // Poll a fresh wait() future. The channel's receiver is
            // cancel-safe, so abandoning it between polls loses nothing;
            // a stored waker from a Pending poll still fires.
            let step = {
                let wait = this.channel.wait();
                tokio::pin!(wait);
                match wait.poll(cx) {
                    Poll::Ready(step) => step,
                    Poll::Pending => return Poll::Pending,
                }
            };

            match step {
                Some(msg) => this.handle_msg(msg),
                None => this.state = ChannelState::Closed,
            }
            // Loop: data lands in the buffer, EOF/close flip the flags, and
            // status-only messages simply poll again.
        }
    }
}

impl AsyncWrite for ChannelStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();

        if this.state == ChannelState::Closed {
            return Poll::Ready(Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "channel is closed",
            )));
        }

        let data_future = this.channel.data(buf);
        tokio::pin!(data_future);

        match data_future.poll(cx) {
            Poll::Ready(Ok(())) => Poll::Ready(Ok(buf.len())),
            Poll::Ready(Err(e)) => {
                Poll::Ready(Err(io::Error::other(format!("SSH write error: {e}"))))
            }
            Poll::Pending => Poll::Pending,
        }
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        // SSH channels have no explicit flush.
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();

        let eof_future = this.channel.eof();
        tokio::pin!(eof_future);

        match eof_future.poll(cx) {
            Poll::Ready(Ok(())) => {
                this.state = ChannelState::Eof;
                Poll::Ready(Ok(()))
            }
            Poll::Ready(Err(e)) => {
                Poll::Ready(Err(io::Error::other(format!("SSH shutdown error: {e}"))))
            }
            Poll::Pending => Poll::Pending,
        }
    }
}
