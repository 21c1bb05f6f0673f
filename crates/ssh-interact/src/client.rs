//! High-level session facade.
//!
//! [`SshInteraction`] binds everything to one authenticated connection: a
//! long-lived shell channel driven by the send/expect engine, SFTP
//! transfers on their own channels, and tails on their own channels. The
//! shell sits behind one lock and the transport behind another, so a
//! transfer or tail runs concurrently with an ongoing dialogue; only the
//! brief channel-open step touches the transport lock.
//!
//! The session moves through three states. It starts disconnected,
//! [`connect`] makes it connected, and [`close`] retires it for good; a
//! closed session cannot be reconnected.
//!
//! [`connect`]: SshInteraction::connect
//! [`close`]: SshInteraction::close

use std::path::Path;
use std::sync::PoisonError;

use tokio::sync::Mutex;

use crate::config::{ClientConfig, InteractConfig};
use crate::error::{Error, Result};
use crate::expect::Interaction;
use crate::tail::{CancelToken, Tailer};
use crate::transfer;
use crate::transport::{ChannelOptions, ChannelStream, TransportSession};
use crate::types::{ExpectOutcome, SessionState, TailEnd, TransferDirection};

/// One SSH session: shell dialogue, file transfer, and stream tailing.
///
/// # Example
///
/// ```no_run
/// use ssh_interact::{ClientConfig, Credentials, SshConfig, SshInteraction};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), ssh_interact::Error> {
/// let ssh = SshConfig::new("web-01.internal")
///     .credentials(Credentials::new("deploy").with_password("hunter2"));
/// let mut client = SshInteraction::new(ClientConfig::new(ssh));
///
/// client.connect().await?;
/// client.send("uptime").await?;
/// let outcome = client.expect(r"\$ ").await?;
/// println!("{}", outcome.text());
/// client.close().await;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct SshInteraction {
    interact: InteractConfig,
    transport: Mutex<TransportSession>,
    shell: Mutex<Option<Interaction<ChannelStream>>>,
    state: std::sync::Mutex<SessionState>,
}

impl SshInteraction {
    /// Create a disconnected session from a configuration.
    #[must_use]
    pub fn new(config: ClientConfig) -> Self {
        Self {
            interact: config.interact,
            transport: Mutex::new(TransportSession::new(config.ssh)),
            shell: Mutex::new(None),
            state: std::sync::Mutex::new(SessionState::Disconnected),
        }
    }

    /// Current session state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        *self
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Check if the session is connected and usable.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state().is_connected()
    }

    fn set_state(&self, state: SessionState) {
        *self
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = state;
    }

    fn ensure_connected(&self) -> Result<()> {
        match self.state() {
            SessionState::Connected => Ok(()),
            SessionState::Closed => Err(Error::Closed),
            SessionState::Disconnected => Err(Error::NotConnected),
        }
    }

    /// Connect, authenticate, and open the shell channel with default
    /// terminal settings.
    ///
    /// # Errors
    ///
    /// Returns a transport error if connection, authentication, or shell
    /// setup fails, and [`Error::Closed`] on a session that was already
    /// closed. On failure the session stays disconnected.
    pub async fn connect(&mut self) -> Result<()> {
        self.connect_with_options(&ChannelOptions::default()).await
    }

    /// Connect like [`connect`](SshInteraction::connect), with explicit
    /// terminal settings for the shell channel.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`connect`](SshInteraction::connect).
    pub async fn connect_with_options(&mut self, options: &ChannelOptions) -> Result<()> {
        let mut transport = self.transport.lock().await;
        let host = transport.config().host.clone();
        let port = transport.config().port;

        match self.state() {
            SessionState::Disconnected => {}
            SessionState::Connected => {
                return Err(Error::transport(host, port, "session is already connected"));
            }
            SessionState::Closed => return Err(Error::Closed),
        }

        transport.connect().await?;

        let opener = transport.opener()?;
        match opener.open_shell(options).await {
            Ok(stream) => {
                *self.shell.lock().await = Some(Interaction::new(stream, self.interact.clone()));
                self.set_state(SessionState::Connected);
                Ok(())
            }
            Err(e) => {
                // A session without its shell is useless; take the
                // transport back down rather than leave it half-open.
                if let Err(d) = transport.disconnect().await {
                    tracing::debug!(error = %d, "disconnect after failed shell open");
                }
                Err(Error::transport(
                    host,
                    port,
                    format!("cannot open shell channel: {e}"),
                ))
            }
        }
    }

    /// Send a command line over the shell channel.
    ///
    /// # Errors
    ///
    /// Fails if the session is not connected or the write fails.
    pub async fn send(&self, command: &str) -> Result<()> {
        self.ensure_connected()?;
        let mut shell = self.shell.lock().await;
        shell.as_mut().ok_or(Error::NotConnected)?.send(command).await
    }

    /// Send raw bytes over the shell channel, no terminator added.
    ///
    /// # Errors
    ///
    /// Fails if the session is not connected or the write fails.
    pub async fn send_raw(&self, data: &[u8]) -> Result<()> {
        self.ensure_connected()?;
        let mut shell = self.shell.lock().await;
        shell.as_mut().ok_or(Error::NotConnected)?.send_raw(data).await
    }

    /// Wait for `pattern` in the shell output, using the configured expect
    /// timeout.
    ///
    /// # Errors
    ///
    /// Fails if the session is not connected, plus the engine's failure
    /// modes ([`Error::Timeout`], [`Error::Pattern`], I/O errors).
    pub async fn expect(&self, pattern: &str) -> Result<ExpectOutcome> {
        self.ensure_connected()?;
        let mut shell = self.shell.lock().await;
        shell.as_mut().ok_or(Error::NotConnected)?.expect(pattern).await
    }

    /// Wait for `pattern` with an explicit timeout.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`expect`](SshInteraction::expect).
    pub async fn expect_timeout(
        &self,
        pattern: &str,
        timeout: std::time::Duration,
    ) -> Result<ExpectOutcome> {
        self.ensure_connected()?;
        let mut shell = self.shell.lock().await;
        shell
            .as_mut()
            .ok_or(Error::NotConnected)?
            .expect_timeout(pattern, timeout)
            .await
    }

    /// Copy a local file to the remote host.
    ///
    /// # Errors
    ///
    /// Fails if the session is not connected, or with a transfer error
    /// naming both paths.
    pub async fn upload(&self, local: impl AsRef<Path>, remote: &str) -> Result<()> {
        self.transfer(local.as_ref(), remote, TransferDirection::Upload)
            .await
    }

    /// Copy a remote file to the local filesystem.
    ///
    /// # Errors
    ///
    /// Fails if the session is not connected, or with a transfer error
    /// naming both paths.
    pub async fn download(&self, remote: &str, local: impl AsRef<Path>) -> Result<()> {
        self.transfer(local.as_ref(), remote, TransferDirection::Download)
            .await
    }

    /// Run one file transfer in the given direction on a dedicated channel.
    ///
    /// # Errors
    ///
    /// Fails if the session is not connected, or with a transfer error
    /// naming both paths.
    pub async fn transfer(
        &self,
        local: &Path,
        remote: &str,
        direction: TransferDirection,
    ) -> Result<()> {
        let opener = {
            self.ensure_connected()?;
            self.transport.lock().await.opener()?
        };
        transfer::run(&opener, local, remote, direction).await
    }

    /// Get a [`Tailer`] bound to this session, suitable for moving into a
    /// spawned task.
    ///
    /// # Errors
    ///
    /// Fails if the session is not connected.
    pub async fn tailer(&self) -> Result<Tailer> {
        self.ensure_connected()?;
        let opener = self.transport.lock().await.opener()?;
        Ok(Tailer::new(opener, self.interact.poll_interval))
    }

    /// Tail a streaming command in place, feeding each line to `on_line`
    /// until the stream closes or `token` is cancelled.
    ///
    /// # Errors
    ///
    /// Fails if the session is not connected, the exec channel cannot be
    /// opened, or reading the stream fails.
    pub async fn tail<F>(&self, command: &str, token: CancelToken, on_line: F) -> Result<TailEnd>
    where
        F: FnMut(&str),
    {
        self.tailer().await?.run(command, token, on_line).await
    }

    /// Close the shell channel and disconnect.
    ///
    /// Never fails and is safe to call repeatedly; teardown errors are
    /// logged and swallowed. After this the session is closed for good.
    pub async fn close(&self) {
        if self.state().is_closed() {
            return;
        }
        // Flip the state first so new operations start failing while
        // teardown proceeds.
        self.set_state(SessionState::Closed);

        if let Some(engine) = self.shell.lock().await.take() {
            let mut stream = engine.into_inner();
            if let Err(e) = stream.close().await {
                tracing::debug!(error = %e, "shell channel close failed");
            }
        }

        let mut transport = self.transport.lock().await;
        if let Err(e) = transport.disconnect().await {
            tracing::debug!(error = %e, "transport disconnect failed");
        }
        tracing::info!("session closed");
    }
}
