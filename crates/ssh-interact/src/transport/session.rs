//! Transport-level SSH session.
//!
//! [`TransportSession`] owns the authenticated russh connection. Channel
//! opening goes through [`ChannelOpener`], a cheap clone of the connection
//! handle, so transfers and tails can open their own channels while the
//! shell channel stays busy.

use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use russh::client::{self, Handle};
use russh::keys::{PrivateKey, PrivateKeyWithHashAlg, decode_secret_key};

use super::auth::{AuthMethod, Credentials, HostKeyPolicy};
use super::channel::{ChannelKind, ChannelOptions, ChannelStream, StderrSink};
use crate::error::{Error, Result};

/// Default SSH port.
pub const DEFAULT_SSH_PORT: u16 = 22;

/// Default bound on transport establishment (TCP, handshake, auth).
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default russh inactivity timeout.
pub const DEFAULT_INACTIVITY_TIMEOUT: Duration = Duration::from_secs(300);

/// SSH transport configuration.
#[derive(Debug, Clone)]
pub struct SshConfig {
    /// Remote host name or address.
    pub host: String,
    /// Remote port.
    pub port: u16,
    /// Username and authentication methods.
    pub credentials: Credentials,
    /// Bound on the whole connect sequence.
    pub connect_timeout: Duration,
    /// Server key verification policy.
    pub host_key_policy: HostKeyPolicy,
    /// Protocol-level inactivity timeout; `None` disables it.
    pub inactivity_timeout: Option<Duration>,
}

impl SshConfig {
    /// Create a configuration for `host` with default settings.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_SSH_PORT,
            credentials: Credentials::default(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            host_key_policy: HostKeyPolicy::default(),
            inactivity_timeout: Some(DEFAULT_INACTIVITY_TIMEOUT),
        }
    }

    /// Set the port.
    #[must_use]
    pub const fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the credentials.
    #[must_use]
    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    /// Set the connect timeout.
    #[must_use]
    pub const fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the host key policy.
    #[must_use]
    pub fn host_key_policy(mut self, policy: HostKeyPolicy) -> Self {
        self.host_key_policy = policy;
        self
    }

    /// Set the protocol inactivity timeout.
    #[must_use]
    pub const fn inactivity_timeout(mut self, timeout: Duration) -> Self {
        self.inactivity_timeout = Some(timeout);
        self
    }

    /// Disable the protocol inactivity timeout.
    #[must_use]
    pub const fn no_inactivity_timeout(mut self) -> Self {
        self.inactivity_timeout = None;
        self
    }
}

/// Connection state of the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    /// No connection.
    Disconnected,
    /// TCP and protocol handshake in progress.
    Connecting,
    /// Handshake done, authenticating.
    Authenticating,
    /// Authenticated and usable.
    Connected,
}

/// russh client event handler: server key checks delegate to the policy.
#[derive(Debug, Clone)]
pub(crate) struct ClientHandler {
    host: String,
    port: u16,
    policy: HostKeyPolicy,
}

impl client::Handler for ClientHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &russh::keys::PublicKey,
    ) -> std::result::Result<bool, Self::Error> {
        Ok(self.policy.verify(&self.host, self.port, server_public_key))
    }
}

/// Load and decode a private key file.
async fn load_private_key(
    path: &Path,
    passphrase: Option<&str>,
) -> std::result::Result<PrivateKey, String> {
    let data = tokio::fs::read(path)
        .await
        .map_err(|e| format!("cannot read key file '{}': {e}", path.display()))?;
    let text = String::from_utf8(data)
        .map_err(|_| format!("key file '{}' is not valid UTF-8", path.display()))?;
    decode_secret_key(&text, passphrase).map_err(|e| {
        if passphrase.is_none() {
            format!(
                "cannot decode key '{}': {e} (encrypted keys need a passphrase)",
                path.display()
            )
        } else {
            format!("cannot decode key '{}': {e}", path.display())
        }
    })
}

/// Try each configured authentication method in order.
async fn authenticate(handle: &mut Handle<ClientHandler>, config: &SshConfig) -> Result<()> {
    let credentials = &config.credentials;
    if credentials.auth_methods.is_empty() {
        return Err(Error::transport(
            &config.host,
            config.port,
            "no authentication methods configured",
        ));
    }

    for method in &credentials.auth_methods {
        match method {
            AuthMethod::Password(password) => {
                tracing::debug!(
                    username = %credentials.username,
                    "attempting password authentication"
                );
                match handle
                    .authenticate_password(&credentials.username, password)
                    .await
                {
                    Ok(result) if result.success() => {
                        tracing::debug!("password authentication succeeded");
                        return Ok(());
                    }
                    Ok(_) => tracing::debug!("password authentication rejected"),
                    Err(e) => tracing::debug!(error = %e, "password authentication errored"),
                }
            }
            AuthMethod::PublicKey {
                private_key,
                passphrase,
            } => {
                tracing::debug!(
                    username = %credentials.username,
                    key = %private_key.display(),
                    "attempting public key authentication"
                );
                let key = match load_private_key(private_key, passphrase.as_deref()).await {
                    Ok(key) => Arc::new(key),
                    Err(reason) => {
                        tracing::debug!(%reason, "skipping private key");
                        continue;
                    }
                };
                let best_hash = handle.best_supported_rsa_hash().await.ok().flatten().flatten();
                match handle
                    .authenticate_publickey(
                        &credentials.username,
                        PrivateKeyWithHashAlg::new(key, best_hash),
                    )
                    .await
                {
                    Ok(result) if result.success() => {
                        tracing::debug!("public key authentication succeeded");
                        return Ok(());
                    }
                    Ok(_) => tracing::debug!("public key authentication rejected"),
                    Err(e) => tracing::debug!(error = %e, "public key authentication errored"),
                }
            }
        }
    }

    Err(Error::transport(
        &config.host,
        config.port,
        format!(
            "all authentication methods failed for user '{}'",
            credentials.username
        ),
    ))
}

/// An authenticated SSH transport connection.
pub struct TransportSession {
    config: SshConfig,
    state: TransportState,
    handle: Option<Arc<Handle<ClientHandler>>>,
}

impl fmt::Debug for TransportSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportSession")
            .field("config", &self.config)
            .field("state", &self.state)
            .field("connected", &self.handle.is_some())
            .finish()
    }
}

impl TransportSession {
    /// Create a disconnected transport.
    #[must_use]
    pub fn new(config: SshConfig) -> Self {
        Self {
            config,
            state: TransportState::Disconnected,
            handle: None,
        }
    }

    /// Current transport state.
    #[must_use]
    pub const fn state(&self) -> TransportState {
        self.state
    }

    /// The configuration this transport was built with.
    #[must_use]
    pub const fn config(&self) -> &SshConfig {
        &self.config
    }

    /// Check if the transport is connected and authenticated.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state == TransportState::Connected && self.handle.is_some()
    }

    /// Establish the connection and authenticate.
    ///
    /// On failure the transport is left `Disconnected`; there is no partial
    /// state to clean up and no automatic retry.
    pub async fn connect(&mut self) -> Result<()> {
        if self.handle.is_some() {
            return Err(Error::transport(
                &self.config.host,
                self.config.port,
                "session is already connected",
            ));
        }

        self.state = TransportState::Connecting;
        tracing::info!(host = %self.config.host, port = self.config.port, "connecting");

        match self.establish().await {
            Ok(handle) => {
                self.handle = Some(Arc::new(handle));
                self.state = TransportState::Connected;
                tracing::info!(host = %self.config.host, port = self.config.port, "connected");
                Ok(())
            }
            Err(e) => {
                self.state = TransportState::Disconnected;
                Err(e)
            }
        }
    }

    async fn establish(&mut self) -> Result<Handle<ClientHandler>> {
        let russh_config = Arc::new(client::Config {
            inactivity_timeout: self.config.inactivity_timeout,
            ..client::Config::default()
        });
        let handler = ClientHandler {
            host: self.config.host.clone(),
            port: self.config.port,
            policy: self.config.host_key_policy.clone(),
        };

        let connecting = client::connect(
            russh_config,
            (self.config.host.as_str(), self.config.port),
            handler,
        );
        let mut handle = tokio::time::timeout(self.config.connect_timeout, connecting)
            .await
            .map_err(|_| {
                Error::transport(
                    &self.config.host,
                    self.config.port,
                    format!(
                        "connection timed out after {:?}",
                        self.config.connect_timeout
                    ),
                )
            })?
            .map_err(|e| {
                Error::transport(
                    &self.config.host,
                    self.config.port,
                    format!("connection failed: {e}"),
                )
            })?;

        self.state = TransportState::Authenticating;
        authenticate(&mut handle, &self.config).await?;
        Ok(handle)
    }

    /// Get a channel opener for the live connection.
    ///
    /// # Errors
    ///
    /// Fails with a channel error if the transport is not connected.
    pub fn opener(&self) -> Result<ChannelOpener> {
        self.handle.as_ref().map_or_else(
            || Err(Error::channel("session is not connected")),
            |handle| {
                Ok(ChannelOpener {
                    handle: Arc::clone(handle),
                })
            },
        )
    }

    /// Disconnect from the remote. Safe to call when already disconnected.
    pub async fn disconnect(&mut self) -> Result<()> {
        if let Some(handle) = self.handle.take() {
            tracing::info!(host = %self.config.host, port = self.config.port, "disconnecting");
            handle
                .disconnect(russh::Disconnect::ByApplication, "", "en")
                .await
                .map_err(|e| {
                    Error::transport(
                        &self.config.host,
                        self.config.port,
                        format!("disconnect failed: {e}"),
                    )
                })?;
        }
        self.state = TransportState::Disconnected;
        Ok(())
    }
}

/// Opens channels on a connection. Cloneable and independent of the
/// [`TransportSession`] borrow, so concurrent operations each hold their
/// own opener.
#[derive(Clone)]
pub struct ChannelOpener {
    handle: Arc<Handle<ClientHandler>>,
}

impl fmt::Debug for ChannelOpener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelOpener").finish_non_exhaustive()
    }
}

impl ChannelOpener {
    async fn open_session_channel(
        &self,
        kind: ChannelKind,
    ) -> Result<russh::Channel<client::Msg>> {
        tracing::debug!(kind = %kind, "opening channel");
        self.handle
            .channel_open_session()
            .await
            .map_err(|e| Error::channel(format!("cannot open {kind} channel: {e}")))
    }

    /// Open the interactive shell channel (PTY by default).
    pub async fn open_shell(&self, options: &ChannelOptions) -> Result<ChannelStream> {
        let channel = self.open_session_channel(ChannelKind::Shell).await?;
        let mut stream = ChannelStream::new(channel, ChannelKind::Shell, StderrSink::Inline);
        if options.pty {
            stream.request_pty(options).await?;
        }
        stream.request_shell().await?;
        Ok(stream)
    }

    /// Open an exec channel running `command`, stderr routed to `stderr`.
    pub async fn open_exec(&self, command: &str, stderr: StderrSink) -> Result<ChannelStream> {
        let channel = self.open_session_channel(ChannelKind::Exec).await?;
        let mut stream = ChannelStream::new(channel, ChannelKind::Exec, stderr);
        stream.exec(command).await?;
        Ok(stream)
    }

    /// Open a raw channel with the SFTP subsystem started.
    pub async fn open_sftp(&self) -> Result<russh::Channel<client::Msg>> {
        let channel = self.open_session_channel(ChannelKind::FileTransfer).await?;
        channel
            .request_subsystem(true, "sftp")
            .await
            .map_err(|e| Error::channel(format!("SFTP subsystem request failed: {e}")))?;
        Ok(channel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults() {
        let config = SshConfig::new("example.test");
        assert_eq!(config.host, "example.test");
        assert_eq!(config.port, 22);
        assert_eq!(config.connect_timeout, Duration::from_secs(30));
        assert_eq!(config.inactivity_timeout, Some(Duration::from_secs(300)));
        assert_eq!(config.host_key_policy, HostKeyPolicy::RejectUnknown);
    }

    #[test]
    fn config_builder() {
        let config = SshConfig::new("example.test")
            .port(2222)
            .credentials(Credentials::new("deploy").with_password("pw"))
            .connect_timeout(Duration::from_secs(5))
            .host_key_policy(HostKeyPolicy::AcceptAll)
            .no_inactivity_timeout();

        assert_eq!(config.port, 2222);
        assert_eq!(config.credentials.username, "deploy");
        assert_eq!(config.connect_timeout, Duration::from_secs(5));
        assert_eq!(config.host_key_policy, HostKeyPolicy::AcceptAll);
        assert!(config.inactivity_timeout.is_none());
    }

    #[test]
    fn new_transport_is_disconnected() {
        let transport = TransportSession::new(SshConfig::new("example.test"));
        assert_eq!(transport.state(), TransportState::Disconnected);
        assert!(!transport.is_connected());
    }

    #[test]
    fn opener_requires_connection() {
        let transport = TransportSession::new(SshConfig::new("example.test"));
        let err = transport.opener().unwrap_err();
        assert!(matches!(err, Error::Channel { .. }));
        assert!(err.to_string().contains("not connected"));
    }

    #[tokio::test]
    async fn disconnect_when_never_connected_is_ok() {
        let mut transport = TransportSession::new(SshConfig::new("example.test"));
        transport.disconnect().await.unwrap();
        assert_eq!(transport.state(), TransportState::Disconnected);
    }
}
