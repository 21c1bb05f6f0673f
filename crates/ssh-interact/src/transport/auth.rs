//! SSH credentials and host key policy.

use std::path::PathBuf;

use russh::keys::PublicKey;

/// SSH authentication method.
#[derive(Debug, Clone)]
pub enum AuthMethod {
    /// Password authentication.
    Password(String),
    /// Public key authentication.
    PublicKey {
        /// Private key path.
        private_key: PathBuf,
        /// Passphrase for the key (if encrypted).
        passphrase: Option<String>,
    },
}

impl AuthMethod {
    /// Create password auth.
    #[must_use]
    pub fn password(password: impl Into<String>) -> Self {
        Self::Password(password.into())
    }

    /// Create public key auth from a private key file.
    #[must_use]
    pub fn key_file(private_key: impl Into<PathBuf>) -> Self {
        Self::PublicKey {
            private_key: private_key.into(),
            passphrase: None,
        }
    }

    /// Create public key auth from an encrypted private key file.
    #[must_use]
    pub fn key_file_with_passphrase(
        private_key: impl Into<PathBuf>,
        passphrase: impl Into<String>,
    ) -> Self {
        Self::PublicKey {
            private_key: private_key.into(),
            passphrase: Some(passphrase.into()),
        }
    }

    /// Check if this is password auth.
    #[must_use]
    pub const fn is_password(&self) -> bool {
        matches!(self, Self::Password(_))
    }

    /// Check if this is public key auth.
    #[must_use]
    pub const fn is_public_key(&self) -> bool {
        matches!(self, Self::PublicKey { .. })
    }
}

/// SSH credentials: a username plus authentication methods tried in order.
#[derive(Debug, Clone)]
pub struct Credentials {
    /// Username.
    pub username: String,
    /// Authentication methods to try (in order).
    pub auth_methods: Vec<AuthMethod>,
}

impl Credentials {
    /// Create credentials with no authentication methods yet.
    #[must_use]
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            auth_methods: Vec::new(),
        }
    }

    /// Add an authentication method.
    #[must_use]
    pub fn with_method(mut self, method: AuthMethod) -> Self {
        self.auth_methods.push(method);
        self
    }

    /// Add password authentication.
    #[must_use]
    pub fn with_password(self, password: impl Into<String>) -> Self {
        self.with_method(AuthMethod::password(password))
    }

    /// Add public key authentication.
    #[must_use]
    pub fn with_key_file(self, private_key: impl Into<PathBuf>) -> Self {
        self.with_method(AuthMethod::key_file(private_key))
    }

    /// Add public key authentication with a passphrase.
    #[must_use]
    pub fn with_key_file_passphrase(
        self,
        private_key: impl Into<PathBuf>,
        passphrase: impl Into<String>,
    ) -> Self {
        self.with_method(AuthMethod::key_file_with_passphrase(private_key, passphrase))
    }

    /// Add the conventional default key files (`~/.ssh/id_ed25519`, then
    /// `~/.ssh/id_rsa`).
    #[must_use]
    pub fn with_default_keys(self) -> Self {
        let home = std::env::var("HOME").unwrap_or_default();
        self.with_key_file(format!("{home}/.ssh/id_ed25519"))
            .with_key_file(format!("{home}/.ssh/id_rsa"))
    }
}

impl Default for Credentials {
    fn default() -> Self {
        let username = std::env::var("USER")
            .or_else(|_| std::env::var("USERNAME"))
            .unwrap_or_else(|_| "root".to_string());
        Self::new(username)
    }
}

/// Host key verification policy.
///
/// # Security
///
/// `AcceptAll` disables verification entirely and allows man-in-the-middle
/// attacks; it exists for lab and test environments where the network is
/// trusted, and every use is logged at warn level. The default policy
/// rejects servers that cannot be verified, so connecting to a new host
/// requires an explicit decision.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum HostKeyPolicy {
    /// Accept any server key without verification.
    AcceptAll,
    /// Check the server key against an OpenSSH `known_hosts` file.
    /// `path: None` uses `~/.ssh/known_hosts`.
    KnownHosts {
        /// Path to the `known_hosts` file, or `None` for the default.
        path: Option<PathBuf>,
    },
    /// Reject every server key.
    RejectUnknown,
}

impl Default for HostKeyPolicy {
    fn default() -> Self {
        Self::RejectUnknown
    }
}

impl HostKeyPolicy {
    /// The known-hosts policy with the default file location.
    #[must_use]
    pub const fn known_hosts() -> Self {
        Self::KnownHosts { path: None }
    }

    /// Decide whether to accept the server's key.
    pub(crate) fn verify(&self, host: &str, port: u16, key: &PublicKey) -> bool {
        match self {
            Self::AcceptAll => {
                tracing::warn!(host, port, "accepting server host key without verification");
                true
            }
            Self::RejectUnknown => {
                tracing::warn!(
                    host,
                    port,
                    "rejecting server host key: no verification source configured"
                );
                false
            }
            Self::KnownHosts { path } => {
                let result = match path {
                    Some(path) => russh::keys::check_known_hosts_path(host, port, key, path),
                    None => russh::keys::check_known_hosts(host, port, key),
                };
                match result {
                    Ok(true) => {
                        tracing::debug!(host, port, "server host key matches known_hosts");
                        true
                    }
                    Ok(false) => {
                        tracing::warn!(host, port, "host not present in known_hosts");
                        false
                    }
                    // A changed key for a known host surfaces as an error.
                    Err(e) => {
                        tracing::warn!(host, port, error = %e, "known_hosts check failed");
                        false
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_method_predicates() {
        let auth = AuthMethod::password("secret");
        assert!(auth.is_password());
        assert!(!auth.is_public_key());

        let key = AuthMethod::key_file("/home/u/.ssh/id_ed25519");
        assert!(key.is_public_key());
    }

    #[test]
    fn credentials_builder_keeps_order() {
        let creds = Credentials::new("user")
            .with_key_file("/k")
            .with_password("pass");

        assert_eq!(creds.username, "user");
        assert_eq!(creds.auth_methods.len(), 2);
        assert!(creds.auth_methods[0].is_public_key());
        assert!(creds.auth_methods[1].is_password());
    }

    #[test]
    fn default_policy_rejects() {
        assert_eq!(HostKeyPolicy::default(), HostKeyPolicy::RejectUnknown);
    }

    #[test]
    fn reject_policy_never_accepts() {
        // Key material is irrelevant for the reject path, but verify() needs
        // one; parse a fixed ed25519 public key.
        let key = russh::keys::parse_public_key_base64(
            "AAAAC3NzaC1lZDI1NTE5AAAAIOMqqnkVzrm0SdG6UOoqKLsabgH5C9okWi0dh2l9GKJl",
        )
        .expect("valid test key");
        assert!(!HostKeyPolicy::RejectUnknown.verify("example.test", 22, &key));
        assert!(HostKeyPolicy::AcceptAll.verify("example.test", 22, &key));
    }
}
