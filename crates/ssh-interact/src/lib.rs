//! ssh-interact: scriptable SSH automation over a single session
//!
//! This crate drives interactive programs on a remote host the way a person
//! at a terminal would: send a command, wait for output matching a pattern,
//! repeat. One authenticated connection carries everything. The send/expect
//! dialogue runs on a long-lived shell channel, while SFTP file transfers
//! and cancellable line-by-line tails of streaming commands each open their
//! own short-lived channels, so they never disturb the dialogue.
//!
//! # Features
//!
//! - **Send/expect engine** with regex matching over accumulated output,
//!   bounded by a configurable timeout and poll interval
//! - **A closed stream is an outcome, not an error**: expect returns
//!   whatever arrived before the close
//! - **SFTP transfer** of whole files in either direction
//! - **Cancellable tailing** of streaming commands such as `tail -f`
//! - **Configuration** from code, TOML files, or environment overrides
//! - **Mock stream** for testing without a server (feature: `mock`)
//!
//! # Example
//!
//! ```no_run
//! use ssh_interact::{ClientConfig, Credentials, SshConfig, SshInteraction};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), ssh_interact::Error> {
//!     let ssh = SshConfig::new("db-01.internal")
//!         .credentials(Credentials::new("admin").with_password("secret"));
//!     let mut client = SshInteraction::new(ClientConfig::new(ssh));
//!
//!     client.connect().await?;
//!     client.expect(r"\$ ").await?;
//!     client.send("systemctl status postgresql").await?;
//!     let outcome = client.expect(r"Active: \w+").await?;
//!     println!("{}", outcome.text());
//!
//!     client.upload("local/schema.sql", "/tmp/schema.sql").await?;
//!     client.close().await;
//!     Ok(())
//! }
//! ```

// Configuration and shared vocabulary
pub mod config;
pub mod error;
pub mod types;

// Engine modules
pub mod expect;
pub mod tail;
pub mod transport;

// Facade and internals
mod client;
mod transfer;
mod util;

/// In-memory stream double for tests.
#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use client::SshInteraction;
pub use config::{ClientConfig, InteractConfig};
pub use error::{Error, Result};
pub use expect::Interaction;
pub use tail::{CancelToken, Tailer, relay_lines};
pub use transport::{
    AuthMethod, ChannelKind, ChannelOpener, ChannelOptions, ChannelStream, Credentials,
    HostKeyPolicy, SshConfig, StderrSink, TransportSession, TransportState,
};
pub use types::{ExpectOutcome, SessionState, TailEnd, TransferDirection};

#[cfg(feature = "mock")]
pub use mock::MockStream;
