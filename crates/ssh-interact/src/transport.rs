//! SSH transport: credentials, session establishment, channel streams.
//!
//! Everything here sits below the client facade. [`session::TransportSession`]
//! owns the authenticated connection; [`channel::ChannelStream`] adapts raw
//! SSH channels into async byte streams the engine, transfer, and tail
//! layers consume.

pub mod auth;
pub mod channel;
pub mod session;

pub use auth::{AuthMethod, Credentials, HostKeyPolicy};
pub use channel::{ChannelKind, ChannelOptions, ChannelStream, StderrSink};
pub use session::{ChannelOpener, SshConfig, TransportSession, TransportState};
