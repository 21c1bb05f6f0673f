//! In-memory stream double for exercising the interaction engine without a
//! network.
//!
//! [`MockStream`] implements `AsyncRead` + `AsyncWrite` over shared buffers.
//! Clones share state, so a test can hold one clone to script remote output
//! while the engine owns another.
//!
//! Available in unit tests and behind the `mock` feature for downstream
//! integration tests.

use std::collections::VecDeque;
use std::io;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};
use std::task::{Context, Poll, Waker};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

#[derive(Debug)]
struct Shared {
    /// Bytes the engine will read, as if sent by the remote.
    output: VecDeque<u8>,
    /// Bytes the engine wrote, as if sent to the remote.
    input: VecDeque<u8>,
    eof: bool,
    /// Error to surface on the next read.
    error: Option<String>,
    /// Reader parked waiting for output.
    read_waker: Option<Waker>,
}

impl Shared {
    const fn new() -> Self {
        Self {
            output: VecDeque::new(),
            input: VecDeque::new(),
            eof: false,
            error: None,
            read_waker: None,
        }
    }

    fn wake_reader(&mut self) {
        if let Some(waker) = self.read_waker.take() {
            waker.wake();
        }
    }
}

/// A scriptable remote endpoint.
#[derive(Debug, Clone)]
pub struct MockStream {
    shared: Arc<Mutex<Shared>>,
}

impl MockStream {
    /// Create an empty mock stream.
    #[must_use]
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Mutex::new(Shared::new())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Shared> {
        self.shared
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Queue bytes for the engine to read.
    pub fn queue_output(&self, data: &[u8]) {
        let mut shared = self.lock();
        shared.output.extend(data);
        shared.wake_reader();
    }

    /// Queue a string for the engine to read.
    pub fn queue_output_str(&self, s: &str) {
        self.queue_output(s.as_bytes());
    }

    /// Drain everything the engine has written so far.
    #[must_use]
    pub fn take_input(&self) -> Vec<u8> {
        self.lock().input.drain(..).collect()
    }

    /// Drain written bytes as a lossy string.
    #[must_use]
    pub fn take_input_str(&self) -> String {
        String::from_utf8_lossy(&self.take_input()).into_owned()
    }

    /// Mark the remote side closed. Queued output is still readable; after
    /// that, reads return EOF.
    pub fn signal_eof(&self) {
        let mut shared = self.lock();
        shared.eof = true;
        shared.wake_reader();
    }

    /// Make the next read fail with an I/O error carrying `msg`.
    pub fn set_error(&self, msg: impl Into<String>) {
        let mut shared = self.lock();
        shared.error = Some(msg.into());
        shared.wake_reader();
    }

    /// Check whether EOF has been signalled.
    #[must_use]
    pub fn is_eof(&self) -> bool {
        self.lock().eof
    }
}

impl Default for MockStream {
    fn default() -> Self {
        Self::new()
    }
}

impl AsyncRead for MockStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let mut shared = self.lock();

        if let Some(msg) = shared.error.take() {
            return Poll::Ready(Err(io::Error::other(msg)));
        }

        if !shared.output.is_empty() {
            let n = buf.remaining().min(shared.output.len());
            let bytes: Vec<u8> = shared.output.drain(..n).collect();
            buf.put_slice(&bytes);
            return Poll::Ready(Ok(()));
        }

        if shared.eof {
            // Empty fill signals EOF.
            return Poll::Ready(Ok(()));
        }

        shared.read_waker = Some(cx.waker().clone());
        Poll::Pending
    }
}

impl AsyncWrite for MockStream {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        self.lock().input.extend(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}
