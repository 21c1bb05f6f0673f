//! Integration tests for line relay over an in-memory pipe.

use std::time::Duration;

use ssh_interact::{CancelToken, relay_lines};
use tokio::io::AsyncWriteExt;

const POLL: Duration = Duration::from_millis(20);

/// Lines written with mixed endings and pauses arrive whole and in order,
/// and dropping the writer ends the relay.
#[tokio::test]
async fn follows_lines_until_close() {
    let (mut local, mut remote) = tokio::io::duplex(1024);

    let feeder = tokio::spawn(async move {
        remote.write_all(b"line one\n").await.unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        remote.write_all(b"line two\r\n").await.unwrap();
        // Dropping the writer closes the stream.
    });

    let mut lines = Vec::new();
    let end = relay_lines(&mut local, POLL, &CancelToken::new(), |line| {
        lines.push(line.to_string());
    })
    .await
    .unwrap();

    assert_eq!(lines, ["line one", "line two"]);
    assert!(!end.was_cancelled());
    feeder.await.unwrap();
}

/// Cancellation interrupts an endless stream within a poll interval or two.
#[tokio::test]
async fn cancellation_stops_an_endless_stream() {
    let (mut local, mut remote) = tokio::io::duplex(1024);

    let feeder = tokio::spawn(async move {
        loop {
            if remote.write_all(b"tick\n").await.is_err() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(15)).await;
        }
    });

    let token = CancelToken::new();
    let canceller = token.clone();
    let stopper = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(80)).await;
        canceller.cancel();
    });

    let mut count = 0u32;
    let end = relay_lines(&mut local, POLL, &token, |_| count += 1)
        .await
        .unwrap();

    assert!(end.was_cancelled());
    assert!(count > 0, "expected some lines before cancellation");

    stopper.await.unwrap();
    drop(local);
    feeder.await.unwrap();
}

/// A final line with no terminator is flushed when the stream closes.
#[tokio::test]
async fn partial_final_line_is_flushed() {
    let (mut local, mut remote) = tokio::io::duplex(1024);

    remote.write_all(b"complete\nno terminator").await.unwrap();
    drop(remote);

    let mut lines = Vec::new();
    let end = relay_lines(&mut local, POLL, &CancelToken::new(), |line| {
        lines.push(line.to_string());
    })
    .await
    .unwrap();

    assert_eq!(lines, ["complete", "no terminator"]);
    assert!(!end.was_cancelled());
}
