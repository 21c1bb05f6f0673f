//! Property tests for line relay chunking.
//!
//! However the byte stream is sliced into reads, the relay must deliver
//! the same lines in the same order.

use std::time::Duration;

use proptest::prelude::*;
use ssh_interact::{CancelToken, relay_lines};
use tokio::io::AsyncWriteExt;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn line_splitting_is_chunking_invariant(
        lines in proptest::collection::vec("[a-zA-Z0-9 .:/-]{0,24}", 0..8),
        chunk_size in 1usize..16,
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let text: String = lines.iter().map(|l| format!("{l}\n")).collect();
            let chunks: Vec<Vec<u8>> =
                text.as_bytes().chunks(chunk_size).map(<[u8]>::to_vec).collect();

            let (mut local, mut remote) = tokio::io::duplex(4096);
            let feeder = tokio::spawn(async move {
                for chunk in chunks {
                    remote.write_all(&chunk).await.unwrap();
                    tokio::task::yield_now().await;
                }
                // Dropping the writer closes the stream.
            });

            let mut got = Vec::new();
            let end = relay_lines(
                &mut local,
                Duration::from_millis(50),
                &CancelToken::new(),
                |line| got.push(line.to_string()),
            )
            .await
            .unwrap();

            assert!(!end.was_cancelled());
            assert_eq!(got, lines);
            feeder.await.unwrap();
        });
    }

    #[test]
    fn trailing_carriage_returns_never_leak(
        body in "[a-z]{0,12}",
        chunk_size in 1usize..8,
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let text = format!("{body}\r\n");
            let chunks: Vec<Vec<u8>> =
                text.as_bytes().chunks(chunk_size).map(<[u8]>::to_vec).collect();

            let (mut local, mut remote) = tokio::io::duplex(256);
            let feeder = tokio::spawn(async move {
                for chunk in chunks {
                    remote.write_all(&chunk).await.unwrap();
                    tokio::task::yield_now().await;
                }
            });

            let mut got = Vec::new();
            relay_lines(
                &mut local,
                Duration::from_millis(50),
                &CancelToken::new(),
                |line| got.push(line.to_string()),
            )
            .await
            .unwrap();

            assert_eq!(got, [body]);
            feeder.await.unwrap();
        });
    }
}
