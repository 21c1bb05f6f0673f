//! Stream tailing example.
//!
//! Follows a log file from a spawned task while the shell dialogue stays
//! available on the same session, then cancels the tail after a few
//! seconds.
//!
//! Run with: `cargo run --example tail_log`
//!
//! Uses the same `SSH_INTERACT_*` environment variables as the
//! `interactive` example.

use std::time::Duration;

use ssh_interact::{
    CancelToken, ClientConfig, Credentials, HostKeyPolicy, SshConfig, SshInteraction,
};

#[tokio::main]
async fn main() -> Result<(), ssh_interact::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let ssh = SshConfig::new("localhost")
        .credentials(Credentials::default().with_default_keys())
        .host_key_policy(HostKeyPolicy::known_hosts());
    let mut config = ClientConfig::new(ssh);
    config.apply_env();

    let mut client = SshInteraction::new(config);
    client.connect().await?;

    let token = CancelToken::new();
    let tailer = client.tailer().await?;

    let stop = token.clone();
    let tail = tokio::spawn(async move {
        tailer
            .run("tail -f /var/log/syslog", stop, |line| {
                println!("log | {line}");
            })
            .await
    });

    // The shell stays usable while the tail runs on its own channel.
    client.send("echo shell still responsive").await?;
    client.expect("shell still responsive").await?;
    println!("shell answered while tailing");

    tokio::time::sleep(Duration::from_secs(5)).await;
    token.cancel();

    match tail.await {
        Ok(Ok(end)) => println!("tail ended, cancelled: {}", end.was_cancelled()),
        Ok(Err(e)) => eprintln!("tail failed: {e}"),
        Err(e) => eprintln!("tail task panicked: {e}"),
    }

    client.close().await;
    Ok(())
}
