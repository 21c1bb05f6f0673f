//! Interactive shell automation example.
//!
//! Connects to a host, waits for the shell prompt, runs a couple of
//! commands, and prints what came back.
//!
//! Run with: `cargo run --example interactive`
//!
//! The defaults target `localhost` with the current user's SSH keys. Set
//! `SSH_INTERACT_HOST`, `SSH_INTERACT_USERNAME`, and
//! `SSH_INTERACT_PASSWORD` (or `SSH_INTERACT_KEY_FILE`) to point it at a
//! real server. `RUST_LOG=ssh_interact=debug` shows the engine at work.

use std::time::Duration;

use ssh_interact::{
    ClientConfig, Credentials, HostKeyPolicy, InteractConfig, SshConfig, SshInteraction,
};

#[tokio::main]
async fn main() -> Result<(), ssh_interact::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let ssh = SshConfig::new("localhost")
        .credentials(Credentials::default().with_default_keys())
        .host_key_policy(HostKeyPolicy::known_hosts());
    let mut config = ClientConfig::new(ssh)
        .interact(InteractConfig::new().expect_timeout(Duration::from_secs(10)));
    config.apply_env();

    let mut client = SshInteraction::new(config);
    client.connect().await?;
    println!("connected");

    // Wait for the first shell prompt before sending anything.
    let prompt = r"[$#] $";
    client.expect(prompt).await?;

    client.send("uname -a").await?;
    let outcome = client.expect(prompt).await?;
    println!("--- uname -a ---\n{}", outcome.text());

    client.send("uptime").await?;
    let outcome = client.expect(prompt).await?;
    println!("--- uptime ---\n{}", outcome.text());

    client.close().await;
    println!("session closed");
    Ok(())
}
