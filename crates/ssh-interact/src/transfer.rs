//! SFTP file transfer over a dedicated channel.
//!
//! Each transfer opens its own channel, starts the SFTP subsystem on it,
//! moves one file whole, and tears the channel down again. Failures during
//! the transfer itself never skip teardown.
//!
//! Files are buffered in memory end to end. That suits the configuration
//! and log files this client moves; a streaming copy for very large files
//! is out of scope.

use std::path::Path;

use russh_sftp::client::SftpSession;
use russh_sftp::protocol::OpenFlags;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::error::{Error, Result};
use crate::transport::ChannelOpener;
use crate::types::TransferDirection;

/// Run one transfer in the given direction.
pub(crate) async fn run(
    opener: &ChannelOpener,
    local: &Path,
    remote: &str,
    direction: TransferDirection,
) -> Result<()> {
    let fail = |reason: String| Error::transfer(direction, local, remote, reason);

    tracing::info!(%direction, local = %local.display(), remote, "starting file transfer");

    let channel = opener
        .open_sftp()
        .await
        .map_err(|e| fail(format!("cannot open SFTP channel: {e}")))?;
    let sftp = SftpSession::new(channel.into_stream())
        .await
        .map_err(|e| fail(format!("cannot start SFTP session: {e}")))?;

    let result = match direction {
        TransferDirection::Upload => upload(&sftp, local, remote).await,
        TransferDirection::Download => download(&sftp, local, remote).await,
    };

    // Teardown runs whether the transfer succeeded or not.
    if let Err(e) = sftp.close().await {
        tracing::debug!(error = %e, "SFTP session close failed");
    }

    if result.is_ok() {
        tracing::info!(%direction, local = %local.display(), remote, "file transfer complete");
    }
    result
}

async fn upload(sftp: &SftpSession, local: &Path, remote: &str) -> Result<()> {
    let fail = |reason: String| Error::transfer(TransferDirection::Upload, local, remote, reason);

    let contents = tokio::fs::read(local)
        .await
        .map_err(|e| fail(format!("cannot read local file: {e}")))?;

    // READ is included alongside the write flags; some servers reject
    // create requests without it.
    let mut file = sftp
        .open_with_flags(
            remote,
            OpenFlags::CREATE | OpenFlags::TRUNCATE | OpenFlags::WRITE | OpenFlags::READ,
        )
        .await
        .map_err(|e| fail(format!("cannot open remote file: {e}")))?;

    file.write_all(&contents)
        .await
        .map_err(|e| fail(format!("cannot write remote file: {e}")))?;
    file.flush()
        .await
        .map_err(|e| fail(format!("cannot flush remote file: {e}")))?;
    file.shutdown()
        .await
        .map_err(|e| fail(format!("cannot close remote file: {e}")))?;

    tracing::debug!(bytes = contents.len(), "upload finished");
    Ok(())
}

async fn download(sftp: &SftpSession, local: &Path, remote: &str) -> Result<()> {
    let fail = |reason: String| Error::transfer(TransferDirection::Download, local, remote, reason);

    let mut file = sftp
        .open_with_flags(remote, OpenFlags::READ)
        .await
        .map_err(|e| fail(format!("cannot open remote file: {e}")))?;

    let mut contents = Vec::new();
    file.read_to_end(&mut contents)
        .await
        .map_err(|e| fail(format!("cannot read remote file: {e}")))?;

    tokio::fs::write(local, &contents)
        .await
        .map_err(|e| fail(format!("cannot write local file: {e}")))?;

    tracing::debug!(bytes = contents.len(), "download finished");
    Ok(())
}
