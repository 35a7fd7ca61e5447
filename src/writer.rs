//! Dedicated writer task for outbound commands.
//!
//! The write half of the transport is owned by one task that receives
//! commands over an mpsc channel, so the session and the keepalive never
//! contend for it.
//!
//! # Architecture
//!
//! ```text
//! Session   ─┐
//!            ├─► mpsc::Sender<WriteRequest> ─► Writer Task ─► Transport
//! KeepAlive ─┘
//! ```
//!
//! Each request carries a oneshot for its result, so callers learn whether
//! their bytes reached the transport. When every handle is dropped the task
//! shuts the write half down, which closes the transport.

use std::time::Duration;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::error::{MirrorError, Result};
use crate::protocol::Command;

/// Default channel capacity.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 16;

/// A command plus the channel its result goes back on.
#[derive(Debug)]
struct WriteRequest {
    command: Command,
    reply: oneshot::Sender<Result<()>>,
}

/// Handle for sending commands to the writer task.
///
/// This is cheaply cloneable and shared by the session and the keepalive.
#[derive(Debug, Clone)]
pub struct WriterHandle {
    tx: mpsc::Sender<WriteRequest>,
}

impl WriterHandle {
    /// Send a command and wait until it was written or failed.
    ///
    /// # Errors
    ///
    /// - [`MirrorError::Io`] if the transport write failed
    /// - [`MirrorError::WriteTimeout`] if it did not complete in time
    /// - [`MirrorError::ConnectionClosed`] if the writer task is gone
    pub async fn send(&self, command: Command) -> Result<()> {
        let (reply, result) = oneshot::channel();
        self.tx
            .send(WriteRequest { command, reply })
            .await
            .map_err(|_| MirrorError::ConnectionClosed)?;
        result.await.map_err(|_| MirrorError::ConnectionClosed)?
    }
}

/// Spawn the writer task and return a handle for sending commands.
///
/// The `JoinHandle` resolves once every handle is dropped and the write half
/// has been shut down; its error is the shutdown (close) failure, if any.
pub fn spawn_writer_task<W>(writer: W, timeout: Duration) -> (WriterHandle, JoinHandle<Result<()>>)
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::channel(DEFAULT_CHANNEL_CAPACITY);
    let task = tokio::spawn(writer_loop(rx, writer, timeout));
    (WriterHandle { tx }, task)
}

/// Main writer loop - writes commands in arrival order.
async fn writer_loop<W>(
    mut rx: mpsc::Receiver<WriteRequest>,
    mut writer: W,
    timeout: Duration,
) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(request) = rx.recv().await {
        let result = write_command(&mut writer, request.command, timeout).await;
        match &result {
            Ok(()) => trace!("Sent command: {}", request.command),
            Err(e) => debug!("Command '{}' failed: {}", request.command, e),
        }
        // The caller may have given up waiting; the result is then moot.
        let _ = request.reply.send(result);
    }

    debug!("Writer channel closed, shutting down transport");
    tokio::time::timeout(timeout, writer.shutdown())
        .await
        .map_err(|_| MirrorError::WriteTimeout(timeout))??;
    Ok(())
}

/// Write one command line and flush, bounded by `timeout`.
async fn write_command<W>(writer: &mut W, command: Command, timeout: Duration) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let write = async {
        writer.write_all(command.as_bytes()).await?;
        writer.flush().await
    };

    match tokio::time::timeout(timeout, write).await {
        Ok(result) => Ok(result?),
        Err(_) => Err(MirrorError::WriteTimeout(timeout)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tokio::io::{duplex, AsyncReadExt};

    const TIMEOUT: Duration = Duration::from_millis(500);

    #[tokio::test]
    async fn test_writer_handle_send() {
        let (client, mut server) = duplex(4096);
        let (handle, _task) = spawn_writer_task(client, TIMEOUT);

        handle.send(Command::StreamEnable).await.unwrap();

        let mut buf = vec![0u8; 64];
        let n = server.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"stream enable\n");
    }

    #[tokio::test]
    async fn test_commands_written_in_order() {
        let (client, mut server) = duplex(4096);
        let (handle, task) = spawn_writer_task(client, TIMEOUT);

        handle.send(Command::StreamEnable).await.unwrap();
        handle.send(Command::StreamPoke).await.unwrap();
        handle.send(Command::StreamDisable).await.unwrap();
        drop(handle);
        task.await.unwrap().unwrap();

        let mut written = Vec::new();
        server.read_to_end(&mut written).await.unwrap();
        assert_eq!(written, b"stream enable\nstream poke\nstream disable\n");
    }

    #[tokio::test]
    async fn test_write_to_closed_peer_fails() {
        let (client, server) = duplex(64);
        drop(server);
        let (handle, _task) = spawn_writer_task(client, TIMEOUT);

        let result = handle.send(Command::StreamPoke).await;
        assert!(matches!(result, Err(MirrorError::Io(_))));
    }

    #[tokio::test]
    async fn test_write_times_out_when_peer_stalls() {
        // A 4-byte pipe nobody reads from cannot take a whole command.
        let (client, _server) = duplex(4);
        let (handle, _task) = spawn_writer_task(client, Duration::from_millis(20));

        let result = handle.send(Command::StreamEnable).await;
        assert!(matches!(result, Err(MirrorError::WriteTimeout(_))));
    }

    #[tokio::test]
    async fn test_send_after_task_gone() {
        let (client, _server) = duplex(64);
        let (handle, task) = spawn_writer_task(client, TIMEOUT);
        task.abort();
        let _ = task.await;

        let result = handle.send(Command::StreamPoke).await;
        assert!(matches!(result, Err(MirrorError::ConnectionClosed)));
    }

    #[tokio::test]
    async fn test_write_command_to_buffer() {
        let mut buf = Cursor::new(Vec::new());

        write_command(&mut buf, Command::StreamPoke, TIMEOUT)
            .await
            .unwrap();

        assert_eq!(buf.into_inner(), b"stream poke\n");
    }

    #[tokio::test]
    async fn test_writer_shutdown_on_channel_close() {
        let (client, mut server) = duplex(64);
        let (handle, task) = spawn_writer_task(client, TIMEOUT);

        drop(handle);

        assert!(task.await.unwrap().is_ok());
        let mut buf = [0u8; 8];
        assert_eq!(server.read(&mut buf).await.unwrap(), 0);
    }
}
