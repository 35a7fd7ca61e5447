//! Periodic liveness pokes.
//!
//! The device stops streaming unless it is poked regularly. [`KeepAlive`]
//! owns a task that sleeps for the interval, sends `stream poke`, and
//! repeats, so the interval is measured from the previous poke rather than
//! aligned to the wall clock.
//!
//! A failed poke is only logged; link loss is detected by the reader.

use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::error::MirrorError;
use crate::protocol::Command;
use crate::writer::WriterHandle;

/// Handle to a running keepalive task.
#[derive(Debug)]
pub struct KeepAlive {
    stop: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl KeepAlive {
    /// Start poking through `writer` every `interval`. The first poke is sent
    /// one interval after start.
    pub fn spawn(writer: WriterHandle, interval: Duration) -> Self {
        let (stop, stopped) = oneshot::channel();
        let task = tokio::spawn(poke_loop(writer, interval, stopped));
        debug!("Keepalive started ({:?})", interval);
        Self { stop, task }
    }

    /// Stop the task and wait for it to exit.
    ///
    /// Once this returns no further poke is written. A poke already in
    /// flight is allowed to finish first.
    pub async fn cancel(self) {
        let _ = self.stop.send(());
        if let Err(e) = self.task.await {
            warn!("Keepalive task ended abnormally: {}", e);
        }
        debug!("Keepalive stopped");
    }
}

async fn poke_loop(writer: WriterHandle, interval: Duration, mut stopped: oneshot::Receiver<()>) {
    loop {
        tokio::select! {
            biased;
            _ = &mut stopped => return,
            _ = tokio::time::sleep(interval) => {}
        }

        trace!("Sending stream poke");
        if let Err(e) = writer.send(Command::StreamPoke).await {
            warn!("{}", MirrorError::KeepAliveWrite(Box::new(e)));
        }
    }
}
