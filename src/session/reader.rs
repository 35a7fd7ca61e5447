//! Background task reading the transport into the decode pipeline.

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use super::DecodePipeline;
use crate::error::{MirrorError, Result};
use crate::render::{FrameSink, Presentation};

/// Read loop tuning.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ReadSettings {
    /// Bound on a single read; elapsing is not an error.
    pub timeout: Duration,
    /// Size of the chunk buffer.
    pub buffer_size: usize,
}

/// Handle to the running reader task.
pub(crate) struct Reader {
    stop: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl Reader {
    /// Spawn the read loop. `on_failure` runs on the reader task when the
    /// transport fails; it must not wait for the reader to stop.
    pub fn spawn<R, F>(
        reader: R,
        pipeline: Arc<Mutex<DecodePipeline>>,
        sink: Arc<dyn FrameSink>,
        settings: ReadSettings,
        on_failure: F,
    ) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
        F: FnOnce(MirrorError) + Send + 'static,
    {
        let (stop, stopped) = oneshot::channel();
        let task = tokio::spawn(async move {
            match read_loop(reader, pipeline, sink, settings, stopped).await {
                Ok(()) => debug!("Reader stopped"),
                Err(e) => on_failure(e),
            }
        });
        Self { stop, task }
    }

    /// Signal the loop and wait for it to exit. After this returns no more
    /// chunks reach the pipeline.
    pub async fn stop(self) {
        let _ = self.stop.send(());
        if let Err(e) = self.task.await {
            warn!("Reader task ended abnormally: {}", e);
        }
    }
}

/// Main read loop - reads chunks and feeds the pipeline.
async fn read_loop<R>(
    mut reader: R,
    pipeline: Arc<Mutex<DecodePipeline>>,
    sink: Arc<dyn FrameSink>,
    settings: ReadSettings,
    mut stopped: oneshot::Receiver<()>,
) -> Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; settings.buffer_size];

    loop {
        let read = tokio::select! {
            biased;
            _ = &mut stopped => return Ok(()),
            read = tokio::time::timeout(settings.timeout, reader.read(&mut buf)) => read,
        };

        let n = match read {
            Err(_) => {
                trace!("No data within {:?}", settings.timeout);
                continue;
            }
            Ok(Ok(0)) => return Err(MirrorError::ConnectionClosed),
            Ok(Ok(n)) => n,
            Ok(Err(e)) => return Err(MirrorError::Read(e)),
        };

        trace!("Read {} bytes", n);
        let canvas = pipeline.lock().await.ingest(&buf[..n])?;
        if let Some(canvas) = canvas {
            sink.present(Presentation::Canvas(Arc::new(canvas)));
        }
    }
}
