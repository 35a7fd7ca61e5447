//! Connection lifecycle.
//!
//! A [`ConnectionSession`] moves through
//!
//! ```text
//! Idle ─connect─► Connecting ─enable ok─► Streaming ─disconnect / link failure─► Disconnecting ─► Idle
//!                     │
//!                     └─enable failed─► Disconnecting ─► Idle
//! ```
//!
//! Every transition happens while holding the session's core lock, so
//! `connect` and `disconnect` are serialised and a link failure reported by
//! the reader can never interleave with a user-initiated teardown. Each link
//! carries a generation number; a failure reported by an older link after a
//! new one was established is ignored.
//!
//! # Example
//!
//! ```no_run
//! use pdmirror::{ConnectionSession, MirrorConfig, Presentation};
//! use tokio::sync::watch;
//!
//! # async fn example(port: tokio::io::DuplexStream) -> pdmirror::Result<()> {
//! let (frames, mut rx) = watch::channel(Presentation::NoSignal);
//! let session = ConnectionSession::new(MirrorConfig::default(), frames)?;
//!
//! session.connect(port).await?;
//! rx.changed().await.ok();
//! session.disconnect().await;
//! # Ok(())
//! # }
//! ```

mod pipeline;
mod reader;

pub use pipeline::DecodePipeline;

use std::fmt;
use std::sync::Arc;

use tokio::sync::{watch, Mutex, MutexGuard};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::MirrorConfig;
use crate::error::{MirrorError, Result};
use crate::keepalive::KeepAlive;
use crate::protocol::Command;
use crate::render::{FrameSink, Presentation};
use crate::screen::ScreenBuffer;
use crate::transport::{Transport, TransportOpener};
use crate::writer::{spawn_writer_task, WriterHandle};
use reader::{ReadSettings, Reader};

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// No transport.
    Idle,
    /// Transport attached, `stream enable` not yet confirmed.
    Connecting,
    /// Receiving screen updates.
    Streaming,
    /// Tearing the link down.
    Disconnecting,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Streaming => "streaming",
            Self::Disconnecting => "disconnecting",
        };
        f.write_str(name)
    }
}

/// Why a teardown ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TeardownReason {
    /// [`ConnectionSession::disconnect`] was called.
    Requested,
    /// `stream enable` could not be written.
    HandshakeFailed(String),
    /// The reader hit a transport error or end of stream.
    LinkFailed(String),
}

/// One completed teardown step, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeardownStep {
    /// Keepalive task stopped; no further pokes.
    KeepAliveCancelled,
    /// Reader task joined; no further chunks reach the pipeline.
    ReaderStopped,
    /// `stream disable` was written.
    DisableSent,
    /// `stream disable` could not be written.
    DisableFailed,
    /// Writer task shut the transport down cleanly.
    TransportClosed,
    /// Shutting the transport down failed or the writer task died.
    TransportCloseFailed,
    /// Framer and screen buffer cleared.
    BuffersReset,
    /// State set back to [`SessionState::Idle`].
    Idle,
    /// [`Presentation::NoSignal`] handed to the sink.
    NoSignalPresented,
}

/// Record of the most recent teardown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeardownReport {
    /// What triggered the teardown.
    pub reason: TeardownReason,
    /// Steps completed, in execution order.
    pub steps: Vec<TeardownStep>,
}

impl TeardownReport {
    /// Whether `stream disable` reached the transport.
    pub fn disable_sent(&self) -> bool {
        self.steps.contains(&TeardownStep::DisableSent)
    }
}

/// Everything owned by one established transport.
struct Link {
    generation: u64,
    writer: WriterHandle,
    writer_task: JoinHandle<Result<()>>,
    reader: Reader,
    keepalive: Option<KeepAlive>,
}

struct Core {
    link: Option<Link>,
    generation: u64,
    last_teardown: Option<TeardownReport>,
}

struct Inner {
    config: MirrorConfig,
    sink: Arc<dyn FrameSink>,
    pipeline: Arc<Mutex<DecodePipeline>>,
    core: Mutex<Core>,
    state: watch::Sender<SessionState>,
}

/// Owns the link to one device and drives the streaming lifecycle.
///
/// Cloning is cheap; clones share the same session. Dropping the last clone
/// while streaming stops the background tasks and closes the transport
/// without sending `stream disable`, so call [`disconnect`](Self::disconnect)
/// first.
#[derive(Clone)]
pub struct ConnectionSession {
    inner: Arc<Inner>,
}

impl ConnectionSession {
    /// Create an idle session that presents frames to `sink`.
    ///
    /// # Errors
    ///
    /// [`MirrorError::Config`] if `config` does not validate.
    pub fn new(config: MirrorConfig, sink: impl FrameSink) -> Result<Self> {
        config.validate()?;
        let pipeline = DecodePipeline::new(config.palette, config.max_payload);
        let (state, _) = watch::channel(SessionState::Idle);

        Ok(Self {
            inner: Arc::new(Inner {
                config,
                sink: Arc::new(sink),
                pipeline: Arc::new(Mutex::new(pipeline)),
                core: Mutex::new(Core {
                    link: None,
                    generation: 0,
                    last_teardown: None,
                }),
                state,
            }),
        })
    }

    /// Current state.
    pub fn state(&self) -> SessionState {
        *self.inner.state.borrow()
    }

    /// Receiver notified on every state change.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    /// Copy of the current screen buffer.
    pub async fn snapshot(&self) -> ScreenBuffer {
        self.inner.pipeline.lock().await.screen().clone()
    }

    /// Report of the most recent teardown, if any ran.
    pub async fn last_teardown(&self) -> Option<TeardownReport> {
        self.inner.core.lock().await.last_teardown.clone()
    }

    /// The configuration this session was created with.
    pub fn config(&self) -> &MirrorConfig {
        &self.inner.config
    }

    /// Attach `transport` and start streaming.
    ///
    /// Returns `Ok(false)` without touching `transport` when the session is
    /// not idle.
    ///
    /// # Errors
    ///
    /// [`MirrorError::HandshakeWrite`] if `stream enable` could not be
    /// written. The transport has been closed and the session is idle again.
    pub async fn connect<T: Transport>(&self, transport: T) -> Result<bool> {
        let mut core = self.inner.core.lock().await;
        if self.state() != SessionState::Idle {
            debug!("Connect ignored while {}", self.state());
            return Ok(false);
        }
        self.establish(&mut core, transport).await?;
        Ok(true)
    }

    /// Open a transport with `opener` and start streaming.
    ///
    /// Returns `Ok(false)` without opening anything when the session is not
    /// idle.
    ///
    /// # Errors
    ///
    /// [`MirrorError::TransportOpen`] if the opener fails (the session stays
    /// idle), otherwise as [`connect`](Self::connect).
    pub async fn connect_with<O: TransportOpener>(&self, opener: &O) -> Result<bool> {
        let mut core = self.inner.core.lock().await;
        if self.state() != SessionState::Idle {
            debug!("Connect ignored while {}", self.state());
            return Ok(false);
        }

        let transport = opener.open(&self.inner.config.serial).await.map_err(|e| {
            warn!("Failed to open transport: {}", e);
            MirrorError::TransportOpen(e)
        })?;
        self.establish(&mut core, transport).await?;
        Ok(true)
    }

    /// Stop streaming and close the transport.
    ///
    /// Returns `None` without side effects when already idle.
    pub async fn disconnect(&self) -> Option<TeardownReport> {
        let mut core = self.inner.core.lock().await;
        if self.state() == SessionState::Idle {
            debug!("Disconnect ignored while idle");
            return None;
        }
        Some(self.teardown(&mut core, TeardownReason::Requested).await)
    }

    fn set_state(&self, state: SessionState) {
        let previous = self.inner.state.send_replace(state);
        if previous != state {
            debug!("Session {} -> {}", previous, state);
        }
    }

    async fn establish<T: Transport>(&self, core: &mut MutexGuard<'_, Core>, transport: T) -> Result<()> {
        self.set_state(SessionState::Connecting);
        core.generation += 1;
        let generation = core.generation;
        info!("Connecting (link {})", generation);

        let config = &self.inner.config;
        let (read_half, write_half) = tokio::io::split(transport);
        let (writer, writer_task) = spawn_writer_task(write_half, config.write_timeout());

        let weak = Arc::downgrade(&self.inner);
        let reader = Reader::spawn(
            read_half,
            Arc::clone(&self.inner.pipeline),
            Arc::clone(&self.inner.sink),
            ReadSettings {
                timeout: config.read_timeout(),
                buffer_size: config.read_buffer_size,
            },
            move |e| {
                // Teardown stops this reader, so it must run elsewhere.
                tokio::spawn(async move {
                    if let Some(inner) = weak.upgrade() {
                        ConnectionSession { inner }.link_failed(generation, e).await;
                    }
                });
            },
        );

        let handshake = writer.send(Command::StreamEnable).await;
        let link = core.link.insert(Link {
            generation,
            writer,
            writer_task,
            reader,
            keepalive: None,
        });

        if let Err(e) = handshake {
            error!("Failed to enable stream: {}", e);
            self.teardown(core, TeardownReason::HandshakeFailed(e.to_string()))
                .await;
            return Err(MirrorError::HandshakeWrite(Box::new(e)));
        }

        let blank = self.inner.pipeline.lock().await.start();
        link.keepalive = Some(KeepAlive::spawn(
            link.writer.clone(),
            config.keepalive_interval(),
        ));
        self.set_state(SessionState::Streaming);
        self.inner.sink.present(Presentation::Canvas(Arc::new(blank)));
        info!("Streaming (link {})", generation);
        Ok(())
    }

    async fn link_failed(&self, generation: u64, e: MirrorError) {
        let mut core = self.inner.core.lock().await;
        match &core.link {
            Some(link) if link.generation == generation => {}
            _ => {
                debug!("Ignoring failure of stale link {}: {}", generation, e);
                return;
            }
        }

        error!("Link {} failed: {}", generation, e);
        self.teardown(&mut core, TeardownReason::LinkFailed(e.to_string()))
            .await;
    }

    /// Ordered teardown. Each step runs even if an earlier one failed.
    async fn teardown(&self, core: &mut MutexGuard<'_, Core>, reason: TeardownReason) -> TeardownReport {
        let was_streaming = self.state() == SessionState::Streaming;
        self.set_state(SessionState::Disconnecting);
        let mut steps = Vec::with_capacity(7);

        if let Some(link) = core.link.take() {
            let Link {
                generation,
                writer,
                writer_task,
                reader,
                keepalive,
            } = link;
            debug!("Tearing down link {} ({:?})", generation, reason);

            if let Some(keepalive) = keepalive {
                keepalive.cancel().await;
            }
            steps.push(TeardownStep::KeepAliveCancelled);

            reader.stop().await;
            steps.push(TeardownStep::ReaderStopped);

            if was_streaming {
                match writer.send(Command::StreamDisable).await {
                    Ok(()) => steps.push(TeardownStep::DisableSent),
                    Err(e) => {
                        warn!("Failed to disable stream: {}", e);
                        steps.push(TeardownStep::DisableFailed);
                    }
                }
            }

            // Last handle gone: the writer task shuts the transport down.
            drop(writer);
            match writer_task.await {
                Ok(Ok(())) => steps.push(TeardownStep::TransportClosed),
                Ok(Err(e)) => {
                    warn!("Failed to close transport: {}", e);
                    steps.push(TeardownStep::TransportCloseFailed);
                }
                Err(e) => {
                    warn!("Writer task ended abnormally: {}", e);
                    steps.push(TeardownStep::TransportCloseFailed);
                }
            }
        }

        self.inner.pipeline.lock().await.reset();
        steps.push(TeardownStep::BuffersReset);

        self.set_state(SessionState::Idle);
        steps.push(TeardownStep::Idle);

        self.inner.sink.present(Presentation::NoSignal);
        steps.push(TeardownStep::NoSignalPresented);

        info!("Disconnected");
        let report = TeardownReport { reason, steps };
        core.last_teardown = Some(report.clone());
        report
    }
}

impl fmt::Debug for ConnectionSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionSession")
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::NullSink;
    use std::io;
    use tokio::io::{duplex, AsyncReadExt, DuplexStream};
    use tokio::sync::mpsc;

    struct FailingOpener;

    impl TransportOpener for FailingOpener {
        type Stream = DuplexStream;

        async fn open(&self, _config: &crate::transport::SerialConfig) -> io::Result<DuplexStream> {
            Err(io::Error::new(io::ErrorKind::NotFound, "no device"))
        }
    }

    struct DuplexOpener(std::sync::Mutex<Option<DuplexStream>>);

    impl TransportOpener for DuplexOpener {
        type Stream = DuplexStream;

        async fn open(&self, _config: &crate::transport::SerialConfig) -> io::Result<DuplexStream> {
            self.0
                .lock()
                .unwrap()
                .take()
                .ok_or_else(|| io::Error::new(io::ErrorKind::AddrInUse, "already opened"))
        }
    }

    fn session() -> ConnectionSession {
        ConnectionSession::new(MirrorConfig::default(), NullSink).unwrap()
    }

    #[test]
    fn test_state_display() {
        assert_eq!(SessionState::Streaming.to_string(), "streaming");
        assert_eq!(SessionState::Idle.to_string(), "idle");
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = MirrorConfig {
            keepalive_interval_ms: 0,
            ..MirrorConfig::default()
        };
        assert!(ConnectionSession::new(config, NullSink).is_err());
    }

    #[tokio::test]
    async fn test_connect_sends_enable_and_streams() {
        let (client, mut device) = duplex(4096);
        let session = session();

        assert!(session.connect(client).await.unwrap());
        assert_eq!(session.state(), SessionState::Streaming);

        let mut buf = [0u8; 64];
        let n = device.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"stream enable\n");

        session.disconnect().await;
    }

    #[tokio::test]
    async fn test_second_connect_is_noop() {
        let (first, _device) = duplex(4096);
        let (second, _other) = duplex(4096);
        let session = session();

        assert!(session.connect(first).await.unwrap());
        assert!(!session.connect(second).await.unwrap());
        assert_eq!(session.state(), SessionState::Streaming);

        session.disconnect().await;
    }

    #[tokio::test]
    async fn test_disconnect_sends_disable_then_closes() {
        let (client, mut device) = duplex(4096);
        let session = session();
        session.connect(client).await.unwrap();

        let report = session.disconnect().await.unwrap();

        assert_eq!(report.reason, TeardownReason::Requested);
        assert!(report.disable_sent());
        assert_eq!(session.state(), SessionState::Idle);

        let mut written = Vec::new();
        device.read_to_end(&mut written).await.unwrap();
        assert_eq!(written, b"stream enable\nstream disable\n");
    }

    #[tokio::test]
    async fn test_disconnect_when_idle_is_noop() {
        let session = session();
        assert!(session.disconnect().await.is_none());
        assert!(session.last_teardown().await.is_none());
    }

    #[tokio::test]
    async fn test_open_failure_stays_idle() {
        let session = session();

        let result = session.connect_with(&FailingOpener).await;

        assert!(matches!(result, Err(MirrorError::TransportOpen(_))));
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[tokio::test]
    async fn test_connect_with_opener() {
        let (client, _device) = duplex(4096);
        let opener = DuplexOpener(std::sync::Mutex::new(Some(client)));
        let session = session();

        assert!(session.connect_with(&opener).await.unwrap());
        // Not idle: the opener must not be called again.
        assert!(!session.connect_with(&opener).await.unwrap());

        session.disconnect().await;
    }

    #[tokio::test]
    async fn test_device_hangup_tears_down() {
        let (client, device) = duplex(4096);
        let session = session();
        let mut states = session.subscribe();
        session.connect(client).await.unwrap();

        drop(device);
        while *states.borrow_and_update() != SessionState::Idle {
            states.changed().await.unwrap();
        }

        let report = session.last_teardown().await.unwrap();
        assert!(matches!(report.reason, TeardownReason::LinkFailed(_)));
        assert_eq!(report.steps.first(), Some(&TeardownStep::KeepAliveCancelled));
        assert_eq!(report.steps.last(), Some(&TeardownStep::NoSignalPresented));
    }

    #[tokio::test]
    async fn test_presents_blank_then_no_signal() {
        let (client, _device) = duplex(4096);
        let (tx, mut frames) = mpsc::unbounded_channel();
        let session = ConnectionSession::new(MirrorConfig::default(), tx).unwrap();

        session.connect(client).await.unwrap();
        let blank = frames.recv().await.unwrap();
        assert!(blank.canvas().is_some());

        session.disconnect().await;
        assert_eq!(frames.recv().await.unwrap(), Presentation::NoSignal);
    }
}
