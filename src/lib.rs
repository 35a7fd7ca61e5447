//! # pdmirror
//!
//! Host side of a handheld screen mirror over a USB-serial link.
//!
//! The device streams its 400×240 one-bit display as length-prefixed binary
//! messages once it receives `stream enable`, and keeps streaming as long as
//! it is poked. This crate turns that byte stream back into pixels.
//!
//! ## Architecture
//!
//! - **Protocol**: [`protocol::MessageFramer`] splits arbitrary chunks into
//!   messages; [`dispatch::MessageDispatcher`] routes them by type
//! - **Screen**: [`screen::ScreenBuffer`] holds the packed bitplane and
//!   expands it into a [`screen::PixelCanvas`]
//! - **Session**: [`ConnectionSession`] owns the transport, the reader,
//!   the writer and the [`keepalive::KeepAlive`] task, and presents frames
//!   to a [`FrameSink`]
//!
//! ## Example
//!
//! ```no_run
//! use pdmirror::{ConnectionSession, MirrorConfig, Presentation};
//! use tokio::sync::mpsc;
//!
//! # async fn example(port: tokio::io::DuplexStream) -> pdmirror::Result<()> {
//! let (frames, mut rx) = mpsc::unbounded_channel();
//! let session = ConnectionSession::new(MirrorConfig::default(), frames)?;
//! session.connect(port).await?;
//!
//! while let Some(frame) = rx.recv().await {
//!     match frame {
//!         Presentation::Canvas(canvas) => { /* draw canvas.pixels() */ }
//!         Presentation::NoSignal => break,
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod dispatch;
pub mod error;
pub mod keepalive;
pub mod protocol;
pub mod render;
pub mod screen;
pub mod session;
pub mod transport;
pub mod writer;

pub use config::MirrorConfig;
pub use error::{MirrorError, Result};
pub use render::{FrameSink, NullSink, Presentation};
pub use session::{ConnectionSession, SessionState, TeardownReason, TeardownReport, TeardownStep};
pub use transport::{Transport, TransportOpener};
