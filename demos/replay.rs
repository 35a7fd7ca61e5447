//! Replay - feed a recorded device stream through a live session.
//!
//! This example demonstrates:
//! - Attaching a [`ConnectionSession`] to an in-memory transport
//! - Playing the device side: answering `stream enable` with captured bytes
//! - Collecting the newest frame from a `watch` sink and saving it as an image
//!
//! # Running
//!
//! ```text
//! RUST_LOG=pdmirror=debug cargo run --example replay -- capture.bin --out screen.png [--config config.json]
//! ```

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use pdmirror::{ConnectionSession, MirrorConfig, Presentation};
use tokio::io::{duplex, AsyncReadExt, AsyncWriteExt};
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Chunk sizes cycled through while replaying, to mimic a real serial read.
const CHUNK_SIZES: [usize; 5] = [1, 7, 64, 513, 4096];

#[derive(Parser, Debug)]
#[command(name = "replay")]
#[command(about = "Replay a captured device stream and save the last frame")]
struct Args {
    /// Raw bytes recorded from the device after `stream enable`.
    capture: PathBuf,
    /// Output image; the format follows the extension.
    #[arg(long, default_value = "screen.png")]
    out: PathBuf,
    /// Session configuration as JSON.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => MirrorConfig::load(path)?,
        None => MirrorConfig::default(),
    };

    let capture = std::fs::read(&args.capture)?;
    info!("Replaying {} bytes from {}", capture.len(), args.capture.display());

    let (frames, mut latest) = watch::channel(Presentation::NoSignal);
    let session = ConnectionSession::new(config, frames)?;
    let (host, mut device) = duplex(64 * 1024);

    let device_task = tokio::spawn(async move {
        let mut line = [0u8; 64];
        let n = device.read(&mut line).await?;
        info!("Device got {:?}", String::from_utf8_lossy(&line[..n]).trim_end());

        let mut rest = capture.as_slice();
        for size in CHUNK_SIZES.iter().cycle() {
            if rest.is_empty() {
                break;
            }
            let (chunk, tail) = rest.split_at((*size).min(rest.len()));
            device.write_all(chunk).await?;
            rest = tail;
        }
        // Keep the link up long enough for the reader to drain.
        tokio::time::sleep(Duration::from_millis(200)).await;
        Ok::<_, std::io::Error>(device)
    });

    session.connect(host).await?;
    let _device = device_task.await??;

    let frame = latest.borrow_and_update().clone();
    let report = session.disconnect().await;
    info!("Teardown: {:?}", report.map(|r| r.steps));

    match frame.canvas() {
        Some(canvas) => {
            canvas.save(&args.out)?;
            info!("Wrote {}", args.out.display());
        }
        None => info!("No frame received"),
    }

    Ok(())
}
