//! castwire-client: headless session driver.
//!
//! - Connects to the configured endpoint and runs one session
//! - Reads user actions from stdin, one per line
//! - Capture replays `capture.source`; playback appends into `playback.sink`

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;
use tracing_subscriber::{fmt, EnvFilter};

use castwire_client::capture::file::FileDevice;
use castwire_client::capture::memory::MemoryPreview;
use castwire_client::capture::MediaDevice;
use castwire_client::playback::file::FileSource;
use castwire_client::playback::memory::MemoryElement;
use castwire_client::playback::PlaybackBuffer;
use castwire_client::{config, MediaBackends, Session, SessionHandle};
use castwire_core::error::{CastwireError, Result};

const HELP: &str = "commands: time | fa | clients | peers | send <n> [message] | start | stop | log | quit";

#[tokio::main]
async fn main() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    if let Err(e) = run().await {
        tracing::error!(kind = e.kind().as_str(), error = %e, "castwire-client failed");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "castwire.yaml".to_string());
    let cfg = config::load_from_file(&path)?;

    let backends = MediaBackends {
        device: cfg
            .capture
            .as_ref()
            .map(|c| Arc::new(FileDevice::new(&c.source)) as Arc<dyn MediaDevice>),
        preview: Some(Box::new(MemoryPreview::new())),
        playback: cfg.playback.as_ref().map(|p| {
            PlaybackBuffer::new(Box::new(MemoryElement::new()), Box::new(FileSource::new(&p.sink)))
        }),
    };

    tracing::info!(url = %cfg.transport.url, "castwire-client starting");
    let (session, handle) = Session::connect(&cfg, backends).await?;
    let session_task = tokio::spawn(session.run());

    println!("{HELP}");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines
        .next_line()
        .await
        .map_err(|e| CastwireError::Internal(format!("stdin read failed: {e}")))?
    {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "quit" {
            break;
        }
        if let Err(e) = execute(&handle, line).await {
            println!("{}: {e}", e.kind().as_str());
        }
    }

    drop(handle);
    join_session(session_task).await

}

/// Wait for the session loop; a panicked or cancelled loop is an `Internal` fault.
async fn join_session(task: JoinHandle<()>) -> Result<()> {
    task.await.map_err(|e| {
        tracing::error!(error = %e, "session task failed");
        CastwireError::Internal(format!("session task failed: {e}"))
    })
}

async fn execute(handle: &SessionHandle, line: &str) -> Result<()> {
    let mut parts = line.splitn(3, ' ');
    let cmd = parts.next().unwrap_or_default();

    match cmd {
        "time" => handle.time().await,
        "fa" => handle.fa().await,
        "clients" => handle.request_clients().await,
        "peers" => {
            for t in handle.presence().targets() {
                println!("[{}] {} ({})", t.index + 1, t.label, t.id);
            }
            Ok(())
        }
        "send" => {
            let n: usize = parts
                .next()
                .and_then(|s| s.parse().ok())
                .ok_or_else(|| CastwireError::BadEnvelope("usage: send <n> [message]".into()))?;
            let target = n
                .checked_sub(1)
                .and_then(|i| handle.presence().get(i))
                .ok_or_else(|| CastwireError::BadEnvelope(format!("no peer {n}, run `clients`")))?;
            if !handle.send_to_peer(&target, parts.next()).await? {
                println!("not connected, message dropped");
            }
            Ok(())
        }
        "start" => handle.start_capture().await,
        "stop" => handle.stop_capture().await.map(|_| ()),
        "log" => {
            print!("{}", handle.output().render());
            if let Some(stats) = handle.playback_stats().await {
                println!("playback: {stats:?}");
            }
            println!("capture: {:?}", handle.capture_stats().await?);
            Ok(())
        }
        _ => {
            println!("{HELP}");
            Ok(())
        }
    }
}
