//! Lockstep client entry point.
//!
//! A headless demonstration client: it connects to the coordinator, renders
//! each released frame by logging it (with a short simulated render delay),
//! and confirms completion so the barrier can advance.
//!
//! # Flow
//!
//! ```text
//! main()
//!  └─ ClientSettings::load()   -- TOML settings, defaults if absent
//!  └─ SyncClient::open()       -- spawns the transport task
//!  └─ ctrl-c task              -- requests a graceful close
//!  └─ SyncClient::run().await  -- dispatch loop until disconnect
//! ```
//!
//! Pass a settings file path as the first argument; without one the client
//! looks for `lockstep.toml` in the working directory and otherwise uses
//! built-in defaults (coordinator at 127.0.0.1:9002).

use std::path::Path;
use std::time::Duration;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use lockstep_client::{ClientSettings, SyncClient, SyncHandle};
use lockstep_core::{ClientId, FrameHandler, FrameNumber};

/// Demonstration renderer: logs every callback and confirms each frame
/// after a simulated render delay.
struct DemoRenderer {
    handle: SyncHandle,
    frames_rendered: u64,
}

impl DemoRenderer {
    fn new(handle: SyncHandle) -> Self {
        Self {
            handle,
            frames_rendered: 0,
        }
    }
}

impl FrameHandler for DemoRenderer {
    fn on_frame(&mut self, frame: FrameNumber) {
        self.frames_rendered += 1;
        info!("rendering frame {frame} (frame #{} this session)", self.frames_rendered);

        // Callbacks run on the dispatch loop, so the simulated render work
        // happens on a separate task and confirms through the handle.
        let handle = self.handle.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            handle.done_rendering().await;
        });
    }

    fn on_string_data(&mut self, payload: &str, from: ClientId) {
        info!("string data from client {from}: {payload}");
    }

    fn on_reset(&mut self) {
        warn!("coordinator reset the session; frame counters cleared");
        self.frames_rendered = 0;
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "lockstep.toml".to_string());
    let settings = ClientSettings::load(Path::new(&settings_path))?;

    // Initialise structured logging. RUST_LOG wins over the settings file.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(settings.client.log_level.clone())),
        )
        .init();

    info!(
        "lockstep client starting; coordinator at {}:{}",
        settings.coordinator.host, settings.coordinator.port
    );

    let (client, handle) = SyncClient::open(&settings, DemoRenderer::new)?;

    // ── Ctrl-C handler ────────────────────────────────────────────────────────
    let shutdown_handle = handle.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received");
            shutdown_handle.close().await;
        }
    });

    client.run().await?;

    info!("lockstep client stopped");
    Ok(())
}
