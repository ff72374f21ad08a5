//! Station assembly and lifecycle
//!
//! Wires the registry actor, the playback engine and the controller
//! together, and tears them down in reverse order.

use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tunecast_common::{AudioFormat, RadioEvent};

use crate::catalog::TrackCatalog;
use crate::config::{EngineSettings, ServiceConfig};
use crate::controller::PlaybackController;
use crate::error::Result;
use crate::playback::PlaybackEngine;
use crate::registry::ClientRegistry;

/// Station construction parameters
#[derive(Debug, Clone)]
pub struct StationOptions {
    pub root_folder: PathBuf,
    pub format: AudioFormat,
    pub engine: EngineSettings,
    pub command_queue: usize,
    pub event_capacity: usize,
}

impl From<&ServiceConfig> for StationOptions {
    fn from(config: &ServiceConfig) -> Self {
        Self {
            root_folder: config.root_folder.clone(),
            format: config.format,
            engine: config.engine.clone(),
            command_queue: config.command_queue,
            event_capacity: config.event_capacity,
        }
    }
}

/// A running station: registry actor plus pacing loop
pub struct Station {
    pub controller: PlaybackController,
    pub engine: Arc<PlaybackEngine>,
    pub registry: ClientRegistry,
    pub events: broadcast::Sender<RadioEvent>,
    registry_shutdown: CancellationToken,
    registry_handle: JoinHandle<()>,
}

impl Station {
    /// Spawn the registry and start the pacing loop
    pub fn launch(options: StationOptions) -> Result<Self> {
        options.format.validate()?;

        let (events, _) = broadcast::channel(options.event_capacity.max(1));
        let registry_shutdown = CancellationToken::new();
        let (registry, registry_handle) = ClientRegistry::spawn(
            options.command_queue,
            events.clone(),
            registry_shutdown.clone(),
        );

        let catalog = TrackCatalog::new(options.root_folder, options.format);
        let engine = PlaybackEngine::new(
            catalog.clone(),
            registry.clone(),
            options.engine,
            events.clone(),
        );
        engine.start()?;

        let controller = PlaybackController::new(Arc::clone(&engine), catalog, registry.clone());

        Ok(Self {
            controller,
            engine,
            registry,
            events,
            registry_shutdown,
            registry_handle,
        })
    }

    /// Stop the pacing loop, then the registry
    pub async fn shutdown(self) {
        self.engine.shutdown().await;
        self.registry_shutdown.cancel();
        if let Err(e) = self.registry_handle.await {
            error!("Client registry ended abnormally: {}", e);
        }
        info!("Station shutdown complete");
    }
}
