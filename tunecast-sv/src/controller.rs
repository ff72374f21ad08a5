//! Playback controller
//!
//! Boundary between inbound control requests and the engine. The HTTP layer
//! calls only these operations; it never touches the client set, file
//! handles, or the active track lock directly.

use std::sync::Arc;
use tracing::info;
use tunecast_common::AudioFormat;

use crate::catalog::{Track, TrackCatalog, TrackList};
use crate::error::Result;
use crate::playback::{EngineState, PlaybackEngine};
use crate::registry::{ClientId, ClientRegistry, FrameSink};

#[derive(Clone)]
pub struct PlaybackController {
    engine: Arc<PlaybackEngine>,
    catalog: TrackCatalog,
    registry: ClientRegistry,
}

impl PlaybackController {
    pub fn new(engine: Arc<PlaybackEngine>, catalog: TrackCatalog, registry: ClientRegistry) -> Self {
        Self {
            engine,
            catalog,
            registry,
        }
    }

    /// Switch playback to `folder`/`track`
    ///
    /// The `.pcm` suffix is optional. Fails with BadRequest for malformed
    /// names and NotFound when the file is absent; the active track is left
    /// unchanged in both cases.
    pub async fn play(&self, folder: &str, track: &str) -> Result<Track> {
        let path = self.catalog.resolve(folder, track)?;
        let track = self.engine.set_track(path).await?;
        info!("Play request accepted: {}/{}", track.folder, track.name);
        Ok(track)
    }

    /// Active track, `None` while idle
    pub async fn status(&self) -> Result<Option<Track>> {
        self.engine.current_track().await
    }

    pub async fn engine_state(&self) -> EngineState {
        self.engine.state().await
    }

    pub async fn catalog(&self) -> Result<TrackList> {
        self.catalog.list().await
    }

    pub async fn subscribe(&self, sink: impl FrameSink) -> Result<ClientId> {
        self.registry.subscribe(sink).await
    }

    pub async fn unsubscribe(&self, id: ClientId) -> Result<()> {
        self.registry.unsubscribe(id).await
    }

    pub async fn listener_count(&self) -> Result<usize> {
        self.registry.listener_count().await
    }

    pub fn format(&self) -> AudioFormat {
        self.catalog.format()
    }
}
