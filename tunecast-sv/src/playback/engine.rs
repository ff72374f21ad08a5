//! Playback engine
//!
//! Owns the active track and the pacing loop that turns it into a real-time
//! stream of frames.
//!
//! **Pacing loop:** one long-lived task. Each iteration selects the active
//! track (seeding it with the first catalog track when idle), opens it, and
//! on every tick reads one frame and hands it to the client registry. At end
//! of file, or after a short backoff when the file cannot be read, it
//! advances to the next catalog track unless a switch arrived.
//!
//! **Switching:** `set_track` replaces the active track under the write lock
//! and sends a capacity-1 stop signal. The loop observes the signal at the
//! tick wait and while a read is in flight; it then abandons the old file
//! without broadcasting anything more from it. Signals coalesce, so a burst
//! of switches may let one more tick of the old file through before the
//! loop re-reads the active track.
//!
//! **Locking:** the active track lock is never held across file I/O or a
//! broadcast.

use bytes::Bytes;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::fs::File;
use tokio::sync::{broadcast, mpsc, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{interval, timeout, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use tunecast_common::RadioEvent;

use super::playlist::next_track;
use super::reader::read_frame;
use crate::catalog::{Track, TrackCatalog};
use crate::config::EngineSettings;
use crate::error::{Error, Result};
use crate::registry::ClientRegistry;

/// Coarse engine state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineState {
    /// No active track
    Idle,
    /// An active track is selected and being paced out
    Streaming,
}

/// How streaming one file ended
#[derive(Debug)]
enum StreamOutcome {
    /// Reached end of file naturally
    Finished,
    /// Stop signal arrived for a different active track
    Interrupted,
    /// Open or read failed, including a vanished file
    Failed(Error),
    /// Engine is shutting down
    Shutdown,
}

/// Playback engine - active track, pacing loop, and switch state machine
pub struct PlaybackEngine {
    catalog: TrackCatalog,
    registry: ClientRegistry,
    settings: EngineSettings,

    /// Path of the active track, `None` while idle
    active_track: RwLock<Option<PathBuf>>,

    /// Capacity-1 stop signal to the pacing loop
    stop_tx: mpsc::Sender<()>,

    /// Receiver half, taken by the pacing loop on start
    stop_rx: Mutex<Option<mpsc::Receiver<()>>>,

    events: broadcast::Sender<RadioEvent>,
    shutdown: CancellationToken,
    loop_handle: Mutex<Option<JoinHandle<()>>>,
}

impl PlaybackEngine {
    pub fn new(
        catalog: TrackCatalog,
        registry: ClientRegistry,
        settings: EngineSettings,
        events: broadcast::Sender<RadioEvent>,
    ) -> Arc<Self> {
        let (stop_tx, stop_rx) = mpsc::channel(1);
        Arc::new(Self {
            catalog,
            registry,
            settings,
            active_track: RwLock::new(None),
            stop_tx,
            stop_rx: Mutex::new(Some(stop_rx)),
            events,
            shutdown: CancellationToken::new(),
            loop_handle: Mutex::new(None),
        })
    }

    /// Spawn the pacing loop
    ///
    /// The loop runs until `shutdown`. Starting twice is an error.
    pub fn start(self: &Arc<Self>) -> Result<()> {
        let stop_rx = self
            .stop_rx
            .lock()
            .map_err(|_| Error::Internal("stop signal lock poisoned".to_string()))?
            .take()
            .ok_or_else(|| Error::Playback("pacing loop already started".to_string()))?;

        let engine = Arc::clone(self);
        let handle = tokio::spawn(async move { engine.run(stop_rx).await });

        *self
            .loop_handle
            .lock()
            .map_err(|_| Error::Internal("loop handle lock poisoned".to_string()))? = Some(handle);

        info!(
            "Pacing loop started ({} byte frames every {:?})",
            self.catalog.format().frame_bytes(),
            self.catalog.format().tick_interval()
        );
        Ok(())
    }

    /// Stop the pacing loop and wait for it to close its file
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        let handle = self.loop_handle.lock().ok().and_then(|mut h| h.take());
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                error!("Pacing loop ended abnormally: {}", e);
            }
        }
        info!("Playback engine stopped");
    }

    /// Switch the active track
    ///
    /// `path` must name an existing catalog track. Setting the track that is
    /// already active changes nothing and does not interrupt playback.
    pub async fn set_track(&self, path: PathBuf) -> Result<Track> {
        let track = self.catalog.describe(&path).await?;

        let previous = {
            let mut active = self.active_track.write().await;
            active.replace(path.clone())
        };

        if previous.as_deref() == Some(path.as_path()) {
            debug!("Track already active: {}", path.display());
            return Ok(track);
        }

        match &previous {
            Some(old) => info!(
                "Change active track from '{}' to '{}'. Signalling stream stop.",
                old.display(),
                path.display()
            ),
            None => info!("Active track set: {}", path.display()),
        }
        self.publish(RadioEvent::track_changed(&track.folder, &track.name));

        match self.stop_tx.try_send(()) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(())) => {
                debug!("Stop signal already pending, relying on next loop iteration");
            }
            Err(mpsc::error::TrySendError::Closed(())) => {
                debug!("Pacing loop not running, stop signal dropped");
            }
        }

        Ok(track)
    }

    /// Describe the active track, `None` while idle
    pub async fn current_track(&self) -> Result<Option<Track>> {
        let Some(path) = self.active_path().await else {
            return Ok(None);
        };
        self.catalog
            .describe(&path)
            .await
            .map(Some)
            .map_err(|e| Error::Internal(format!("Failed to get active track info: {}", e)))
    }

    /// Path of the active track
    pub async fn active_path(&self) -> Option<PathBuf> {
        self.active_track.read().await.clone()
    }

    pub async fn state(&self) -> EngineState {
        if self.active_track.read().await.is_some() {
            EngineState::Streaming
        } else {
            EngineState::Idle
        }
    }

    // ------------------------------------------------------------------
    // Pacing loop
    // ------------------------------------------------------------------

    async fn run(self: Arc<Self>, mut stop_rx: mpsc::Receiver<()>) {
        let mut frame = vec![0u8; self.catalog.format().frame_bytes()];
        let mut idle_announced = false;

        while !self.shutdown.is_cancelled() {
            // Anything pending predates this selection, which already sees
            // the latest active track
            while stop_rx.try_recv().is_ok() {}

            let Some(path) = self.select_track().await else {
                if !idle_announced {
                    info!("No active track set. Waiting for /play...");
                    self.publish(RadioEvent::idle());
                    idle_announced = true;
                }
                tokio::select! {
                    _ = self.shutdown.cancelled() => break,
                    _ = stop_rx.recv() => debug!("Woken from idle by track switch"),
                    _ = tokio::time::sleep(self.settings.idle_recheck) => {}
                }
                continue;
            };
            idle_announced = false;

            match self.stream_file(&path, &mut frame, &mut stop_rx).await {
                StreamOutcome::Finished => self.advance_from(&path).await,
                StreamOutcome::Interrupted => {
                    info!("Stream stop signal received. Switching track.");
                }
                StreamOutcome::Failed(e) => {
                    warn!("Error streaming {}: {}", path.display(), e);
                    self.pause(self.settings.error_backoff).await;
                    // Skip the broken file unless a switch arrived meanwhile
                    self.advance_from(&path).await;
                }
                StreamOutcome::Shutdown => break,
            }
        }

        debug!("Pacing loop exited");
    }

    /// Active track, seeding it with the first catalog track when idle
    async fn select_track(&self) -> Option<PathBuf> {
        if let Some(path) = self.active_path().await {
            return Some(path);
        }

        let first = match self.catalog.sorted_paths().await {
            Ok(paths) => paths.into_iter().next()?,
            Err(e) => {
                debug!("Catalog unavailable while idle: {}", e);
                return None;
            }
        };

        let mut active = self.active_track.write().await;
        match active.as_ref() {
            // A switch landed while the catalog was being read
            Some(path) => Some(path.clone()),
            None => {
                info!("Default track set: {}", first.display());
                *active = Some(first.clone());
                Some(first)
            }
        }
    }

    /// Pace one file out to the registry
    ///
    /// The file handle is dropped on every return path.
    async fn stream_file(
        &self,
        path: &Path,
        frame: &mut [u8],
        stop_rx: &mut mpsc::Receiver<()>,
    ) -> StreamOutcome {
        let mut file = match timeout(self.settings.read_timeout, File::open(path)).await {
            Ok(Ok(file)) => file,
            Ok(Err(e)) => return StreamOutcome::Failed(Error::Io(e)),
            Err(_) => return StreamOutcome::Failed(Error::Playback("open timed out".to_string())),
        };

        info!("Streaming file: {}", path.display());
        if let Ok(track) = self.catalog.describe(path).await {
            self.publish(RadioEvent::track_started(&track.folder, &track.name, track.duration));
        }

        let mut ticker = interval(self.catalog.format().tick_interval());
        // After a stall, resume one frame per tick instead of flooding listeners
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => return StreamOutcome::Shutdown,
                Some(()) = stop_rx.recv() => {
                    if self.is_superseded(path).await {
                        return StreamOutcome::Interrupted;
                    }
                    continue;
                }
                _ = ticker.tick() => {}
            }

            // A read in flight is never cancelled for a signal that does not
            // supersede this file, so the file position stays frame-aligned
            let result = {
                let read = timeout(self.settings.read_timeout, read_frame(&mut file, &mut *frame));
                tokio::pin!(read);
                loop {
                    tokio::select! {
                        biased;
                        Some(()) = stop_rx.recv() => {
                            if self.is_superseded(path).await {
                                return StreamOutcome::Interrupted;
                            }
                        }
                        result = &mut read => break result,
                    }
                }
            };

            let n = match result {
                Ok(Ok(n)) => n,
                Ok(Err(e)) => return StreamOutcome::Failed(Error::Io(e)),
                Err(_) => {
                    return StreamOutcome::Failed(Error::Playback(format!(
                        "frame read exceeded {:?}",
                        self.settings.read_timeout
                    )))
                }
            };

            if n == 0 {
                return StreamOutcome::Finished;
            }

            if let Err(e) = self.registry.broadcast(Bytes::copy_from_slice(&frame[..n])).await {
                return StreamOutcome::Failed(e);
            }

            if n < frame.len() {
                return StreamOutcome::Finished;
            }
        }
    }

    /// True when the active track is no longer `path`
    async fn is_superseded(&self, path: &Path) -> bool {
        self.active_track.read().await.as_deref() != Some(path)
    }

    /// Auto-advance after `finished` reached end of file or failed
    ///
    /// Skipped when the active track changed while the file played.
    async fn advance_from(&self, finished: &Path) {
        let sorted = match self.catalog.sorted_paths().await {
            Ok(sorted) => sorted,
            Err(e) => {
                warn!("Error collecting track list for loop: {}", e);
                self.pause(self.settings.error_backoff).await;
                return;
            }
        };
        let next = next_track(&sorted, finished);

        {
            let mut active = self.active_track.write().await;
            if active.as_deref() != Some(finished) {
                debug!("Active track changed during playback, not advancing");
                return;
            }
            *active = next.as_ref().map(|(path, _)| path.clone());
        }

        match next {
            None => info!("Catalog is empty, going idle"),
            Some((path, wrapped)) => {
                if wrapped {
                    info!("Playlist finished, starting over with: {}", path.display());
                } else {
                    info!("Automatically advancing to next track: {}", path.display());
                }
                if let Ok(track) = self.catalog.describe(&path).await {
                    self.publish(RadioEvent::track_advanced(&track.folder, &track.name, wrapped));
                }
                if wrapped {
                    self.pause(self.settings.wrap_pause).await;
                }
            }
        }
    }

    /// Sleep unless shutting down
    async fn pause(&self, duration: Duration) {
        if duration.is_zero() {
            return;
        }
        tokio::select! {
            _ = self.shutdown.cancelled() => {}
            _ = tokio::time::sleep(duration) => {}
        }
    }

    fn publish(&self, event: RadioEvent) {
        let _ = self.events.send(event);
    }
}
