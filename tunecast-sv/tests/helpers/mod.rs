//! Test helpers for tunecast-sv integration tests
//!
//! - Temp catalogs with small, recognisable PCM files
//! - A station with shortened timings and a tiny frame size
//! - Frame collection with deadlines

#![allow(dead_code)]

use bytes::Bytes;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;
use tunecast_common::{AudioFormat, RadioEvent};
use tunecast_sv::catalog::TrackCatalog;
use tunecast_sv::config::EngineSettings;
use tunecast_sv::controller::PlaybackController;
use tunecast_sv::playback::PlaybackEngine;
use tunecast_sv::registry::ClientRegistry;
use tunecast_sv::{Station, StationOptions};

/// 1 kHz stereo 16-bit, 10-sample frames: 40 bytes every 10 ms
pub fn test_format() -> AudioFormat {
    AudioFormat {
        sample_rate: 1000,
        channels: 2,
        bits_per_sample: 16,
        frame_samples: 10,
    }
}

pub const FRAME_BYTES: usize = 40;

pub fn fast_settings() -> EngineSettings {
    EngineSettings {
        idle_recheck: Duration::from_millis(50),
        error_backoff: Duration::from_millis(50),
        wrap_pause: Duration::ZERO,
        read_timeout: Duration::from_secs(1),
    }
}

/// Write `<root>/<rel>` with `len` bytes of `fill`
pub fn write_track(root: &Path, rel: &str, len: usize, fill: u8) -> PathBuf {
    let path = root.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, vec![fill; len]).unwrap();
    path
}

/// Write a track whose k-th frame is filled with byte k
pub fn write_counting_track(root: &Path, rel: &str, frames: usize) -> PathBuf {
    let path = root.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    let data: Vec<u8> = (0..frames)
        .flat_map(|k| std::iter::repeat(k as u8).take(FRAME_BYTES))
        .collect();
    std::fs::write(&path, data).unwrap();
    path
}

pub fn launch(root: &Path) -> Station {
    Station::launch(StationOptions {
        root_folder: root.to_path_buf(),
        format: test_format(),
        engine: fast_settings(),
        command_queue: 256,
        event_capacity: 64,
    })
    .expect("station should launch")
}

/// Station over an empty catalog plus a subscribed listener
pub async fn launch_with_listener() -> (TempDir, Station, mpsc::Receiver<Bytes>) {
    let dir = TempDir::new().unwrap();
    let station = launch(dir.path());
    let (tx, rx) = mpsc::channel(10_000);
    station.registry.subscribe(tx).await.unwrap();
    (dir, station, rx)
}

/// Engine wired to a live registry but not yet started
///
/// Lets a test set the active track and alter the filesystem before the
/// pacing loop first looks at it.
pub struct EngineParts {
    pub engine: Arc<PlaybackEngine>,
    pub catalog: TrackCatalog,
    pub registry: ClientRegistry,
    pub events: broadcast::Sender<RadioEvent>,
    registry_shutdown: CancellationToken,
}

impl EngineParts {
    pub fn new(root: &Path) -> Self {
        let (events, _) = broadcast::channel(64);
        let registry_shutdown = CancellationToken::new();
        let (registry, _handle) =
            ClientRegistry::spawn(256, events.clone(), registry_shutdown.clone());
        let catalog = TrackCatalog::new(root, test_format());
        let engine = PlaybackEngine::new(
            catalog.clone(),
            registry.clone(),
            fast_settings(),
            events.clone(),
        );
        Self {
            engine,
            catalog,
            registry,
            events,
            registry_shutdown,
        }
    }

    pub fn controller(&self) -> PlaybackController {
        PlaybackController::new(
            Arc::clone(&self.engine),
            self.catalog.clone(),
            self.registry.clone(),
        )
    }

    pub async fn shutdown(self) {
        self.engine.shutdown().await;
        self.registry_shutdown.cancel();
    }
}

/// Receive exactly `count` frames or panic after `deadline`
pub async fn recv_frames(rx: &mut mpsc::Receiver<Bytes>, count: usize, deadline: Duration) -> Vec<Bytes> {
    let mut frames = Vec::with_capacity(count);
    let result = tokio::time::timeout(deadline, async {
        while frames.len() < count {
            match rx.recv().await {
                Some(frame) => frames.push(frame),
                None => break,
            }
        }
    })
    .await;
    assert!(
        result.is_ok() && frames.len() == count,
        "received {} of {} frames",
        frames.len(),
        count
    );
    frames
}

/// First byte and length of each frame
pub fn summarize(frames: &[Bytes]) -> Vec<(u8, usize)> {
    frames.iter().map(|f| (f[0], f.len())).collect()
}

/// Poll `check` until it returns true or `deadline` passes
pub async fn wait_until<F, Fut>(deadline: Duration, mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let start = tokio::time::Instant::now();
    while start.elapsed() < deadline {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}
