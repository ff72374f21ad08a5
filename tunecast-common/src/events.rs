//! Event types for the tunecast event stream

use serde::{Deserialize, Serialize};

/// Station events published to SSE listeners
///
/// These describe what the shared stream is doing; they never carry audio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RadioEvent {
    /// Pacing loop opened a file and began broadcasting it
    TrackStarted {
        folder: String,
        name: String,
        duration: u64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Controller switched the active track
    TrackChanged {
        folder: String,
        name: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Active track advanced to the next catalog entry after end of file
    TrackAdvanced {
        folder: String,
        name: String,
        /// True when the catalog wrapped back to its first track
        wrapped: bool,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// No track available; the station is silent
    Idle {
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Number of stream subscribers changed
    ListenersChanged {
        count: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl RadioEvent {
    pub fn track_started(folder: &str, name: &str, duration: u64) -> Self {
        Self::TrackStarted {
            folder: folder.to_string(),
            name: name.to_string(),
            duration,
            timestamp: chrono::Utc::now(),
        }
    }

    pub fn track_changed(folder: &str, name: &str) -> Self {
        Self::TrackChanged {
            folder: folder.to_string(),
            name: name.to_string(),
            timestamp: chrono::Utc::now(),
        }
    }

    pub fn track_advanced(folder: &str, name: &str, wrapped: bool) -> Self {
        Self::TrackAdvanced {
            folder: folder.to_string(),
            name: name.to_string(),
            wrapped,
            timestamp: chrono::Utc::now(),
        }
    }

    pub fn idle() -> Self {
        Self::Idle {
            timestamp: chrono::Utc::now(),
        }
    }

    pub fn listeners_changed(count: usize) -> Self {
        Self::ListenersChanged {
            count,
            timestamp: chrono::Utc::now(),
        }
    }

    /// SSE event name for this variant
    pub fn event_name(&self) -> &'static str {
        match self {
            RadioEvent::TrackStarted { .. } => "TrackStarted",
            RadioEvent::TrackChanged { .. } => "TrackChanged",
            RadioEvent::TrackAdvanced { .. } => "TrackAdvanced",
            RadioEvent::Idle { .. } => "Idle",
            RadioEvent::ListenersChanged { .. } => "ListenersChanged",
        }
    }
}
