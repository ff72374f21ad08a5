//! Fixed PCM stream format
//!
//! Every file in the catalog and every frame on the wire share one raw,
//! little-endian, interleaved PCM format. Listeners are configured with the
//! same values out of band; nothing about the format travels in the stream.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::{Error, Result};

/// File extension of raw audio files in the catalog (without the dot)
pub const PCM_EXTENSION: &str = "pcm";

/// Raw PCM stream format
///
/// Constant for the lifetime of the process. The reference configuration is
/// 48 kHz stereo 16-bit with 480-sample (10 ms) frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioFormat {
    /// Samples per second, per channel
    pub sample_rate: u32,
    /// Interleaved channel count
    pub channels: u16,
    /// Bits per sample (multiple of 8)
    pub bits_per_sample: u16,
    /// Samples per channel in one broadcast frame
    pub frame_samples: u32,
}

impl Default for AudioFormat {
    fn default() -> Self {
        Self {
            sample_rate: 48_000,
            channels: 2,
            bits_per_sample: 16,
            frame_samples: 480,
        }
    }
}

impl AudioFormat {
    /// Reject formats that cannot produce a non-empty frame or a finite tick
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(Error::Config("sample_rate must be greater than zero".to_string()));
        }
        if self.channels == 0 {
            return Err(Error::Config("channels must be greater than zero".to_string()));
        }
        if self.bits_per_sample == 0 || self.bits_per_sample % 8 != 0 {
            return Err(Error::Config(format!(
                "bits_per_sample must be a non-zero multiple of 8, got {}",
                self.bits_per_sample
            )));
        }
        if self.frame_samples == 0 {
            return Err(Error::Config("frame_samples must be greater than zero".to_string()));
        }
        Ok(())
    }

    /// Bytes in one sample frame (one sample for every channel)
    pub fn bytes_per_sample_frame(&self) -> usize {
        self.channels as usize * (self.bits_per_sample as usize / 8)
    }

    /// Bytes in one broadcast frame
    pub fn frame_bytes(&self) -> usize {
        self.frame_samples as usize * self.bytes_per_sample_frame()
    }

    /// Bytes of audio per second of playback
    pub fn bytes_per_second(&self) -> u64 {
        self.sample_rate as u64 * self.bytes_per_sample_frame() as u64
    }

    /// Wall-clock duration of one frame, i.e. the pacing loop's tick
    pub fn tick_interval(&self) -> Duration {
        Duration::from_nanos(self.frame_samples as u64 * 1_000_000_000 / self.sample_rate as u64)
    }

    /// Whole seconds of audio in a file of `size_bytes` (floor)
    pub fn duration_secs(&self, size_bytes: u64) -> u64 {
        size_bytes / self.bytes_per_second()
    }
}
