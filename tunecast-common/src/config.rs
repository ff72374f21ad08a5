//! Bootstrap configuration loading and root folder resolution
//!
//! The TOML file is optional. A missing default file is not an error: the
//! service logs a warning and starts on built-in defaults. A file named
//! explicitly (CLI or environment) must exist and parse.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::format::AudioFormat;
use crate::{Error, Result};

/// Environment variable naming the catalog root folder
pub const ROOT_FOLDER_ENV: &str = "TUNECAST_ROOT_FOLDER";

/// Catalog root used when nothing else is configured
pub const DEFAULT_ROOT_FOLDER: &str = "audio/output";

/// Bootstrap configuration loaded from TOML
///
/// Cannot change while running; restart to pick up edits.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct TomlConfig {
    /// HTTP server port
    pub port: Option<u16>,

    /// HTTP bind host
    pub host: Option<String>,

    /// Root folder holding one subdirectory per catalog folder
    pub root_folder: Option<PathBuf>,

    pub logging: LoggingConfig,

    /// Raw PCM format shared with the producer of the catalog files
    pub audio: AudioFormat,

    pub engine: EngineTomlConfig,

    pub stream: StreamTomlConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Pacing loop timings, all in milliseconds
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineTomlConfig {
    /// Wait between catalog rechecks while idle
    pub idle_recheck_ms: u64,
    /// Wait after an open or read failure before selecting again
    pub error_backoff_ms: u64,
    /// Pause after the last catalog track before wrapping to the first
    pub wrap_pause_ms: u64,
    /// Upper bound on a single frame read
    pub read_timeout_ms: u64,
}

impl Default for EngineTomlConfig {
    fn default() -> Self {
        Self {
            idle_recheck_ms: 3000,
            error_backoff_ms: 2000,
            wrap_pause_ms: 1000,
            read_timeout_ms: 500,
        }
    }
}

/// Subscriber fan-out sizing
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StreamTomlConfig {
    /// Frames a single listener may fall behind before it is dropped
    pub client_queue_frames: usize,
    /// Pending registry commands before senders wait
    pub command_queue: usize,
    /// Buffered station events per SSE listener
    pub event_capacity: usize,
}

impl Default for StreamTomlConfig {
    fn default() -> Self {
        Self {
            client_queue_frames: 50,
            command_queue: 1024,
            event_capacity: 100,
        }
    }
}

impl TomlConfig {
    /// Parse a TOML document and validate the audio format
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: TomlConfig = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Invalid TOML: {}", e)))?;
        config.audio.validate()?;
        Ok(config)
    }

    /// Load configuration
    ///
    /// `explicit` is a path given by the operator; it must exist. Without one,
    /// the platform default location is tried and defaults are used if absent.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            let content = std::fs::read_to_string(path).map_err(|e| {
                Error::Config(format!("Cannot read config file {}: {}", path.display(), e))
            })?;
            info!("Loaded configuration from {}", path.display());
            return Self::from_toml_str(&content);
        }

        match default_config_path() {
            Some(path) if path.exists() => {
                let content = std::fs::read_to_string(&path).map_err(|e| {
                    Error::Config(format!("Cannot read config file {}: {}", path.display(), e))
                })?;
                info!("Loaded configuration from {}", path.display());
                Self::from_toml_str(&content)
            }
            _ => {
                warn!("No configuration file found, using built-in defaults");
                Ok(Self::default())
            }
        }
    }
}

/// Platform default config file: `<config_dir>/tunecast/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("tunecast").join("config.toml"))
}

/// Root folder resolution, highest priority first:
/// 1. Command-line argument
/// 2. `TUNECAST_ROOT_FOLDER` environment variable
/// 3. TOML `root_folder`
/// 4. Compiled default (`audio/output`)
pub fn resolve_root_folder(cli_arg: Option<&Path>, toml: &TomlConfig) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = &toml.root_folder {
        return path.clone();
    }

    PathBuf::from(DEFAULT_ROOT_FOLDER)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    #[test]
    fn test_empty_toml_gives_defaults() {
        let config = TomlConfig::from_toml_str("").unwrap();
        assert!(config.port.is_none());
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.audio, AudioFormat::default());
        assert_eq!(config.engine.idle_recheck_ms, 3000);
        assert_eq!(config.engine.error_backoff_ms, 2000);
        assert_eq!(config.stream.client_queue_frames, 50);
    }

    #[test]
    fn test_partial_sections_keep_other_defaults() {
        let config = TomlConfig::from_toml_str(
            r#"
            port = 9000
            root_folder = "/srv/radio"

            [audio]
            sample_rate = 44100

            [engine]
            wrap_pause_ms = 0
            "#,
        )
        .unwrap();

        assert_eq!(config.port, Some(9000));
        assert_eq!(config.root_folder, Some(PathBuf::from("/srv/radio")));
        assert_eq!(config.audio.sample_rate, 44100);
        assert_eq!(config.audio.channels, 2);
        assert_eq!(config.engine.wrap_pause_ms, 0);
        assert_eq!(config.engine.read_timeout_ms, 500);
    }

    #[test]
    fn test_invalid_audio_format_rejected() {
        let result = TomlConfig::from_toml_str("[audio]\nbits_per_sample = 7\n");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_explicit_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = TomlConfig::load(Some(&dir.path().join("missing.toml")));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_explicit_file_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "host = \"127.0.0.1\"").unwrap();

        let config = TomlConfig::load(Some(&path)).unwrap();
        assert_eq!(config.host.as_deref(), Some("127.0.0.1"));
    }

    #[test]
    #[serial]
    fn test_root_folder_priority() {
        std::env::remove_var(ROOT_FOLDER_ENV);
        let toml = TomlConfig {
            root_folder: Some(PathBuf::from("/from/toml")),
            ..TomlConfig::default()
        };

        // CLI wins over everything
        let cli = PathBuf::from("/from/cli");
        assert_eq!(resolve_root_folder(Some(&cli), &toml), cli);

        // TOML when no CLI or env
        assert_eq!(resolve_root_folder(None, &toml), PathBuf::from("/from/toml"));

        // Env beats TOML
        std::env::set_var(ROOT_FOLDER_ENV, "/from/env");
        assert_eq!(resolve_root_folder(None, &toml), PathBuf::from("/from/env"));
        std::env::remove_var(ROOT_FOLDER_ENV);

        // Compiled default last
        assert_eq!(
            resolve_root_folder(None, &TomlConfig::default()),
            PathBuf::from(DEFAULT_ROOT_FOLDER)
        );
    }
}
