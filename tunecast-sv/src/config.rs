//! tunecast-sv configuration
//!
//! Settings sources, highest priority first:
//! 1. Command-line arguments
//! 2. Environment variables (via clap `env`, plus `TUNECAST_ROOT_FOLDER`)
//! 3. TOML configuration file
//! 4. Built-in defaults

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tunecast_common::config::{resolve_root_folder, EngineTomlConfig, TomlConfig};
use tunecast_common::AudioFormat;

use crate::error::Result;

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_HOST: &str = "0.0.0.0";

/// Level used until configuration has been loaded
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// `EnvFilter` directives for the service at `level`
///
/// Covers both tunecast crates so configuration loading is logged too.
pub fn log_filter(level: &str) -> String {
    format!("tunecast_sv={level},tunecast_common={level},tower_http=info")
}

/// Command-line arguments for tunecast-sv
#[derive(Parser, Debug, Default)]
#[command(name = "tunecast-sv")]
#[command(about = "Live raw PCM radio: one shared stream, many listeners")]
#[command(version)]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, env = "TUNECAST_PORT")]
    pub port: Option<u16>,

    /// Host address to bind
    #[arg(long, env = "TUNECAST_HOST")]
    pub host: Option<String>,

    /// Root folder containing one subdirectory per catalog folder
    #[arg(short, long)]
    pub root_folder: Option<PathBuf>,

    /// TOML configuration file
    #[arg(short, long, env = "TUNECAST_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,
}

/// Pacing loop timings
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub idle_recheck: Duration,
    pub error_backoff: Duration,
    pub wrap_pause: Duration,
    pub read_timeout: Duration,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self::from(&EngineTomlConfig::default())
    }
}

impl From<&EngineTomlConfig> for EngineSettings {
    fn from(toml: &EngineTomlConfig) -> Self {
        Self {
            idle_recheck: Duration::from_millis(toml.idle_recheck_ms),
            error_backoff: Duration::from_millis(toml.error_backoff_ms),
            wrap_pause: Duration::from_millis(toml.wrap_pause_ms),
            read_timeout: Duration::from_millis(toml.read_timeout_ms),
        }
    }
}

/// Resolved service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub host: String,
    pub port: u16,
    pub root_folder: PathBuf,
    pub log_level: String,
    pub format: AudioFormat,
    pub engine: EngineSettings,
    pub client_queue_frames: usize,
    pub command_queue: usize,
    pub event_capacity: usize,
}

impl ServiceConfig {
    /// Load the TOML file named by `args` (or the default one) and merge
    pub fn load(args: &Args) -> Result<Self> {
        let toml = TomlConfig::load(args.config.as_deref())?;
        Ok(Self::merge(args, &toml))
    }

    /// Apply CLI/env overrides on top of a parsed TOML file
    pub fn merge(args: &Args, toml: &TomlConfig) -> Self {
        Self {
            host: args
                .host
                .clone()
                .or_else(|| toml.host.clone())
                .unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: args.port.or(toml.port).unwrap_or(DEFAULT_PORT),
            root_folder: resolve_root_folder(args.root_folder.as_deref(), toml),
            log_level: args
                .log_level
                .clone()
                .unwrap_or_else(|| toml.logging.level.clone()),
            format: toml.audio,
            engine: EngineSettings::from(&toml.engine),
            // A zero-depth queue would shed every listener on its first frame
            client_queue_frames: toml.stream.client_queue_frames.max(1),
            command_queue: toml.stream.command_queue.max(1),
            event_capacity: toml.stream.event_capacity.max(1),
        }
    }

    /// `host:port` string for the listener
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
