//! # Tunecast Common Library
//!
//! Shared code for the tunecast live PCM radio service:
//! - Fixed stream format and frame arithmetic
//! - Bootstrap configuration loading (TOML + root folder resolution)
//! - Stream event types (RadioEvent enum)
//! - Common error types

pub mod config;
pub mod error;
pub mod events;
pub mod format;

pub use error::{Error, Result};
pub use events::RadioEvent;
pub use format::{AudioFormat, PCM_EXTENSION};
