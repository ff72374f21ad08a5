//! Common error types for tunecast

use thiserror::Error;

/// Common result type for tunecast operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types shared by tunecast crates
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),
}
