//! # Tunecast Station Library (tunecast-sv)
//!
//! Live one-to-many raw PCM radio.
//!
//! **Purpose:** Pace a single shared stream of fixed-size PCM frames out of a
//! directory catalog at real-time cadence, fan each frame out to every
//! connected listener, and let a controller switch the active track or let it
//! auto-advance through the catalog.
//!
//! **Architecture:**
//! - `catalog`: folder/track listing derived from the filesystem on demand
//! - `registry`: actor owning the subscriber set
//! - `playback`: active track state and the pacing loop
//! - `controller`: control operations consumed by the HTTP layer
//! - `api`: HTTP, WebSocket and SSE endpoints

pub mod api;
pub mod catalog;
pub mod config;
pub mod controller;
pub mod error;
pub mod playback;
pub mod registry;
pub mod station;

pub use error::{Error, Result};
pub use station::{Station, StationOptions};
