//! Playback engine and its supporting pieces
//!
//! - `engine`: active track state, the pacing loop, track switching
//! - `reader`: fixed-size frame reads from the active file
//! - `playlist`: catalog order and auto-advance target selection

pub mod engine;
pub mod playlist;
pub mod reader;

pub use engine::{EngineState, PlaybackEngine};
