//! Audio output for narration.
//!
//! [`NarrationSink`] is the seam the narration thread speaks through. The
//! production sink, [`PiperSink`], synthesises each unit with Piper into a
//! temporary WAV file and plays it with [`AudioPlayer`], blocking until the
//! clip has finished. Tests inject their own sinks so no audio device or
//! voice model is needed.

pub mod piper;
pub mod player;

use std::path::PathBuf;

use thiserror::Error;

pub use piper::{PiperConfig, PiperSink};
pub use player::AudioPlayer;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("voice model not found at {0}")]
    VoiceNotFound(PathBuf),
    #[error("failed to spawn Piper process: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("Piper exited with status {status}: {stderr}")]
    Piper { status: i32, stderr: String },
    #[error("could not open audio file: {0}")]
    Io(String),
    #[error("audio file is corrupt: {0}")]
    Decode(String),
    #[error("no playback device available")]
    Device,
    #[error("{0}")]
    Other(String),
}

/// Renders one unit of text as audio.
///
/// `speak` blocks until the unit has finished playing. It is called from the
/// narration thread, hence the `Send + Sync` bound.
pub trait NarrationSink: Send + Sync {
    fn speak(&self, text: &str) -> Result<(), SinkError>;
}
