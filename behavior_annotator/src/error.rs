// THEORY:
// Errors are split by concern, one enum each. Configuration errors are fatal and
// surface before any frame is decoded. Decode errors never escape a session: the
// playback machine reads them as the end of the video. Display errors end the
// session without saving. Log file errors belong to saving and loading a log.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for configuration loading and catalog construction.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Fatal problems found while loading the behavior catalog or playback settings.
/// All of them surface before the first frame is decoded.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("key '{key}' is bound to both '{first}' and '{second}'")]
    DuplicateKey {
        key: char,
        first: String,
        second: String,
    },

    #[error("key '{key}' of behavior '{behavior}' collides with the reserved {reserved_for} key")]
    ReservedKey {
        key: char,
        behavior: String,
        reserved_for: String,
    },

    #[error("behavior name '{behavior}' is reserved for the end-of-video marker")]
    ReservedName { behavior: String },

    #[error("invalid key {key:?} for '{owner}': expected exactly one character")]
    InvalidKey { owner: String, key: String },

    #[error("malformed colour {value:?} for behavior '{behavior}': {reason}")]
    MalformedColour {
        behavior: String,
        value: String,
        reason: String,
    },

    #[error("missing required field '{field}' in behavior #{index}")]
    MissingField { index: usize, field: &'static str },

    #[error("invalid setting '{name}': {reason}")]
    InvalidSetting { name: &'static str, reason: String },

    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Toml(#[from] toml::de::Error),
}

/// A frame could not be produced by the video backend.
///
/// Never fatal for a session: the playback loop treats it as the end of the video.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("video backend error: {0}")]
    Backend(String),

    #[error("seek to frame {requested} outside of 0..{frame_count}")]
    SeekOutOfRange { requested: usize, frame_count: usize },
}

impl DecodeError {
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend(message.into())
    }
}

/// The rendering surface or the key source failed. Fatal for a session.
#[derive(Debug, Error)]
pub enum DisplayError {
    #[error("display surface was closed")]
    SurfaceLost,

    #[error("display backend error: {0}")]
    Backend(String),
}

impl DisplayError {
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend(message.into())
    }
}

/// Errors that end an annotation session without producing a segment list.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("video didn't load: {frame_count} frames at {fps} fps")]
    EmptyVideo { frame_count: usize, fps: f64 },

    #[error(transparent)]
    Display(#[from] DisplayError),
}

/// Errors reading or writing a saved annotation log.
#[derive(Debug, Error)]
pub enum LogFileError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed row {row}: {reason}")]
    MalformedRow { row: usize, reason: String },
}
