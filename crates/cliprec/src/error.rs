//! Error types for the capture, relocation, index, and playback seams.

use std::path::PathBuf;
use thiserror::Error;

/// The capture engine could not start or serve a stream.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("Failed to open stream {uri}: {reason}")]
    OpenFailed { uri: String, reason: String },

    #[error("Capture engine error: {0}")]
    Engine(String),
}

/// A finished segment could not be moved into storage.
#[derive(Debug, Error)]
pub enum RelocateError {
    #[error("Failed to move {} to {}: {source}", from.display(), to.display())]
    Move {
        from: PathBuf,
        to: PathBuf,
        source: std::io::Error,
    },

    #[error("Engine could not move {} to {}: {source}", from.display(), to.display())]
    Engine {
        from: PathBuf,
        to: PathBuf,
        source: CaptureError,
    },

    #[error("Relocated {path} but the index commit failed: {source}")]
    Commit { path: String, source: IndexError },
}

/// Clip index read/write failure.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Index unavailable: {0}")]
    Unavailable(String),
}

/// A clip file could not be opened or decoded.
#[derive(Debug, Error)]
pub enum ClipError {
    #[error("Failed to open clip {}: {reason}", path.display())]
    OpenFailed { path: PathBuf, reason: String },
}
