//! Recorder lifecycle errors

use thiserror::Error;

pub type Result<T> = std::result::Result<T, RecorderError>;

#[derive(Debug, Error)]
pub enum RecorderError {
    #[error("Recording already in progress")]
    AlreadyRecording,

    #[error("No recording in progress")]
    NotRecording,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Input capture error: {0}")]
    Capture(#[from] deskrec_core::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Recording worker panicked")]
    WorkerPanicked,
}
