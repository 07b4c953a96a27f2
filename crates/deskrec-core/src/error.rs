//! Structured errors for playback outcomes and capability failures

use serde::{Deserialize, Serialize};
use std::fmt;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Error {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// No visual match and no fallback coordinates
    ImageNotFound,
    /// Polling wait exceeded its deadline
    Timeout,
    /// Unrecognized action tag
    UnknownAction,
    /// The capture or injection capability raised
    ActionFailed,
    /// Screen capture failed
    CaptureFailed,
    /// A known action tag carried data that does not decode
    InvalidPayload,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ImageNotFound => "image_not_found",
            ErrorCode::Timeout => "timeout",
            ErrorCode::UnknownAction => "unknown_action",
            ErrorCode::ActionFailed => "action_failed",
            ErrorCode::CaptureFailed => "capture_failed",
            ErrorCode::InvalidPayload => "invalid_payload",
        }
    }

    /// Kinds whose wire representation is the bare code rather than a message.
    pub fn is_named_kind(&self) -> bool {
        matches!(
            self,
            ErrorCode::ImageNotFound | ErrorCode::Timeout | ErrorCode::UnknownAction
        )
    }
}

impl Error {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: None,
        }
    }

    pub fn with_context(mut self, context: serde_json::Value) -> Self {
        self.context = Some(context);
        self
    }

    pub fn image_not_found(path: Option<&std::path::Path>) -> Self {
        let message = match path {
            Some(p) => format!("No on-screen match for {}", p.display()),
            None => "No anchor image and no fallback coordinates".to_string(),
        };
        Self::new(ErrorCode::ImageNotFound, message)
    }

    pub fn timeout(what: &str, timeout_ms: u64) -> Self {
        Self::new(
            ErrorCode::Timeout,
            format!("Timeout after {}ms waiting for: {}", timeout_ms, what),
        )
    }

    pub fn unknown_action(tag: &str) -> Self {
        Self::new(ErrorCode::UnknownAction, format!("Unknown action: {}", tag))
    }

    pub fn action_failed(action: &str, reason: impl fmt::Display) -> Self {
        Self::new(ErrorCode::ActionFailed, format!("{} failed: {}", action, reason))
    }

    pub fn capture_failed(reason: impl fmt::Display) -> Self {
        Self::new(ErrorCode::CaptureFailed, format!("Screen capture failed: {}", reason))
    }

    pub fn invalid_payload(tag: &str, reason: impl fmt::Display) -> Self {
        Self::new(
            ErrorCode::InvalidPayload,
            format!("Invalid data for '{}': {}", tag, reason),
        )
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.as_str(), self.message)
    }
}

impl std::error::Error for Error {}

impl From<image::ImageError> for Error {
    fn from(e: image::ImageError) -> Self {
        Self::new(ErrorCode::ActionFailed, e.to_string())
    }
}
