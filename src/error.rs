//! Error taxonomy shared by the session, recording and synthesis layers.
//!
//! Every error here is caught at a component boundary and turned into a
//! status notification; none of them are meant to escape an entry point.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Category of a failure reported by the voice service.
///
/// Only the kind is interpreted locally; message and remedy text are passed
/// through untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", from = "String")]
pub enum ErrorKind {
    /// Persistent until the operator fixes the environment (e.g. FFmpeg)
    MissingDependency,
    ProcessingError,
    Unknown,
}

impl From<String> for ErrorKind {
    fn from(raw: String) -> Self {
        ErrorKind::from(raw.as_str())
    }
}

impl From<&str> for ErrorKind {
    fn from(raw: &str) -> Self {
        match raw {
            "missing_dependency" => ErrorKind::MissingDependency,
            "processing_error" | "processing_failed" => ErrorKind::ProcessingError,
            _ => ErrorKind::Unknown,
        }
    }
}

impl ErrorKind {
    /// Whether a user-initiated retry can be expected to help
    pub fn is_retryable(self) -> bool {
        !matches!(self, ErrorKind::MissingDependency)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::MissingDependency => "missing_dependency",
            ErrorKind::ProcessingError => "processing_error",
            ErrorKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Server-reported domain failure, carried opaquely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredError {
    #[serde(rename = "error_type", alias = "kind", default = "unknown_kind")]
    pub kind: ErrorKind,
    #[serde(default)]
    pub message: String,
    #[serde(
        rename = "solution",
        alias = "remedy",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub remedy: Option<String>,
}

fn unknown_kind() -> ErrorKind {
    ErrorKind::Unknown
}

impl StructuredError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            remedy: None,
        }
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unknown, message)
    }

    pub fn with_remedy(mut self, remedy: impl Into<String>) -> Self {
        self.remedy = Some(remedy.into());
        self
    }
}

impl fmt::Display for StructuredError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.kind)?;
        if let Some(remedy) = &self.remedy {
            write!(f, ": {}", remedy)?;
        }
        Ok(())
    }
}

/// Microphone could not be acquired or failed mid-capture.
///
/// Fatal to the current attempt only; a retry starts from scratch.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CaptureError {
    #[error("microphone permission denied")]
    PermissionDenied,
    #[error("capture device unavailable: {0}")]
    DeviceUnavailable(String),
    #[error("capture failed: {0}")]
    Failed(String),
}

/// Network failure or non-2xx response. Previous state is preserved.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Network(String),
    #[error("service returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("malformed response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            TransportError::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            TransportError::Status {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else {
            TransportError::Network(err.to_string())
        }
    }
}

/// Why a finished capture attempt did not yield a usable session
#[derive(Debug, Error)]
pub enum RecordingError {
    #[error("no audio was captured")]
    NoAudio,
    #[error("upload failed: {0}")]
    Upload(#[from] TransportError),
    #[error("service accepted the sample without assigning a session id")]
    NoSession,
    #[error("capture task aborted: {0}")]
    Aborted(String),
}

/// Input rejected locally, before any network call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("text to synthesize is empty")]
    EmptyText,
}
