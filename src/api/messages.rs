use serde::{Deserialize, Serialize};

use crate::error::StructuredError;

/// GET /health
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    #[serde(default)]
    pub ffmpeg_available: bool,
    /// "ok" or "limited"
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub bark_loaded: Option<bool>,
    #[serde(default)]
    pub voice_adaptation_loaded: Option<bool>,
    /// "GPU" or "CPU"
    #[serde(default)]
    pub device: Option<String>,
}

/// A selectable voice as listed by the service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceDescriptor {
    pub id: String,
    #[serde(rename = "name")]
    pub display_name: String,
    #[serde(default)]
    pub is_user_voice: bool,
}

/// GET /voices
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoicesResponse {
    #[serde(default)]
    pub voices: Vec<VoiceDescriptor>,
}

/// GET /user-voice-status?userId=
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceStatusResponse {
    #[serde(default)]
    pub has_voice: bool,
    #[serde(default)]
    pub ffmpeg_available: bool,
    #[serde(default)]
    pub error: Option<StructuredError>,
}

/// POST /upload success body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(default)]
    pub voice_processed: bool,
    #[serde(default)]
    pub error: Option<StructuredError>,
    #[serde(default)]
    pub message: Option<String>,
}

/// POST /synthesize request body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesizeRequest {
    pub text: String,
    #[serde(rename = "userId")]
    pub user_id: Option<String>,
    /// `None` lets the service pick its default voice
    pub voice: Option<String>,
    pub use_user_voice: bool,
}

/// POST /synthesize success body
///
/// `file_url` is optional on the wire so a response without audio can be
/// classified instead of failing to decode.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SynthesizeResponse {
    #[serde(default)]
    pub file_url: Option<String>,
    #[serde(default)]
    pub download_url: Option<String>,
    #[serde(default)]
    pub user_voice_applied: bool,
    #[serde(default)]
    pub adaptation_failure: Option<StructuredError>,
}

/// Body of any non-2xx response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub message: String,
}

/// Captured sample handed to the upload step
#[derive(Debug, Clone)]
pub struct UploadRequest {
    /// Encoded audio blob
    pub audio: Vec<u8>,
    /// Existing session id, re-used so the server updates the same identity
    pub user_id: Option<String>,
}
