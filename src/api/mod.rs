//! Client side of the voice service HTTP API
//!
//! - GET /health - FFmpeg / model availability
//! - GET /voices - Voice catalog
//! - GET /user-voice-status?userId= - Processed voice status
//! - POST /upload - Voice sample (multipart)
//! - POST /synthesize - Text to speech (JSON)

pub mod client;
pub mod messages;
pub mod transport;

pub use client::HttpTransport;
pub use messages::{
    ErrorBody, HealthResponse, SynthesizeRequest, SynthesizeResponse, UploadRequest,
    UploadResponse, VoiceDescriptor, VoiceStatusResponse, VoicesResponse,
};
pub use transport::Transport;
