use crate::error::TransportError;

use super::messages::{
    HealthResponse, SynthesizeRequest, SynthesizeResponse, UploadRequest, UploadResponse,
    VoiceStatusResponse, VoicesResponse,
};

/// Voice service transport
///
/// Implementations:
/// - HTTP: `HttpTransport` talking to the Flask service
/// - In-memory fakes for tests
///
/// Every method maps a non-2xx response to `TransportError::Status`.
/// No method retries; retries are user-initiated.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// GET /health
    async fn health(&self) -> Result<HealthResponse, TransportError>;

    /// GET /voices
    async fn voices(&self) -> Result<VoicesResponse, TransportError>;

    /// GET /user-voice-status?userId=
    async fn voice_status(&self, user_id: &str) -> Result<VoiceStatusResponse, TransportError>;

    /// POST /upload (multipart)
    async fn upload(&self, request: UploadRequest) -> Result<UploadResponse, TransportError>;

    /// POST /synthesize (JSON)
    ///
    /// The body of a 2xx response is returned as-is; classifying it is the
    /// caller's job.
    async fn synthesize(
        &self,
        request: &SynthesizeRequest,
    ) -> Result<SynthesizeResponse, TransportError>;

    /// Fetch a produced audio file by its locator
    async fn download(&self, url: &str) -> Result<Vec<u8>, TransportError>;

    /// Transport name for logging
    fn name(&self) -> &str;
}
