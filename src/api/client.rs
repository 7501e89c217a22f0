use reqwest::multipart::{Form, Part};
use reqwest::{Response, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::ServiceConfig;
use crate::error::TransportError;

use super::messages::{
    ErrorBody, HealthResponse, SynthesizeRequest, SynthesizeResponse, UploadRequest,
    UploadResponse, VoiceStatusResponse, VoicesResponse,
};
use super::transport::Transport;

const SAMPLE_FILE_NAME: &str = "voice_sample.wav";
const SAMPLE_MIME: &str = "audio/wav";

/// `Transport` over HTTP using reqwest
#[derive(Clone)]
pub struct HttpTransport {
    inner: reqwest::Client,
    base_url: Url,
}

impl HttpTransport {
    pub fn new(config: &ServiceConfig) -> Result<Self, TransportError> {
        Self::with_timeout(&config.base_url, config.request_timeout())
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self, TransportError> {
        // Url::join drops the last path segment unless the base ends with '/'
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{}/", base_url)
        };
        let base_url = normalized
            .parse::<Url>()
            .map_err(|e| TransportError::Network(format!("invalid base URL '{}': {}", base_url, e)))?;

        let inner = reqwest::Client::builder().timeout(timeout).build()?;

        info!("Voice service transport targeting {}", base_url);

        Ok(Self { inner, base_url })
    }

    fn url(&self, path: &str) -> Result<Url, TransportError> {
        self.base_url
            .join(path)
            .map_err(|e| TransportError::Network(format!("invalid path '{}': {}", path, e)))
    }

    /// Decode a 2xx body, or turn the `{message}` error body into a status error
    async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T, TransportError> {
        let status = resp.status();
        if !status.is_success() {
            let message = match resp.json::<ErrorBody>().await {
                Ok(body) if !body.message.is_empty() => body.message,
                _ => status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string(),
            };
            warn!("Voice service returned {}: {}", status, message);
            return Err(TransportError::Status {
                status: status.as_u16(),
                message,
            });
        }

        resp.json::<T>()
            .await
            .map_err(|e| TransportError::Decode(e.to_string()))
    }
}

#[async_trait::async_trait]
impl Transport for HttpTransport {
    async fn health(&self) -> Result<HealthResponse, TransportError> {
        let resp = self.inner.get(self.url("health")?).send().await?;
        Self::decode(resp).await
    }

    async fn voices(&self) -> Result<VoicesResponse, TransportError> {
        let resp = self.inner.get(self.url("voices")?).send().await?;
        Self::decode(resp).await
    }

    async fn voice_status(&self, user_id: &str) -> Result<VoiceStatusResponse, TransportError> {
        let resp = self
            .inner
            .get(self.url("user-voice-status")?)
            .query(&[("userId", user_id)])
            .send()
            .await?;
        Self::decode(resp).await
    }

    async fn upload(&self, request: UploadRequest) -> Result<UploadResponse, TransportError> {
        let bytes = request.audio.len();
        let part = Part::bytes(request.audio)
            .file_name(SAMPLE_FILE_NAME)
            .mime_str(SAMPLE_MIME)?;

        let mut form = Form::new().part("audio", part);
        if let Some(user_id) = request.user_id {
            form = form.text("userId", user_id);
        }

        debug!("Uploading voice sample ({} bytes)", bytes);

        let resp = self
            .inner
            .post(self.url("upload")?)
            .multipart(form)
            .send()
            .await?;
        Self::decode(resp).await
    }

    async fn synthesize(
        &self,
        request: &SynthesizeRequest,
    ) -> Result<SynthesizeResponse, TransportError> {
        let resp = self
            .inner
            .post(self.url("synthesize")?)
            .json(request)
            .send()
            .await?;
        Self::decode(resp).await
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, TransportError> {
        // Locators are usually absolute, but accept service-relative paths too
        let target = match Url::parse(url) {
            Ok(absolute) => absolute,
            Err(_) => self.url(url.trim_start_matches('/'))?,
        };

        let resp = self.inner.get(target).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                message: format!("download of {} failed", url),
            });
        }
        Ok(resp.bytes().await?.to_vec())
    }

    fn name(&self) -> &str {
        "http"
    }
}
