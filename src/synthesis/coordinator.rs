use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::api::{SynthesizeRequest, SynthesizeResponse, Transport};
use crate::error::{StructuredError, ValidationError};
use crate::session::Session;

/// Result of one synthesis request. Replaced, never merged, by the next one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SynthesisOutcome {
    /// Streaming locator
    pub audio_ref: Option<String>,
    pub download_ref: Option<String>,
    pub adaptation_applied: bool,
    pub failure_reason: Option<StructuredError>,
}

impl SynthesisOutcome {
    /// Outcome rendered for a failed request: no audio, only the reason
    pub fn failed(reason: StructuredError) -> Self {
        Self {
            failure_reason: Some(reason),
            ..Self::default()
        }
    }
}

#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("synthesis failed: {0}")]
    Failed(StructuredError),
}

/// Issues synthesis requests and classifies the responses
///
/// Stateless per call; never mutates the session.
#[derive(Clone)]
pub struct SynthesisCoordinator {
    transport: Arc<dyn Transport>,
}

impl SynthesisCoordinator {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Synthesize `text`, optionally in `voice_id`.
    ///
    /// `voice_id = None` lets the service choose. Adaptation is requested only
    /// if asked for and the session has a processed voice.
    pub async fn synthesize(
        &self,
        text: &str,
        voice_id: Option<&str>,
        session: &Session,
        adaptation_requested: bool,
    ) -> Result<SynthesisOutcome, SynthesisError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ValidationError::EmptyText.into());
        }

        let use_user_voice = adaptation_requested && session.has_processed_voice;
        if adaptation_requested && !use_user_voice {
            info!("Adaptation requested without a processed voice; asking for AI voice only");
        }

        let request = SynthesizeRequest {
            text: text.to_string(),
            user_id: session.session_id.clone(),
            voice: voice_id.map(str::to_string),
            use_user_voice,
        };

        info!(
            "Synthesizing {} chars (voice={}, adaptation={})",
            text.chars().count(),
            voice_id.unwrap_or("<service default>"),
            use_user_voice
        );

        let response = match self.transport.synthesize(&request).await {
            Ok(response) => response,
            Err(e) => {
                warn!("Synthesis request failed: {}", e);
                return Err(SynthesisError::Failed(StructuredError::unknown(e.to_string())));
            }
        };

        classify(response)
    }
}

/// Map a 2xx synthesis response to an outcome.
///
/// Order matters: missing audio, then applied adaptation, then a reported
/// adaptation failure, then plain AI voice.
pub fn classify(response: SynthesizeResponse) -> Result<SynthesisOutcome, SynthesisError> {
    let Some(audio_ref) = response.file_url.filter(|url| !url.is_empty()) else {
        return Err(SynthesisError::Failed(StructuredError::unknown(
            "no audio produced",
        )));
    };

    let mut outcome = SynthesisOutcome {
        audio_ref: Some(audio_ref),
        download_ref: response.download_url,
        adaptation_applied: false,
        failure_reason: None,
    };

    if response.user_voice_applied {
        outcome.adaptation_applied = true;
    } else if let Some(failure) = response.adaptation_failure {
        outcome.failure_reason = Some(failure);
    }

    Ok(outcome)
}
