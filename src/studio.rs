//! UI-facing entry points
//!
//! `VoiceStudio` wires the session, the recorder and the synthesizer
//! together. Every entry point converts its failures into presenter
//! notifications and additionally returns them to the caller. Entry points
//! of the same kind are not re-entrant: a second call while one is
//! outstanding is rejected, not queued.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::api::{HealthResponse, Transport};
use crate::config::Config;
use crate::error::{CaptureError, ErrorKind, StructuredError, TransportError};
use crate::presentation::{NoticeFilter, Presenter, Severity};
use crate::recording::{AttemptOutcome, CaptureProvider, RecordingController, StartOutcome};
use crate::session::{
    KeyValueStore, Reconcile, RequestKind, Session, SessionHandle, VoiceCatalog,
};
use crate::synthesis::{SynthesisCoordinator, SynthesisError, SynthesisOutcome};

const FFMPEG_HINT: &str = "FFmpeg not found. Voice adaptation requires FFmpeg to be installed. \
Install with: brew install ffmpeg (macOS) or apt-get install ffmpeg (Linux)";

#[derive(Debug, Error)]
pub enum StudioError {
    #[error("{0} already in progress")]
    Busy(&'static str),
    #[error(transparent)]
    Capture(#[from] CaptureError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Synthesis(#[from] SynthesisError),
    #[error("no session yet; record a voice sample first")]
    NoSession,
    #[error("outcome has no audio to download")]
    NoAudio,
}

/// Clears an in-flight flag on every exit path
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn try_enter(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| InFlight(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

pub struct VoiceStudio {
    transport: Arc<dyn Transport>,
    session: SessionHandle,
    recorder: RecordingController,
    synthesizer: SynthesisCoordinator,
    presenter: Arc<dyn Presenter>,
    notices: Arc<NoticeFilter>,
    loading_voices: AtomicBool,
    checking_status: AtomicBool,
    synthesizing: AtomicBool,
    last_outcome: Mutex<Option<SynthesisOutcome>>,
}

impl VoiceStudio {
    pub fn new(
        config: &Config,
        transport: Arc<dyn Transport>,
        provider: Arc<dyn CaptureProvider>,
        store: Arc<dyn KeyValueStore>,
        presenter: Arc<dyn Presenter>,
    ) -> Self {
        let notices = Arc::new(NoticeFilter::new());
        let session = SessionHandle::new(store, Arc::clone(&presenter));
        let recorder = RecordingController::new(
            provider,
            Arc::clone(&transport),
            session.clone(),
            Arc::clone(&presenter),
            Arc::clone(&notices),
            config.recording.max_duration(),
        );
        let synthesizer = SynthesisCoordinator::new(Arc::clone(&transport));

        Self {
            transport,
            session,
            recorder,
            synthesizer,
            presenter,
            notices,
            loading_voices: AtomicBool::new(false),
            checking_status: AtomicBool::new(false),
            synthesizing: AtomicBool::new(false),
            last_outcome: Mutex::new(None),
        }
    }

    /// Restore the persisted session and run the health check.
    ///
    /// Returns whether a previous session was restored.
    pub async fn initialize(&self) -> bool {
        let restored = self.session.restore().await;
        if restored {
            self.presenter.on_transient_message(
                "Welcome back! Your voice profile is ready.",
                Severity::Success,
            );
        }
        // advisory only; failures are already rendered
        let _ = self.check_health().await;
        restored
    }

    /// GET /health. A missing FFmpeg is surfaced but blocks nothing.
    pub async fn check_health(&self) -> Result<HealthResponse, StudioError> {
        match self.transport.health().await {
            Ok(health) => {
                debug!(
                    "Service health: status={:?} device={:?} ffmpeg={}",
                    health.status, health.device, health.ffmpeg_available
                );
                if !health.ffmpeg_available {
                    let notice = StructuredError::new(ErrorKind::MissingDependency, FFMPEG_HINT);
                    if self.notices.first_time(&notice) {
                        self.presenter
                            .on_transient_message(FFMPEG_HINT, Severity::Warning);
                    }
                }
                Ok(health)
            }
            Err(e) => {
                error!("Health check failed: {}", e);
                self.presenter.on_transient_message(
                    "Warning: System is not fully loaded. Some features may not work.",
                    Severity::Error,
                );
                Err(e.into())
            }
        }
    }

    /// Fetch and render the voice catalog, then refresh the voice status
    pub async fn load_voices(&self) -> Result<VoiceCatalog, StudioError> {
        let Some(_guard) = InFlight::try_enter(&self.loading_voices) else {
            return Err(StudioError::Busy("voice catalog load"));
        };

        let response = match self.transport.voices().await {
            Ok(response) => response,
            Err(e) => {
                error!("Error loading voices: {}", e);
                self.presenter
                    .on_transient_message("Could not load available voices.", Severity::Error);
                return Err(e.into());
            }
        };

        let catalog = VoiceCatalog::from_descriptors(response.voices);
        info!(
            "Loaded {} voice(s) ({} yours)",
            catalog.len(),
            catalog.user_voices.len()
        );
        self.session.set_catalog(catalog.clone()).await;

        if self.session.session_id().await.is_some() {
            if let Err(e) = self.refresh_voice_status().await {
                debug!("Voice status refresh after catalog load failed: {}", e);
            }
        }

        Ok(catalog)
    }

    /// Ask the service whether the session's voice has been processed
    pub async fn refresh_voice_status(&self) -> Result<Reconcile, StudioError> {
        let Some(_guard) = InFlight::try_enter(&self.checking_status) else {
            return Err(StudioError::Busy("voice status check"));
        };
        let Some(session_id) = self.session.session_id().await else {
            return Err(StudioError::NoSession);
        };

        let ticket = self.session.issue(RequestKind::VoiceStatus).await;
        let status = match self.transport.voice_status(&session_id).await {
            Ok(status) => status,
            Err(e) => {
                // not user-visible; the previous state stays authoritative
                error!("Error checking voice status: {}", e);
                return Err(e.into());
            }
        };

        let reconcile = self
            .session
            .record_voice_status(ticket, status.has_voice, status.error.clone())
            .await;
        if reconcile == Reconcile::Discarded {
            return Ok(reconcile);
        }

        if status.has_voice {
            self.presenter.on_transient_message(
                "Your voice sample is ready for adaptation!",
                Severity::Success,
            );
        } else if let Some(err) = &status.error {
            if err.kind == ErrorKind::MissingDependency
                && !status.ffmpeg_available
                && self.notices.first_time(err)
            {
                self.presenter.on_transient_message(
                    "Voice adaptation requires FFmpeg. Please install it to use this feature.",
                    Severity::Error,
                );
            }
        }

        Ok(reconcile)
    }

    pub async fn start_recording(&self) -> Result<StartOutcome, StudioError> {
        Ok(self.recorder.start().await?)
    }

    /// Returns whether a capture was actually stopped
    pub async fn stop_recording(&self) -> bool {
        self.recorder.stop().await
    }

    /// Wait until the current capture has been uploaded and released.
    ///
    /// `None` when no capture was started since the last wait.
    pub async fn wait_for_recording(&self) -> Option<AttemptOutcome> {
        self.recorder.wait_finished().await
    }

    /// Returns the effective value, which is false without a processed voice
    pub async fn set_adaptation(&self, enabled: bool) -> bool {
        let effective = self.session.set_adaptation_preference(enabled).await;
        info!(
            "Voice adaptation {}",
            if effective { "enabled" } else { "disabled" }
        );
        effective
    }

    /// Synthesize `text` with the session's effective adaptation flag.
    ///
    /// `voice_id = None` leaves the choice of voice to the service.
    pub async fn synthesize(
        &self,
        text: &str,
        voice_id: Option<&str>,
    ) -> Result<SynthesisOutcome, StudioError> {
        let Some(_guard) = InFlight::try_enter(&self.synthesizing) else {
            debug!("Synthesis already in progress; ignoring request");
            return Err(StudioError::Busy("synthesis"));
        };

        let session = self.session.snapshot().await;
        let result = self
            .synthesizer
            .synthesize(text, voice_id, &session, session.adaptation_enabled)
            .await;

        let outcome = match result {
            Ok(outcome) => outcome,
            Err(SynthesisError::Validation(e)) => {
                self.presenter
                    .on_transient_message("Please enter text to synthesize.", Severity::Error);
                return Err(SynthesisError::Validation(e).into());
            }
            Err(SynthesisError::Failed(reason)) => {
                error!("Error synthesizing voice: {}", reason);
                let failed = SynthesisOutcome::failed(reason.clone());
                self.presenter.on_synthesis_outcome(&failed);
                self.presenter.on_transient_message(
                    &format!("Failed to synthesize speech: {}", reason.message),
                    Severity::Error,
                );
                *self.last_outcome.lock().await = Some(failed);
                return Err(SynthesisError::Failed(reason).into());
            }
        };

        self.presenter.on_synthesis_outcome(&outcome);
        if let Some(reason) = &outcome.failure_reason {
            if reason.kind == ErrorKind::MissingDependency && self.notices.first_time(reason) {
                let remedy = reason.remedy.as_deref().unwrap_or_default();
                self.presenter.on_transient_message(
                    &format!("{} Solution: {}", reason.message, remedy),
                    Severity::Error,
                );
            } else if reason.kind != ErrorKind::MissingDependency {
                warn!("Voice adaptation not applied: {}", reason.message);
            }
        }
        self.presenter
            .on_transient_message("Speech synthesized successfully!", Severity::Success);

        *self.last_outcome.lock().await = Some(outcome.clone());
        Ok(outcome)
    }

    /// Fetch the audio of an outcome, preferring its download locator
    pub async fn download_audio(&self, outcome: &SynthesisOutcome) -> Result<Vec<u8>, StudioError> {
        let url = outcome
            .download_ref
            .as_deref()
            .or(outcome.audio_ref.as_deref())
            .ok_or(StudioError::NoAudio)?;

        match self.transport.download(url).await {
            Ok(bytes) => Ok(bytes),
            Err(e) => {
                self.presenter.on_transient_message(
                    "Error playing audio. Please use the download link instead.",
                    Severity::Error,
                );
                Err(e.into())
            }
        }
    }

    /// Drop the persisted session id; the next process starts fresh
    pub fn forget_session(&self) -> anyhow::Result<()> {
        self.session.forget()
    }

    pub async fn session(&self) -> Session {
        self.session.snapshot().await
    }

    pub async fn catalog(&self) -> VoiceCatalog {
        self.session.catalog().await
    }

    pub async fn last_outcome(&self) -> Option<SynthesisOutcome> {
        self.last_outcome.lock().await.clone()
    }
}
