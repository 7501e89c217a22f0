//! Presentation adapter seam
//!
//! The core never renders anything itself. It calls a `Presenter` with
//! fire-and-forget notifications, in the causal order of the calls that
//! produced them.

use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::sync::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::error::{ErrorKind, StructuredError};
use crate::session::{Session, VoiceCatalog};
use crate::synthesis::SynthesisOutcome;

/// Severity of a transient user-facing message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Success,
    Warning,
    Error,
}

/// Recording progress as shown to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordingStatus {
    Capturing,
    Finalizing,
    Uploading,
    Uploaded,
    Failed,
}

impl fmt::Display for RecordingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RecordingStatus::Capturing => "capturing",
            RecordingStatus::Finalizing => "finalizing",
            RecordingStatus::Uploading => "uploading",
            RecordingStatus::Uploaded => "uploaded",
            RecordingStatus::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// Rendering collaborator. Implementations must not block.
pub trait Presenter: Send + Sync {
    fn on_session_changed(&self, session: &Session);

    fn on_voice_catalog(&self, catalog: &VoiceCatalog);

    fn on_recording_status(&self, status: RecordingStatus, message: &str);

    fn on_synthesis_outcome(&self, outcome: &SynthesisOutcome);

    fn on_transient_message(&self, text: &str, severity: Severity);
}

/// Remembers which persistent failures were already surfaced
///
/// A missing dependency stays missing until the operator acts, so the same
/// prompt is shown once per process. Retryable kinds always pass.
#[derive(Debug, Default)]
pub struct NoticeFilter {
    seen: Mutex<HashSet<String>>,
}

impl NoticeFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// True if `err` should be shown now
    pub fn first_time(&self, err: &StructuredError) -> bool {
        if err.kind.is_retryable() {
            return true;
        }
        match self.seen.lock() {
            Ok(mut seen) => seen.insert(err.message.clone()),
            // a poisoned set only costs a duplicate prompt
            Err(_) => true,
        }
    }
}

/// Notification forwarded by `ChannelPresenter`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum UiEvent {
    SessionChanged(Session),
    VoiceCatalog(VoiceCatalog),
    RecordingStatus {
        status: RecordingStatus,
        message: String,
    },
    SynthesisOutcome(SynthesisOutcome),
    TransientMessage {
        text: String,
        severity: Severity,
    },
}

/// Presenter that forwards every notification over a channel
///
/// Lets an embedding host (or a test) drive its own rendering loop.
pub struct ChannelPresenter {
    tx: mpsc::UnboundedSender<UiEvent>,
}

impl ChannelPresenter {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<UiEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn send(&self, event: UiEvent) {
        if self.tx.send(event).is_err() {
            debug!("UI event receiver dropped");
        }
    }
}

impl Presenter for ChannelPresenter {
    fn on_session_changed(&self, session: &Session) {
        self.send(UiEvent::SessionChanged(session.clone()));
    }

    fn on_voice_catalog(&self, catalog: &VoiceCatalog) {
        self.send(UiEvent::VoiceCatalog(catalog.clone()));
    }

    fn on_recording_status(&self, status: RecordingStatus, message: &str) {
        self.send(UiEvent::RecordingStatus {
            status,
            message: message.to_string(),
        });
    }

    fn on_synthesis_outcome(&self, outcome: &SynthesisOutcome) {
        self.send(UiEvent::SynthesisOutcome(outcome.clone()));
    }

    fn on_transient_message(&self, text: &str, severity: Severity) {
        self.send(UiEvent::TransientMessage {
            text: text.to_string(),
            severity,
        });
    }
}

/// Presenter that renders to the log (used by the CLI)
#[derive(Debug, Default)]
pub struct LogPresenter;

impl Presenter for LogPresenter {
    fn on_session_changed(&self, session: &Session) {
        info!(
            "Session {}: voice={:?} adaptation={}",
            session.session_id.as_deref().unwrap_or("<none>"),
            session.voice,
            if session.adaptation_enabled { "on" } else { "off" }
        );
    }

    fn on_voice_catalog(&self, catalog: &VoiceCatalog) {
        if !catalog.user_voices.is_empty() {
            info!("Your voice:");
            for voice in &catalog.user_voices {
                info!("  {} ({})", voice.display_name, voice.id);
            }
        }
        if !catalog.ai_voices.is_empty() {
            info!("AI voices:");
            for voice in &catalog.ai_voices {
                info!("  {} ({})", voice.display_name, voice.id);
            }
        }
    }

    fn on_recording_status(&self, status: RecordingStatus, message: &str) {
        match status {
            RecordingStatus::Failed => error!("[{}] {}", status, message),
            _ => info!("[{}] {}", status, message),
        }
    }

    fn on_synthesis_outcome(&self, outcome: &SynthesisOutcome) {
        if let Some(url) = &outcome.audio_ref {
            info!("Audio: {}", url);
        }
        if let Some(url) = &outcome.download_ref {
            info!("Download: {}", url);
        }
        match (&outcome.failure_reason, outcome.adaptation_applied) {
            (_, true) => info!("Voice adaptation applied"),
            (Some(reason), false) if reason.kind == ErrorKind::MissingDependency => {
                warn!("{}", reason.message);
                if let Some(remedy) = &reason.remedy {
                    warn!("Solution: {}", remedy);
                }
            }
            (Some(reason), false) => {
                warn!("Voice adaptation not applied: {}", reason.message)
            }
            (None, false) => info!("Using AI voice only (no adaptation)"),
        }
    }

    fn on_transient_message(&self, text: &str, severity: Severity) {
        match severity {
            Severity::Success => info!("{}", text),
            Severity::Warning => warn!("{}", text),
            Severity::Error => error!("{}", text),
        }
    }
}
