use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::capture::{CaptureProvider, DeviceLease};
use super::session::RecordingSession;
use super::upload::{upload_sample, UploadReceipt};
use crate::api::Transport;
use crate::error::{CaptureError, ErrorKind, RecordingError};
use crate::presentation::{NoticeFilter, Presenter, RecordingStatus, Severity};
use crate::session::{Reconcile, SessionHandle};

/// Upper bound on waiting for a device to flush after stop
const FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

/// How a finished capture attempt ended
pub type AttemptOutcome = Result<UploadReceipt, RecordingError>;

/// Recorder lifecycle: `Idle -> Acquiring -> Capturing -> Finalizing -> Idle`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderState {
    Idle,
    /// Waiting on the device (and its permission prompt); falls back to `Idle`
    /// if acquisition fails
    Acquiring,
    Capturing,
    /// Flushing, uploading and releasing the device
    Finalizing,
}

/// Result of a start request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    /// A capture is already in progress; nothing was acquired
    AlreadyRecording,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StopReason {
    Manual,
    Deadline,
    DeviceEnded,
}

struct Inner {
    state: RecorderState,
    started_at: Option<DateTime<Utc>>,
    stop_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<AttemptOutcome>>,
}

/// Drives capture start/stop, the maximum-duration deadline and the upload
/// of the finished sample.
///
/// Only one capture may be active. The device is owned by the capture task
/// for the whole `Capturing` + `Finalizing` span and released when it ends.
#[derive(Clone)]
pub struct RecordingController {
    inner: Arc<Mutex<Inner>>,
    provider: Arc<dyn CaptureProvider>,
    transport: Arc<dyn Transport>,
    session: SessionHandle,
    presenter: Arc<dyn Presenter>,
    notices: Arc<NoticeFilter>,
    max_duration: Duration,
}

impl RecordingController {
    pub fn new(
        provider: Arc<dyn CaptureProvider>,
        transport: Arc<dyn Transport>,
        session: SessionHandle,
        presenter: Arc<dyn Presenter>,
        notices: Arc<NoticeFilter>,
        max_duration: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                state: RecorderState::Idle,
                started_at: None,
                stop_tx: None,
                task: None,
            })),
            provider,
            transport,
            session,
            presenter,
            notices,
            max_duration,
        }
    }

    pub async fn state(&self) -> RecorderState {
        self.inner.lock().await.state
    }

    pub async fn started_at(&self) -> Option<DateTime<Utc>> {
        self.inner.lock().await.started_at
    }

    /// Start capturing
    ///
    /// A start while acquiring, capturing or finalizing is a benign no-op.
    /// The state lock is not held while the device is being acquired.
    pub async fn start(&self) -> Result<StartOutcome, CaptureError> {
        {
            let mut inner = self.inner.lock().await;
            if inner.state != RecorderState::Idle {
                info!("Recording already in progress ({:?})", inner.state);
                self.presenter
                    .on_transient_message("Already recording.", Severity::Warning);
                return Ok(StartOutcome::AlreadyRecording);
            }
            inner.state = RecorderState::Acquiring;
        }

        let acquired = self.acquire().await;

        let mut inner = self.inner.lock().await;
        let (mut lease, chunk_rx) = match acquired {
            Ok(acquired) => acquired,
            Err(e) => {
                inner.state = RecorderState::Idle;
                drop(inner);
                self.report_capture_error(&e);
                return Err(e);
            }
        };

        info!(
            "Recording started on {} (max {:?})",
            lease.backend().name(),
            self.max_duration
        );

        let (stop_tx, stop_rx) = oneshot::channel();
        inner.state = RecorderState::Capturing;
        inner.started_at = Some(Utc::now());
        inner.stop_tx = Some(stop_tx);

        self.presenter.on_recording_status(
            RecordingStatus::Capturing,
            "Recording... Speak clearly for 10-15 seconds.",
        );

        let this = self.clone();
        inner.task = Some(tokio::spawn(async move {
            this.run(lease, chunk_rx, stop_rx).await
        }));

        Ok(StartOutcome::Started)
    }

    async fn acquire(&self) -> Result<(DeviceLease, mpsc::Receiver<Vec<u8>>), CaptureError> {
        let backend = self.provider.acquire().await?;
        let mut lease = DeviceLease::new(backend);
        // on error the lease drops here, releasing the device
        let chunk_rx = lease.backend().start().await?;
        Ok((lease, chunk_rx))
    }

    /// Stop capturing. Only acts while `Capturing`; returns whether it did.
    pub async fn stop(&self) -> bool {
        let mut inner = self.inner.lock().await;
        if inner.state != RecorderState::Capturing {
            debug!("Stop ignored while {:?}", inner.state);
            return false;
        }

        info!("Recording stopped by user");
        self.begin_finalizing(&mut inner);
        if let Some(stop_tx) = inner.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        true
    }

    /// Wait for the current capture to be uploaded and released.
    ///
    /// Returns `None` when no capture was started since the last wait.
    pub async fn wait_finished(&self) -> Option<AttemptOutcome> {
        let task = self.inner.lock().await.task.take()?;
        match task.await {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                error!("Capture task panicked: {}", e);
                Some(Err(RecordingError::Aborted(e.to_string())))
            }
        }
    }

    fn begin_finalizing(&self, inner: &mut Inner) {
        inner.state = RecorderState::Finalizing;
        self.presenter
            .on_recording_status(RecordingStatus::Finalizing, "Processing...");
    }

    async fn run(
        self,
        mut lease: DeviceLease,
        mut chunk_rx: mpsc::Receiver<Vec<u8>>,
        mut stop_rx: oneshot::Receiver<()>,
    ) -> AttemptOutcome {
        let mut recording = RecordingSession::new();
        let deadline = tokio::time::sleep(self.max_duration);
        tokio::pin!(deadline);

        let reason = loop {
            tokio::select! {
                chunk = chunk_rx.recv() => match chunk {
                    Some(chunk) => recording.push(chunk),
                    None => break StopReason::DeviceEnded,
                },
                _ = &mut stop_rx => break StopReason::Manual,
                _ = &mut deadline => break StopReason::Deadline,
            }
        };

        if reason != StopReason::Manual {
            let mut inner = self.inner.lock().await;
            if inner.state == RecorderState::Capturing {
                match reason {
                    StopReason::Deadline => {
                        info!("Maximum recording duration reached; stopping")
                    }
                    _ => warn!("Capture device ended the stream"),
                }
                inner.stop_tx = None;
                self.begin_finalizing(&mut inner);
            }
        }

        if reason != StopReason::DeviceEnded {
            if let Err(e) = lease.backend().finish().await {
                warn!("Capture device failed to flush: {}", e);
            }
            let drain = async {
                while let Some(chunk) = chunk_rx.recv().await {
                    recording.push(chunk);
                }
            };
            if tokio::time::timeout(FLUSH_TIMEOUT, drain).await.is_err() {
                warn!("Capture device did not close its stream; using what was received");
            }
        }

        info!(
            "Captured {} bytes in {} chunk(s) since {}",
            recording.byte_count(),
            recording.chunk_count(),
            recording.started_at().format("%H:%M:%S")
        );

        let outcome = if recording.is_empty() {
            Err(RecordingError::NoAudio)
        } else {
            self.presenter
                .on_recording_status(RecordingStatus::Uploading, "Uploading voice sample...");
            let sample = recording.into_sample();
            let result = upload_sample(self.transport.as_ref(), &self.session, sample).await;
            let has_session = self.session.session_id().await.is_some();
            match result {
                Ok(receipt) if receipt.reconcile == Reconcile::Discarded && !has_session => {
                    Err(RecordingError::NoSession)
                }
                Ok(receipt) => Ok(receipt),
                Err(e) => Err(e.into()),
            }
        };
        self.report_attempt(&outcome);

        // release before going idle so a new start cannot race the old device
        drop(lease);

        let mut inner = self.inner.lock().await;
        inner.state = RecorderState::Idle;
        inner.started_at = None;
        inner.stop_tx = None;
        drop(inner);

        debug!("Recorder idle");
        outcome
    }

    fn report_capture_error(&self, e: &CaptureError) {
        error!("Error accessing microphone: {}", e);
        self.presenter
            .on_recording_status(RecordingStatus::Failed, &format!("Error: {}", e));
        self.presenter.on_transient_message(
            "Cannot access microphone. Please check permissions.",
            Severity::Error,
        );
    }

    fn report_attempt(&self, outcome: &AttemptOutcome) {
        let receipt = match outcome {
            Ok(receipt) => receipt,
            Err(RecordingError::NoAudio) => {
                self.presenter
                    .on_recording_status(RecordingStatus::Failed, "Error: no audio was captured");
                self.presenter.on_transient_message(
                    "No audio was captured. Please try again.",
                    Severity::Error,
                );
                return;
            }
            Err(e) => {
                error!("Error uploading voice sample: {}", e);
                self.presenter
                    .on_recording_status(RecordingStatus::Failed, &format!("Error: {}", e));
                self.presenter
                    .on_transient_message(&format!("Failed to process voice: {}", e), Severity::Error);
                return;
            }
        };

        info!(
            "Upload accepted for session {} (processed={})",
            receipt.session_id, receipt.voice_processed
        );
        if receipt.voice_processed {
            self.presenter.on_recording_status(
                RecordingStatus::Uploaded,
                "Voice sample uploaded successfully!",
            );
            self.presenter.on_transient_message(
                "Your voice has been processed and is ready for adaptation! You can now synthesize text.",
                Severity::Success,
            );
            return;
        }

        match &receipt.error {
            Some(err) => {
                self.presenter
                    .on_recording_status(RecordingStatus::Uploaded, &format!("Error: {}", err.message));
                if err.kind == ErrorKind::MissingDependency {
                    if self.notices.first_time(err) {
                        let remedy = err.remedy.as_deref().unwrap_or_default();
                        self.presenter.on_transient_message(
                            &format!("Voice processing failed: {}. {}", err.message, remedy),
                            Severity::Error,
                        );
                    }
                } else {
                    self.presenter.on_transient_message(
                        &format!(
                            "Voice sample uploaded, but could not be processed for adaptation: {}",
                            err.message
                        ),
                        Severity::Warning,
                    );
                }
            }
            None => {
                self.presenter.on_recording_status(
                    RecordingStatus::Uploaded,
                    "Voice sample uploaded successfully!",
                );
                self.presenter.on_transient_message(
                    "Voice sample uploaded, but could not be processed for adaptation. Using AI voices only.",
                    Severity::Warning,
                );
            }
        }
    }
}
