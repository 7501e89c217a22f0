//! Voice sample recording
//!
//! This module provides:
//! - The capture capability seam (`CaptureProvider` / `CaptureBackend`)
//! - A WAV-file capture backend
//! - The `RecordingController` state machine with its 15s deadline
//!   and the outcome of each attempt
//! - The upload step that reconciles the session

mod capture;
mod controller;
mod file;
mod session;
mod upload;

pub use capture::{CaptureBackend, CaptureProvider, DeviceLease};
pub use controller::{AttemptOutcome, RecorderState, RecordingController, StartOutcome};
pub use file::{encode_wav, WavClip, WavFileCapture, WavFileProvider};
pub use session::RecordingSession;
pub use upload::{upload_sample, UploadReceipt};
