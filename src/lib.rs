pub mod api;
pub mod config;
pub mod error;
pub mod presentation;
pub mod recording;
pub mod session;
pub mod studio;
pub mod synthesis;

#[cfg(test)]
mod testing;

pub use api::{HttpTransport, Transport, VoiceDescriptor};
pub use config::Config;
pub use error::{
    CaptureError, ErrorKind, RecordingError, StructuredError, TransportError, ValidationError,
};
pub use presentation::{
    ChannelPresenter, LogPresenter, NoticeFilter, Presenter, RecordingStatus, Severity, UiEvent,
};
pub use recording::{
    AttemptOutcome, CaptureBackend, CaptureProvider, RecorderState, RecordingController,
    StartOutcome, UploadReceipt, WavFileProvider,
};
pub use session::{
    FileStore, KeyValueStore, MemoryStore, Reconcile, Session, SessionHandle, VoiceCatalog,
    VoiceState,
};
pub use studio::{StudioError, VoiceStudio};
pub use synthesis::{SynthesisCoordinator, SynthesisError, SynthesisOutcome};
