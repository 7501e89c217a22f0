use tokio::sync::mpsc;
use tracing::debug;

use crate::error::CaptureError;

/// Platform microphone capability
///
/// Acquiring corresponds to the permission prompt / device open. Failures
/// here leave the recorder idle.
#[async_trait::async_trait]
pub trait CaptureProvider: Send + Sync {
    async fn acquire(&self) -> Result<Box<dyn CaptureBackend>, CaptureError>;
}

/// An acquired capture device
///
/// Implementations:
/// - `WavFileCapture`: replays a WAV file (CLI, tests)
/// - Embedding hosts wrap their platform recorder
#[async_trait::async_trait]
pub trait CaptureBackend: Send {
    /// Start capturing
    ///
    /// Returns a channel receiver that will receive encoded chunks, in order.
    async fn start(&mut self) -> Result<mpsc::Receiver<Vec<u8>>, CaptureError>;

    /// Flush buffered audio onto the chunk channel, then close it
    async fn finish(&mut self) -> Result<(), CaptureError>;

    /// Stop all underlying tracks. Must be idempotent and must not block.
    fn release(&mut self);

    /// Get backend name for logging
    fn name(&self) -> &str;
}

/// Exclusive ownership of an acquired device
///
/// The device is released when the lease drops, on every exit path.
pub struct DeviceLease {
    backend: Box<dyn CaptureBackend>,
}

impl DeviceLease {
    pub fn new(backend: Box<dyn CaptureBackend>) -> Self {
        Self { backend }
    }

    pub fn backend(&mut self) -> &mut dyn CaptureBackend {
        self.backend.as_mut()
    }
}

impl Drop for DeviceLease {
    fn drop(&mut self) {
        debug!("Releasing capture device: {}", self.backend.name());
        self.backend.release();
    }
}
