//! In-memory collaborators for unit tests

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::api::{
    HealthResponse, SynthesizeRequest, SynthesizeResponse, Transport, UploadRequest,
    UploadResponse, VoiceStatusResponse, VoicesResponse,
};
use crate::error::{CaptureError, TransportError};
use crate::presentation::{ChannelPresenter, UiEvent};
use crate::recording::{CaptureBackend, CaptureProvider};
use crate::session::{MemoryStore, SessionHandle};

type Scripted<T> = Mutex<VecDeque<(Duration, Result<T, TransportError>)>>;

/// Transport replaying scripted responses, each after an optional delay
#[derive(Default)]
pub struct FakeTransport {
    pub health: Mutex<Option<HealthResponse>>,
    pub voices: Mutex<Option<VoicesResponse>>,
    statuses: Scripted<VoiceStatusResponse>,
    uploads: Scripted<UploadResponse>,
    syntheses: Scripted<SynthesizeResponse>,
    pub status_queries: Mutex<Vec<String>>,
    pub upload_requests: Mutex<Vec<UploadRequest>>,
    pub synth_requests: Mutex<Vec<SynthesizeRequest>>,
}

impl FakeTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push_status(&self, delay: Duration, result: Result<VoiceStatusResponse, TransportError>) {
        self.statuses.lock().unwrap().push_back((delay, result));
    }

    pub fn push_upload(&self, delay: Duration, result: Result<UploadResponse, TransportError>) {
        self.uploads.lock().unwrap().push_back((delay, result));
    }

    pub fn push_synthesis(&self, delay: Duration, result: Result<SynthesizeResponse, TransportError>) {
        self.syntheses.lock().unwrap().push_back((delay, result));
    }

    pub fn upload_count(&self) -> usize {
        self.upload_requests.lock().unwrap().len()
    }

    pub fn synth_count(&self) -> usize {
        self.synth_requests.lock().unwrap().len()
    }

    async fn replay<T>(queue: &Scripted<T>) -> Result<T, TransportError> {
        let next = queue.lock().unwrap().pop_front();
        match next {
            Some((delay, result)) => {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                result
            }
            None => Err(TransportError::Network("no scripted response".to_string())),
        }
    }
}

#[async_trait::async_trait]
impl Transport for FakeTransport {
    async fn health(&self) -> Result<HealthResponse, TransportError> {
        self.health
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| TransportError::Network("connection refused".to_string()))
    }

    async fn voices(&self) -> Result<VoicesResponse, TransportError> {
        self.voices
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| TransportError::Status {
                status: 500,
                message: "Error getting voices".to_string(),
            })
    }

    async fn voice_status(&self, user_id: &str) -> Result<VoiceStatusResponse, TransportError> {
        self.status_queries.lock().unwrap().push(user_id.to_string());
        Self::replay(&self.statuses).await
    }

    async fn upload(&self, request: UploadRequest) -> Result<UploadResponse, TransportError> {
        self.upload_requests.lock().unwrap().push(request);
        Self::replay(&self.uploads).await
    }

    async fn synthesize(
        &self,
        request: &SynthesizeRequest,
    ) -> Result<SynthesizeResponse, TransportError> {
        self.synth_requests.lock().unwrap().push(request.clone());
        Self::replay(&self.syntheses).await
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, TransportError> {
        Ok(url.as_bytes().to_vec())
    }

    fn name(&self) -> &str {
        "fake"
    }
}

/// Counters shared by a fake microphone and every backend it hands out
#[derive(Default)]
pub struct FakeMicrophone {
    pub deny: AtomicBool,
    /// How long each acquisition takes (a pending permission prompt)
    pub acquire_delay_ms: AtomicU64,
    pub attempts: AtomicUsize,
    pub acquired: AtomicUsize,
    pub finished: AtomicUsize,
    pub released: AtomicUsize,
}

impl FakeMicrophone {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

pub struct FakeProvider(pub Arc<FakeMicrophone>);

#[async_trait::async_trait]
impl CaptureProvider for FakeProvider {
    async fn acquire(&self) -> Result<Box<dyn CaptureBackend>, CaptureError> {
        self.0.attempts.fetch_add(1, Ordering::SeqCst);
        let delay = self.0.acquire_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.0.deny.load(Ordering::SeqCst) {
            return Err(CaptureError::PermissionDenied);
        }
        self.0.acquired.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeBackend {
            mic: Arc::clone(&self.0),
            tx: None,
        }))
    }
}

/// Emits `head` on start and `tail` when finished
struct FakeBackend {
    mic: Arc<FakeMicrophone>,
    tx: Option<mpsc::Sender<Vec<u8>>>,
}

#[async_trait::async_trait]
impl CaptureBackend for FakeBackend {
    async fn start(&mut self) -> Result<mpsc::Receiver<Vec<u8>>, CaptureError> {
        let (tx, rx) = mpsc::channel(8);
        tx.try_send(b"head".to_vec())
            .map_err(|e| CaptureError::Failed(e.to_string()))?;
        self.tx = Some(tx);
        Ok(rx)
    }

    async fn finish(&mut self) -> Result<(), CaptureError> {
        self.mic.finished.fetch_add(1, Ordering::SeqCst);
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(b"tail".to_vec()).await;
        }
        Ok(())
    }

    fn release(&mut self) {
        self.mic.released.fetch_add(1, Ordering::SeqCst);
        self.tx = None;
    }

    fn name(&self) -> &str {
        "fake-mic"
    }
}

/// Session handle over a memory store, reporting to a channel presenter
pub fn session_with_events() -> (
    SessionHandle,
    Arc<ChannelPresenter>,
    mpsc::UnboundedReceiver<UiEvent>,
) {
    let (presenter, rx) = ChannelPresenter::new();
    let presenter = Arc::new(presenter);
    let session = SessionHandle::new(Arc::new(MemoryStore::new()), presenter.clone());
    (session, presenter, rx)
}

/// Everything received so far
pub fn drain(rx: &mut mpsc::UnboundedReceiver<UiEvent>) -> Vec<UiEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
