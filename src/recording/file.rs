// File-backed capture device: replays a WAV file at real-time pace

use hound::{WavReader, WavSpec, WavWriter};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{error, info};

use super::capture::{CaptureBackend, CaptureProvider};
use crate::error::CaptureError;

/// Decoded contents of a WAV file
#[derive(Debug, Clone)]
pub struct WavClip {
    pub spec: WavSpec,
    /// Interleaved 16-bit PCM
    pub samples: Vec<i16>,
}

impl WavClip {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CaptureError> {
        let path = path.as_ref();
        let reader = WavReader::open(path).map_err(|e| {
            CaptureError::DeviceUnavailable(format!("{}: {}", path.display(), e))
        })?;

        let spec = reader.spec();
        if spec.bits_per_sample != 16 || spec.sample_format != hound::SampleFormat::Int {
            return Err(CaptureError::DeviceUnavailable(format!(
                "{}: expected 16-bit PCM, got {}-bit {:?}",
                path.display(),
                spec.bits_per_sample,
                spec.sample_format
            )));
        }

        let samples = reader
            .into_samples::<i16>()
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| CaptureError::Failed(format!("{}: {}", path.display(), e)))?;

        Ok(Self { spec, samples })
    }

    pub fn duration_seconds(&self) -> f64 {
        self.samples.len() as f64 / (self.spec.sample_rate as f64 * self.spec.channels as f64)
    }

    /// Interleaved samples covering `duration`
    fn samples_per(&self, duration: Duration) -> usize {
        let per_second = self.spec.sample_rate as u128 * self.spec.channels as u128;
        ((per_second * duration.as_millis()) / 1000).max(1) as usize
    }
}

/// Encode PCM samples as a complete WAV blob
pub fn encode_wav(samples: &[i16], spec: WavSpec) -> Result<Vec<u8>, hound::Error> {
    let mut buf = Vec::new();
    {
        let mut writer = WavWriter::new(Cursor::new(&mut buf), spec)?;
        for &sample in samples {
            writer.write_sample(sample)?;
        }
        writer.finalize()?;
    }
    Ok(buf)
}

/// Provider that "opens the microphone" by loading a WAV file
#[derive(Debug, Clone)]
pub struct WavFileProvider {
    path: PathBuf,
    chunk: Duration,
}

impl WavFileProvider {
    pub fn new(path: impl Into<PathBuf>, chunk: Duration) -> Self {
        Self {
            path: path.into(),
            chunk,
        }
    }
}

#[async_trait::async_trait]
impl CaptureProvider for WavFileProvider {
    async fn acquire(&self) -> Result<Box<dyn CaptureBackend>, CaptureError> {
        let path = self.path.clone();
        let clip = tokio::task::spawn_blocking(move || WavClip::open(path))
            .await
            .map_err(|e| CaptureError::Failed(format!("WAV loader panicked: {}", e)))??;

        info!(
            "Capture source loaded: {} ({:.1}s, {}Hz, {} channels)",
            self.path.display(),
            clip.duration_seconds(),
            clip.spec.sample_rate,
            clip.spec.channels
        );

        Ok(Box::new(WavFileCapture::new(clip, self.chunk)))
    }
}

/// Capture backend that plays back a clip as if it were live input
///
/// Like a platform recorder without a timeslice, it emits a single encoded
/// WAV chunk when finished (or when the clip runs out).
pub struct WavFileCapture {
    clip: Option<WavClip>,
    chunk: Duration,
    stop_tx: Option<oneshot::Sender<()>>,
    track: Option<JoinHandle<()>>,
}

impl WavFileCapture {
    pub fn new(clip: WavClip, chunk: Duration) -> Self {
        Self {
            clip: Some(clip),
            chunk,
            stop_tx: None,
            track: None,
        }
    }

    async fn play(
        clip: WavClip,
        chunk: Duration,
        mut stop_rx: oneshot::Receiver<()>,
        chunk_tx: mpsc::Sender<Vec<u8>>,
    ) {
        let step = clip.samples_per(chunk);
        let mut captured = 0usize;
        let mut ticker = tokio::time::interval(chunk);

        while captured < clip.samples.len() {
            tokio::select! {
                _ = ticker.tick() => {
                    captured = (captured + step).min(clip.samples.len());
                }
                _ = &mut stop_rx => break,
            }
        }

        // keep whole frames only
        let channels = clip.spec.channels.max(1) as usize;
        let captured = captured - captured % channels;

        match encode_wav(&clip.samples[..captured], clip.spec) {
            Ok(blob) => {
                if chunk_tx.send(blob).await.is_err() {
                    error!("Capture consumer went away before the final chunk");
                }
            }
            Err(e) => error!("Failed to encode captured audio: {}", e),
        }
        // dropping chunk_tx closes the stream
    }
}

#[async_trait::async_trait]
impl CaptureBackend for WavFileCapture {
    async fn start(&mut self) -> Result<mpsc::Receiver<Vec<u8>>, CaptureError> {
        let Some(clip) = self.clip.take() else {
            return Err(CaptureError::Failed("capture already started".to_string()));
        };

        let (chunk_tx, chunk_rx) = mpsc::channel(4);
        let (stop_tx, stop_rx) = oneshot::channel();

        self.track = Some(tokio::spawn(Self::play(clip, self.chunk, stop_rx, chunk_tx)));
        self.stop_tx = Some(stop_tx);

        Ok(chunk_rx)
    }

    async fn finish(&mut self) -> Result<(), CaptureError> {
        if let Some(stop_tx) = self.stop_tx.take() {
            // the track may already have run out on its own
            let _ = stop_tx.send(());
        }
        Ok(())
    }

    fn release(&mut self) {
        self.stop_tx = None;
        if let Some(track) = self.track.take() {
            track.abort();
        }
    }

    fn name(&self) -> &str {
        "wav-file"
    }
}
