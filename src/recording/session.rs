use chrono::{DateTime, Utc};

/// One capture attempt's buffered audio
///
/// Consumed by `into_sample` when the upload starts, which releases the
/// chunks whatever the upload's outcome.
#[derive(Debug)]
pub struct RecordingSession {
    started_at: DateTime<Utc>,
    chunks: Vec<Vec<u8>>,
    bytes: usize,
}

impl RecordingSession {
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            chunks: Vec::new(),
            bytes: 0,
        }
    }

    /// Append a chunk; empty chunks are dropped
    pub fn push(&mut self, chunk: Vec<u8>) {
        if chunk.is_empty() {
            return;
        }
        self.bytes += chunk.len();
        self.chunks.push(chunk);
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn byte_count(&self) -> usize {
        self.bytes
    }

    pub fn is_empty(&self) -> bool {
        self.bytes == 0
    }

    /// Concatenate the chunks, in arrival order, into one sample blob
    pub fn into_sample(self) -> Vec<u8> {
        let mut sample = Vec::with_capacity(self.bytes);
        for chunk in self.chunks {
            sample.extend_from_slice(&chunk);
        }
        sample
    }
}

impl Default for RecordingSession {
    fn default() -> Self {
        Self::new()
    }
}
