use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::StructuredError;

/// Where the session stands with respect to the user's processed voice
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "error", rename_all = "snake_case")]
pub enum VoiceState {
    /// No session id yet
    Unknown,
    /// Id known, voice status not checked yet
    Uninitialized,
    VoiceReady,
    VoicePending,
    VoiceFailed(StructuredError),
}

/// Snapshot handed to the presentation layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    pub session_id: Option<String>,
    /// Only ever set from a server response
    pub has_processed_voice: bool,
    /// Never true while `has_processed_voice` is false
    pub adaptation_enabled: bool,
    pub voice: VoiceState,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            session_id: None,
            has_processed_voice: false,
            adaptation_enabled: false,
            voice: VoiceState::Unknown,
        }
    }
}

/// Which kind of request a ticket was issued for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Upload,
    VoiceStatus,
}

/// Monotonic sequence number attached to a request when it is issued
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    seq: u64,
    kind: RequestKind,
}

impl Ticket {
    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn kind(&self) -> RequestKind {
        self.kind
    }
}

/// Result of reconciling one server response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconcile {
    /// Session changed; observers should be notified
    Applied,
    /// Response accepted but the session already matched it
    Unchanged,
    /// Response predates state already applied, or was unusable
    Discarded,
}

/// Session state machine
///
/// Responses are applied in completion order, guarded by tickets:
/// - an upload response applies unless a newer upload was already applied
/// - a voice-status response applies only if nothing newer (upload or
///   status) was applied before it
///
/// Uploads are writes and therefore dominate status reads issued while they
/// were in flight.
#[derive(Debug, Default)]
pub struct SessionState {
    session: Session,
    next_seq: u64,
    last_upload_seq: u64,
    last_applied_seq: u64,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Issue a ticket for a request that is about to be sent
    pub fn issue(&mut self, kind: RequestKind) -> Ticket {
        self.next_seq += 1;
        Ticket {
            seq: self.next_seq,
            kind,
        }
    }

    /// Adopt a persisted id: `Unknown -> Uninitialized`.
    ///
    /// Ignored once an id is held.
    pub fn restore(&mut self, session_id: &str) -> Reconcile {
        let session_id = session_id.trim();
        if session_id.is_empty() || self.session.session_id.is_some() {
            return Reconcile::Unchanged;
        }

        info!("Restored session {}", session_id);
        self.session.session_id = Some(session_id.to_string());
        self.session.voice = VoiceState::Uninitialized;
        Reconcile::Applied
    }

    /// Apply a successful upload response
    pub fn record_upload_accepted(
        &mut self,
        ticket: Ticket,
        session_id: &str,
        voice_processed: bool,
        error: Option<StructuredError>,
    ) -> Reconcile {
        if ticket.kind() != RequestKind::Upload {
            warn!("{:?} ticket #{} used for an upload response", ticket.kind(), ticket.seq);
            return Reconcile::Discarded;
        }
        if ticket.seq <= self.last_upload_seq {
            debug!(
                "Discarding upload response #{} (newer upload #{} applied)",
                ticket.seq, self.last_upload_seq
            );
            return Reconcile::Discarded;
        }

        let session_id = session_id.trim();
        match self.session.session_id.as_deref() {
            None if session_id.is_empty() => {
                warn!("Upload response #{} carried no session id", ticket.seq);
                return Reconcile::Discarded;
            }
            Some(held) if !session_id.is_empty() && held != session_id => {
                warn!(
                    "Service answered with session {} but {} is already assigned; keeping it",
                    session_id, held
                );
            }
            _ => {}
        }

        self.last_upload_seq = ticket.seq;
        self.last_applied_seq = self.last_applied_seq.max(ticket.seq);

        let before = self.session.clone();
        if self.session.session_id.is_none() {
            info!("Session {} assigned", session_id);
            self.session.session_id = Some(session_id.to_string());
        }
        self.apply_voice(voice_processed, error);

        self.outcome(before)
    }

    /// Apply a voice-status query response
    pub fn record_voice_status(
        &mut self,
        ticket: Ticket,
        has_voice: bool,
        error: Option<StructuredError>,
    ) -> Reconcile {
        if ticket.kind() != RequestKind::VoiceStatus {
            warn!("{:?} ticket #{} used for a voice status response", ticket.kind(), ticket.seq);
            return Reconcile::Discarded;
        }
        if ticket.seq <= self.last_applied_seq {
            debug!(
                "Discarding stale voice status #{} (#{} already applied)",
                ticket.seq, self.last_applied_seq
            );
            return Reconcile::Discarded;
        }
        if self.session.session_id.is_none() {
            debug!("Voice status #{} without a session; ignoring", ticket.seq);
            return Reconcile::Discarded;
        }

        self.last_applied_seq = ticket.seq;

        let before = self.session.clone();
        self.apply_voice(has_voice, error);
        self.outcome(before)
    }

    /// Set the user's adaptation wish and return the effective value
    pub fn set_adaptation_preference(&mut self, enabled: bool) -> bool {
        self.session.adaptation_enabled = enabled && self.session.has_processed_voice;
        self.session.adaptation_enabled
    }

    fn apply_voice(&mut self, has_voice: bool, error: Option<StructuredError>) {
        let was_ready = self.session.has_processed_voice;
        self.session.has_processed_voice = has_voice;

        self.session.voice = match (has_voice, error) {
            (true, Some(stale)) => {
                // an earlier embedding is still usable
                debug!("Voice ready despite reported error: {}", stale);
                VoiceState::VoiceReady
            }
            (true, None) => VoiceState::VoiceReady,
            (false, Some(error)) => VoiceState::VoiceFailed(error),
            (false, None) => VoiceState::VoicePending,
        };

        if !has_voice {
            self.session.adaptation_enabled = false;
        } else if !was_ready {
            // adaptation switches on when a voice first becomes available
            self.session.adaptation_enabled = true;
        }
    }

    fn outcome(&self, before: Session) -> Reconcile {
        if before == self.session {
            Reconcile::Unchanged
        } else {
            Reconcile::Applied
        }
    }
}
