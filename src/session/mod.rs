//! Session management
//!
//! This module owns the single source of truth for:
//! - The server-assigned session identifier (persisted)
//! - Whether the user's voice has been processed
//! - The effective voice-adaptation flag
//! - The voice catalog

mod catalog;
mod handle;
mod state;
mod store;

pub use catalog::VoiceCatalog;
pub use handle::SessionHandle;
pub use state::{Reconcile, RequestKind, Session, SessionState, Ticket, VoiceState};
pub use store::{FileStore, KeyValueStore, MemoryStore, USER_ID_KEY};
