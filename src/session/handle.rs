use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::error::StructuredError;
use crate::presentation::Presenter;

use super::catalog::VoiceCatalog;
use super::state::{Reconcile, RequestKind, Session, SessionState, Ticket};
use super::store::{KeyValueStore, USER_ID_KEY};

/// Shared, single source of truth for the session
///
/// Wraps `SessionState` with persistence of the session id and change
/// notifications. Every session mutation goes through here.
#[derive(Clone)]
pub struct SessionHandle {
    state: Arc<Mutex<SessionState>>,
    catalog: Arc<Mutex<VoiceCatalog>>,
    store: Arc<dyn KeyValueStore>,
    presenter: Arc<dyn Presenter>,
}

impl SessionHandle {
    pub fn new(store: Arc<dyn KeyValueStore>, presenter: Arc<dyn Presenter>) -> Self {
        Self {
            state: Arc::new(Mutex::new(SessionState::new())),
            catalog: Arc::new(Mutex::new(VoiceCatalog::default())),
            store,
            presenter,
        }
    }

    /// Adopt the persisted session id, if any. Returns true when one was found.
    pub async fn restore(&self) -> bool {
        let persisted = match self.store.get(USER_ID_KEY) {
            Ok(value) => value,
            Err(e) => {
                warn!("Failed to read persisted session: {:#}", e);
                return false;
            }
        };
        let Some(session_id) = persisted else {
            return false;
        };

        let mut state = self.state.lock().await;
        let result = state.restore(&session_id);
        self.notify(result, state.session());
        result == Reconcile::Applied
    }

    pub async fn issue(&self, kind: RequestKind) -> Ticket {
        self.state.lock().await.issue(kind)
    }

    pub async fn snapshot(&self) -> Session {
        self.state.lock().await.session().clone()
    }

    pub async fn session_id(&self) -> Option<String> {
        self.state.lock().await.session().session_id.clone()
    }

    pub async fn record_upload_accepted(
        &self,
        ticket: Ticket,
        session_id: &str,
        voice_processed: bool,
        error: Option<StructuredError>,
    ) -> Reconcile {
        let mut state = self.state.lock().await;
        let had_id = state.session().session_id.is_some();
        let result = state.record_upload_accepted(ticket, session_id, voice_processed, error);

        if !had_id {
            if let Some(id) = &state.session().session_id {
                self.persist(id);
            }
        }
        self.notify(result, state.session());
        result
    }

    pub async fn record_voice_status(
        &self,
        ticket: Ticket,
        has_voice: bool,
        error: Option<StructuredError>,
    ) -> Reconcile {
        let mut state = self.state.lock().await;
        let result = state.record_voice_status(ticket, has_voice, error);
        self.notify(result, state.session());
        result
    }

    /// Returns the effective value after clamping
    pub async fn set_adaptation_preference(&self, enabled: bool) -> bool {
        let mut state = self.state.lock().await;
        let before = state.session().adaptation_enabled;
        let effective = state.set_adaptation_preference(enabled);
        if effective != before {
            self.presenter.on_session_changed(state.session());
        }
        effective
    }

    /// Replace the catalog and render it
    pub async fn set_catalog(&self, catalog: VoiceCatalog) {
        let mut current = self.catalog.lock().await;
        *current = catalog;
        self.presenter.on_voice_catalog(&current);
    }

    pub async fn catalog(&self) -> VoiceCatalog {
        self.catalog.lock().await.clone()
    }

    /// Drop the persisted id. The in-memory session keeps its id until exit.
    pub fn forget(&self) -> anyhow::Result<()> {
        self.store.remove(USER_ID_KEY)?;
        info!("Forgot persisted session");
        Ok(())
    }

    fn persist(&self, session_id: &str) {
        if let Err(e) = self.store.set(USER_ID_KEY, session_id) {
            warn!("Failed to persist session {}: {:#}", session_id, e);
        }
    }

    fn notify(&self, result: Reconcile, session: &Session) {
        if result == Reconcile::Applied {
            self.presenter.on_session_changed(session);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presentation::{ChannelPresenter, UiEvent};
    use crate::session::store::MemoryStore;
    use crate::session::VoiceState;

    fn handle_with_store(store: Arc<MemoryStore>) -> (SessionHandle, tokio::sync::mpsc::UnboundedReceiver<UiEvent>) {
        let (presenter, rx) = ChannelPresenter::new();
        (SessionHandle::new(store, Arc::new(presenter)), rx)
    }

    #[tokio::test]
    async fn test_first_upload_persists_session_id() {
        let store = Arc::new(MemoryStore::new());
        let (handle, mut rx) = handle_with_store(Arc::clone(&store));

        let ticket = handle.issue(RequestKind::Upload).await;
        handle.record_upload_accepted(ticket, "abc", true, None).await;

        assert_eq!(store.get(USER_ID_KEY).unwrap().as_deref(), Some("abc"));
        match rx.try_recv() {
            Ok(UiEvent::SessionChanged(session)) => {
                assert_eq!(session.voice, VoiceState::VoiceReady)
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unchanged_upload_emits_no_notification() {
        let store = Arc::new(MemoryStore::new());
        let (handle, mut rx) = handle_with_store(store);

        for _ in 0..2 {
            let ticket = handle.issue(RequestKind::Upload).await;
            handle.record_upload_accepted(ticket, "abc", false, None).await;
        }

        assert!(matches!(rx.try_recv(), Ok(UiEvent::SessionChanged(_))));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_restore_from_store() {
        let store = Arc::new(MemoryStore::new());
        store.set(USER_ID_KEY, "persisted").unwrap();
        let (handle, _rx) = handle_with_store(store);

        assert!(handle.restore().await);
        let session = handle.snapshot().await;
        assert_eq!(session.session_id.as_deref(), Some("persisted"));
        assert_eq!(session.voice, VoiceState::Uninitialized);
    }

    #[tokio::test]
    async fn test_forget_keeps_in_memory_session() {
        let store = Arc::new(MemoryStore::new());
        let (handle, _rx) = handle_with_store(Arc::clone(&store));

        let ticket = handle.issue(RequestKind::Upload).await;
        handle.record_upload_accepted(ticket, "abc", false, None).await;
        handle.forget().unwrap();

        assert_eq!(store.get(USER_ID_KEY).unwrap(), None);
        assert_eq!(handle.session_id().await.as_deref(), Some("abc"));
    }
}
