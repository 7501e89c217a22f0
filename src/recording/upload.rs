use tracing::info;

use crate::api::{Transport, UploadRequest};
use crate::error::{StructuredError, TransportError};
use crate::session::{Reconcile, RequestKind, SessionHandle};

/// What the service said about an accepted sample
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReceipt {
    pub session_id: String,
    pub voice_processed: bool,
    pub error: Option<StructuredError>,
    pub reconcile: Reconcile,
}

/// Upload one captured sample and reconcile the session with the response.
///
/// The current session id, if any, is sent along so the service updates the
/// same identity. On a transport failure the session is not touched.
pub async fn upload_sample(
    transport: &dyn Transport,
    session: &SessionHandle,
    audio: Vec<u8>,
) -> Result<UploadReceipt, TransportError> {
    let ticket = session.issue(RequestKind::Upload).await;
    let user_id = session.session_id().await;

    info!(
        "Uploading voice sample #{} ({} bytes, session={})",
        ticket.seq(),
        audio.len(),
        user_id.as_deref().unwrap_or("<new>")
    );

    let response = transport.upload(UploadRequest { audio, user_id }).await?;

    let reconcile = session
        .record_upload_accepted(
            ticket,
            &response.user_id,
            response.voice_processed,
            response.error.clone(),
        )
        .await;

    Ok(UploadReceipt {
        session_id: response.user_id,
        voice_processed: response.voice_processed,
        error: response.error,
        reconcile,
    })
}
