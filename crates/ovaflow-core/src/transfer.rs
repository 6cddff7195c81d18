// ── Artifact transfer ──
//
// Drives one library-item update session from begin to complete. Polling
// is the only wait point in a workflow run: it is bounded by a timeout and
// aborts promptly when the run's cancellation token fires.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::CoreError;
use crate::model::{FileSpec, UploadSession, UploadState};

/// Update-session lifecycle on the server.
pub trait TransferService: Send + Sync {
    /// Opens a session against a library item and returns its id.
    fn begin(
        &self,
        item_id: &str,
        client_token: Uuid,
    ) -> impl Future<Output = Result<String, CoreError>> + Send;

    fn add_file(
        &self,
        session_id: &str,
        file: &FileSpec,
    ) -> impl Future<Output = Result<(), CoreError>> + Send;

    fn poll(
        &self,
        session_id: &str,
    ) -> impl Future<Output = Result<UploadSession, CoreError>> + Send;

    fn complete(&self, session_id: &str) -> impl Future<Output = Result<(), CoreError>> + Send;

    fn cancel(&self, session_id: &str) -> impl Future<Output = Result<(), CoreError>> + Send;
}

/// Poll cadence for upload sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub interval: Duration,
    pub timeout: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            timeout: Duration::from_secs(2 * 60 * 60),
        }
    }
}

/// Uploads (or server-pulls) one file into a library item.
///
/// `complete` is called exactly once, after the session leaves `ACTIVE`.
/// On timeout or cancellation the session is cancelled best effort and
/// `complete` is never called.
pub async fn stage_artifact<T, P>(
    service: &T,
    item_id: &str,
    file: &FileSpec,
    config: PollConfig,
    cancel: &CancellationToken,
    mut on_progress: P,
) -> Result<UploadSession, CoreError>
where
    T: TransferService,
    P: FnMut(&UploadSession) + Send,
{
    let session_id = service.begin(item_id, Uuid::new_v4()).await?;
    info!(session = %session_id, item = %item_id, file = %file.name, "upload session opened");

    if let Err(e) = service.add_file(&session_id, file).await {
        abandon(service, &session_id).await;
        return Err(e);
    }

    let started = Instant::now();
    let deadline = started + config.timeout;

    let session = loop {
        let session = match service.poll(&session_id).await {
            Ok(session) => session,
            Err(e) => {
                abandon(service, &session_id).await;
                return Err(e);
            }
        };
        on_progress(&session);
        debug!(
            session = %session_id,
            state = %session.state,
            progress = session.client_progress,
            "upload session polled"
        );
        if session.state.is_terminal() {
            break session;
        }

        let now = Instant::now();
        if now >= deadline {
            abandon(service, &session_id).await;
            return Err(CoreError::UploadTimedOut {
                session_id,
                elapsed_secs: started.elapsed().as_secs(),
            });
        }

        let wait = config.interval.min(deadline - now);
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                abandon(service, &session_id).await;
                return Err(CoreError::Cancelled);
            }
            () = tokio::time::sleep(wait) => {}
        }
    };

    let completed = service.complete(&session_id).await;
    match session.state {
        UploadState::Done => {
            completed?;
            info!(session = %session_id, "upload complete");
            Ok(session)
        }
        state => {
            if let Err(e) = completed {
                warn!(session = %session_id, error = %e, "could not complete failed session");
            }
            Err(CoreError::UploadFailed {
                session_id,
                state,
                message: session
                    .error_message
                    .unwrap_or_else(|| "no error message reported".into()),
            })
        }
    }
}

async fn abandon<T: TransferService>(service: &T, session_id: &str) {
    if let Err(e) = service.cancel(session_id).await {
        warn!(session = %session_id, error = %e, "could not cancel upload session");
    }
}
