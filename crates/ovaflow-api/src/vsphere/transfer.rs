// Library-item update sessions as a `TransferService`.

use ovaflow_core::model::{FileSource, FileSpec};
use ovaflow_core::{CoreError, ResourceKind, TransferService, UploadSession, UploadState};
use uuid::Uuid;

use super::gateway::VsphereGateway;
use super::types;

/// Session states outside the known set are reported as `ERROR` so polling
/// terminates instead of spinning.
fn upload_state(raw: &str) -> UploadState {
    raw.parse().unwrap_or(UploadState::Error)
}

fn session_from_wire(id: &str, model: types::UpdateSessionModel) -> UploadSession {
    let progress = model.client_progress.clamp(0, 100);
    UploadSession {
        id: model.id.unwrap_or_else(|| id.to_owned()),
        library_item_id: model.library_item_id,
        state: upload_state(&model.state),
        client_progress: u8::try_from(progress).unwrap_or(100),
        error_message: model.error_message.and_then(|m| m.default_message),
    }
}

impl TransferService for VsphereGateway {
    async fn begin(&self, item_id: &str, client_token: Uuid) -> Result<String, CoreError> {
        self.client()
            .create_update_session(item_id, client_token)
            .await
            .map_err(|e| e.for_resource(ResourceKind::LibraryItem, item_id))
    }

    async fn add_file(&self, session_id: &str, file: &FileSpec) -> Result<(), CoreError> {
        let spec = match &file.source {
            FileSource::Pull {
                uri,
                ssl_thumbprint,
            } => types::AddFileSpec {
                name: &file.name,
                source_type: "PULL",
                source_endpoint: Some(types::TransferEndpoint {
                    uri,
                    ssl_certificate_thumbprint: ssl_thumbprint.as_deref(),
                }),
                size: None,
            },
            FileSource::Push { size } => types::AddFileSpec {
                name: &file.name,
                source_type: "PUSH",
                source_endpoint: None,
                size: *size,
            },
        };
        Ok(self.client().add_file(session_id, &spec).await?)
    }

    async fn poll(&self, session_id: &str) -> Result<UploadSession, CoreError> {
        let model = self.client().get_update_session(session_id).await?;
        Ok(session_from_wire(session_id, model))
    }

    async fn complete(&self, session_id: &str) -> Result<(), CoreError> {
        Ok(self
            .client()
            .update_session_action(session_id, "complete")
            .await?)
    }

    async fn cancel(&self, session_id: &str) -> Result<(), CoreError> {
        Ok(self
            .client()
            .update_session_action(session_id, "cancel")
            .await?)
    }
}
