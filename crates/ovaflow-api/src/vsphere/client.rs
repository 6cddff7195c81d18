// Typed async client for the vSphere Automation REST API.
//
// Base path: /api/
// Auth: vmware-api-session-id header (see `auth::vsphere_login`)

use uuid::Uuid;

use super::types;
use crate::error::Error;
use crate::http::RestClient;

/// Thin typed wrapper; one method per endpoint the workflow uses.
#[derive(Debug, Clone)]
pub struct VsphereClient {
    rest: RestClient,
}

impl VsphereClient {
    pub fn new(rest: RestClient) -> Self {
        Self { rest }
    }

    pub fn rest(&self) -> &RestClient {
        &self.rest
    }

    // ── Content libraries ────────────────────────────────────────────

    pub async fn find_libraries(&self, spec: &types::LibraryFindSpec<'_>) -> Result<Vec<String>, Error> {
        self.rest
            .post("api/content/library", &[("action", "find")], spec, None)
            .await
    }

    pub async fn get_library(&self, id: &str) -> Result<types::LibraryModel, Error> {
        self.rest.get(&format!("api/content/library/{id}")).await
    }

    pub async fn create_local_library(
        &self,
        model: &types::LibraryModel,
        client_token: Uuid,
    ) -> Result<String, Error> {
        self.rest
            .post("api/content/local-library", &[], model, Some(client_token))
            .await
    }

    pub async fn update_local_library(&self, id: &str, model: &types::LibraryModel) -> Result<(), Error> {
        self.rest
            .patch(&format!("api/content/local-library/{id}"), model)
            .await
    }

    pub async fn delete_local_library(&self, id: &str) -> Result<(), Error> {
        self.rest
            .delete(&format!("api/content/local-library/{id}"))
            .await
    }

    // ── Library items ────────────────────────────────────────────────

    pub async fn find_items(&self, spec: &types::ItemFindSpec<'_>) -> Result<Vec<String>, Error> {
        self.rest
            .post("api/content/library/item", &[("action", "find")], spec, None)
            .await
    }

    pub async fn get_item(&self, id: &str) -> Result<types::ItemModel, Error> {
        self.rest.get(&format!("api/content/library/item/{id}")).await
    }

    pub async fn create_item(
        &self,
        model: &types::ItemModel,
        client_token: Uuid,
    ) -> Result<String, Error> {
        self.rest
            .post("api/content/library/item", &[], model, Some(client_token))
            .await
    }

    pub async fn update_item(&self, id: &str, model: &types::ItemModel) -> Result<(), Error> {
        self.rest
            .patch(&format!("api/content/library/item/{id}"), model)
            .await
    }

    pub async fn delete_item(&self, id: &str) -> Result<(), Error> {
        self.rest
            .delete(&format!("api/content/library/item/{id}"))
            .await
    }

    // ── Update sessions ──────────────────────────────────────────────

    pub async fn create_update_session(
        &self,
        item_id: &str,
        client_token: Uuid,
    ) -> Result<String, Error> {
        self.rest
            .post(
                "api/content/library/item/update-session",
                &[],
                &types::UpdateSessionCreate {
                    library_item_id: item_id,
                },
                Some(client_token),
            )
            .await
    }

    pub async fn get_update_session(&self, id: &str) -> Result<types::UpdateSessionModel, Error> {
        self.rest
            .get(&format!("api/content/library/item/update-session/{id}"))
            .await
    }

    pub async fn add_file(&self, session_id: &str, spec: &types::AddFileSpec<'_>) -> Result<(), Error> {
        self.rest
            .post_no_response(
                &format!("api/content/library/item/updatesession/file/{session_id}"),
                &[("action", "add")],
                Some(spec),
            )
            .await
    }

    /// `action` is one of `complete`, `cancel`, `fail`, `keep-alive`.
    pub async fn update_session_action(&self, session_id: &str, action: &str) -> Result<(), Error> {
        self.rest
            .post_no_response::<()>(
                &format!("api/content/library/item/update-session/{session_id}"),
                &[("action", action)],
                None,
            )
            .await
    }

    // ── OVF ──────────────────────────────────────────────────────────

    pub async fn ovf_filter(
        &self,
        item_id: &str,
        request: &types::FilterRequest<'_>,
    ) -> Result<types::FilterResponse, Error> {
        self.rest
            .post(
                &format!("api/vcenter/ovf/library-item/{item_id}"),
                &[("action", "filter")],
                request,
                None,
            )
            .await
    }

    pub async fn ovf_deploy(
        &self,
        item_id: &str,
        request: &types::DeployRequest<'_>,
        client_token: Uuid,
    ) -> Result<types::DeploymentResult, Error> {
        self.rest
            .post(
                &format!("api/vcenter/ovf/library-item/{item_id}"),
                &[("action", "deploy")],
                request,
                Some(client_token),
            )
            .await
    }

    // ── Inventory ────────────────────────────────────────────────────

    pub async fn list_datastores(
        &self,
        params: &[(&str, String)],
    ) -> Result<Vec<types::DatastoreSummary>, Error> {
        self.rest.get_with_params("api/vcenter/datastore", params).await
    }

    pub async fn list_resource_pools(
        &self,
        params: &[(&str, String)],
    ) -> Result<Vec<types::ResourcePoolSummary>, Error> {
        self.rest
            .get_with_params("api/vcenter/resource-pool", params)
            .await
    }

    pub async fn list_folders(
        &self,
        params: &[(&str, String)],
    ) -> Result<Vec<types::FolderSummary>, Error> {
        self.rest.get_with_params("api/vcenter/folder", params).await
    }

    pub async fn list_networks(
        &self,
        params: &[(&str, String)],
    ) -> Result<Vec<types::NetworkSummary>, Error> {
        self.rest.get_with_params("api/vcenter/network", params).await
    }

    pub async fn list_vms(&self, params: &[(&str, String)]) -> Result<Vec<types::VmSummary>, Error> {
        self.rest.get_with_params("api/vcenter/vm", params).await
    }

    pub async fn delete_vm(&self, vm_id: &str) -> Result<(), Error> {
        self.rest.delete(&format!("api/vcenter/vm/{vm_id}")).await
    }

    // ── VM ethernet ──────────────────────────────────────────────────

    pub async fn list_nics(&self, vm_id: &str) -> Result<Vec<types::EthernetSummary>, Error> {
        self.rest
            .get(&format!("api/vcenter/vm/{vm_id}/hardware/ethernet"))
            .await
    }

    pub async fn get_nic(&self, vm_id: &str, nic: &str) -> Result<types::EthernetInfo, Error> {
        self.rest
            .get(&format!("api/vcenter/vm/{vm_id}/hardware/ethernet/{nic}"))
            .await
    }

    pub async fn create_nic(
        &self,
        vm_id: &str,
        spec: &types::EthernetCreateSpec,
        client_token: Uuid,
    ) -> Result<String, Error> {
        self.rest
            .post(
                &format!("api/vcenter/vm/{vm_id}/hardware/ethernet"),
                &[],
                spec,
                Some(client_token),
            )
            .await
    }

    pub async fn delete_nic(&self, vm_id: &str, nic: &str) -> Result<(), Error> {
        self.rest
            .delete(&format!("api/vcenter/vm/{vm_id}/hardware/ethernet/{nic}"))
            .await
    }
}
