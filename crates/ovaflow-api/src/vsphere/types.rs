// Wire types for the vSphere Automation REST API (`/api/...`).
//
// Field names follow the server's snake_case JSON. Only the fields the
// workflow reads or writes are modelled.

use serde::{Deserialize, Serialize};

// ── Content library ──────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageBacking {
    #[serde(rename = "type")]
    pub backing_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datastore_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibraryModel {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub library_type: Option<String>,
    #[serde(default)]
    pub storage_backings: Vec<StorageBacking>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LibraryFindSpec<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<&'a str>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub library_type: Option<&'a str>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemModel {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub library_id: String,
    pub name: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub item_type: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ItemFindSpec<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub library_id: Option<&'a str>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub item_type: Option<&'a str>,
}

// ── Update sessions ──────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct UpdateSessionCreate<'a> {
    pub library_item_id: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LocalizableMessage {
    #[serde(default)]
    pub default_message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateSessionModel {
    #[serde(default)]
    pub id: Option<String>,
    pub library_item_id: String,
    pub state: String,
    #[serde(default)]
    pub client_progress: i64,
    #[serde(default)]
    pub error_message: Option<LocalizableMessage>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TransferEndpoint<'a> {
    pub uri: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssl_certificate_thumbprint: Option<&'a str>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AddFileSpec<'a> {
    pub name: &'a str,
    pub source_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_endpoint: Option<TransferEndpoint<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

// ── OVF deployment ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct DeploymentTarget<'a> {
    pub resource_pool_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folder_id: Option<&'a str>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FilterRequest<'a> {
    pub target: DeploymentTarget<'a>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FilterResponse {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub annotation: Option<String>,
    #[serde(default, rename = "EULAs")]
    pub eulas: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExtraConfig {
    pub key: String,
    pub value: String,
}

/// The `ExtraConfigParams` OVF parameter, the only one the deployer emits.
#[derive(Debug, Clone, Serialize)]
pub struct ExtraConfigParams {
    #[serde(rename = "@class")]
    pub class: &'static str,
    #[serde(rename = "type")]
    pub param_type: &'static str,
    pub extra_config: Vec<ExtraConfig>,
}

impl ExtraConfigParams {
    pub fn new(extra_config: Vec<ExtraConfig>) -> Self {
        Self {
            class: "com.vmware.vcenter.ovf.extra_config_params",
            param_type: "ExtraConfigParams",
            extra_config,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ResourcePoolDeploymentSpec<'a> {
    pub name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotation: Option<&'a str>,
    #[serde(rename = "accept_all_EULA")]
    pub accept_all_eula: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub additional_parameters: Vec<ExtraConfigParams>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeployRequest<'a> {
    pub target: DeploymentTarget<'a>,
    pub deployment_spec: ResourcePoolDeploymentSpec<'a>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeployableIdentity {
    #[serde(rename = "type")]
    pub resource_type: String,
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OvfError {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub error: Option<serde_json::Value>,
    #[serde(default)]
    pub message: Option<LocalizableMessage>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OperationResult {
    #[serde(default)]
    pub errors: Vec<OvfError>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeploymentResult {
    pub succeeded: bool,
    #[serde(default)]
    pub resource_id: Option<DeployableIdentity>,
    #[serde(default)]
    pub error: Option<OperationResult>,
}

// ── Inventory summaries ──────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct DatastoreSummary {
    pub datastore: String,
    pub name: String,
    #[serde(rename = "type", default)]
    pub datastore_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResourcePoolSummary {
    pub resource_pool: String,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FolderSummary {
    pub folder: String,
    pub name: String,
    #[serde(rename = "type", default)]
    pub folder_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NetworkSummary {
    pub network: String,
    pub name: String,
    #[serde(rename = "type", default)]
    pub network_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VmSummary {
    pub vm: String,
    pub name: String,
    #[serde(default)]
    pub power_state: Option<String>,
}

// ── VM ethernet ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EthernetBacking {
    #[serde(rename = "type")]
    pub backing_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EthernetCreateSpec {
    pub backing: EthernetBacking,
    pub start_connected: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EthernetSummary {
    pub nic: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EthernetInfo {
    #[serde(default)]
    pub label: Option<String>,
    pub backing: EthernetBacking,
    #[serde(default)]
    pub start_connected: bool,
    #[serde(default)]
    pub state: Option<String>,
}
