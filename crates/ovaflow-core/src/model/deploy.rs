// ── OVF deployment ──

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Placement of a deployed VM.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentTarget {
    pub resource_pool_id: String,
    pub folder_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploySpec {
    pub name: String,
    pub annotation: Option<String>,
    pub accept_all_eula: bool,
    /// Opaque extra-config key/values handed to the VM.
    #[serde(default)]
    pub additional_parameters: BTreeMap<String, String>,
}

/// What the server reports about a package before deploying it.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OvfSummary {
    pub name: Option<String>,
    pub annotation: Option<String>,
    #[serde(default)]
    pub eulas: Vec<String>,
}

/// Terminal outcome of one deploy call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentResult {
    pub succeeded: bool,
    pub resource_id: Option<String>,
    pub error: Option<String>,
}

impl DeploymentResult {
    pub fn success(resource_id: impl Into<String>) -> Self {
        Self {
            succeeded: true,
            resource_id: Some(resource_id.into()),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            succeeded: false,
            resource_id: None,
            error: Some(error.into()),
        }
    }
}
