// ── Deployment plans ──
//
// A plan is a TOML file describing one run: library, item, placement, VM
// parameters and an optional network plan. Parameter values may point at
// the environment or the keyring instead of holding secrets inline.

use std::collections::BTreeMap;
use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use url::Url;

use ovaflow_core::model::{FileSource, FileSpec};
use ovaflow_core::{ItemRequest, LibraryRequest, NetworkPlan, Placement, WorkflowRequest};

use crate::{ConfigError, SecretChain};

/// A literal, or a reference resolved at load time.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    Literal(String),
    Env { env: String },
    Keyring { keyring: String },
}

impl ParamValue {
    pub fn resolve(&self, name: &str, chain: SecretChain) -> Result<SecretString, ConfigError> {
        match self {
            Self::Literal(v) => Ok(SecretString::from(v.clone())),
            Self::Env { env } => chain.env(env).ok_or_else(|| ConfigError::MissingSecret {
                name: name.into(),
                source_kind: format!("env var {env}"),
            }),
            Self::Keyring { keyring } => {
                chain
                    .keyring(keyring)
                    .ok_or_else(|| ConfigError::MissingSecret {
                        name: name.into(),
                        source_kind: format!("keyring entry {keyring}"),
                    })
            }
        }
    }
}

/// Resolves every value; the result is handed to the remote side verbatim.
fn resolve_all(
    params: &BTreeMap<String, ParamValue>,
    chain: SecretChain,
) -> Result<BTreeMap<String, String>, ConfigError> {
    params
        .iter()
        .map(|(k, v)| Ok((k.clone(), v.resolve(k, chain)?.expose_secret().to_owned())))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ItemSection {
    pub name: String,
    #[serde(rename = "type", default = "default_item_type")]
    pub item_type: String,
    /// URL the server pulls the package from when the item is created.
    pub source: Option<String>,
    pub ssl_thumbprint: Option<String>,
}

fn default_item_type() -> String {
    "ovf".into()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct VmSection {
    pub name: Option<String>,
    /// Network the VM's NIC is backed by.
    pub network: Option<String>,
}

/// Inputs for a deployment through the external OVF tool.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct OvftoolSection {
    #[serde(default = "default_binary")]
    pub binary: String,
    /// OVA/OVF URL or local path.
    pub source: String,
    #[serde(default = "default_datastore")]
    pub datastore: String,
    /// Network the appliance is connected to.
    pub network: String,
    pub folder: Option<String>,
    #[serde(default = "default_datacenter")]
    pub datacenter: String,
    #[serde(default = "default_cluster")]
    pub cluster: String,
    #[serde(default = "default_resource_pool")]
    pub resource_pool: String,
    #[serde(default = "default_cpus")]
    pub cpus: u32,
    #[serde(default = "default_memory_mb")]
    pub memory_mb: u32,
    /// Reserved CPU, MHz.
    #[serde(default = "default_cpu_reservation")]
    pub cpu_reservation_mhz: u32,
    #[serde(default = "default_true")]
    pub power_on: bool,
    /// OVF properties, passed as `--prop:KEY=VALUE`.
    #[serde(default)]
    pub properties: BTreeMap<String, ParamValue>,
}

fn default_binary() -> String {
    "ovftool".into()
}
fn default_datastore() -> String {
    "WorkloadDatastore".into()
}
fn default_datacenter() -> String {
    "SDDC-Datacenter".into()
}
fn default_cluster() -> String {
    "Cluster-1".into()
}
fn default_resource_pool() -> String {
    "Compute-ResourcePool".into()
}
fn default_cpus() -> u32 {
    4
}
fn default_memory_mb() -> u32 {
    16384
}
fn default_cpu_reservation() -> u32 {
    1251
}
fn default_true() -> bool {
    true
}

impl OvftoolSection {
    pub fn resolved_properties(
        &self,
        chain: SecretChain,
    ) -> Result<BTreeMap<String, String>, ConfigError> {
        resolve_all(&self.properties, chain)
    }
}

/// One deployment plan file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Plan {
    pub library: LibraryRequest,
    pub item: ItemSection,
    pub placement: Placement,
    #[serde(default)]
    pub vm: VmSection,
    #[serde(default)]
    pub parameters: BTreeMap<String, ParamValue>,
    pub network: Option<NetworkPlan>,
    pub ovftool: Option<OvftoolSection>,
}

impl Plan {
    /// Loads `path`, then `OVAFLOW_PLAN_`-prefixed env vars (`__` nests).
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.is_file() {
            return Err(ConfigError::PlanNotFound {
                path: path.to_path_buf(),
            });
        }
        let plan = Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed("OVAFLOW_PLAN_").split("__"))
            .extract()?;
        Ok(plan)
    }

    fn file_spec(&self) -> Result<Option<FileSpec>, ConfigError> {
        let Some(source) = &self.item.source else {
            return Ok(None);
        };
        let url = Url::parse(source).map_err(|e| ConfigError::Validation {
            field: "item.source".into(),
            reason: format!("invalid URL '{source}': {e}"),
        })?;
        // Library files are named after the last path segment.
        let name = url
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .filter(|s| !s.is_empty())
            .map_or_else(|| self.item.name.clone(), str::to_owned);

        Ok(Some(FileSpec {
            name,
            source: FileSource::Pull {
                uri: url.into(),
                ssl_thumbprint: self.item.ssl_thumbprint.clone(),
            },
        }))
    }

    /// Resolves parameter references and builds the run request.
    pub fn to_request(&self, chain: SecretChain) -> Result<WorkflowRequest, ConfigError> {
        Ok(WorkflowRequest {
            library: self.library.clone(),
            item: ItemRequest {
                name: self.item.name.clone(),
                item_type: self.item.item_type.clone(),
                source: self.file_spec()?,
            },
            placement: self.placement.clone(),
            vm_name: self.vm.name.clone(),
            network: self.vm.network.clone(),
            additional_parameters: resolve_all(&self.parameters, chain)?,
            network_plan: self.network.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use pretty_assertions::assert_eq;

    use super::*;

    fn env(name: &str) -> Option<String> {
        (name == "PROXY_SECRET").then(|| "s3cret".to_owned())
    }

    fn write_plan(body: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .expect("temp file");
        file.write_all(body.as_bytes()).expect("write plan");
        file
    }

    const PLAN: &str = r#"
[library]
name = "ova-lib"
datastore = "WorkloadDatastore"

[item]
name = "collector-proxy"
source = "https://downloads.example.com/builds/proxy-6.1.ova"

[placement]
resource_pool = "Compute-ResourcePool"

[vm]
name = "proxy-01"
network = "proxy-segment"

[parameters]
"guestinfo.ip" = "10.2.224.4"
"guestinfo.shared_secret" = { env = "PROXY_SECRET" }

[network]
public_ip = "vc-ip"

[network.nat_rule]
display_name = "vc_public_private_ip_match_nat_rule"
translated_network = "10.2.224.4"
service = "/infra/services/HTTPS"
translated_ports = "443"

[network.segment]
display_name = "proxy-segment"
subnets = [{ network = "10.2.224.0/24", gateway_address = "10.2.224.1/24" }]

[[network.groups]]
domain = "cgw"
display_name = "vrni-proxy-group"

[[network.policies]]
domain = "cgw"

[[network.policies.rules]]
display_name = "vrni-services-allow"
sources = ["/infra/domains/cgw/groups/vrni-proxy-group"]
destinations = ["ANY"]
services = ["/infra/services/HTTPS"]
scope = ["/infra/labels/cgw-all"]
"#;

    #[test]
    fn plan_becomes_a_workflow_request() {
        let file = write_plan(PLAN);
        let plan = Plan::load(file.path()).expect("loads");
        let request = plan
            .to_request(SecretChain::with_env(env))
            .expect("resolves");

        assert_eq!(request.item.item_type, "ovf");
        assert_eq!(request.placement.folder_name(), "Workloads");
        assert_eq!(request.vm_name.as_deref(), Some("proxy-01"));
        assert_eq!(
            request.additional_parameters.get("guestinfo.shared_secret").map(String::as_str),
            Some("s3cret")
        );
        let source = request.item.source.expect("has a source");
        assert_eq!(source.name, "proxy-6.1.ova");

        let network = request.network_plan.expect("has a network plan");
        assert_eq!(network.nat_rule.sequence_number, 100);
        assert_eq!(network.policies[0].policy, "default");
        assert_eq!(network.groups.len(), 1);
    }

    #[test]
    fn unresolvable_reference_names_the_parameter() {
        let file = write_plan(PLAN);
        let plan = Plan::load(file.path()).expect("loads");

        let err = plan
            .to_request(SecretChain::with_env(|_| None))
            .expect_err("env var missing");
        match err {
            ConfigError::MissingSecret { name, source_kind } => {
                assert_eq!(name, "guestinfo.shared_secret");
                assert_eq!(source_kind, "env var PROXY_SECRET");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_plan_file_is_reported() {
        let dir = tempfile::tempdir().expect("temp dir");
        let err = Plan::load(&dir.path().join("nope.toml")).expect_err("absent");
        assert!(matches!(err, ConfigError::PlanNotFound { .. }));
    }

    #[test]
    fn ovftool_section_defaults() {
        let body = format!(
            "{PLAN}\n[ovftool]\nsource = \"https://downloads.example.com/proxy.ova\"\nnetwork = \"proxy-segment\"\n\n[ovftool.properties]\nIP_Address = \"10.2.224.4\"\n"
        );
        let file = write_plan(&body);
        let plan = Plan::load(file.path()).expect("loads");
        let ovftool = plan.ovftool.expect("has ovftool section");

        assert_eq!(ovftool.datastore, "WorkloadDatastore");
        assert_eq!(ovftool.cpus, 4);
        assert_eq!(ovftool.memory_mb, 16384);
        assert!(ovftool.power_on);
        let props = ovftool
            .resolved_properties(SecretChain::with_env(|_| None))
            .expect("literal only");
        assert_eq!(props.get("IP_Address").map(String::as_str), Some("10.2.224.4"));
    }
}
