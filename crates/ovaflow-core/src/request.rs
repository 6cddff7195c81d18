// ── Workflow inputs ──
//
// Everything a run needs, already resolved: no secrets references, no file
// paths. Plan loaders in the config crate produce these.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::{
    FileSpec, FirewallMatch, NatAction, NatRuleSpec, ReplicationMode, Rule, RuleAction,
    SegmentSpec, SegmentSubnet, SegmentType,
};

/// Folder VMs land in when a placement names none.
pub const DEFAULT_FOLDER: &str = "Workloads";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryRequest {
    pub name: String,
    /// Datastore name backing the library.
    pub datastore: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRequest {
    pub name: String,
    #[serde(default = "default_item_type")]
    pub item_type: String,
    /// Staged only when the item had to be created.
    pub source: Option<FileSpec>,
}

fn default_item_type() -> String {
    "ovf".into()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    pub resource_pool: String,
    pub folder: Option<String>,
}

impl Placement {
    pub fn folder_name(&self) -> &str {
        self.folder.as_deref().unwrap_or(DEFAULT_FOLDER)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowRequest {
    pub library: LibraryRequest,
    pub item: ItemRequest,
    pub placement: Placement,
    pub vm_name: Option<String>,
    /// Network the deployed VM is attached to. No network, no NIC.
    pub network: Option<String>,
    #[serde(default)]
    pub additional_parameters: BTreeMap<String, String>,
    pub network_plan: Option<NetworkPlan>,
}

// ── Network plan ────────────────────────────────────────────────────

/// NAT rule whose destination is filled in from the allocated public IP.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NatRuleTemplate {
    pub display_name: String,
    #[serde(default = "default_nat_action")]
    pub action: NatAction,
    /// Private address the public IP is translated to.
    pub translated_network: String,
    pub service: Option<String>,
    pub translated_ports: Option<String>,
    #[serde(default = "default_firewall_match")]
    pub firewall_match: FirewallMatch,
    #[serde(default = "default_nat_sequence")]
    pub sequence_number: u32,
}

fn default_nat_action() -> NatAction {
    NatAction::Dnat
}

fn default_firewall_match() -> FirewallMatch {
    FirewallMatch::MatchInternalAddress
}

fn default_nat_sequence() -> u32 {
    100
}

impl NatRuleTemplate {
    pub fn to_spec(&self, display_name: &str, public_address: &str) -> NatRuleSpec {
        NatRuleSpec {
            display_name: display_name.to_owned(),
            action: self.action,
            destination_network: public_address.to_owned(),
            translated_network: self.translated_network.clone(),
            service: self.service.clone(),
            translated_ports: self.translated_ports.clone(),
            firewall_match: self.firewall_match,
            sequence_number: self.sequence_number,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentTemplate {
    pub display_name: String,
    #[serde(default = "default_segment_type")]
    pub segment_type: SegmentType,
    #[serde(default = "default_replication")]
    pub replication_mode: ReplicationMode,
    pub subnets: Vec<SegmentSubnet>,
}

fn default_segment_type() -> SegmentType {
    SegmentType::Routed
}

fn default_replication() -> ReplicationMode {
    ReplicationMode::Mtep
}

impl SegmentTemplate {
    pub fn to_spec(&self, display_name: &str) -> SegmentSpec {
        SegmentSpec {
            display_name: display_name.to_owned(),
            segment_type: self.segment_type,
            replication_mode: self.replication_mode,
            subnets: self.subnets.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupTemplate {
    pub domain: String,
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleTemplate {
    pub display_name: String,
    #[serde(default = "default_rule_action")]
    pub action: RuleAction,
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(default)]
    pub destinations: Vec<String>,
    #[serde(default)]
    pub services: Vec<String>,
    #[serde(default)]
    pub scope: Vec<String>,
    #[serde(default)]
    pub logged: bool,
}

fn default_rule_action() -> RuleAction {
    RuleAction::Allow
}

impl RuleTemplate {
    pub fn to_rule(&self, sequence_number: u32) -> Rule {
        Rule {
            id: None,
            display_name: self.display_name.clone(),
            sequence_number,
            action: self.action,
            sources: self.sources.clone(),
            destinations: self.destinations.clone(),
            services: self.services.clone(),
            scope: self.scope.clone(),
            logged: self.logged,
        }
    }
}

/// Rules merged into one existing gateway policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyPlan {
    pub domain: String,
    #[serde(default = "default_policy_id")]
    pub policy: String,
    pub rules: Vec<RuleTemplate>,
}

fn default_policy_id() -> String {
    "default".into()
}

/// Network objects reconciled after deployment, in this order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkPlan {
    pub public_ip: String,
    pub nat_rule: NatRuleTemplate,
    pub segment: SegmentTemplate,
    #[serde(default)]
    pub groups: Vec<GroupTemplate>,
    #[serde(default)]
    pub policies: Vec<PolicyPlan>,
}
