// Wire types for the NSX Policy API and the VMC cloud-service API, both
// served from the SDDC's NSX reverse proxy.
//
// Every object carries `_revision` once it exists; sending it back on a
// write turns a concurrent change into HTTP 412.

use serde::{Deserialize, Serialize};

/// Paged list envelope: `{"results": [...], "cursor": "..."}`.
#[derive(Debug, Clone, Deserialize)]
pub struct ListResult<T> {
    #[serde(default = "Vec::new")]
    pub results: Vec<T>,
    #[serde(default)]
    pub cursor: Option<String>,
}

// ── Public IPs (cloud-service API) ───────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicIp {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    /// Allocated by the server on creation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
}

// ── NAT ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NatRule {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_network: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translated_network: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translated_ports: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub firewall_match: Option<String>,
    #[serde(default)]
    pub sequence_number: u32,
    #[serde(default = "enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub logging: bool,
    #[serde(rename = "_revision", default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<i64>,
}

fn enabled() -> bool {
    true
}

// ── Segments ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentSubnet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gateway_address: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Segment {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub segment_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replication_mode: Option<String>,
    #[serde(default)]
    pub subnets: Vec<SegmentSubnet>,
    #[serde(rename = "_revision", default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<i64>,
}

// ── Groups ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    /// Membership criteria; kept opaque.
    #[serde(default)]
    pub expression: Vec<serde_json::Value>,
    #[serde(rename = "_revision", default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<i64>,
}

// ── Gateway policies ─────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    pub resource_type: String,
    #[serde(default)]
    pub sequence_number: i64,
    pub action: String,
    #[serde(default)]
    pub source_groups: Vec<String>,
    #[serde(default)]
    pub destination_groups: Vec<String>,
    #[serde(default)]
    pub services: Vec<String>,
    #[serde(default)]
    pub scope: Vec<String>,
    #[serde(default)]
    pub logged: bool,
    #[serde(rename = "_revision", default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayPolicy {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub rules: Vec<Rule>,
    #[serde(rename = "_revision", default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<i64>,
}
