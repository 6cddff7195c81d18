// ── Desired-state value objects ──
//
// One immutable spec per reconcilable kind. Gateways translate these into
// request bodies; the reconciler only ever hands them through.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::resource::ResourceKind;
use super::rules::RuleSet;

/// Kind-specific desired state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DesiredSpec {
    Library(LibrarySpec),
    LibraryItem(LibraryItemSpec),
    PublicIp(PublicIpSpec),
    NatRule(NatRuleSpec),
    Segment(SegmentSpec),
    Group(GroupSpec),
    FirewallPolicy(PolicySpec),
    Nic(NicSpec),
}

impl DesiredSpec {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Self::Library(_) => ResourceKind::Library,
            Self::LibraryItem(_) => ResourceKind::LibraryItem,
            Self::PublicIp(_) => ResourceKind::PublicIp,
            Self::NatRule(_) => ResourceKind::NatRule,
            Self::Segment(_) => ResourceKind::Segment,
            Self::Group(_) => ResourceKind::Group,
            Self::FirewallPolicy(_) => ResourceKind::FirewallPolicy,
            Self::Nic(_) => ResourceKind::Nic,
        }
    }

    /// Name the object will be found under once created.
    pub fn display_name(&self) -> &str {
        match self {
            Self::Library(s) => &s.name,
            Self::LibraryItem(s) => &s.name,
            Self::PublicIp(s) => &s.display_name,
            Self::NatRule(s) => &s.display_name,
            Self::Segment(s) => &s.display_name,
            Self::Group(s) => &s.display_name,
            Self::FirewallPolicy(s) => &s.id,
            Self::Nic(s) => &s.network,
        }
    }
}

// ── Content library ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum LibraryType {
    Local,
    Subscribed,
}

/// Where a library keeps its files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageBacking {
    pub datastore_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibrarySpec {
    pub name: String,
    pub description: String,
    pub library_type: LibraryType,
    pub storage_backings: Vec<StorageBacking>,
}

impl LibrarySpec {
    /// A local library stored on one datastore.
    pub fn local(name: impl Into<String>, datastore_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: "Local library backed by VC datastore".into(),
            library_type: LibraryType::Local,
            storage_backings: vec![StorageBacking {
                datastore_id: datastore_id.into(),
            }],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryItemSpec {
    pub name: String,
    pub library_id: String,
    /// Package type, `ovf` for OVF/OVA templates.
    pub item_type: String,
}

// ── Cloud networking ────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicIpSpec {
    pub display_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum NatAction {
    Dnat,
    Snat,
    Reflexive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum FirewallMatch {
    MatchInternalAddress,
    MatchExternalAddress,
    Bypass,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NatRuleSpec {
    pub display_name: String,
    pub action: NatAction,
    pub destination_network: String,
    pub translated_network: String,
    pub service: Option<String>,
    pub translated_ports: Option<String>,
    pub firewall_match: FirewallMatch,
    pub sequence_number: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum SegmentType {
    Routed,
    Extended,
    Disconnected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ReplicationMode {
    Mtep,
    Source,
}

/// One routed subnet: `network` in CIDR form, gateway as `addr/prefix`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentSubnet {
    pub network: String,
    pub gateway_address: String,
}

impl SegmentSubnet {
    /// The /24 around `host`, with the gateway on `.1`.
    ///
    /// Returns `None` unless `host` is a dotted IPv4 address.
    pub fn around_host(host: &str) -> Option<Self> {
        let addr: std::net::Ipv4Addr = host.parse().ok()?;
        let [a, b, c, _] = addr.octets();
        Some(Self {
            network: format!("{a}.{b}.{c}.0/24"),
            gateway_address: format!("{a}.{b}.{c}.1/24"),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentSpec {
    pub display_name: String,
    pub segment_type: SegmentType,
    pub replication_mode: ReplicationMode,
    pub subnets: Vec<SegmentSubnet>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSpec {
    /// Policy domain, e.g. `cgw` or `mgw`.
    pub domain: String,
    pub display_name: String,
}

/// A gateway policy and its rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicySpec {
    pub domain: String,
    pub id: String,
    pub rules: RuleSet,
}

// ── VM hardware ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum BackingType {
    StandardPortgroup,
    DistributedPortgroup,
    OpaqueNetwork,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NicSpec {
    pub vm_id: String,
    pub backing_type: BackingType,
    /// Network backing id.
    pub network: String,
    pub start_connected: bool,
}
