// ── Resource identity ──

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::spec::DesiredSpec;

/// Every remote object type the workflow touches.
///
/// The first eight kinds can be reconciled. The rest are lookup-only
/// inventory objects: gateways answer `find`, `get` and `delete` for them
/// and reject everything else with `Unsupported`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, EnumString,
)]
#[strum(ascii_case_insensitive)]
pub enum ResourceKind {
    Library,
    LibraryItem,
    PublicIp,
    NatRule,
    Segment,
    Group,
    FirewallPolicy,
    Nic,

    // Lookup-only
    Datastore,
    ResourcePool,
    Folder,
    Network,
    Vm,
}

impl ResourceKind {
    pub fn is_lookup_only(self) -> bool {
        matches!(
            self,
            Self::Datastore | Self::ResourcePool | Self::Folder | Self::Network | Self::Vm
        )
    }
}

/// Identity of a remote object. Equality is `(kind, id)`; the display
/// name is informational.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceRef {
    pub kind: ResourceKind,
    pub id: String,
    pub display_name: String,
}

impl ResourceRef {
    pub fn new(kind: ResourceKind, id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
            display_name: display_name.into(),
        }
    }
}

impl PartialEq for ResourceRef {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.id == other.id
    }
}

impl Eq for ResourceRef {}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} '{}' ({})", self.kind, self.display_name, self.id)
    }
}

/// Query passed to `ResourceGateway::find`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FindCriteria {
    pub kind: ResourceKind,
    /// Exact display-name match.
    pub name_filter: Option<String>,
    pub type_filter: Option<String>,
    /// Parent container: a library id for items, a policy domain for
    /// groups and gateway policies, a VM id for NICs.
    pub scope: Option<String>,
}

impl FindCriteria {
    pub fn new(kind: ResourceKind) -> Self {
        Self {
            kind,
            name_filter: None,
            type_filter: None,
            scope: None,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name_filter = Some(name.into());
        self
    }

    pub fn of_type(mut self, type_filter: impl Into<String>) -> Self {
        self.type_filter = Some(type_filter.into());
        self
    }

    pub fn in_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }
}

/// Canonical remote state of one object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub reference: ResourceRef,
    /// `None` for lookup-only kinds.
    pub spec: Option<DesiredSpec>,
    /// Server-assigned facts, e.g. the address allocated to a public IP.
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

impl Resource {
    pub fn new(reference: ResourceRef, spec: Option<DesiredSpec>) -> Self {
        Self {
            reference,
            spec,
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }
}

/// Attribute key under which gateways publish an allocated address.
pub const ATTR_IP: &str = "ip";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refs_compare_by_kind_and_id() {
        let a = ResourceRef::new(ResourceKind::Group, "cgw/proxy", "proxy");
        let b = ResourceRef::new(ResourceKind::Group, "cgw/proxy", "renamed");
        let c = ResourceRef::new(ResourceKind::Segment, "cgw/proxy", "proxy");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn kind_parses_case_insensitively() {
        assert_eq!(
            "libraryitem".parse::<ResourceKind>().ok(),
            Some(ResourceKind::LibraryItem)
        );
        assert!(ResourceKind::Vm.is_lookup_only());
        assert!(!ResourceKind::Nic.is_lookup_only());
    }
}
