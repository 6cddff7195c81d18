// `ResourceGateway` over the NSX Policy API.
//
// Owns public IPs, NAT rules, segments, groups and gateway policies. Object
// ids are derived from display names, so a create is preceded by a GET that
// turns an existing id into `Conflict`. Groups and policies live in a
// domain and are addressed as `{domain}/{id}`.

use std::str::FromStr;

use ovaflow_core::model::{
    ATTR_IP, FirewallMatch, GroupSpec, NatRuleSpec, PolicySpec, PublicIpSpec, Rule, RuleSet, SegmentSpec,
    SegmentSubnet,
};
use ovaflow_core::{
    CoreError, DesiredSpec, FindCriteria, Resource, ResourceGateway, ResourceKind, ResourceRef,
    scoped_id, split_scoped_id,
};
use tracing::debug;
use uuid::Uuid;

use super::client::{Collection, NsxClient};
use super::types;
use crate::error::Error;

/// Attribute carrying the object's `_revision`; sent back on writes.
pub const ATTR_REVISION: &str = "revision";

const RULE_RESOURCE_TYPE: &str = "Rule";

#[derive(Debug, Clone)]
pub struct NsxGateway {
    client: NsxClient,
}

impl NsxGateway {
    pub fn new(client: NsxClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &NsxClient {
        &self.client
    }

    /// Kinds this gateway answers for.
    pub fn owns(kind: ResourceKind) -> bool {
        matches!(
            kind,
            ResourceKind::PublicIp
                | ResourceKind::NatRule
                | ResourceKind::Segment
                | ResourceKind::Group
                | ResourceKind::FirewallPolicy
        )
    }
}

/// Policy ids allow `[A-Za-z0-9_-]`; anything else becomes `-`.
pub fn object_id(display_name: &str) -> String {
    display_name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '-' })
        .collect()
}

/// Collection and local id for a gateway id.
fn locate(kind: ResourceKind, id: &str) -> Result<(Collection<'_>, &str), CoreError> {
    match kind {
        ResourceKind::PublicIp => Ok((Collection::PublicIps, id)),
        ResourceKind::NatRule => Ok((Collection::NatRules, id)),
        ResourceKind::Segment => Ok((Collection::Segments, id)),
        ResourceKind::Group | ResourceKind::FirewallPolicy => {
            let (domain, local) = split_scoped_id(id).ok_or_else(|| CoreError::NotFound {
                kind,
                id: id.to_owned(),
            })?;
            let collection = if kind == ResourceKind::Group {
                Collection::Groups { domain }
            } else {
                Collection::GatewayPolicies { domain }
            };
            Ok((collection, local))
        }
        _ => Err(Error::Unsupported {
            kind,
            operation: "NSX lookup",
        }
        .into()),
    }
}

fn parse_field<T: FromStr>(kind: ResourceKind, field: &str, raw: &str) -> Result<T, CoreError> {
    raw.parse()
        .map_err(|_| CoreError::Internal(format!("{kind} has unrecognized {field} '{raw}'")))
}

fn revision(resource: &Resource) -> Option<i64> {
    resource.attribute(ATTR_REVISION).and_then(|r| r.parse().ok())
}

fn with_revision(resource: Resource, revision: Option<i64>) -> Resource {
    match revision {
        Some(r) => resource.with_attribute(ATTR_REVISION, r.to_string()),
        None => resource,
    }
}

fn name_or_id(display_name: Option<String>, id: &str) -> String {
    display_name.unwrap_or_else(|| id.to_owned())
}

// ── Wire ⇄ model conversions ─────────────────────────────────────────

fn public_ip_resource(ip: types::PublicIp) -> Resource {
    let name = name_or_id(ip.display_name, &ip.id);
    let resource = Resource::new(
        ResourceRef::new(ResourceKind::PublicIp, ip.id, name.clone()),
        Some(DesiredSpec::PublicIp(PublicIpSpec { display_name: name })),
    );
    match ip.ip {
        Some(addr) => resource.with_attribute(ATTR_IP, addr),
        None => resource,
    }
}

fn nat_resource(rule: types::NatRule) -> Result<Resource, CoreError> {
    let kind = ResourceKind::NatRule;
    let name = name_or_id(rule.display_name, &rule.id);
    let spec = NatRuleSpec {
        display_name: name.clone(),
        action: parse_field(kind, "action", &rule.action)?,
        destination_network: rule.destination_network.unwrap_or_default(),
        translated_network: rule.translated_network.unwrap_or_default(),
        service: rule.service,
        translated_ports: rule.translated_ports,
        firewall_match: match rule.firewall_match {
            Some(raw) => parse_field(kind, "firewall_match", &raw)?,
            None => FirewallMatch::Bypass,
        },
        sequence_number: rule.sequence_number,
    };
    Ok(with_revision(
        Resource::new(
            ResourceRef::new(kind, rule.id, name),
            Some(DesiredSpec::NatRule(spec)),
        ),
        rule.revision,
    ))
}

fn nat_wire(id: &str, spec: &NatRuleSpec, revision: Option<i64>) -> types::NatRule {
    types::NatRule {
        id: id.to_owned(),
        display_name: Some(spec.display_name.clone()),
        action: spec.action.to_string(),
        destination_network: Some(spec.destination_network.clone()),
        translated_network: Some(spec.translated_network.clone()),
        service: spec.service.clone(),
        translated_ports: spec.translated_ports.clone(),
        firewall_match: Some(spec.firewall_match.to_string()),
        sequence_number: spec.sequence_number,
        enabled: true,
        logging: false,
        revision,
    }
}

fn segment_resource(segment: types::Segment) -> Result<Resource, CoreError> {
    let kind = ResourceKind::Segment;
    let name = name_or_id(segment.display_name, &segment.id);
    let spec = SegmentSpec {
        display_name: name.clone(),
        segment_type: parse_field(kind, "type", segment.segment_type.as_deref().unwrap_or("ROUTED"))?,
        replication_mode: parse_field(
            kind,
            "replication_mode",
            segment.replication_mode.as_deref().unwrap_or("MTEP"),
        )?,
        subnets: segment
            .subnets
            .into_iter()
            .map(|s| SegmentSubnet {
                network: s.network.unwrap_or_default(),
                gateway_address: s.gateway_address.unwrap_or_default(),
            })
            .collect(),
    };
    Ok(with_revision(
        Resource::new(
            ResourceRef::new(kind, segment.id, name),
            Some(DesiredSpec::Segment(spec)),
        ),
        segment.revision,
    ))
}

fn segment_wire(id: &str, spec: &SegmentSpec, revision: Option<i64>) -> types::Segment {
    types::Segment {
        id: id.to_owned(),
        display_name: Some(spec.display_name.clone()),
        segment_type: Some(spec.segment_type.to_string()),
        replication_mode: Some(spec.replication_mode.to_string()),
        subnets: spec
            .subnets
            .iter()
            .map(|s| types::SegmentSubnet {
                network: Some(s.network.clone()),
                gateway_address: Some(s.gateway_address.clone()),
            })
            .collect(),
        revision,
    }
}

fn group_resource(domain: &str, group: types::Group) -> Resource {
    let name = name_or_id(group.display_name, &group.id);
    with_revision(
        Resource::new(
            ResourceRef::new(ResourceKind::Group, scoped_id(domain, &group.id), name.clone()),
            Some(DesiredSpec::Group(GroupSpec {
                domain: domain.to_owned(),
                display_name: name,
            })),
        ),
        group.revision,
    )
}

fn group_wire(id: &str, spec: &GroupSpec, revision: Option<i64>) -> types::Group {
    types::Group {
        id: id.to_owned(),
        display_name: Some(spec.display_name.clone()),
        expression: Vec::new(),
        revision,
    }
}

fn rule_from_wire(rule: types::Rule) -> Result<Rule, CoreError> {
    let display_name = rule
        .display_name
        .or_else(|| rule.id.clone())
        .unwrap_or_default();
    let sequence_number = u32::try_from(rule.sequence_number).map_err(|_| {
        CoreError::Internal(format!(
            "rule '{display_name}' has sequence number {} outside 0..={}",
            rule.sequence_number,
            u32::MAX
        ))
    })?;
    Ok(Rule {
        id: rule.id,
        display_name,
        sequence_number,
        action: parse_field(ResourceKind::FirewallPolicy, "rule action", &rule.action)?,
        sources: rule.source_groups,
        destinations: rule.destination_groups,
        services: rule.services,
        scope: rule.scope,
        logged: rule.logged,
    })
}

/// Rules without a server id get one derived from their name.
fn rule_wire(rule: &Rule) -> types::Rule {
    types::Rule {
        id: Some(
            rule.id
                .clone()
                .unwrap_or_else(|| object_id(&rule.display_name)),
        ),
        display_name: Some(rule.display_name.clone()),
        resource_type: RULE_RESOURCE_TYPE.into(),
        sequence_number: i64::from(rule.sequence_number),
        action: rule.action.to_string(),
        source_groups: rule.sources.clone(),
        destination_groups: rule.destinations.clone(),
        services: rule.services.clone(),
        scope: rule.scope.clone(),
        logged: rule.logged,
        revision: None,
    }
}

fn policy_resource(domain: &str, policy: types::GatewayPolicy) -> Result<Resource, CoreError> {
    let rules = policy
        .rules
        .into_iter()
        .map(rule_from_wire)
        .collect::<Result<Vec<_>, _>>()?;
    let name = name_or_id(policy.display_name, &policy.id);
    Ok(with_revision(
        Resource::new(
            ResourceRef::new(ResourceKind::FirewallPolicy, scoped_id(domain, &policy.id), name),
            Some(DesiredSpec::FirewallPolicy(PolicySpec {
                domain: domain.to_owned(),
                id: policy.id,
                rules: RuleSet::new(rules),
            })),
        ),
        policy.revision,
    ))
}

fn policy_wire(spec: &PolicySpec, revision: Option<i64>) -> types::GatewayPolicy {
    types::GatewayPolicy {
        id: spec.id.clone(),
        display_name: Some(spec.id.clone()),
        rules: spec.rules.rules().iter().map(rule_wire).collect(),
        revision,
    }
}

impl NsxGateway {
    async fn find_in<T, F>(
        &self,
        collection: Collection<'_>,
        name: Option<&str>,
        to_ref: F,
    ) -> Result<Vec<ResourceRef>, CoreError>
    where
        T: serde::de::DeserializeOwned,
        F: Fn(T) -> ResourceRef,
    {
        let all: Vec<T> = self.client.list(collection).await?;
        Ok(all
            .into_iter()
            .map(to_ref)
            .filter(|r| name.is_none_or(|n| r.display_name == n))
            .collect())
    }

    /// Writes `desired` with PUT or PATCH, then re-reads it.
    async fn write(
        &self,
        kind: ResourceKind,
        id: &str,
        desired: &Resource,
        replace: bool,
    ) -> Result<Resource, CoreError> {
        let (collection, local) = locate(kind, id)?;
        let rev = revision(desired);
        let sent = match &desired.spec {
            Some(DesiredSpec::NatRule(s)) => {
                self.send(collection, local, &nat_wire(local, s, rev), replace).await
            }
            Some(DesiredSpec::Segment(s)) => {
                self.send(collection, local, &segment_wire(local, s, rev), replace)
                    .await
            }
            Some(DesiredSpec::Group(s)) => {
                self.send(collection, local, &group_wire(local, s, rev), replace)
                    .await
            }
            Some(DesiredSpec::FirewallPolicy(s)) => {
                self.send(collection, local, &policy_wire(s, rev), replace).await
            }
            Some(DesiredSpec::PublicIp(s)) => {
                let body = types::PublicIp {
                    id: local.to_owned(),
                    display_name: Some(s.display_name.clone()),
                    ip: None,
                };
                self.send(collection, local, &body, replace).await
            }
            _ => return Err(Error::Unsupported { kind, operation: "write" }.into()),
        };
        sent.map_err(|e| e.for_resource(kind, id))?;
        self.get(kind, id).await
    }

    async fn send<B: serde::Serialize + Sync>(
        &self,
        collection: Collection<'_>,
        id: &str,
        body: &B,
        replace: bool,
    ) -> Result<(), Error> {
        if replace {
            self.client
                .put::<serde_json::Value, _>(collection, id, body)
                .await
                .map(|_| ())
        } else {
            self.client.patch(collection, id, body).await
        }
    }
}

impl ResourceGateway for NsxGateway {
    async fn find(&self, criteria: &FindCriteria) -> Result<Vec<ResourceRef>, CoreError> {
        let kind = criteria.kind;
        let name = criteria.name_filter.as_deref();
        debug!(%kind, ?name, scope = ?criteria.scope, "NSX find");

        let domain = || {
            criteria.scope.as_deref().ok_or_else(|| {
                CoreError::Internal(format!("{kind} lookups need a policy domain as scope"))
            })
        };

        match kind {
            ResourceKind::PublicIp => {
                self.find_in(Collection::PublicIps, name, |ip: types::PublicIp| {
                    let n = name_or_id(ip.display_name, &ip.id);
                    ResourceRef::new(kind, ip.id, n)
                })
                .await
            }
            ResourceKind::NatRule => {
                self.find_in(Collection::NatRules, name, |r: types::NatRule| {
                    let n = name_or_id(r.display_name, &r.id);
                    ResourceRef::new(kind, r.id, n)
                })
                .await
            }
            ResourceKind::Segment => {
                self.find_in(Collection::Segments, name, |s: types::Segment| {
                    let n = name_or_id(s.display_name, &s.id);
                    ResourceRef::new(kind, s.id, n)
                })
                .await
            }
            ResourceKind::Group => {
                let domain = domain()?;
                self.find_in(Collection::Groups { domain }, name, |g: types::Group| {
                    let n = name_or_id(g.display_name, &g.id);
                    ResourceRef::new(kind, scoped_id(domain, &g.id), n)
                })
                .await
            }
            ResourceKind::FirewallPolicy => {
                let domain = domain()?;
                self.find_in(
                    Collection::GatewayPolicies { domain },
                    name,
                    |p: types::GatewayPolicy| {
                        let n = name_or_id(p.display_name, &p.id);
                        ResourceRef::new(kind, scoped_id(domain, &p.id), n)
                    },
                )
                .await
            }
            _ => Err(Error::Unsupported { kind, operation: "find" }.into()),
        }
    }

    async fn get(&self, kind: ResourceKind, id: &str) -> Result<Resource, CoreError> {
        let (collection, local) = locate(kind, id)?;
        let not_found = |e: Error| e.for_resource(kind, id);
        match collection {
            Collection::PublicIps => self
                .client
                .get(collection, local)
                .await
                .map(public_ip_resource)
                .map_err(not_found),
            Collection::NatRules => nat_resource(
                self.client
                    .get(collection, local)
                    .await
                    .map_err(not_found)?,
            ),
            Collection::Segments => segment_resource(
                self.client
                    .get(collection, local)
                    .await
                    .map_err(not_found)?,
            ),
            Collection::Groups { domain } => self
                .client
                .get(collection, local)
                .await
                .map(|g| group_resource(domain, g))
                .map_err(not_found),
            Collection::GatewayPolicies { domain } => policy_resource(
                domain,
                self.client
                    .get(collection, local)
                    .await
                    .map_err(not_found)?,
            ),
        }
    }

    async fn create(
        &self,
        kind: ResourceKind,
        _client_token: Uuid,
        spec: &DesiredSpec,
    ) -> Result<String, CoreError> {
        if spec.kind() != kind {
            return Err(CoreError::Internal(format!(
                "cannot create {kind} from a {} spec",
                spec.kind()
            )));
        }
        if !Self::owns(kind) {
            return Err(Error::Unsupported { kind, operation: "create" }.into());
        }

        let local = match spec {
            DesiredSpec::FirewallPolicy(p) => object_id(&p.id),
            other => object_id(other.display_name()),
        };
        let id = match spec {
            DesiredSpec::Group(g) => scoped_id(&g.domain, &local),
            DesiredSpec::FirewallPolicy(p) => scoped_id(&p.domain, &local),
            _ => local,
        };

        let (collection, local) = locate(kind, &id)?;
        match self.client.get::<serde_json::Value>(collection, local).await {
            Ok(_) => return Err(CoreError::Conflict { kind, id }),
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e.for_resource(kind, &id)),
        }

        // Groups and policies are created by PATCH, the rest by PUT.
        let replace = !matches!(kind, ResourceKind::Group | ResourceKind::FirewallPolicy);
        let desired = Resource::new(
            ResourceRef::new(kind, id.clone(), spec.display_name()),
            Some(spec.clone()),
        );
        let created = self.write(kind, &id, &desired, replace).await?;
        debug!(%kind, id = %created.reference.id, "NSX object created");
        Ok(created.reference.id)
    }

    async fn update(
        &self,
        kind: ResourceKind,
        id: &str,
        resource: &Resource,
    ) -> Result<Resource, CoreError> {
        self.write(kind, id, resource, true).await
    }

    async fn patch(
        &self,
        kind: ResourceKind,
        id: &str,
        resource: &Resource,
    ) -> Result<Resource, CoreError> {
        self.write(kind, id, resource, false).await
    }

    async fn delete(&self, kind: ResourceKind, id: &str) -> Result<(), CoreError> {
        let (collection, local) = locate(kind, id)?;
        self.client
            .delete(collection, local)
            .await
            .map_err(|e| e.for_resource(kind, id))
    }
}
