// ── Idempotent reconciliation ──
//
// Get-or-create over a `ResourceGateway`. A lookup miss is ordinary control
// flow (an empty `find`), never an error. Name collisions resolve
// first-match-wins; concurrent runs racing on the same name are guarded only
// by the client token handed to `create`.

use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::CoreError;
use crate::gateway::ResourceGateway;
use crate::model::{
    DesiredSpec, FindCriteria, PolicySpec, Resource, ResourceKind, ResourceRef, Rule, RuleSet,
};

/// Outcome of one `ensure`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ensured {
    pub reference: ResourceRef,
    /// `true` when this call created the object.
    pub created: bool,
}

/// Reconciler bound to one gateway.
pub struct Reconciler<'g, G> {
    gateway: &'g G,
}

impl<'g, G: ResourceGateway> Reconciler<'g, G> {
    pub fn new(gateway: &'g G) -> Self {
        Self { gateway }
    }

    pub fn gateway(&self) -> &'g G {
        self.gateway
    }

    /// Returns the first object of `kind` named `name`, creating it from
    /// `build(name)` when none exists.
    pub async fn ensure<F>(&self, kind: ResourceKind, name: &str, build: F) -> Result<Ensured, CoreError>
    where
        F: FnOnce(&str) -> DesiredSpec + Send,
    {
        self.ensure_in(FindCriteria::new(kind), name, build).await
    }

    /// `ensure` within a narrowed query, e.g. items of one library.
    pub async fn ensure_in<F>(
        &self,
        criteria: FindCriteria,
        name: &str,
        build: F,
    ) -> Result<Ensured, CoreError>
    where
        F: FnOnce(&str) -> DesiredSpec + Send,
    {
        let kind = criteria.kind;
        let failed = |cause: CoreError| CoreError::ReconcileFailed {
            kind,
            name: name.to_owned(),
            cause: Box::new(cause),
        };

        let criteria = criteria.named(name);
        let found = self.gateway.find(&criteria).await.map_err(failed)?;
        if let Some(existing) = found.into_iter().next() {
            debug!(%kind, name, id = %existing.id, "found existing");
            return Ok(Ensured {
                reference: existing,
                created: false,
            });
        }

        let spec = build(name);
        if spec.kind() != kind {
            return Err(failed(CoreError::Internal(format!(
                "builder for {kind} produced a {} spec",
                spec.kind()
            ))));
        }

        let token = Uuid::new_v4();
        let id = self
            .gateway
            .create(kind, token, &spec)
            .await
            .map_err(failed)?;
        let created = self.gateway.get(kind, &id).await.map_err(failed)?;
        info!(%kind, name, id = %created.reference.id, "created");

        Ok(Ensured {
            reference: created.reference,
            created: true,
        })
    }

    /// First object matching `criteria`, or `NotFound` naming the filter.
    pub async fn lookup(&self, criteria: FindCriteria) -> Result<ResourceRef, CoreError> {
        let kind = criteria.kind;
        let found = self.gateway.find(&criteria).await?;
        found.into_iter().next().ok_or_else(|| CoreError::NotFound {
            kind,
            id: criteria.name_filter.unwrap_or_default(),
        })
    }

    /// Merges one named rule into an existing gateway policy.
    ///
    /// An existing rule whose id or display name matches `rule_name`
    /// (ignoring ASCII case) leaves the policy untouched. Otherwise the rule
    /// is built at the lowest free sequence number and the policy is
    /// patched once.
    pub async fn ensure_policy_rule<F>(
        &self,
        policy: &ResourceRef,
        rule_name: &str,
        build: F,
    ) -> Result<RuleSet, CoreError>
    where
        F: Fn(&str, u32) -> Rule + Send,
    {
        self.ensure_policy_rules(policy, &[rule_name], build).await
    }

    /// Merges several named rules with a single patch. No patch is issued
    /// when every rule is already present.
    pub async fn ensure_policy_rules<F>(
        &self,
        policy: &ResourceRef,
        rule_names: &[&str],
        build: F,
    ) -> Result<RuleSet, CoreError>
    where
        F: Fn(&str, u32) -> Rule + Send,
    {
        let failed = |cause: CoreError| CoreError::ReconcileFailed {
            kind: ResourceKind::FirewallPolicy,
            name: policy.display_name.clone(),
            cause: Box::new(cause),
        };

        let current = self
            .gateway
            .get(ResourceKind::FirewallPolicy, &policy.id)
            .await
            .map_err(failed)?;
        let Some(DesiredSpec::FirewallPolicy(spec)) = current.spec else {
            return Err(failed(CoreError::Internal(format!(
                "{} carries no rule set",
                policy.id
            ))));
        };

        let mut rules = spec.rules.clone();
        let mut added = Vec::new();
        for &name in rule_names {
            if rules.find(name).is_some() {
                debug!(policy = %policy.id, rule = name, "rule already present");
                continue;
            }
            let rule = rules.insert_with(name, &build);
            info!(policy = %policy.id, rule = name, sequence = rule.sequence_number, "adding rule");
            added.push(name);
        }

        if added.is_empty() {
            return Ok(rules);
        }

        let desired = Resource {
            reference: current.reference,
            spec: Some(DesiredSpec::FirewallPolicy(PolicySpec {
                rules: rules.clone(),
                ..spec
            })),
            attributes: current.attributes,
        };
        let patched = self
            .gateway
            .patch(ResourceKind::FirewallPolicy, &policy.id, &desired)
            .await
            .map_err(failed)?;

        // Some endpoints answer a patch with an empty body.
        Ok(match patched.spec {
            Some(DesiredSpec::FirewallPolicy(s)) => s.rules,
            _ => rules,
        })
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::{GroupSpec, LibraryItemSpec, PublicIpSpec};
    use crate::testing::{Call, FakeGateway, Op};

    fn public_ip(name: &str) -> DesiredSpec {
        DesiredSpec::PublicIp(PublicIpSpec {
            display_name: name.into(),
        })
    }

    fn rules_with(seqs: &[u32]) -> RuleSet {
        RuleSet::new(
            seqs.iter()
                .map(|&n| Rule::allow(format!("existing-{n}"), n))
                .collect(),
        )
    }

    fn policy() -> ResourceRef {
        ResourceRef::new(ResourceKind::FirewallPolicy, "cgw/default", "default")
    }

    #[tokio::test]
    async fn ensure_twice_creates_once() {
        let gw = FakeGateway::new();
        let rec = Reconciler::new(&gw);

        let first = rec
            .ensure(ResourceKind::PublicIp, "vc-ip", public_ip)
            .await
            .expect("first ensure");
        let second = rec
            .ensure(ResourceKind::PublicIp, "vc-ip", public_ip)
            .await
            .expect("second ensure");

        assert!(first.created);
        assert!(!second.created);
        assert_eq!(first.reference, second.reference);
        assert_eq!(gw.count(&Call::Create(ResourceKind::PublicIp)), 1);
    }

    #[tokio::test]
    async fn first_match_wins_without_create() {
        let gw = FakeGateway::new();
        gw.seed_named(ResourceKind::Segment, "seg-a", "proxy");
        gw.seed_named(ResourceKind::Segment, "seg-b", "proxy");
        let rec = Reconciler::new(&gw);

        let ensured = rec
            .ensure(ResourceKind::Segment, "proxy", |_| unreachable!("must not build"))
            .await
            .expect("ensure");

        assert_eq!(ensured.reference.id, "seg-a");
        assert!(!ensured.created);
        assert_eq!(gw.count(&Call::Create(ResourceKind::Segment)), 0);
    }

    #[tokio::test]
    async fn ensure_in_respects_scope() {
        let gw = FakeGateway::new();
        gw.seed(
            Some("mgw"),
            Resource::new(ResourceRef::new(ResourceKind::Group, "mgw/proxy", "proxy"), None),
        );
        let rec = Reconciler::new(&gw);

        let ensured = rec
            .ensure_in(
                FindCriteria::new(ResourceKind::Group).in_scope("cgw"),
                "proxy",
                |name| {
                    DesiredSpec::Group(GroupSpec {
                        domain: "cgw".into(),
                        display_name: name.into(),
                    })
                },
            )
            .await
            .expect("ensure");

        assert!(ensured.created);
        assert_ne!(ensured.reference.id, "mgw/proxy");
    }

    #[tokio::test]
    async fn create_failure_is_wrapped() {
        let gw = FakeGateway::new();
        gw.fail(Op::Create, ResourceKind::LibraryItem);
        let rec = Reconciler::new(&gw);

        let err = rec
            .ensure(ResourceKind::LibraryItem, "appliance", |name| {
                DesiredSpec::LibraryItem(LibraryItemSpec {
                    name: name.into(),
                    library_id: "lib-1".into(),
                    item_type: "ovf".into(),
                })
            })
            .await
            .expect_err("create fails");

        match err {
            CoreError::ReconcileFailed { kind, name, cause } => {
                assert_eq!(kind, ResourceKind::LibraryItem);
                assert_eq!(name, "appliance");
                assert!(matches!(*cause, CoreError::Api { .. }));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(gw.count(&Call::Create(ResourceKind::LibraryItem)), 1);
    }

    #[tokio::test]
    async fn mismatched_builder_is_rejected_before_create() {
        let gw = FakeGateway::new();
        let rec = Reconciler::new(&gw);

        let err = rec
            .ensure(ResourceKind::Segment, "proxy", public_ip)
            .await
            .expect_err("kind mismatch");

        assert!(matches!(err.root_cause(), CoreError::Internal(_)));
        assert_eq!(gw.count(&Call::Create(ResourceKind::Segment)), 0);
    }

    #[tokio::test]
    async fn rule_is_added_at_lowest_free_sequence() {
        let gw = FakeGateway::new();
        gw.seed_policy("cgw", "default", rules_with(&[0, 1, 3]));
        let rec = Reconciler::new(&gw);

        let rules = rec
            .ensure_policy_rule(&policy(), "services-allow", |name, seq| Rule::allow(name, seq))
            .await
            .expect("merge");

        let added = rules.find("services-allow").expect("rule added");
        assert_eq!(added.sequence_number, 2);
        assert_eq!(rules.len(), 4);
    }

    #[tokio::test]
    async fn second_merge_does_not_patch() {
        let gw = FakeGateway::new();
        gw.seed_policy("cgw", "default", rules_with(&[0]));
        let rec = Reconciler::new(&gw);

        for _ in 0..2 {
            rec.ensure_policy_rule(&policy(), "services-allow", |name, seq| Rule::allow(name, seq))
                .await
                .expect("merge");
        }

        assert_eq!(gw.count(&Call::Patch(ResourceKind::FirewallPolicy)), 1);
        let stored = gw
            .resource(ResourceKind::FirewallPolicy, "cgw/default")
            .expect("policy present");
        let Some(DesiredSpec::FirewallPolicy(spec)) = stored.spec else {
            panic!("policy lost its spec");
        };
        assert_eq!(spec.rules.len(), 2);
    }

    #[tokio::test]
    async fn existing_rule_matches_case_insensitively() {
        let gw = FakeGateway::new();
        gw.seed_policy(
            "mgw",
            "default",
            RuleSet::new(vec![Rule::allow("Proxy-VC", 0)]),
        );
        let rec = Reconciler::new(&gw);
        let mgw = ResourceRef::new(ResourceKind::FirewallPolicy, "mgw/default", "default");

        let rules = rec
            .ensure_policy_rule(&mgw, "proxy-vc", |name, seq| Rule::allow(name, seq))
            .await
            .expect("merge");

        assert_eq!(rules.len(), 1);
        assert_eq!(gw.count(&Call::Patch(ResourceKind::FirewallPolicy)), 0);
    }

    #[tokio::test]
    async fn missing_policy_fails_without_patch() {
        let gw = FakeGateway::new();
        let rec = Reconciler::new(&gw);

        let err = rec
            .ensure_policy_rule(&policy(), "services-allow", |name, seq| Rule::allow(name, seq))
            .await
            .expect_err("no parent policy");

        assert!(matches!(err, CoreError::ReconcileFailed { .. }));
        assert!(err.root_cause().is_not_found());
        assert_eq!(gw.count(&Call::Patch(ResourceKind::FirewallPolicy)), 0);
        assert_eq!(gw.count(&Call::Create(ResourceKind::FirewallPolicy)), 0);
    }

    #[tokio::test]
    async fn several_rules_share_one_patch() {
        let gw = FakeGateway::new();
        gw.seed_policy("mgw", "default", rules_with(&[0, 2]));
        let rec = Reconciler::new(&gw);
        let mgw = ResourceRef::new(ResourceKind::FirewallPolicy, "mgw/default", "default");

        let rules = rec
            .ensure_policy_rules(&mgw, &["proxy-vc", "proxy-nsx"], |name, seq| {
                Rule::allow(name, seq)
            })
            .await
            .expect("merge");

        let seqs: Vec<u32> = rules.rules().iter().map(|r| r.sequence_number).collect();
        assert_eq!(seqs, vec![0, 2, 1, 3]);
        assert_eq!(gw.count(&Call::Patch(ResourceKind::FirewallPolicy)), 1);
    }

    #[tokio::test]
    async fn patch_failure_is_wrapped() {
        let gw = FakeGateway::new();
        gw.seed_policy("cgw", "default", RuleSet::default());
        gw.fail(Op::Patch, ResourceKind::FirewallPolicy);
        let rec = Reconciler::new(&gw);

        let err = rec
            .ensure_policy_rule(&policy(), "services-allow", |name, seq| Rule::allow(name, seq))
            .await
            .expect_err("patch fails");

        assert!(matches!(
            err,
            CoreError::ReconcileFailed {
                kind: ResourceKind::FirewallPolicy,
                ..
            }
        ));
    }
}
