// ── Deployment orchestrator ──
//
// Runs the provisioning workflow as a strict sequence of stages. Nothing is
// retried and nothing is rolled back: the first failure stops the run and is
// reported with the stage it happened in and the last stage that finished.

use chrono::{DateTime, Utc};
use serde::Serialize;
use strum::Display;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

use crate::deploy::{OvfDeployer, generated_vm_name};
use crate::error::{CoreError, WorkflowError};
use crate::gateway::{ResourceGateway, scoped_id};
use crate::model::{
    ATTR_IP, BackingType, DeploySpec, DeploymentTarget, DesiredSpec, FileSpec, FindCriteria, GroupSpec,
    LibraryItemSpec, LibrarySpec, NicSpec, PublicIpSpec, ResourceKind, ResourceRef, Rule,
    RuleSet, UploadSession,
};
use crate::reconcile::{Ensured, Reconciler};
use crate::request::{ItemRequest, LibraryRequest, NetworkPlan, WorkflowRequest};
use crate::transfer::{PollConfig, TransferService, stage_artifact};

/// Attribute a network lookup may carry to pick the NIC backing type.
pub const ATTR_BACKING_TYPE: &str = "backing_type";

// ── Stage ────────────────────────────────────────────────────────

/// Workflow checkpoints, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Display)]
pub enum Stage {
    LibraryEnsured,
    ItemEnsured,
    ArtifactStaged,
    VmDeployed,
    NetworkAttached,
    PolicyReconciled,
    Done,
}

// ── Reports ──────────────────────────────────────────────────────

/// Objects touched by the network stage.
#[derive(Debug, Clone, Serialize)]
pub struct NetworkReport {
    /// Address allocated to the public IP object.
    pub public_address: String,
    /// Public IP, NAT rule, segment, then groups, in reconciliation order.
    pub objects: Vec<Ensured>,
    pub policies: Vec<PolicyOutcome>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PolicyOutcome {
    pub policy: ResourceRef,
    pub rules: RuleSet,
}

/// Summary of a successful run.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowReport {
    pub vm_name: String,
    pub library: Ensured,
    pub item: Ensured,
    pub vm_id: String,
    pub nic_id: Option<String>,
    pub network: Option<NetworkReport>,
    pub stages: Vec<Stage>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

// ── Orchestrator ─────────────────────────────────────────────────

type ProgressFn<'a> = Box<dyn Fn(&UploadSession) + Send + Sync + 'a>;

/// Drives one workflow run over the three capabilities.
pub struct Orchestrator<'a, G, T, D> {
    reconciler: Reconciler<'a, G>,
    transfer: &'a T,
    deployer: &'a D,
    poll: PollConfig,
    cancel: CancellationToken,
    on_progress: Option<ProgressFn<'a>>,
}

struct RunState {
    completed: Vec<Stage>,
    vm_id: Option<String>,
}

impl RunState {
    fn complete(&mut self, stage: Stage) {
        info!(%stage, "stage complete");
        self.completed.push(stage);
    }

    fn fail(&self, stage: Stage, source: CoreError) -> WorkflowError {
        WorkflowError {
            failed_stage: stage,
            last_completed: self.completed.last().copied(),
            vm_id: self.vm_id.clone(),
            source,
        }
    }
}

impl<'a, G, T, D> Orchestrator<'a, G, T, D>
where
    G: ResourceGateway,
    T: TransferService,
    D: OvfDeployer,
{
    pub fn new(gateway: &'a G, transfer: &'a T, deployer: &'a D) -> Self {
        Self {
            reconciler: Reconciler::new(gateway),
            transfer,
            deployer,
            poll: PollConfig::default(),
            cancel: CancellationToken::new(),
            on_progress: None,
        }
    }

    pub fn with_poll_config(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }

    /// Honoured between stages and while waiting on an upload.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn on_progress(mut self, f: impl Fn(&UploadSession) + Send + Sync + 'a) -> Self {
        self.on_progress = Some(Box::new(f));
        self
    }

    fn checkpoint(&self, run: &RunState, next: Stage) -> Result<(), WorkflowError> {
        if self.cancel.is_cancelled() {
            return Err(run.fail(next, CoreError::Cancelled));
        }
        Ok(())
    }

    /// Runs every stage of `request` in order.
    pub async fn run(&self, request: &WorkflowRequest) -> Result<WorkflowReport, WorkflowError> {
        let started_at = Utc::now();
        let mut run = RunState {
            completed: Vec::new(),
            vm_id: None,
        };

        // LibraryEnsured
        self.checkpoint(&run, Stage::LibraryEnsured)?;
        let library = self
            .ensure_library(&request.library)
            .await
            .map_err(|e| {
                run.fail(
                    Stage::LibraryEnsured,
                    CoreError::FatalSetup {
                        message: format!("could not ensure library '{}'", request.library.name),
                        cause: Some(Box::new(e)),
                    },
                )
            })?;
        run.complete(Stage::LibraryEnsured);

        // ItemEnsured
        self.checkpoint(&run, Stage::ItemEnsured)?;
        let item = self
            .ensure_item(&library.reference.id, &request.item)
            .await
            .map_err(|e| run.fail(Stage::ItemEnsured, e))?;
        run.complete(Stage::ItemEnsured);

        // ArtifactStaged, only for a fresh item
        if item.created {
            self.checkpoint(&run, Stage::ArtifactStaged)?;
            let Some(source) = &request.item.source else {
                return Err(run.fail(
                    Stage::ArtifactStaged,
                    CoreError::FatalSetup {
                        message: format!(
                            "library item '{}' was created but the request has no source to upload",
                            request.item.name
                        ),
                        cause: None,
                    },
                ));
            };
            self.stage(&item.reference.id, source)
                .await
                .map_err(|e| run.fail(Stage::ArtifactStaged, e))?;
            run.complete(Stage::ArtifactStaged);
        }

        // VmDeployed
        self.checkpoint(&run, Stage::VmDeployed)?;
        let vm_name = request.vm_name.clone().unwrap_or_else(generated_vm_name);
        let vm_id = self
            .deploy_vm(request, &item.reference.id, &vm_name)
            .await
            .map_err(|e| run.fail(Stage::VmDeployed, e))?;
        run.vm_id = Some(vm_id.clone());
        run.complete(Stage::VmDeployed);

        // NetworkAttached
        let mut nic_id = None;
        if let Some(network) = &request.network {
            self.checkpoint(&run, Stage::NetworkAttached)?;
            let id = self
                .attach_network(&vm_id, network)
                .await
                .map_err(|e| run.fail(Stage::NetworkAttached, e))?;
            nic_id = Some(id);
            run.complete(Stage::NetworkAttached);
        }

        // PolicyReconciled
        let mut network = None;
        if let Some(plan) = &request.network_plan {
            self.checkpoint(&run, Stage::PolicyReconciled)?;
            let report = self
                .reconcile_network(plan)
                .await
                .map_err(|e| run.fail(Stage::PolicyReconciled, e))?;
            network = Some(report);
            run.complete(Stage::PolicyReconciled);
        }

        run.complete(Stage::Done);
        Ok(WorkflowReport {
            vm_name,
            library,
            item,
            vm_id,
            nic_id,
            network,
            stages: run.completed,
            started_at,
            finished_at: Utc::now(),
        })
    }

    /// Local library on the named datastore, created when missing.
    pub async fn ensure_library(&self, request: &LibraryRequest) -> Result<Ensured, CoreError> {
        let datastore = self
            .reconciler
            .lookup(FindCriteria::new(ResourceKind::Datastore).named(&request.datastore))
            .await?;
        self.reconciler
            .ensure(ResourceKind::Library, &request.name, |name| {
                let mut spec = LibrarySpec::local(name, datastore.id);
                if let Some(description) = &request.description {
                    spec.description.clone_from(description);
                }
                DesiredSpec::Library(spec)
            })
            .await
    }

    /// Library item named `item.name` inside `library_id`.
    pub async fn ensure_item(
        &self,
        library_id: &str,
        item: &ItemRequest,
    ) -> Result<Ensured, CoreError> {
        self.reconciler
            .ensure_in(
                FindCriteria::new(ResourceKind::LibraryItem).in_scope(library_id),
                &item.name,
                |name| {
                    DesiredSpec::LibraryItem(LibraryItemSpec {
                        name: name.to_owned(),
                        library_id: library_id.to_owned(),
                        item_type: item.item_type.clone(),
                    })
                },
            )
            .await
    }

    /// Uploads `source` into the item through one update session.
    pub async fn stage(&self, item_id: &str, source: &FileSpec) -> Result<UploadSession, CoreError> {
        stage_artifact(self.transfer, item_id, source, self.poll, &self.cancel, |s| {
            if let Some(cb) = &self.on_progress {
                cb(s);
            }
        })
        .await
    }

    async fn deploy_vm(
        &self,
        request: &WorkflowRequest,
        item_id: &str,
        vm_name: &str,
    ) -> Result<String, CoreError> {
        let pool = self
            .reconciler
            .lookup(FindCriteria::new(ResourceKind::ResourcePool).named(&request.placement.resource_pool))
            .await?;
        let folder = self
            .reconciler
            .lookup(
                FindCriteria::new(ResourceKind::Folder)
                    .named(request.placement.folder_name())
                    .of_type("VIRTUAL_MACHINE"),
            )
            .await?;
        let target = DeploymentTarget {
            resource_pool_id: pool.id,
            folder_id: Some(folder.id),
        };

        let summary = self.deployer.filter(item_id, &target).await?;
        let spec = DeploySpec {
            name: vm_name.to_owned(),
            annotation: summary.annotation,
            accept_all_eula: true,
            additional_parameters: request.additional_parameters.clone(),
        };

        let result = self
            .deployer
            .deploy(Uuid::new_v4(), item_id, &target, &spec)
            .await?;
        if !result.succeeded {
            return Err(CoreError::DeploymentFailed {
                error: result
                    .error
                    .unwrap_or_else(|| "deployment reported failure without detail".into()),
            });
        }
        let vm_id = result.resource_id.ok_or_else(|| CoreError::DeploymentFailed {
            error: "deployment succeeded but returned no VM id".into(),
        })?;
        info!(vm = %vm_id, name = vm_name, "VM deployed");
        Ok(vm_id)
    }

    async fn attach_network(&self, vm_id: &str, network: &str) -> Result<String, CoreError> {
        let gateway = self.reconciler.gateway();
        let backing = self
            .reconciler
            .lookup(FindCriteria::new(ResourceKind::Network).named(network))
            .await?;
        let details = gateway.get(ResourceKind::Network, &backing.id).await?;
        let backing_type = details
            .attribute(ATTR_BACKING_TYPE)
            .and_then(|t| t.parse::<BackingType>().ok())
            .unwrap_or(BackingType::OpaqueNetwork);

        let spec = DesiredSpec::Nic(NicSpec {
            vm_id: vm_id.to_owned(),
            backing_type,
            network: backing.id,
            start_connected: true,
        });
        let nic_id = gateway
            .create(ResourceKind::Nic, Uuid::new_v4(), &spec)
            .await?;
        info!(vm = %vm_id, nic = %nic_id, network, "network attached");
        Ok(nic_id)
    }

    /// The network stage on its own: public IP, NAT rule, segment, groups,
    /// then policy rules. Stops at the first failure; earlier objects stay.
    pub async fn reconcile_network(&self, plan: &NetworkPlan) -> Result<NetworkReport, CoreError> {
        let rec = &self.reconciler;
        let mut objects = Vec::new();

        let public_ip = rec
            .ensure(ResourceKind::PublicIp, &plan.public_ip, |name| {
                DesiredSpec::PublicIp(PublicIpSpec {
                    display_name: name.to_owned(),
                })
            })
            .await?;
        let allocated = rec
            .gateway()
            .get(ResourceKind::PublicIp, &public_ip.reference.id)
            .await?;
        let public_address = allocated
            .attribute(ATTR_IP)
            .map(str::to_owned)
            .ok_or_else(|| CoreError::ReconcileFailed {
                kind: ResourceKind::PublicIp,
                name: plan.public_ip.clone(),
                cause: Box::new(CoreError::Internal("no address allocated".into())),
            })?;
        objects.push(public_ip);

        let nat = rec
            .ensure(ResourceKind::NatRule, &plan.nat_rule.display_name, |name| {
                DesiredSpec::NatRule(plan.nat_rule.to_spec(name, &public_address))
            })
            .await?;
        objects.push(nat);

        let segment = rec
            .ensure(ResourceKind::Segment, &plan.segment.display_name, |name| {
                DesiredSpec::Segment(plan.segment.to_spec(name))
            })
            .await?;
        objects.push(segment);

        for group in &plan.groups {
            let ensured = rec
                .ensure_in(
                    FindCriteria::new(ResourceKind::Group).in_scope(&group.domain),
                    &group.display_name,
                    |name| {
                        DesiredSpec::Group(GroupSpec {
                            domain: group.domain.clone(),
                            display_name: name.to_owned(),
                        })
                    },
                )
                .await?;
            objects.push(ensured);
        }

        let mut policies = Vec::new();
        for policy in &plan.policies {
            if self.cancel.is_cancelled() {
                return Err(CoreError::Cancelled);
            }
            let reference = ResourceRef::new(
                ResourceKind::FirewallPolicy,
                scoped_id(&policy.domain, &policy.policy),
                policy.policy.clone(),
            );
            let names: Vec<&str> = policy.rules.iter().map(|r| r.display_name.as_str()).collect();
            let rules = rec
                .ensure_policy_rules(&reference, &names, |name, seq| {
                    policy
                        .rules
                        .iter()
                        .find(|r| r.display_name == name)
                        .map_or_else(
                            || {
                                warn!(rule = name, "no template for rule");
                                Rule::allow(name, seq)
                            },
                            |t| t.to_rule(seq),
                        )
                })
                .await?;
            policies.push(PolicyOutcome {
                policy: reference,
                rules,
            });
        }

        Ok(NetworkReport {
            public_address,
            objects,
            policies,
        })
    }
}
