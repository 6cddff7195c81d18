// In-memory doubles for the capability traits.

use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;

use uuid::Uuid;

use crate::error::CoreError;
use crate::gateway::{ResourceGateway, scoped_id};
use crate::model::{
    ATTR_IP, DeploySpec, DeploymentResult, DeploymentTarget, DesiredSpec, FileSpec, FindCriteria,
    OvfSummary, PolicySpec, Resource, ResourceKind, ResourceRef, RuleSet, UploadSession,
    UploadState,
};
use crate::{OvfDeployer, TransferService};

/// Operations recorded by the doubles, in call order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Find(ResourceKind),
    Get(ResourceKind),
    Create(ResourceKind),
    Update(ResourceKind),
    Patch(ResourceKind),
    Delete(ResourceKind),
    Begin,
    AddFile,
    Poll,
    Complete,
    Cancel,
    Filter,
    Deploy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Find,
    Get,
    Create,
    Patch,
}

fn injected(kind: ResourceKind) -> CoreError {
    CoreError::Api {
        status: Some(500),
        message: format!("injected failure for {kind}"),
    }
}

#[derive(Default)]
struct GatewayState {
    objects: Vec<(Option<String>, Resource)>,
    calls: Vec<Call>,
    failing: HashSet<(Op, ResourceKind)>,
    next_id: u32,
}

/// A gateway over a list of objects, each with an optional scope.
#[derive(Default)]
pub struct FakeGateway {
    state: Mutex<GatewayState>,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, scope: Option<&str>, resource: Resource) {
        self.lock().objects.push((scope.map(str::to_owned), resource));
    }

    /// Seeds a lookup-only object.
    pub fn seed_named(&self, kind: ResourceKind, id: &str, name: &str) {
        self.seed(None, Resource::new(ResourceRef::new(kind, id, name), None));
    }

    pub fn seed_policy(&self, domain: &str, id: &str, rules: RuleSet) {
        let spec = DesiredSpec::FirewallPolicy(PolicySpec {
            domain: domain.into(),
            id: id.into(),
            rules,
        });
        let reference = ResourceRef::new(ResourceKind::FirewallPolicy, scoped_id(domain, id), id);
        self.seed(Some(domain), Resource::new(reference, Some(spec)));
    }

    pub fn fail(&self, op: Op, kind: ResourceKind) {
        self.lock().failing.insert((op, kind));
    }

    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    pub fn count(&self, call: &Call) -> usize {
        self.lock().calls.iter().filter(|c| *c == call).count()
    }

    pub fn resource(&self, kind: ResourceKind, id: &str) -> Option<Resource> {
        self.lock()
            .objects
            .iter()
            .find(|(_, r)| r.reference.kind == kind && r.reference.id == id)
            .map(|(_, r)| r.clone())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, GatewayState> {
        self.state.lock().expect("fake gateway lock poisoned")
    }

    fn enter(&self, call: Call, op: Option<Op>, kind: ResourceKind) -> Result<(), CoreError> {
        let mut state = self.lock();
        state.calls.push(call);
        match op {
            Some(op) if state.failing.contains(&(op, kind)) => Err(injected(kind)),
            _ => Ok(()),
        }
    }
}

fn scope_of(spec: &DesiredSpec) -> Option<String> {
    match spec {
        DesiredSpec::LibraryItem(s) => Some(s.library_id.clone()),
        DesiredSpec::Group(s) => Some(s.domain.clone()),
        DesiredSpec::FirewallPolicy(s) => Some(s.domain.clone()),
        DesiredSpec::Nic(s) => Some(s.vm_id.clone()),
        _ => None,
    }
}

impl ResourceGateway for FakeGateway {
    async fn find(&self, criteria: &FindCriteria) -> Result<Vec<ResourceRef>, CoreError> {
        self.enter(Call::Find(criteria.kind), Some(Op::Find), criteria.kind)?;
        let state = self.lock();
        Ok(state
            .objects
            .iter()
            .filter(|(scope, r)| {
                r.reference.kind == criteria.kind
                    && criteria
                        .name_filter
                        .as_ref()
                        .is_none_or(|n| *n == r.reference.display_name)
                    && criteria
                        .scope
                        .as_ref()
                        .is_none_or(|s| scope.as_ref() == Some(s))
            })
            .map(|(_, r)| r.reference.clone())
            .collect())
    }

    async fn get(&self, kind: ResourceKind, id: &str) -> Result<Resource, CoreError> {
        self.enter(Call::Get(kind), Some(Op::Get), kind)?;
        self.resource(kind, id).ok_or_else(|| CoreError::NotFound {
            kind,
            id: id.into(),
        })
    }

    async fn create(
        &self,
        kind: ResourceKind,
        _client_token: Uuid,
        spec: &DesiredSpec,
    ) -> Result<String, CoreError> {
        self.enter(Call::Create(kind), Some(Op::Create), kind)?;
        let mut state = self.lock();
        state.next_id += 1;
        let n = state.next_id;
        let id = format!("{}-{n}", kind.to_string().to_lowercase());
        let reference = ResourceRef::new(kind, &id, spec.display_name());
        let mut resource = Resource::new(reference, Some(spec.clone()));
        if kind == ResourceKind::PublicIp {
            resource = resource.with_attribute(ATTR_IP, format!("203.0.113.{n}"));
        }
        state.objects.push((scope_of(spec), resource));
        Ok(id)
    }

    async fn update(
        &self,
        kind: ResourceKind,
        id: &str,
        resource: &Resource,
    ) -> Result<Resource, CoreError> {
        self.enter(Call::Update(kind), None, kind)?;
        self.replace(kind, id, resource)
    }

    async fn patch(
        &self,
        kind: ResourceKind,
        id: &str,
        resource: &Resource,
    ) -> Result<Resource, CoreError> {
        self.enter(Call::Patch(kind), Some(Op::Patch), kind)?;
        self.replace(kind, id, resource)
    }

    async fn delete(&self, kind: ResourceKind, id: &str) -> Result<(), CoreError> {
        self.enter(Call::Delete(kind), None, kind)?;
        let mut state = self.lock();
        let before = state.objects.len();
        state
            .objects
            .retain(|(_, r)| !(r.reference.kind == kind && r.reference.id == id));
        if state.objects.len() == before {
            return Err(CoreError::NotFound {
                kind,
                id: id.into(),
            });
        }
        Ok(())
    }
}

impl FakeGateway {
    fn replace(&self, kind: ResourceKind, id: &str, resource: &Resource) -> Result<Resource, CoreError> {
        let mut state = self.lock();
        let slot = state
            .objects
            .iter_mut()
            .find(|(_, r)| r.reference.kind == kind && r.reference.id == id)
            .ok_or_else(|| CoreError::NotFound {
                kind,
                id: id.into(),
            })?;
        slot.1 = resource.clone();
        Ok(resource.clone())
    }
}

// ── Transfer ────────────────────────────────────────────────────────

struct TransferState {
    states: VecDeque<UploadState>,
    calls: Vec<Call>,
    fail_complete: bool,
}

/// Replays a scripted sequence of session states; the last one repeats.
pub struct FakeTransfer {
    state: Mutex<TransferState>,
}

impl FakeTransfer {
    pub fn scripted(states: &[UploadState]) -> Self {
        Self {
            state: Mutex::new(TransferState {
                states: states.iter().copied().collect(),
                calls: Vec::new(),
                fail_complete: false,
            }),
        }
    }

    pub fn failing_complete(self) -> Self {
        self.lock().fail_complete = true;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    pub fn count(&self, call: &Call) -> usize {
        self.lock().calls.iter().filter(|c| *c == call).count()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, TransferState> {
        self.state.lock().expect("fake transfer lock poisoned")
    }

    fn record(&self, call: Call) {
        self.lock().calls.push(call);
    }
}

impl TransferService for FakeTransfer {
    async fn begin(&self, item_id: &str, _client_token: Uuid) -> Result<String, CoreError> {
        self.record(Call::Begin);
        Ok(format!("session-for-{item_id}"))
    }

    async fn add_file(&self, _session_id: &str, _file: &FileSpec) -> Result<(), CoreError> {
        self.record(Call::AddFile);
        Ok(())
    }

    async fn poll(&self, session_id: &str) -> Result<UploadSession, CoreError> {
        let mut state = self.lock();
        state.calls.push(Call::Poll);
        let current = if state.states.len() > 1 {
            state.states.pop_front()
        } else {
            state.states.front().copied()
        }
        .unwrap_or(UploadState::Active);
        Ok(UploadSession {
            id: session_id.into(),
            library_item_id: "item".into(),
            state: current,
            client_progress: if current == UploadState::Done { 100 } else { 40 },
            error_message: (current == UploadState::Error).then(|| "checksum mismatch".into()),
        })
    }

    async fn complete(&self, _session_id: &str) -> Result<(), CoreError> {
        let mut state = self.lock();
        state.calls.push(Call::Complete);
        if state.fail_complete {
            return Err(CoreError::Api {
                status: Some(400),
                message: "session not completable".into(),
            });
        }
        Ok(())
    }

    async fn cancel(&self, _session_id: &str) -> Result<(), CoreError> {
        self.record(Call::Cancel);
        Ok(())
    }
}

// ── Deployer ────────────────────────────────────────────────────────

pub struct FakeDeployer {
    result: DeploymentResult,
    calls: Mutex<Vec<Call>>,
    last_spec: Mutex<Option<DeploySpec>>,
}

impl FakeDeployer {
    pub fn succeeding(vm_id: &str) -> Self {
        Self::returning(DeploymentResult::success(vm_id))
    }

    pub fn returning(result: DeploymentResult) -> Self {
        Self {
            result,
            calls: Mutex::new(Vec::new()),
            last_spec: Mutex::new(None),
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().expect("lock").clone()
    }

    pub fn last_spec(&self) -> Option<DeploySpec> {
        self.last_spec.lock().expect("lock").clone()
    }
}

impl OvfDeployer for FakeDeployer {
    async fn filter(
        &self,
        _item_id: &str,
        _target: &DeploymentTarget,
    ) -> Result<OvfSummary, CoreError> {
        self.calls.lock().expect("lock").push(Call::Filter);
        Ok(OvfSummary {
            name: Some("appliance".into()),
            annotation: Some("Network insight collector".into()),
            eulas: Vec::new(),
        })
    }

    async fn deploy(
        &self,
        _client_token: Uuid,
        _item_id: &str,
        _target: &DeploymentTarget,
        spec: &DeploySpec,
    ) -> Result<DeploymentResult, CoreError> {
        self.calls.lock().expect("lock").push(Call::Deploy);
        *self.last_spec.lock().expect("lock") = Some(spec.clone());
        Ok(self.result.clone())
    }
}
