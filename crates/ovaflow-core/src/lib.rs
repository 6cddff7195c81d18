// ovaflow-core: reconciliation and orchestration between the CLI and the
// platform clients. Never talks HTTP itself.

pub mod deploy;
pub mod error;
pub mod gateway;
pub mod model;
pub mod orchestrator;
pub mod reconcile;
pub mod request;
pub mod transfer;

#[cfg(test)]
pub(crate) mod testing;

// ── Primary re-exports ──────────────────────────────────────────────
pub use deploy::{OvfDeployer, generated_vm_name};
pub use error::{CoreError, WorkflowError};
pub use gateway::{ResourceGateway, scoped_id, split_scoped_id};
pub use orchestrator::{NetworkReport, Orchestrator, PolicyOutcome, Stage, WorkflowReport};
pub use reconcile::{Ensured, Reconciler};
pub use request::{
    GroupTemplate, ItemRequest, LibraryRequest, NatRuleTemplate, NetworkPlan, Placement,
    PolicyPlan, RuleTemplate, SegmentTemplate, WorkflowRequest,
};
pub use transfer::{PollConfig, TransferService, stage_artifact};

pub use model::{
    DesiredSpec, FindCriteria, Resource, ResourceKind, ResourceRef, Rule, RuleSet, UploadSession,
    UploadState,
};
