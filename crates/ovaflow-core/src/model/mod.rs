// ── Domain model ──
//
// Plain values exchanged with gateways. Nothing here is cached: every
// workflow run re-reads remote state.

pub mod deploy;
pub mod resource;
pub mod rules;
pub mod spec;
pub mod upload;

pub use deploy::{DeploySpec, DeploymentResult, DeploymentTarget, OvfSummary};
pub use resource::{ATTR_IP, FindCriteria, Resource, ResourceKind, ResourceRef};
pub use rules::{Rule, RuleAction, RuleSet};
pub use spec::{
    BackingType, DesiredSpec, FirewallMatch, GroupSpec, LibraryItemSpec, LibrarySpec,
    LibraryType, NatAction, NatRuleSpec, NicSpec, PolicySpec, PublicIpSpec, ReplicationMode,
    SegmentSpec, SegmentSubnet, SegmentType, StorageBacking,
};
pub use upload::{FileSource, FileSpec, UploadSession, UploadState};
