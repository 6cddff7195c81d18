// ── Core error types ──
//
// Errors surfaced by reconciliation, transfer, and orchestration. Transport
// crates translate their own failures into these variants so callers never
// see HTTP status codes or JSON parse failures directly.

use thiserror::Error;

use crate::model::{ResourceKind, UploadState};
use crate::orchestrator::Stage;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Remote object state ──────────────────────────────────────────
    #[error("{kind} not found: {id}")]
    NotFound { kind: ResourceKind, id: String },

    #[error("{kind} {id} conflicts with an existing object")]
    Conflict { kind: ResourceKind, id: String },

    #[error("{kind} {id} was modified concurrently")]
    VersionConflict { kind: ResourceKind, id: String },

    #[error("{operation} is not supported for {kind}")]
    Unsupported {
        kind: ResourceKind,
        operation: &'static str,
    },

    // ── Reconciliation ───────────────────────────────────────────────
    #[error("Could not reconcile {kind} '{name}': {cause}")]
    ReconcileFailed {
        kind: ResourceKind,
        name: String,
        #[source]
        cause: Box<CoreError>,
    },

    // ── Workflow ─────────────────────────────────────────────────────
    #[error("Deployment failed: {error}")]
    DeploymentFailed { error: String },

    #[error("Setup failed: {message}")]
    FatalSetup {
        message: String,
        /// The remote failure behind it, when there is one.
        #[source]
        cause: Option<Box<CoreError>>,
    },

    #[error("Upload session {session_id} still active after {elapsed_secs}s")]
    UploadTimedOut { session_id: String, elapsed_secs: u64 },

    #[error("Upload session {session_id} ended in state {state}: {message}")]
    UploadFailed {
        session_id: String,
        state: UploadState,
        message: String,
    },

    #[error("Operation cancelled")]
    Cancelled,

    // ── Remote endpoint ──────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    #[error("Connection failed: {reason}")]
    Connection { reason: String },

    #[error("API error: {message}")]
    Api {
        /// HTTP status code (if applicable).
        status: Option<u16>,
        message: String,
    },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Returns `true` if the remote object does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns `true` for both natural-key and version conflicts.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. } | Self::VersionConflict { .. })
    }

    /// Follows `ReconcileFailed` and `FatalSetup` wrappers down to the
    /// remote failure.
    pub fn root_cause(&self) -> &CoreError {
        match self {
            Self::ReconcileFailed { cause, .. }
            | Self::FatalSetup {
                cause: Some(cause), ..
            } => cause.root_cause(),
            other => other,
        }
    }
}

/// A workflow failure tagged with where the run stopped.
#[derive(Debug, Error)]
#[error("stage {failed_stage} failed: {source}")]
pub struct WorkflowError {
    pub failed_stage: Stage,
    pub last_completed: Option<Stage>,
    /// Set once a VM exists, so callers can find what was left behind.
    pub vm_id: Option<String>,
    #[source]
    pub source: CoreError,
}
