//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError`, `WorkflowError` and `ConfigError` into user-facing
//! errors with help text and a stable exit code.

use miette::Diagnostic;
use thiserror::Error;

use ovaflow_config::ConfigError;
use ovaflow_core::{CoreError, Stage, WorkflowError};

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONFLICT: i32 = 6;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
    pub const DEPLOY: i32 = 9;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Connection failed: {reason}")]
    #[diagnostic(
        code(ovaflow::connection_failed),
        help(
            "Check that the endpoint is reachable.\n\
             Lab vCenters with self-signed certificates need --insecure (-k) or ca_cert."
        )
    )]
    ConnectionFailed { reason: String },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(ovaflow::auth_failed),
        help(
            "Verify the stored credentials.\n\
             Run: ovaflow config set-secret password\n\
             Or:  ovaflow config set-secret refresh-token"
        )
    )]
    AuthFailed { message: String },

    #[error("No credentials configured for profile '{profile}'")]
    #[diagnostic(
        code(ovaflow::no_credentials),
        help(
            "Set a vcenter URL and username, or org_id and sddc_id, in the profile.\n\
             Secrets come from OVAFLOW_PASSWORD / OVAFLOW_REFRESH_TOKEN or the keyring."
        )
    )]
    NoCredentials { profile: String },

    #[error("Secret '{name}' could not be resolved from {source_kind}")]
    #[diagnostic(
        code(ovaflow::missing_secret),
        help("Export the variable or store the keyring entry, then retry.")
    )]
    MissingSecret { name: String, source_kind: String },

    // ── Remote objects ───────────────────────────────────────────────
    #[error("{kind} '{id}' not found")]
    #[diagnostic(code(ovaflow::not_found))]
    NotFound { kind: String, id: String },

    #[error("{kind} '{id}' already exists")]
    #[diagnostic(
        code(ovaflow::conflict),
        help("Another object owns this name or id. Rename it in the plan or remove the other one.")
    )]
    Conflict { kind: String, id: String },

    #[error("{kind} '{id}' was modified while this run was updating it")]
    #[diagnostic(code(ovaflow::stale_revision), help("Re-run the command; it re-reads the object."))]
    StaleRevision { kind: String, id: String },

    #[error("Could not reconcile {kind} '{name}'")]
    #[diagnostic(code(ovaflow::reconcile_failed))]
    Reconcile {
        kind: String,
        name: String,
        #[source]
        cause: Box<CoreError>,
    },

    #[error("{message}")]
    #[diagnostic(
        code(ovaflow::unsupported),
        help("NSX objects need a profile with org_id and sddc_id.")
    )]
    Unsupported { message: String },

    // ── Workflow ─────────────────────────────────────────────────────
    #[error("Stage {failed_stage} failed")]
    #[diagnostic(code(ovaflow::workflow_failed))]
    Workflow {
        failed_stage: Stage,
        #[help]
        progress: String,
        #[source]
        source: CoreError,
    },

    #[error("Deployment failed: {message}")]
    #[diagnostic(code(ovaflow::deployment_failed))]
    Deployment { message: String },

    #[error("Upload did not finish within {elapsed_secs}s (session {session_id})")]
    #[diagnostic(
        code(ovaflow::upload_timeout),
        help("Raise defaults.upload_timeout in the config file for large packages.")
    )]
    UploadTimedOut { session_id: String, elapsed_secs: u64 },

    #[error("Upload failed: {message}")]
    #[diagnostic(code(ovaflow::upload_failed))]
    UploadFailed { message: String },

    #[error("Interrupted")]
    #[diagnostic(code(ovaflow::cancelled))]
    Cancelled,

    #[error("{program} exited with {status}")]
    #[diagnostic(code(ovaflow::process_failed), help("Re-run with -vv to see the tool's output."))]
    ProcessFailed { program: String, status: String },

    // ── Remote API ───────────────────────────────────────────────────
    #[error("API error: {message}")]
    #[diagnostic(code(ovaflow::api_error))]
    Api { message: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(ovaflow::validation))]
    Validation { field: String, reason: String },

    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(ovaflow::profile_not_found),
        help("Available profiles: {available}\nConfig file: ovaflow config path")
    )]
    ProfileNotFound { name: String, available: String },

    #[error("Plan file not found: {path}")]
    #[diagnostic(code(ovaflow::plan_not_found))]
    PlanNotFound { path: String },

    #[error(transparent)]
    #[diagnostic(code(ovaflow::config))]
    Config(Box<ConfigError>),

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Could not render output: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Could not render output: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

fn workflow_help(last_completed: Option<Stage>, vm_id: Option<&str>) -> String {
    let mut help = match last_completed {
        Some(stage) => format!("Last completed stage: {stage}. Earlier objects were left in place."),
        None => "No stage completed.".to_owned(),
    };
    if let Some(vm) = vm_id {
        help.push_str("\nVM ");
        help.push_str(vm);
        help.push_str(" exists and was not removed.");
    }
    help
}

impl CliError {
    /// Exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::NotFound { .. } | Self::PlanNotFound { .. } => exit_code::NOT_FOUND,
            Self::Conflict { .. } | Self::StaleRevision { .. } => exit_code::CONFLICT,
            Self::UploadTimedOut { .. } => exit_code::TIMEOUT,
            Self::Deployment { .. } | Self::ProcessFailed { .. } => exit_code::DEPLOY,
            Self::Validation { .. }
            | Self::MissingSecret { .. }
            | Self::ProfileNotFound { .. }
            | Self::Unsupported { .. } => exit_code::USAGE,
            Self::Reconcile { cause, .. } => core_exit_code(cause.root_cause()),
            Self::Workflow { source, .. } => core_exit_code(source.root_cause()),
            _ => exit_code::GENERAL,
        }
    }
}

/// Exit code for a leaf core error.
fn core_exit_code(err: &CoreError) -> i32 {
    match err {
        CoreError::NotFound { .. } => exit_code::NOT_FOUND,
        CoreError::Conflict { .. } | CoreError::VersionConflict { .. } => exit_code::CONFLICT,
        CoreError::Authentication { .. } => exit_code::AUTH,
        CoreError::Connection { .. } => exit_code::CONNECTION,
        CoreError::UploadTimedOut { .. } => exit_code::TIMEOUT,
        CoreError::DeploymentFailed { .. } => exit_code::DEPLOY,
        CoreError::Unsupported { .. } => exit_code::USAGE,
        _ => exit_code::GENERAL,
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::NotFound { kind, id } => Self::NotFound {
                kind: kind.to_string(),
                id,
            },
            CoreError::Conflict { kind, id } => Self::Conflict {
                kind: kind.to_string(),
                id,
            },
            CoreError::VersionConflict { kind, id } => Self::StaleRevision {
                kind: kind.to_string(),
                id,
            },
            CoreError::ReconcileFailed { kind, name, cause } => Self::Reconcile {
                kind: kind.to_string(),
                name,
                cause,
            },
            CoreError::Unsupported { kind, operation } => Self::Unsupported {
                message: format!("{operation} is not supported for {kind}"),
            },
            CoreError::DeploymentFailed { error } => Self::Deployment { message: error },
            CoreError::UploadTimedOut {
                session_id,
                elapsed_secs,
            } => Self::UploadTimedOut {
                session_id,
                elapsed_secs,
            },
            err @ CoreError::UploadFailed { .. } => Self::UploadFailed {
                message: err.to_string(),
            },
            CoreError::Cancelled => Self::Cancelled,
            CoreError::Authentication { message } => Self::AuthFailed { message },
            CoreError::Connection { reason } => Self::ConnectionFailed { reason },
            CoreError::Api {
                status: Some(status),
                message,
            } => Self::Api {
                message: format!("HTTP {status}: {message}"),
            },
            CoreError::FatalSetup {
                cause: Some(cause), ..
            } => (*cause).into(),
            CoreError::Api { message, .. }
            | CoreError::FatalSetup { message, .. }
            | CoreError::Internal(message) => Self::Api { message },
        }
    }
}

impl From<WorkflowError> for CliError {
    fn from(err: WorkflowError) -> Self {
        Self::Workflow {
            failed_stage: err.failed_stage,
            progress: workflow_help(err.last_completed, err.vm_id.as_deref()),
            source: err.source,
        }
    }
}

impl From<ovaflow_api::Error> for CliError {
    fn from(err: ovaflow_api::Error) -> Self {
        CoreError::from(err).into()
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            ConfigError::NoCredentials { profile } => Self::NoCredentials { profile },
            ConfigError::MissingSecret { name, source_kind } => {
                Self::MissingSecret { name, source_kind }
            }
            ConfigError::UnknownProfile { profile } => Self::ProfileNotFound {
                name: profile,
                available: "(none)".into(),
            },
            ConfigError::PlanNotFound { path } => Self::PlanNotFound {
                path: path.display().to_string(),
            },
            other => Self::Config(Box::new(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use ovaflow_core::ResourceKind;

    use super::*;

    #[test]
    fn workflow_exit_code_follows_the_root_cause() {
        let err = CliError::from(WorkflowError {
            failed_stage: Stage::PolicyReconciled,
            last_completed: Some(Stage::VmDeployed),
            vm_id: Some("vm-42".into()),
            source: CoreError::ReconcileFailed {
                kind: ResourceKind::FirewallPolicy,
                name: "default".into(),
                cause: Box::new(CoreError::NotFound {
                    kind: ResourceKind::FirewallPolicy,
                    id: "cgw/default".into(),
                }),
            },
        });
        assert_eq!(err.exit_code(), exit_code::NOT_FOUND);
    }

    #[test]
    fn setup_failure_keeps_the_remote_exit_code() {
        let err = CliError::from(WorkflowError {
            failed_stage: Stage::LibraryEnsured,
            last_completed: None,
            vm_id: None,
            source: CoreError::FatalSetup {
                message: "could not ensure library 'ova-lib'".into(),
                cause: Some(Box::new(CoreError::Connection {
                    reason: "connection refused".into(),
                })),
            },
        });
        assert_eq!(err.exit_code(), exit_code::CONNECTION);
    }

    #[test]
    fn deploy_failure_has_its_own_code() {
        let err = CliError::from(CoreError::DeploymentFailed {
            error: "no space".into(),
        });
        assert_eq!(err.exit_code(), exit_code::DEPLOY);
    }

    #[test]
    fn version_conflict_is_a_conflict() {
        let err = CliError::from(CoreError::VersionConflict {
            kind: ResourceKind::FirewallPolicy,
            id: "cgw/default".into(),
        });
        assert_eq!(err.exit_code(), exit_code::CONFLICT);
    }

    #[test]
    fn workflow_help_mentions_leftover_vm() {
        let help = workflow_help(Some(Stage::VmDeployed), Some("vm-42"));
        assert!(help.contains("VmDeployed"));
        assert!(help.contains("vm-42"));
    }
}
