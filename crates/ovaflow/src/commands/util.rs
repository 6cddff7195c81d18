//! Shared rows and helpers for command handlers.

use std::path::Path;

use tabled::Tabled;

use ovaflow_config::{Plan, SecretChain};
use ovaflow_core::{Ensured, ResourceRef, WorkflowRequest};

use crate::cli::PlanArgs;
use crate::error::CliError;
use crate::output;

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Tabled)]
pub struct EnsuredRow {
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Status")]
    status: &'static str,
}

impl From<&Ensured> for EnsuredRow {
    fn from(e: &Ensured) -> Self {
        Self {
            kind: e.reference.kind.to_string(),
            id: e.reference.id.clone(),
            name: e.reference.display_name.clone(),
            status: output::ensured_label(e.created),
        }
    }
}

#[derive(Tabled)]
pub struct RefRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
}

impl From<&ResourceRef> for RefRow {
    fn from(r: &ResourceRef) -> Self {
        Self {
            id: r.id.clone(),
            name: r.display_name.clone(),
        }
    }
}

/// `  Library     lib-1  ova-lib  (created)`
pub fn ensured_line(e: &Ensured) -> String {
    let kind = e.reference.kind.to_string();
    format!(
        "  {kind:<15} {}  {}  ({})",
        e.reference.id,
        e.reference.display_name,
        output::ensured_label(e.created)
    )
}

// ── Plans ───────────────────────────────────────────────────────────

pub fn load_plan(args: &PlanArgs) -> Result<Plan, CliError> {
    Ok(Plan::load(&args.plan)?)
}

pub fn plan_request(plan: &Plan) -> Result<WorkflowRequest, CliError> {
    Ok(plan.to_request(SecretChain::system())?)
}

/// A `[network]` section needs an NSX session. Checked before anything is
/// created, so a vCenter-only profile never leaves a half-networked VM.
pub fn check_nsx(has_nsx: bool, plan: &Path) -> Result<(), CliError> {
    if has_nsx {
        return Ok(());
    }
    Err(CliError::Validation {
        field: "network".into(),
        reason: format!(
            "{} has a [network] section but the profile has no NSX access \
             (set org_id and sddc_id)",
            plan.display()
        ),
    })
}
