//! `ovaflow network reconcile`: the NSX stage on its own.

use std::path::Path;

use ovaflow_core::{NetworkPlan, NetworkReport};

use crate::cli::{NetworkArgs, NetworkCommand};
use crate::error::CliError;
use crate::output;

use super::{Context, util};

fn detail(r: &NetworkReport) -> String {
    let mut lines = vec![format!("Public IP: {}", r.public_address)];
    lines.extend(r.objects.iter().map(util::ensured_line));
    for policy in &r.policies {
        let names: Vec<&str> = policy
            .rules
            .rules()
            .iter()
            .map(|rule| rule.display_name.as_str())
            .collect();
        lines.push(format!("  {:<15} {}  [{}]", "FirewallPolicy", policy.policy.id, names.join(", ")));
    }
    lines.join("\n")
}

/// The plan's network section, or a usage error naming the file.
pub fn required(plan: Option<&NetworkPlan>, path: &Path) -> Result<NetworkPlan, CliError> {
    plan.cloned().ok_or_else(|| CliError::Validation {
        field: "network".into(),
        reason: format!("{} has no [network] section", path.display()),
    })
}

pub async fn handle(args: NetworkArgs, ctx: &Context<'_>) -> Result<(), CliError> {
    match args.command {
        NetworkCommand::Reconcile(plan_args) => {
            let plan = util::load_plan(&plan_args)?;
            let network = required(plan.network.as_ref(), &plan_args.plan)?;
            ctx.require_nsx(&plan_args.plan)?;

            let report = ctx.orchestrator().reconcile_network(&network).await?;
            let out = output::render_single(ctx.global.output, &report, detail, |r| {
                r.public_address.clone()
            })?;
            output::print_output(&out, ctx.global.quiet);
            Ok(())
        }
    }
}
