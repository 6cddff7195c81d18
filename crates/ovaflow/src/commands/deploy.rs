//! `ovaflow deploy`: the full workflow from a plan.

use ovaflow_core::WorkflowReport;

use crate::cli::PlanArgs;
use crate::error::CliError;
use crate::output::{self, UploadProgress};

use super::{Context, util};

fn detail(r: &WorkflowReport) -> String {
    let mut lines = vec![
        format!("VM:       {} ({})", r.vm_name, r.vm_id),
        format!("NIC:      {}", r.nic_id.as_deref().unwrap_or("-")),
        format!("Elapsed:  {}", output::elapsed(r.started_at, r.finished_at)),
        String::new(),
        util::ensured_line(&r.library),
        util::ensured_line(&r.item),
    ];
    if let Some(network) = &r.network {
        lines.push(format!("  Public IP:      {}", network.public_address));
        lines.extend(network.objects.iter().map(util::ensured_line));
        for policy in &network.policies {
            lines.push(format!(
                "  {:<15} {}  {} rules",
                "FirewallPolicy",
                policy.policy.id,
                policy.rules.len()
            ));
        }
    }
    lines.join("\n")
}

pub async fn handle(args: PlanArgs, ctx: &Context<'_>) -> Result<(), CliError> {
    let plan = util::load_plan(&args)?;
    if plan.network.is_some() {
        ctx.require_nsx(&args.plan)?;
    }
    let request = util::plan_request(&plan)?;

    let progress = UploadProgress::new(ctx.global.quiet);
    let orchestrator = ctx.orchestrator().on_progress(|s| progress.update(s));
    let result = orchestrator.run(&request).await;
    progress.finish();

    let report = result?;
    output::print_stages(&report.stages, ctx.global.quiet);
    let out = output::render_single(ctx.global.output, &report, detail, |r| r.vm_id.clone())?;
    output::print_output(&out, ctx.global.quiet);
    Ok(())
}
