//! `ovaflow ovftool`: reconcile the network, then deploy with the OVF tool.

use ovaflow_config::SecretChain;
use ovaflow_core::{NetworkReport, ResourceKind, generated_vm_name};

use crate::cli::PlanArgs;
use crate::error::CliError;
use crate::ovftool::{OvftoolCommand, Target, TokioRunner};
use crate::output;

use super::{Context, util};

/// The reconciled segment, which the appliance is attached to.
fn segment_id(report: &NetworkReport) -> Option<&str> {
    report
        .objects
        .iter()
        .find(|e| e.reference.kind == ResourceKind::Segment)
        .map(|e| e.reference.id.as_str())
}

pub async fn handle(args: PlanArgs, ctx: &Context<'_>) -> Result<(), CliError> {
    let plan = util::load_plan(&args)?;
    let section = plan.ovftool.as_ref().ok_or_else(|| CliError::Validation {
        field: "ovftool".into(),
        reason: format!("{} has no [ovftool] section", args.plan.display()),
    })?;
    if plan.network.is_some() {
        ctx.require_nsx(&args.plan)?;
    }
    let properties = section.resolved_properties(SecretChain::system())?;

    let report = match &plan.network {
        Some(network) => Some(ctx.orchestrator().reconcile_network(network).await?),
        None => None,
    };
    let network = report
        .as_ref()
        .and_then(segment_id)
        .unwrap_or(section.network.as_str());

    let name = plan.vm.name.clone().unwrap_or_else(generated_vm_name);
    let login = &ctx.session.vcenter;
    let command = OvftoolCommand::build(
        section,
        &name,
        network,
        &properties,
        &Target {
            vcenter: &login.url,
            username: &login.username,
            password: &login.password,
            insecure: ctx.session.insecure,
        },
    );
    command.run(&TokioRunner).await?;

    if !ctx.global.quiet {
        eprintln!("Deployed {name} on {network}");
    }
    if let Some(report) = &report {
        let out = output::render_list(
            ctx.global.output,
            &report.objects,
            |e| util::EnsuredRow::from(e),
            |e| e.reference.id.clone(),
        )?;
        output::print_output(&out, ctx.global.quiet);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use ovaflow_core::{Ensured, ResourceRef};

    use super::*;

    #[test]
    fn picks_the_segment_from_the_report() {
        let report = NetworkReport {
            public_address: "34.1.2.3".into(),
            objects: vec![
                Ensured {
                    reference: ResourceRef::new(ResourceKind::PublicIp, "vc-ip", "vc-ip"),
                    created: false,
                },
                Ensured {
                    reference: ResourceRef::new(ResourceKind::Segment, "proxy-segment", "proxy segment"),
                    created: true,
                },
            ],
            policies: Vec::new(),
        };
        assert_eq!(segment_id(&report), Some("proxy-segment"));
    }
}
