//! Library command handlers.

use ovaflow_core::{FindCriteria, LibraryRequest, ResourceGateway, ResourceKind};

use crate::cli::{LibraryArgs, LibraryCommand};
use crate::error::CliError;
use crate::output;

use super::{Context, util};

pub async fn handle(args: LibraryArgs, ctx: &Context<'_>) -> Result<(), CliError> {
    match args.command {
        LibraryCommand::Ensure {
            name,
            datastore,
            description,
        } => {
            let request = LibraryRequest {
                name,
                datastore,
                description,
            };
            let ensured = ctx.orchestrator().ensure_library(&request).await?;
            let out = output::render_single(
                ctx.global.output,
                &ensured,
                util::ensured_line,
                |e| e.reference.id.clone(),
            )?;
            output::print_output(&out, ctx.global.quiet);
            Ok(())
        }

        LibraryCommand::Find { name } => {
            let found = ctx
                .session
                .gateway
                .find(&FindCriteria::new(ResourceKind::Library).named(&name))
                .await?;
            if found.is_empty() {
                return Err(CliError::NotFound {
                    kind: ResourceKind::Library.to_string(),
                    id: name,
                });
            }
            let out = output::render_list(
                ctx.global.output,
                &found,
                |r| util::RefRow::from(r),
                |r| r.id.clone(),
            )?;
            output::print_output(&out, ctx.global.quiet);
            Ok(())
        }
    }
}
