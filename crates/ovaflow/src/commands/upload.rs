//! `ovaflow upload`: ensure a library item and stage its package.

use serde::Serialize;
use url::Url;

use ovaflow_core::model::{FileSource, FileSpec};
use ovaflow_core::{Ensured, FindCriteria, ItemRequest, Reconciler, ResourceKind, UploadState};

use crate::cli::UploadArgs;
use crate::error::CliError;
use crate::output::{self, UploadProgress};

use super::{Context, util};

#[derive(Serialize)]
struct UploadReport {
    item: Ensured,
    /// Absent when the item already existed and nothing was uploaded.
    upload: Option<UploadState>,
}

fn detail(r: &UploadReport) -> String {
    let upload = r
        .upload
        .map_or_else(|| "skipped (item exists)".to_owned(), |s| s.to_string());
    format!("{}\n  Upload:         {upload}", util::ensured_line(&r.item))
}

/// Last path segment of `url`, unless the caller named the file.
fn file_spec(args: &UploadArgs) -> Result<FileSpec, CliError> {
    let url = Url::parse(&args.url).map_err(|e| CliError::Validation {
        field: "url".into(),
        reason: format!("{}: {e}", args.url),
    })?;
    let name = args.file_name.clone().unwrap_or_else(|| {
        url.path_segments()
            .and_then(|mut s| s.next_back())
            .filter(|s| !s.is_empty())
            .map_or_else(|| args.item.clone(), str::to_owned)
    });
    Ok(FileSpec {
        name,
        source: FileSource::Pull {
            uri: url.into(),
            ssl_thumbprint: args.ssl_thumbprint.clone(),
        },
    })
}

pub async fn handle(args: UploadArgs, ctx: &Context<'_>) -> Result<(), CliError> {
    let file = file_spec(&args)?;
    let library = Reconciler::new(&ctx.session.gateway)
        .lookup(FindCriteria::new(ResourceKind::Library).named(&args.library))
        .await?;

    let progress = UploadProgress::new(ctx.global.quiet);
    let orchestrator = ctx.orchestrator().on_progress(|s| progress.update(s));
    let item = orchestrator
        .ensure_item(
            &library.id,
            &ItemRequest {
                name: args.item.clone(),
                item_type: args.item_type.clone(),
                source: Some(file.clone()),
            },
        )
        .await?;

    let upload = if item.created {
        let staged = orchestrator.stage(&item.reference.id, &file).await;
        progress.finish();
        Some(staged?.state)
    } else {
        progress.finish();
        None
    };

    let report = UploadReport { item, upload };
    let out = output::render_single(ctx.global.output, &report, detail, |r| {
        r.item.reference.id.clone()
    })?;
    output::print_output(&out, ctx.global.quiet);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(url: &str, file_name: Option<&str>) -> UploadArgs {
        UploadArgs {
            library: "ova-lib".into(),
            item: "collector-proxy".into(),
            url: url.into(),
            ssl_thumbprint: None,
            file_name: file_name.map(str::to_owned),
            item_type: "ovf".into(),
        }
    }

    #[test]
    fn file_name_defaults_to_last_segment() {
        let spec = file_spec(&args("https://downloads.example.com/b/proxy.ova", None)).expect("valid");
        assert_eq!(spec.name, "proxy.ova");
    }

    #[test]
    fn bare_host_falls_back_to_item_name() {
        let spec = file_spec(&args("https://downloads.example.com/", None)).expect("valid");
        assert_eq!(spec.name, "collector-proxy");
    }

    #[test]
    fn explicit_file_name_wins() {
        let spec = file_spec(&args("https://x.example.com/a.ova", Some("proxy.ovf"))).expect("valid");
        assert_eq!(spec.name, "proxy.ovf");
    }

    #[test]
    fn invalid_url_is_a_usage_error() {
        let err = file_spec(&args("not a url", None)).expect_err("invalid");
        assert_eq!(err.exit_code(), crate::error::exit_code::USAGE);
    }
}
