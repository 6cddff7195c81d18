//! Command dispatch: bridges CLI args -> orchestrator -> output formatting.

pub mod config_cmd;
pub mod deploy;
pub mod library;
pub mod network;
pub mod ovftool_cmd;
pub mod upload;
pub mod util;

use std::path::Path;

use tokio_util::sync::CancellationToken;

use ovaflow_api::{CompositeGateway, VsphereGateway};
use ovaflow_config::Config;
use ovaflow_core::Orchestrator;

use crate::cli::{Command, GlobalOpts};
use crate::connect::Session;
use crate::error::CliError;

/// Everything a connected command needs.
pub struct Context<'a> {
    pub session: &'a Session,
    pub config: &'a Config,
    pub global: &'a GlobalOpts,
    pub cancel: CancellationToken,
}

pub type Runner<'a> = Orchestrator<'a, CompositeGateway, VsphereGateway, VsphereGateway>;

impl Context<'_> {
    /// An orchestrator over the open sessions, with configured polling.
    pub fn orchestrator(&self) -> Runner<'_> {
        let gateway = &self.session.gateway;
        Orchestrator::new(gateway, gateway.vsphere(), gateway.vsphere())
            .with_poll_config(self.config.defaults.poll_config())
            .with_cancellation(self.cancel.clone())
    }

    /// Fails fast when `plan` needs NSX and this session has none.
    pub fn require_nsx(&self, plan: &Path) -> Result<(), CliError> {
        util::check_nsx(self.session.gateway.nsx().is_some(), plan)
    }
}

/// Dispatch a connected command to its handler.
pub async fn dispatch(cmd: Command, ctx: &Context<'_>) -> Result<(), CliError> {
    match cmd {
        Command::Deploy(args) => deploy::handle(args, ctx).await,
        Command::Library(args) => library::handle(args, ctx).await,
        Command::Upload(args) => upload::handle(args, ctx).await,
        Command::Network(args) => network::handle(args, ctx).await,
        Command::Ovftool(args) => ovftool_cmd::handle(args, ctx).await,
        // Handled before a session is opened
        Command::Config(_) | Command::Completions(_) => Err(CliError::Validation {
            field: "command".into(),
            reason: "does not need a connection".into(),
        }),
    }
}
