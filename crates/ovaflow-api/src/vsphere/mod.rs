// vSphere Automation API: content library, OVF deployment, inventory and
// VM hardware.

pub mod client;
mod deploy;
pub mod gateway;
mod transfer;
pub mod types;

pub use client::VsphereClient;
pub use gateway::VsphereGateway;
