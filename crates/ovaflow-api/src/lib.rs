// ovaflow-api: async clients for the vSphere Automation, NSX Policy and VMC
// REST APIs, and the gateways that expose them to ovaflow-core.

pub mod auth;
pub mod composite;
pub mod error;
pub mod http;
pub mod nsx;
pub mod transport;
pub mod vmc;
pub mod vsphere;

pub use auth::{AccessToken, exchange_refresh_token, session_client, vsphere_login, vsphere_logout};
pub use composite::CompositeGateway;
pub use error::Error;
pub use http::RestClient;
pub use nsx::{NsxClient, NsxGateway};
pub use transport::{TlsMode, TransportConfig};
pub use vmc::{SddcEndpoints, VmcClient};
pub use vsphere::{VsphereClient, VsphereGateway};
