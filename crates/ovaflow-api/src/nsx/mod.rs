// NSX Policy API (plus the VMC public-IP endpoint): NAT, segments, groups
// and gateway firewall policies.

pub mod client;
pub mod gateway;
pub mod types;

pub use client::{Collection, NsxClient};
pub use gateway::{NsxGateway, object_id};
