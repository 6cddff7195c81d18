// ── OVF deployer capability ──

use std::future::Future;

use uuid::Uuid;

use crate::error::CoreError;
use crate::model::{DeploySpec, DeploymentResult, DeploymentTarget, OvfSummary};

/// Instantiates library items as VMs.
pub trait OvfDeployer: Send + Sync {
    /// Reads the package summary (annotation, EULAs) for a target.
    fn filter(
        &self,
        item_id: &str,
        target: &DeploymentTarget,
    ) -> impl Future<Output = Result<OvfSummary, CoreError>> + Send;

    /// A server-side rejection comes back as `Ok` with `succeeded == false`;
    /// `Err` is reserved for transport failures.
    fn deploy(
        &self,
        client_token: Uuid,
        item_id: &str,
        target: &DeploymentTarget,
        spec: &DeploySpec,
    ) -> impl Future<Output = Result<DeploymentResult, CoreError>> + Send;
}

/// Name used when a request does not pick one.
pub fn generated_vm_name() -> String {
    format!("deployed-vm-{}", Uuid::new_v4())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_names_are_unique_and_prefixed() {
        let a = generated_vm_name();
        let b = generated_vm_name();
        assert!(a.starts_with("deployed-vm-"));
        assert_ne!(a, b);
    }
}
