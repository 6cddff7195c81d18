// OVF library-item deployment as an `OvfDeployer`.

use ovaflow_core::model::{DeploySpec, DeploymentResult, DeploymentTarget, OvfSummary};
use ovaflow_core::{CoreError, OvfDeployer, ResourceKind};
use tracing::debug;
use uuid::Uuid;

use super::gateway::VsphereGateway;
use super::types;

fn wire_target(target: &DeploymentTarget) -> types::DeploymentTarget<'_> {
    types::DeploymentTarget {
        resource_pool_id: &target.resource_pool_id,
        folder_id: target.folder_id.as_deref(),
    }
}

/// Extra-config pairs travel as a single `ExtraConfigParams` entry.
fn additional_parameters(spec: &DeploySpec) -> Vec<types::ExtraConfigParams> {
    if spec.additional_parameters.is_empty() {
        return Vec::new();
    }
    let pairs = spec
        .additional_parameters
        .iter()
        .map(|(key, value)| types::ExtraConfig {
            key: key.clone(),
            value: value.clone(),
        })
        .collect();
    vec![types::ExtraConfigParams::new(pairs)]
}

fn result_from_wire(result: types::DeploymentResult) -> DeploymentResult {
    if result.succeeded {
        if let Some(identity) = result.resource_id {
            return DeploymentResult::success(identity.id);
        }
    }
    let messages: Vec<String> = result
        .error
        .unwrap_or_default()
        .errors
        .into_iter()
        .filter_map(|e| {
            e.message
                .and_then(|m| m.default_message)
                .or(e.category)
        })
        .collect();
    if messages.is_empty() {
        DeploymentResult::failure("deployment reported no resource id")
    } else {
        DeploymentResult::failure(messages.join("; "))
    }
}

impl OvfDeployer for VsphereGateway {
    async fn filter(
        &self,
        item_id: &str,
        target: &DeploymentTarget,
    ) -> Result<OvfSummary, CoreError> {
        let request = types::FilterRequest {
            target: wire_target(target),
        };
        let resp = self
            .client()
            .ovf_filter(item_id, &request)
            .await
            .map_err(|e| e.for_resource(ResourceKind::LibraryItem, item_id))?;
        Ok(OvfSummary {
            name: resp.name,
            annotation: resp.annotation,
            eulas: resp.eulas,
        })
    }

    async fn deploy(
        &self,
        client_token: Uuid,
        item_id: &str,
        target: &DeploymentTarget,
        spec: &DeploySpec,
    ) -> Result<DeploymentResult, CoreError> {
        let request = types::DeployRequest {
            target: wire_target(target),
            deployment_spec: types::ResourcePoolDeploymentSpec {
                name: &spec.name,
                annotation: spec.annotation.as_deref(),
                accept_all_eula: spec.accept_all_eula,
                additional_parameters: additional_parameters(spec),
            },
        };
        debug!(item = %item_id, vm = %spec.name, "deploying OVF library item");
        let result = self
            .client()
            .ovf_deploy(item_id, &request, client_token)
            .await
            .map_err(|e| e.for_resource(ResourceKind::LibraryItem, item_id))?;
        Ok(result_from_wire(result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wire(body: serde_json::Value) -> types::DeploymentResult {
        serde_json::from_value(body).expect("valid deployment result")
    }

    #[test]
    fn error_messages_are_joined() {
        let result = result_from_wire(wire(serde_json::json!({
            "succeeded": false,
            "error": { "errors": [
                { "category": "SERVER", "message": { "default_message": "no space" } },
                { "category": "INPUT" }
            ]}
        })));
        assert!(!result.succeeded);
        assert_eq!(result.error.as_deref(), Some("no space; INPUT"));
    }

    #[test]
    fn success_carries_vm_id() {
        let result = result_from_wire(wire(serde_json::json!({
            "succeeded": true,
            "resource_id": { "type": "VirtualMachine", "id": "vm-42" }
        })));
        assert_eq!(result, DeploymentResult::success("vm-42"));
    }

    #[test]
    fn extra_config_becomes_one_parameter() {
        let mut spec = DeploySpec {
            name: "vm".into(),
            annotation: None,
            accept_all_eula: true,
            additional_parameters: std::collections::BTreeMap::new(),
        };
        assert!(additional_parameters(&spec).is_empty());

        spec.additional_parameters.insert("guestinfo.ip".into(), "10.0.0.5".into());
        let params = additional_parameters(&spec);
        let json = serde_json::to_value(&params).expect("serializes");
        assert_eq!(json[0]["@class"], "com.vmware.vcenter.ovf.extra_config_params");
        assert_eq!(json[0]["extra_config"][0]["key"], "guestinfo.ip");
    }
}
