// One `ResourceGateway` over both control planes.

use ovaflow_core::{
    CoreError, DesiredSpec, FindCriteria, Resource, ResourceGateway, ResourceKind, ResourceRef,
};
use uuid::Uuid;

use crate::nsx::NsxGateway;
use crate::vsphere::VsphereGateway;

/// Routes cloud-networking kinds to NSX and everything else to vCenter.
///
/// The NSX half is optional: a deployment without a network plan never
/// needs it, and asking for an NSX kind without one is `Unsupported`.
#[derive(Debug, Clone)]
pub struct CompositeGateway {
    vsphere: VsphereGateway,
    nsx: Option<NsxGateway>,
}

impl CompositeGateway {
    pub fn new(vsphere: VsphereGateway, nsx: Option<NsxGateway>) -> Self {
        Self { vsphere, nsx }
    }

    pub fn vsphere(&self) -> &VsphereGateway {
        &self.vsphere
    }

    pub fn nsx(&self) -> Option<&NsxGateway> {
        self.nsx.as_ref()
    }

    fn nsx_for(&self, kind: ResourceKind) -> Result<Option<&NsxGateway>, CoreError> {
        if !NsxGateway::owns(kind) {
            return Ok(None);
        }
        self.nsx.as_ref().map(Some).ok_or(CoreError::Unsupported {
            kind,
            operation: "NSX access without an NSX endpoint",
        })
    }
}

impl ResourceGateway for CompositeGateway {
    async fn find(&self, criteria: &FindCriteria) -> Result<Vec<ResourceRef>, CoreError> {
        match self.nsx_for(criteria.kind)? {
            Some(nsx) => nsx.find(criteria).await,
            None => self.vsphere.find(criteria).await,
        }
    }

    async fn get(&self, kind: ResourceKind, id: &str) -> Result<Resource, CoreError> {
        match self.nsx_for(kind)? {
            Some(nsx) => nsx.get(kind, id).await,
            None => self.vsphere.get(kind, id).await,
        }
    }

    async fn create(
        &self,
        kind: ResourceKind,
        client_token: Uuid,
        spec: &DesiredSpec,
    ) -> Result<String, CoreError> {
        match self.nsx_for(kind)? {
            Some(nsx) => nsx.create(kind, client_token, spec).await,
            None => self.vsphere.create(kind, client_token, spec).await,
        }
    }

    async fn update(
        &self,
        kind: ResourceKind,
        id: &str,
        resource: &Resource,
    ) -> Result<Resource, CoreError> {
        match self.nsx_for(kind)? {
            Some(nsx) => nsx.update(kind, id, resource).await,
            None => self.vsphere.update(kind, id, resource).await,
        }
    }

    async fn patch(
        &self,
        kind: ResourceKind,
        id: &str,
        resource: &Resource,
    ) -> Result<Resource, CoreError> {
        match self.nsx_for(kind)? {
            Some(nsx) => nsx.patch(kind, id, resource).await,
            None => self.vsphere.patch(kind, id, resource).await,
        }
    }

    async fn delete(&self, kind: ResourceKind, id: &str) -> Result<(), CoreError> {
        match self.nsx_for(kind)? {
            Some(nsx) => nsx.delete(kind, id).await,
            None => self.vsphere.delete(kind, id).await,
        }
    }
}
